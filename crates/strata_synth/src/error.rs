//! Error types for synthesis.

use thiserror::Error;

/// Result type alias for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors raised while synthesizing blocks or building references.
///
/// These indicate programming errors in resource definitions or invalid
/// names, never bad configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthError {
    #[error("No emission rule for field {field} of {resource_type}")]
    UnplannedField { resource_type: String, field: String },

    #[error("Emission plan for {resource_type} overrides undeclared field {field}")]
    UnknownPlanField { resource_type: String, field: String },

    #[error("Invalid {kind} identifier: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Resource {resource_type}.{name} is already defined")]
    DuplicateResource { resource_type: String, name: String },

    #[error("Output {0} is already defined")]
    DuplicateOutput(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SynthError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}
