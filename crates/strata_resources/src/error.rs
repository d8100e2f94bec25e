//! Error types for resource construction.

use std::path::PathBuf;

use thiserror::Error;

use strata_schema::{SchemaError, ValidationError};
use strata_synth::SynthError;

/// Result type alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors that can occur while building resources.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Invalid configuration for {resource_type}.{name}: {error}")]
    Validation {
        resource_type: String,
        name: String,
        error: ValidationError,
    },

    #[error("Synthesis error: {0}")]
    Synth(#[from] SynthError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid pricing catalog {path}: {message}")]
    Pricing { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResourceError {
    /// The underlying validation failure, if this is one.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation { error, .. } => Some(error),
            _ => None,
        }
    }
}
