//! Error types for composition.

use std::path::PathBuf;

use thiserror::Error;

use strata_resources::ResourceError;
use strata_synth::SynthError;

/// Result type alias for composition operations.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Errors that can occur while composing a template.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Step {step} ({resource_type}) failed")]
    Step {
        step: String,
        resource_type: String,
        #[source]
        source: Box<ComposeError>,
    },

    #[error("Output {output} failed")]
    Output {
        output: String,
        #[source]
        source: Box<ComposeError>,
    },

    #[error("Unknown reference {reference}: {reason}")]
    UnknownReference { reference: String, reason: String },

    #[error("Instance name {0} is used by more than one step")]
    DuplicateInstance(String),

    #[error("Unknown architecture: {0}")]
    UnknownArchitecture(String),

    #[error("Invalid parameters for architecture {architecture}: {message}")]
    InvalidParameters { architecture: String, message: String },

    #[error("Invalid template {path}: {message}")]
    InvalidTemplate { path: PathBuf, message: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ComposeError {
    /// Wrap an error raised while running a step.
    pub fn in_step(self, step: &str, resource_type: &str) -> Self {
        Self::Step {
            step: step.to_string(),
            resource_type: resource_type.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, unwrapping step and output context.
    pub fn root(&self) -> &ComposeError {
        match self {
            Self::Step { source, .. } | Self::Output { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure is a configuration validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), Self::Resource(e) if e.validation_error().is_some())
    }
}
