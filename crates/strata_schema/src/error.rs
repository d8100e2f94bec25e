//! Error types for schema definition and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type alias for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A configuration failed validation.
///
/// Validation stops at the first violation, so a single error is returned
/// rather than a collected list. Every variant names the offending field
/// using a dotted path (`scaling_config.min_size`, `ingress[1].protocol`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value {value} for {field}: expected one of {}", .allowed.join(", "))]
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("{field} violates {constraint}: {message}")]
    ConstraintViolation {
        field: String,
        constraint: String,
        message: String,
    },

    #[error("{field} must contain {} items, got {len}", describe_bounds(.min, .max))]
    ArraySizeViolation {
        field: String,
        len: usize,
        min: Option<usize>,
        max: Option<usize>,
    },

    #[error("{field} must be {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Only one of {} may be set{}, found {}", .groups.join(", "), describe_scope(.scope), .present.join(" and "))]
    AmbiguousVariant {
        scope: String,
        groups: Vec<String>,
        present: Vec<String>,
    },

    #[error("One of {} must be set{}", .groups.join(", "), describe_scope(.scope))]
    NoVariantSelected { scope: String, groups: Vec<String> },

    #[error("{message}")]
    CrossFieldRuleViolation {
        rule: String,
        fields: Vec<String>,
        message: String,
    },

    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    #[error("Duplicate key after normalization: {field}")]
    DuplicateKey { field: String },

    #[error("Source file for {field} not found: {}", .path.display())]
    SourceNotFound { field: String, path: PathBuf },
}

impl ValidationError {
    /// Field paths the error refers to.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingField { field }
            | Self::InvalidEnumValue { field, .. }
            | Self::ConstraintViolation { field, .. }
            | Self::ArraySizeViolation { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::UnknownField { field }
            | Self::DuplicateKey { field }
            | Self::SourceNotFound { field, .. } => vec![field.as_str()],
            Self::AmbiguousVariant { present, .. } => present.iter().map(String::as_str).collect(),
            Self::NoVariantSelected { groups, .. } => groups.iter().map(String::as_str).collect(),
            Self::CrossFieldRuleViolation { fields, .. } => {
                fields.iter().map(String::as_str).collect()
            }
        }
    }

    /// The primary field the error refers to.
    pub fn field(&self) -> Option<&str> {
        self.fields().into_iter().next()
    }
}

fn describe_bounds(min: &Option<usize>, max: &Option<usize>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("between {} and {}", min, max),
        (Some(min), None) => format!("at least {}", min),
        (None, Some(max)) => format!("at most {}", max),
        (None, None) => "any number of".to_string(),
    }
}

fn describe_scope(scope: &str) -> String {
    if scope.is_empty() {
        String::new()
    } else {
        format!(" in {}", scope)
    }
}

/// A schema declaration is inconsistent.
///
/// These surface when a schema is built, never while validating input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Schema {schema} declares field {field} more than once")]
    DuplicateField { schema: String, field: String },

    #[error("Schema {schema}: {rule} refers to undeclared field {field}")]
    UndeclaredField {
        schema: String,
        rule: String,
        field: String,
    },

    #[error("Schema {schema}: default for {field} is invalid: {reason}")]
    InvalidDefault {
        schema: String,
        field: String,
        reason: String,
    },

    #[error("Invalid pattern for {name}: {message}")]
    InvalidPattern { name: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_size_message() {
        let err = ValidationError::ArraySizeViolation {
            field: "subnet_ids".to_string(),
            len: 0,
            min: Some(1),
            max: None,
        };
        assert_eq!(err.to_string(), "subnet_ids must contain at least 1 items, got 0");
    }

    #[test]
    fn test_variant_message_names_groups() {
        let err = ValidationError::AmbiguousVariant {
            scope: String::new(),
            groups: vec!["ip".into(), "hostname".into()],
            present: vec!["ip".into(), "hostname".into()],
        };
        assert_eq!(
            err.to_string(),
            "Only one of ip, hostname may be set, found ip and hostname"
        );
        assert_eq!(err.field(), Some("ip"));
    }
}
