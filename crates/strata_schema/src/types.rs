//! Composable field types and constraints.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;

/// Predicate used by [`Constraint::Predicate`].
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// An additional check applied on top of a base field type.
#[derive(Clone)]
pub enum Constraint {
    /// String must match a regular expression.
    Pattern { name: String, regex: Regex },
    /// Number must fall within inclusive bounds.
    Range { min: Option<f64>, max: Option<f64> },
    /// Integer bounds, compared without going through `f64`.
    IntRange { min: Option<i64>, max: Option<i64> },
    /// String length (in characters) must fall within inclusive bounds.
    Length { min: Option<usize>, max: Option<usize> },
    /// Arbitrary named predicate.
    Predicate { name: String, check: PredicateFn },
}

impl Constraint {
    /// Regex constraint. The name is what error messages report.
    pub fn pattern(name: impl Into<String>, pattern: &str) -> SchemaResult<Self> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern {
            name: name.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::Pattern { name, regex })
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self::Range { min, max }
    }

    pub fn between(min: i64, max: i64) -> Self {
        Self::IntRange {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: i64) -> Self {
        Self::IntRange {
            min: Some(min),
            max: None,
        }
    }

    pub fn length(min: Option<usize>, max: Option<usize>) -> Self {
        Self::Length { min, max }
    }

    pub fn predicate(
        name: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Predicate {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Human-readable name reported in `ConstraintViolation`.
    pub fn name(&self) -> String {
        match self {
            Self::Pattern { name, .. } | Self::Predicate { name, .. } => name.clone(),
            Self::Range { min, max } => range_name(min.as_ref(), max.as_ref()),
            Self::IntRange { min, max } => range_name(min.as_ref(), max.as_ref()),
            Self::Length { min, max } => match (min, max) {
                (Some(min), Some(max)) => format!("length {}..={}", min, max),
                (Some(min), None) => format!("minimum length {}", min),
                (None, Some(max)) => format!("maximum length {}", max),
                (None, None) => "length".to_string(),
            },
        }
    }

    /// Check a value that already matched the base type.
    ///
    /// Returns the failure message on violation.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Self::Pattern { regex, .. } => match value.as_str() {
                Some(s) if regex.is_match(s) => Ok(()),
                Some(s) => Err(format!("{:?} does not match {}", s, regex.as_str())),
                None => Err(format!("{} is not a string", value)),
            },
            Self::Range { min, max } => {
                let Some(n) = value.as_f64() else {
                    return Err(format!("{} is not a number", value));
                };
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("{} is less than {}", value, min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("{} is greater than {}", value, max));
                    }
                }
                Ok(())
            }
            Self::IntRange { min, max } => {
                if !value.is_number() {
                    return Err(format!("{} is not a number", value));
                }
                if let Some(min) = min {
                    if compare_int(value, *min) == Some(Ordering::Less) {
                        return Err(format!("{} is less than {}", value, min));
                    }
                }
                if let Some(max) = max {
                    if compare_int(value, *max) == Some(Ordering::Greater) {
                        return Err(format!("{} is greater than {}", value, max));
                    }
                }
                Ok(())
            }
            Self::Length { min, max } => {
                let Some(s) = value.as_str() else {
                    return Err(format!("{} is not a string", value));
                };
                let len = s.chars().count();
                if min.is_some_and(|min| len < min) || max.is_some_and(|max| len > max) {
                    return Err(format!("length {} is out of bounds", len));
                }
                Ok(())
            }
            Self::Predicate { name, check } => {
                if check(value) {
                    Ok(())
                } else {
                    Err(format!("{} is not a valid {}", value, name))
                }
            }
        }
    }
}

fn range_name<T: fmt::Display>(min: Option<&T>, max: Option<&T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("range {}..={}", min, max),
        (Some(min), None) => format!("minimum {}", min),
        (None, Some(max)) => format!("maximum {}", max),
        (None, None) => "range".to_string(),
    }
}

/// Order a JSON number against an integer bound, exactly for integers.
fn compare_int(value: &Value, bound: i64) -> Option<Ordering> {
    if let Some(n) = value.as_i64() {
        Some(n.cmp(&bound))
    } else if let Some(n) = value.as_u64() {
        Some(i128::from(n).cmp(&i128::from(bound)))
    } else {
        value.as_f64().and_then(|n| n.partial_cmp(&(bound as f64)))
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern { name, regex } => f
                .debug_struct("Pattern")
                .field("name", name)
                .field("regex", &regex.as_str())
                .finish(),
            Self::Predicate { name, .. } => {
                f.debug_struct("Predicate").field("name", name).finish()
            }
            Self::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::IntRange { min, max } => f
                .debug_struct("IntRange")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Length { min, max } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .finish(),
        }
    }
}

/// The declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Any JSON value, passed through unchecked.
    Any,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    Constrained(Box<FieldType>, Constraint),
    Object(Schema),
    Array {
        element: Box<FieldType>,
        min: Option<usize>,
        max: Option<usize>,
    },
    /// String-keyed map with homogeneous values (tags, labels).
    Map(Box<FieldType>),
}

impl FieldType {
    pub fn enumeration<S: AsRef<str>>(values: &[S]) -> Self {
        Self::Enum(values.iter().map(|v| v.as_ref().to_string()).collect())
    }

    pub fn constrained(base: FieldType, constraint: Constraint) -> Self {
        Self::Constrained(Box::new(base), constraint)
    }

    pub fn object(schema: Schema) -> Self {
        Self::Object(schema)
    }

    pub fn array_of(element: FieldType) -> Self {
        Self::Array {
            element: Box::new(element),
            min: None,
            max: None,
        }
    }

    pub fn array_bounded(element: FieldType, min: Option<usize>, max: Option<usize>) -> Self {
        Self::Array {
            element: Box::new(element),
            min,
            max,
        }
    }

    pub fn map_of(value: FieldType) -> Self {
        Self::Map(Box::new(value))
    }

    /// Shorthand for `FieldType::constrained(self, constraint)`.
    pub fn with(self, constraint: Constraint) -> Self {
        Self::constrained(self, constraint)
    }

    /// Short description used in `TypeMismatch` messages.
    pub fn describe(&self) -> String {
        match self {
            Self::String => "a string".to_string(),
            Self::Integer => "an integer".to_string(),
            Self::Number => "a number".to_string(),
            Self::Boolean => "a boolean".to_string(),
            Self::Any => "any value".to_string(),
            Self::Enum(values) => format!("one of {}", values.join(", ")),
            Self::Constrained(base, _) => base.describe(),
            Self::Object(_) => "an object".to_string(),
            Self::Array { element, .. } => format!("an array of {}", element.describe()),
            Self::Map(value) => format!("a map of {}", value.describe()),
        }
    }

    /// The object schema this type validates against, if any.
    ///
    /// Looks through constraints and array element types, which is what the
    /// synthesizer needs to decide between nested and repeated blocks.
    pub fn object_schema(&self) -> Option<&Schema> {
        match self {
            Self::Object(schema) => Some(schema),
            Self::Constrained(base, _) => base.object_schema(),
            _ => None,
        }
    }

    /// Element schema when this is an array of objects.
    pub fn element_schema(&self) -> Option<&Schema> {
        match self {
            Self::Array { element, .. } => element.object_schema(),
            Self::Constrained(base, _) => base.element_schema(),
            _ => None,
        }
    }
}

/// JSON shape name used in `TypeMismatch` messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a number",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_constraint() {
        let c = Constraint::between(1, 65535);
        assert!(c.check(&json!(443)).is_ok());
        assert!(c.check(&json!(0)).is_err());
        assert!(c.check(&json!(70000)).is_err());
        assert_eq!(c.name(), "range 1..=65535");
    }

    #[test]
    fn test_integer_bounds_are_exact() {
        let max = i64::MAX - 1;
        let c = Constraint::between(0, max);
        assert!(c.check(&json!(max)).is_ok());
        assert!(c.check(&json!(i64::MAX)).is_err());
        assert!(c.check(&json!(u64::MAX)).is_err());

        let c = Constraint::at_least(9_007_199_254_740_993);
        assert!(c.check(&json!(9_007_199_254_740_992_i64)).is_err());
        assert!(c.check(&json!(9_007_199_254_740_993_i64)).is_ok());
        assert_eq!(c.name(), "minimum 9007199254740993");
    }

    #[test]
    fn test_pattern_constraint() {
        let c = Constraint::pattern("AMI id", r"^ami-[0-9a-f]{8,17}$").unwrap();
        assert!(c.check(&json!("ami-0abcdef1234567890")).is_ok());
        assert!(c.check(&json!("img-123")).is_err());
    }

    #[test]
    fn test_invalid_pattern_is_schema_error() {
        let err = Constraint::pattern("broken", "([a-z").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn test_length_constraint() {
        let c = Constraint::length(Some(3), Some(5));
        assert!(c.check(&json!("abcd")).is_ok());
        assert!(c.check(&json!("ab")).is_err());
    }
}
