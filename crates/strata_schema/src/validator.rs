//! Attribute validation: apply a schema to raw input.
//!
//! Validation is two-phase. [`parse`] checks shape, types and constraints and
//! applies defaults; [`check_rules`] then runs tagged-union and cross-field
//! rules, innermost objects first. [`validate`] composes both. The first
//! violation found is returned.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ValidatedConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::schema::{Schema, UnknownKeys};
use crate::types::{json_kind, FieldType};

/// Canonical form of a configuration key.
///
/// Symbol-style keys (`:min_size`) lose their leading colon and
/// dashes become underscores.
pub fn normalize_key(key: &str) -> String {
    key.trim().trim_start_matches(':').replace('-', "_")
}

/// Whether a string carries an unresolved `${...}` placeholder.
///
/// Such values are only known after external evaluation, so format
/// constraints are not applied to them and scalar fields of any type
/// accept them.
pub fn is_interpolation(s: &str) -> bool {
    s.contains("${")
}

/// Parse and rule-check `raw` against `schema`.
pub fn validate(schema: &Schema, raw: &Value) -> ValidationResult<ValidatedConfig> {
    let config = parse(schema, raw)?;
    check_rules(schema, &config)?;
    Ok(config)
}

/// First phase: shape, type and constraint checks with defaulting.
pub fn parse(schema: &Schema, raw: &Value) -> ValidationResult<ValidatedConfig> {
    let Some(object) = raw.as_object() else {
        return Err(ValidationError::TypeMismatch {
            field: schema.name().to_string(),
            expected: "an object".to_string(),
            found: json_kind(raw).to_string(),
        });
    };
    parse_object(schema, object, "").map(ValidatedConfig::new)
}

/// Second phase: tagged-union and cross-field rules.
pub fn check_rules(schema: &Schema, config: &ValidatedConfig) -> ValidationResult<()> {
    check_object_rules(schema, config.as_map(), "")
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn normalize_object(object: &Map<String, Value>, path: &str) -> ValidationResult<Map<String, Value>> {
    let mut normalized = Map::new();
    for (key, value) in object {
        let canonical = normalize_key(key);
        if normalized.contains_key(&canonical) {
            return Err(ValidationError::DuplicateKey {
                field: child_path(path, &canonical),
            });
        }
        normalized.insert(canonical, value.clone());
    }
    Ok(normalized)
}

fn parse_object(
    schema: &Schema,
    object: &Map<String, Value>,
    path: &str,
) -> ValidationResult<Map<String, Value>> {
    let input = normalize_object(object, path)?;
    let mut output = Map::new();

    for field in schema.fields() {
        let field_path = child_path(path, &field.name);
        match input.get(&field.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let checked = check_value(&field.ty, value, &field_path)?;
                output.insert(field.name.clone(), checked);
            }
            None if field.required => {
                return Err(ValidationError::MissingField { field: field_path });
            }
            None => {
                if let Some(default) = &field.default {
                    debug!("Defaulting {} to {}", field_path, default);
                    output.insert(field.name.clone(), default.clone());
                }
            }
        }
    }

    for key in input.keys() {
        if schema.field(key).is_some() {
            continue;
        }
        let field_path = child_path(path, key);
        match schema.unknown_keys() {
            UnknownKeys::Reject => {
                return Err(ValidationError::UnknownField { field: field_path });
            }
            UnknownKeys::Strip => debug!("Stripping unknown field {}", field_path),
        }
    }

    Ok(output)
}

/// Check a single value against a field type, returning its parsed form.
pub(crate) fn check_value(ty: &FieldType, value: &Value, path: &str) -> ValidationResult<Value> {
    let mismatch = || ValidationError::TypeMismatch {
        field: path.to_string(),
        expected: ty.describe(),
        found: json_kind(value).to_string(),
    };

    match ty {
        FieldType::Any => Ok(value.clone()),
        FieldType::String if value.is_string() => Ok(value.clone()),
        FieldType::Integer if value.is_i64() || value.is_u64() => Ok(value.clone()),
        FieldType::Number if value.is_number() => Ok(value.clone()),
        FieldType::Boolean if value.is_boolean() => Ok(value.clone()),
        FieldType::Integer | FieldType::Number | FieldType::Boolean
            if value.as_str().is_some_and(is_interpolation) =>
        {
            Ok(value.clone())
        }
        FieldType::String | FieldType::Integer | FieldType::Number | FieldType::Boolean => {
            Err(mismatch())
        }
        FieldType::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => Ok(value.clone()),
            _ => Err(ValidationError::InvalidEnumValue {
                field: path.to_string(),
                value: value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
                allowed: allowed.clone(),
            }),
        },
        FieldType::Constrained(base, constraint) => {
            let checked = check_value(base, value, path)?;
            if checked.as_str().is_some_and(is_interpolation) {
                debug!("Deferring {} check on {} to the evaluator", constraint.name(), path);
                return Ok(checked);
            }
            constraint
                .check(&checked)
                .map_err(|message| ValidationError::ConstraintViolation {
                    field: path.to_string(),
                    constraint: constraint.name(),
                    message,
                })?;
            Ok(checked)
        }
        FieldType::Object(schema) => match value.as_object() {
            Some(object) => parse_object(schema, object, path).map(Value::Object),
            None => Err(mismatch()),
        },
        FieldType::Array { element, min, max } => {
            let Some(items) = value.as_array() else {
                return Err(mismatch());
            };
            let len = items.len();
            if min.is_some_and(|min| len < min) || max.is_some_and(|max| len > max) {
                return Err(ValidationError::ArraySizeViolation {
                    field: path.to_string(),
                    len,
                    min: *min,
                    max: *max,
                });
            }
            items
                .iter()
                .enumerate()
                .map(|(i, item)| check_value(element, item, &format!("{}[{}]", path, i)))
                .collect::<ValidationResult<Vec<_>>>()
                .map(Value::Array)
        }
        FieldType::Map(value_type) => {
            let Some(entries) = value.as_object() else {
                return Err(mismatch());
            };
            // Map keys are user data (tag names), so they are not normalized.
            let mut checked = Map::new();
            for (key, entry) in entries {
                let entry = check_value(value_type, entry, &child_path(path, key))?;
                checked.insert(key.clone(), entry);
            }
            Ok(Value::Object(checked))
        }
    }
}

fn check_object_rules(schema: &Schema, object: &Map<String, Value>, path: &str) -> ValidationResult<()> {
    for field in schema.fields() {
        if let Some(value) = object.get(&field.name) {
            check_nested_rules(&field.ty, value, &child_path(path, &field.name))?;
        }
    }

    for variant in schema.variants() {
        let present: Vec<String> = variant
            .groups
            .iter()
            .filter(|g| g.is_present(object))
            .map(|g| child_path(path, &g.name))
            .collect();

        if present.len() > 1 {
            return Err(ValidationError::AmbiguousVariant {
                scope: path.to_string(),
                groups: variant.group_names(),
                present,
            });
        }
        if present.is_empty() && variant.required {
            return Err(ValidationError::NoVariantSelected {
                scope: path.to_string(),
                groups: variant.group_names(),
            });
        }
    }

    for rule in schema.rules() {
        (rule.check)(object).map_err(|message| ValidationError::CrossFieldRuleViolation {
            rule: rule.name.clone(),
            fields: rule.fields.iter().map(|f| child_path(path, f)).collect(),
            message,
        })?;
    }

    Ok(())
}

fn check_nested_rules(ty: &FieldType, value: &Value, path: &str) -> ValidationResult<()> {
    match (ty, value) {
        (FieldType::Constrained(base, _), _) => check_nested_rules(base, value, path),
        (FieldType::Object(schema), Value::Object(object)) => check_object_rules(schema, object, path),
        (FieldType::Array { element, .. }, Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_nested_rules(element, item, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        (FieldType::Map(value_type), Value::Object(entries)) => {
            for (key, entry) in entries {
                check_nested_rules(value_type, entry, &child_path(path, key))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
