//! Integration tests for schema validation.

use proptest::prelude::*;
use serde_json::{json, Value};

use strata_schema::{
    check_rules, parse, validate, Attributes, Constraint, FieldType, Schema, ValidationError,
    VariantGroup,
};

fn scaling_schema() -> Schema {
    Schema::builder("scaling_config")
        .with_default("min_size", FieldType::Integer.with(Constraint::at_least(0)), json!(1))
        .with_default("max_size", FieldType::Integer, json!(1))
        .with_default("desired_size", FieldType::Integer, json!(1))
        .rule("min_le_max", &["min_size", "max_size"], |c| {
            match (c.get_i64("min_size"), c.get_i64("max_size")) {
                (Some(min), Some(max)) if min > max => Err(format!(
                    "min_size ({}) cannot be greater than max_size ({})",
                    min, max
                )),
                _ => Ok(()),
            }
        })
        .rule(
            "desired_in_range",
            &["min_size", "max_size", "desired_size"],
            |c| {
                let (min, max, desired) = (
                    c.get_i64("min_size").unwrap_or_default(),
                    c.get_i64("max_size").unwrap_or_default(),
                    c.get_i64("desired_size").unwrap_or_default(),
                );
                if desired < min || desired > max {
                    return Err(format!(
                        "desired_size ({}) must be between min_size ({}) and max_size ({})",
                        desired, min, max
                    ));
                }
                Ok(())
            },
        )
        .build()
        .unwrap()
}

fn list_item_schema() -> Schema {
    Schema::builder("list_item")
        .optional("ip", FieldType::String)
        .optional("asn", FieldType::Integer)
        .optional("hostname", FieldType::String)
        .optional("redirect_source", FieldType::String)
        .optional("redirect_target", FieldType::String)
        .exactly_one_of_groups(vec![
            VariantGroup::single("ip"),
            VariantGroup::single("asn"),
            VariantGroup::single("hostname"),
            VariantGroup::new("redirect", &["redirect_source", "redirect_target"]),
        ])
        .build()
        .unwrap()
}

fn node_group_schema() -> Schema {
    let taint = Schema::builder("taint")
        .required("key", FieldType::String)
        .optional("value", FieldType::String)
        .required(
            "effect",
            FieldType::enumeration(&["NO_SCHEDULE", "NO_EXECUTE", "PREFER_NO_SCHEDULE"]),
        )
        .build()
        .unwrap();

    Schema::builder("node_group")
        .required("cluster_name", FieldType::String)
        .required("scaling_config", FieldType::object(scaling_schema()))
        .optional("taints", FieldType::array_bounded(FieldType::object(taint), None, Some(2)))
        .with_default("capacity_type", FieldType::enumeration(&["ON_DEMAND", "SPOT"]), json!("ON_DEMAND"))
        .build()
        .unwrap()
}

#[test]
fn test_scaling_min_greater_than_max() {
    let err = validate(
        &scaling_schema(),
        &json!({"min_size": 5, "max_size": 3, "desired_size": 4}),
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("min_size"), "{}", message);
    assert!(message.contains("max_size"), "{}", message);
    assert_eq!(message, "min_size (5) cannot be greater than max_size (3)");
    assert!(matches!(err, ValidationError::CrossFieldRuleViolation { ref rule, .. } if rule == "min_le_max"));
}

#[test]
fn test_first_failing_rule_wins() {
    // Both rules fail; only the first declared is reported.
    let err = validate(
        &scaling_schema(),
        &json!({"min_size": 5, "max_size": 3, "desired_size": 10}),
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::CrossFieldRuleViolation { ref rule, .. } if rule == "min_le_max"));
}

#[test]
fn test_nested_error_paths() {
    let err = validate(
        &node_group_schema(),
        &json!({
            "cluster_name": "main",
            "scaling_config": {"min_size": 1, "max_size": 3, "desired_size": 2},
            "taints": [
                {"key": "gpu", "effect": "NO_SCHEDULE"},
                {"key": "spot", "effect": "SOMETIMES"}
            ]
        }),
    )
    .unwrap_err();

    assert_eq!(err.field(), Some("taints[1].effect"));
    assert!(matches!(err, ValidationError::InvalidEnumValue { .. }));
}

#[test]
fn test_nested_rule_fields_are_prefixed() {
    let err = validate(
        &node_group_schema(),
        &json!({
            "cluster_name": "main",
            "scaling_config": {"min_size": 4, "max_size": 2, "desired_size": 3}
        }),
    )
    .unwrap_err();

    assert_eq!(
        err.fields(),
        vec!["scaling_config.min_size", "scaling_config.max_size"]
    );
}

#[test]
fn test_array_size_violation() {
    let err = validate(
        &node_group_schema(),
        &json!({
            "cluster_name": "main",
            "scaling_config": {},
            "taints": [
                {"key": "a", "effect": "NO_SCHEDULE"},
                {"key": "b", "effect": "NO_SCHEDULE"},
                {"key": "c", "effect": "NO_SCHEDULE"}
            ]
        }),
    )
    .unwrap_err();

    assert_eq!(
        err,
        ValidationError::ArraySizeViolation {
            field: "taints".to_string(),
            len: 3,
            min: None,
            max: Some(2),
        }
    );
}

#[test]
fn test_missing_required_field() {
    let err = validate(&node_group_schema(), &json!({"scaling_config": {}})).unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingField {
            field: "cluster_name".to_string()
        }
    );
}

#[test]
fn test_nested_defaults_applied() {
    let config = validate(
        &node_group_schema(),
        &json!({"cluster_name": "main", "scaling_config": {}}),
    )
    .unwrap();

    let scaling = config.get_object("scaling_config").unwrap();
    assert_eq!(scaling.get_i64("min_size"), Some(1));
    assert_eq!(scaling.get_i64("max_size"), Some(1));
    assert_eq!(config.get_str("capacity_type"), Some("ON_DEMAND"));
    assert!(!config.has("taints"));
}

#[test]
fn test_two_phase_composition() {
    let raw = json!({"min_size": 5, "max_size": 3, "desired_size": 4});
    let schema = scaling_schema();

    // Shape is fine; only the rule phase rejects it.
    let parsed = parse(&schema, &raw).unwrap();
    assert!(check_rules(&schema, &parsed).is_err());
}

#[test]
fn test_multi_field_variant_group() {
    let schema = list_item_schema();

    let config = validate(
        &schema,
        &json!({"redirect_source": "a.example.com/", "redirect_target": "https://b.example.com"}),
    )
    .unwrap();
    assert!(config.has("redirect_source"));

    let err = validate(&schema, &json!({"ip": "10.0.0.1", "redirect_source": "a/"})).unwrap_err();
    assert_eq!(
        err,
        ValidationError::AmbiguousVariant {
            scope: String::new(),
            groups: vec![
                "ip".to_string(),
                "asn".to_string(),
                "hostname".to_string(),
                "redirect".to_string()
            ],
            present: vec!["ip".to_string(), "redirect".to_string()],
        }
    );
}

fn variant_input(ip: bool, asn: bool, hostname: bool, redirect: bool) -> Value {
    let mut object = serde_json::Map::new();
    if ip {
        object.insert("ip".into(), json!("192.0.2.1"));
    }
    if asn {
        object.insert("asn".into(), json!(13335));
    }
    if hostname {
        object.insert("hostname".into(), json!("example.com"));
    }
    if redirect {
        object.insert("redirect_target".into(), json!("https://example.com"));
    }
    Value::Object(object)
}

proptest! {
    #[test]
    fn prop_scaling_range_invariant(min in -20i64..20, max in -20i64..20, desired in -20i64..20) {
        let result = validate(
            &scaling_schema(),
            &json!({"min_size": min, "max_size": max, "desired_size": desired}),
        );
        let expected = min >= 0 && min <= desired && desired <= max;
        prop_assert_eq!(result.is_ok(), expected);
    }

    #[test]
    fn prop_exactly_one_variant(ip: bool, asn: bool, hostname: bool, redirect: bool) {
        let selected = [ip, asn, hostname, redirect].iter().filter(|b| **b).count();
        let result = validate(&list_item_schema(), &variant_input(ip, asn, hostname, redirect));

        match selected {
            0 => prop_assert!(matches!(result, Err(ValidationError::NoVariantSelected { .. })), "expected NoVariantSelected, got {:?}", result),
            1 => prop_assert!(result.is_ok()),
            _ => prop_assert!(matches!(result, Err(ValidationError::AmbiguousVariant { .. })), "expected AmbiguousVariant, got {:?}", result),
        }
    }

    #[test]
    fn prop_validation_is_idempotent(min in 0i64..10, extra in 0i64..10, use_default: bool) {
        let raw = if use_default {
            json!({"cluster_name": "main", "scaling_config": {}})
        } else {
            json!({
                "cluster_name": "main",
                "scaling_config": {"min_size": min, "max_size": min + extra, "desired_size": min},
                "capacity_type": "SPOT"
            })
        };
        let schema = node_group_schema();
        let first = validate(&schema, &raw).unwrap();
        let second = validate(&schema, &first.to_value()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_omitted_fields_take_defaults(omit_min: bool, omit_max: bool, omit_desired: bool) {
        let mut raw = serde_json::Map::new();
        if !omit_min {
            raw.insert("min_size".into(), json!(1));
        }
        if !omit_max {
            raw.insert("max_size".into(), json!(1));
        }
        if !omit_desired {
            raw.insert("desired_size".into(), json!(1));
        }
        let config = validate(&scaling_schema(), &Value::Object(raw)).unwrap();
        for field in scaling_schema().fields() {
            prop_assert_eq!(config.attr(&field.name), field.default.as_ref());
        }
    }
}
