//! Integration tests for synthesis and references.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use regex::Regex;
use serde_json::{json, Map, Value};

use strata_schema::{validate, FieldType, Schema};
use strata_synth::{build_reference, synthesize, Computed, Document, EmissionPlan};

fn node_group_schema() -> Schema {
    let scaling = Schema::builder("scaling_config")
        .with_default("min_size", FieldType::Integer, json!(1))
        .with_default("max_size", FieldType::Integer, json!(1))
        .with_default("desired_size", FieldType::Integer, json!(1))
        .build()
        .unwrap();
    let taint = Schema::builder("taint")
        .required("key", FieldType::String)
        .optional("value", FieldType::String)
        .required("effect", FieldType::enumeration(&["NO_SCHEDULE", "NO_EXECUTE"]))
        .build()
        .unwrap();

    Schema::builder("aws_eks_node_group")
        .required("cluster_name", FieldType::String)
        .required("scaling_config", FieldType::object(scaling))
        .optional("instance_types", FieldType::array_of(FieldType::String))
        .optional("taints", FieldType::array_of(FieldType::object(taint)))
        .optional("labels", FieldType::map_of(FieldType::String))
        .optional("release_version", FieldType::String)
        .build()
        .unwrap()
}

fn node_group_plan(schema: &Schema) -> EmissionPlan {
    EmissionPlan::from_schema(schema).rename("taints", "taint")
}

#[test]
fn test_nested_and_repeated_blocks() {
    let schema = node_group_schema();
    let config = validate(
        &schema,
        &json!({
            "cluster_name": "main",
            "scaling_config": {"min_size": 1, "max_size": 4, "desired_size": 2},
            "taints": [
                {"key": "gpu", "value": "true", "effect": "NO_SCHEDULE"},
                {"key": "spot", "effect": "NO_EXECUTE"}
            ],
            "labels": {"team": "ml"}
        }),
    )
    .unwrap();

    let block = synthesize("aws_eks_node_group", "gpu", &config, &node_group_plan(&schema)).unwrap();

    assert_eq!(
        Value::Object(block.body().clone()),
        json!({
            "cluster_name": "main",
            "scaling_config": {"min_size": 1, "max_size": 4, "desired_size": 2},
            "taint": [
                {"key": "gpu", "value": "true", "effect": "NO_SCHEDULE"},
                {"key": "spot", "effect": "NO_EXECUTE"}
            ],
            "labels": {"team": "ml"}
        })
    );
}

#[test]
fn test_empty_optional_array_omitted() {
    let schema = node_group_schema();
    let config = validate(
        &schema,
        &json!({"cluster_name": "main", "scaling_config": {}, "instance_types": [], "taints": []}),
    )
    .unwrap();

    let block = synthesize("aws_eks_node_group", "main", &config, &node_group_plan(&schema)).unwrap();

    assert!(!block.contains_key("instance_types"));
    assert!(!block.contains_key("taint"));
    assert!(!block.contains_key("taints"));
}

#[test]
fn test_document_keeps_placeholders_verbatim() {
    let schema = node_group_schema();
    let plan = node_group_plan(&schema);
    let config = validate(
        &schema,
        &json!({"cluster_name": "${aws_eks_cluster.main.name}", "scaling_config": {}}),
    )
    .unwrap();

    let mut document = Document::new();
    document
        .insert(synthesize("aws_eks_node_group", "main", &config, &plan).unwrap())
        .unwrap();

    let json = document.to_json_pretty().unwrap();
    assert!(json.contains("\"cluster_name\": \"${aws_eks_cluster.main.name}\""));
}

fn optional_fields() -> Vec<&'static str> {
    vec!["instance_types", "taints", "labels", "release_version"]
}

fn value_for(field: &str) -> Value {
    match field {
        "instance_types" => json!(["t3.large"]),
        "taints" => json!([{"key": "a", "effect": "NO_SCHEDULE"}]),
        "labels" => json!({"tier": "web"}),
        _ => json!("1.29"),
    }
}

proptest! {
    #[test]
    fn prop_absent_optional_fields_never_emitted(mask in proptest::collection::vec(any::<bool>(), 4)) {
        let schema = node_group_schema();
        let plan = node_group_plan(&schema);

        let mut raw = Map::new();
        raw.insert("cluster_name".into(), json!("main"));
        raw.insert("scaling_config".into(), json!({}));
        for (field, include) in optional_fields().into_iter().zip(&mask) {
            if *include {
                raw.insert(field.to_string(), value_for(field));
            }
        }

        let config = validate(&schema, &Value::Object(raw)).unwrap();
        let block = synthesize("aws_eks_node_group", "main", &config, &plan).unwrap();

        for (field, include) in optional_fields().into_iter().zip(&mask) {
            let key = plan.rule(field).unwrap().key.clone();
            prop_assert_eq!(block.contains_key(&key), *include);
        }
        prop_assert!(block.body().values().all(|v| !v.is_null()));
    }

    #[test]
    fn prop_placeholder_format(
        resource_type in "[a-z][a-z0-9_]{0,20}",
        name in "[A-Za-z_][A-Za-z0-9_-]{0,20}",
        field in "[a-z0-9_]{1,12}",
    ) {
        let pattern = Regex::new(r"^\$\{[a-z][a-z0-9_]*\.[A-Za-z_][A-Za-z0-9_-]*\.[a-z0-9_]+\}$").unwrap();
        let schema = Schema::builder("any").build().unwrap();
        let config = validate(&schema, &json!({})).unwrap();

        let reference = build_reference(&resource_type, &name, config, &[field.as_str(), "id"], Computed::new()).unwrap();

        for placeholder in reference.outputs().values() {
            prop_assert!(pattern.is_match(placeholder), "{}", placeholder);
            prop_assert_eq!(placeholder.matches("${").count(), 1);
        }
    }
}
