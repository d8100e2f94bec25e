//! Resource synthesizer: validated config to Terraform JSON block.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use strata_schema::ValidatedConfig;

use crate::error::{SynthError, SynthResult};
use crate::ident;
use crate::plan::{Emit, EmissionPlan};

/// One declarative resource entry, keyed by type and instance name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedBlock {
    resource_type: String,
    name: String,
    body: Map<String, Value>,
}

impl SynthesizedBlock {
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    pub fn into_parts(self) -> (String, String, Map<String, Value>) {
        (self.resource_type, self.name, self.body)
    }
}

/// Walk `config` according to `plan` and build the block.
///
/// Absent optional fields, nulls, empty arrays and empty maps are never
/// emitted. Repeated-block elements that end up empty are dropped too.
pub fn synthesize(
    resource_type: &str,
    name: &str,
    config: &ValidatedConfig,
    plan: &EmissionPlan,
) -> SynthResult<SynthesizedBlock> {
    ident::check_resource_type(resource_type)?;
    ident::check_instance_name(name)?;

    let body = emit_object(resource_type, plan, config.as_map(), "")?;
    debug!(
        "Synthesized {}.{} with {} attributes",
        resource_type,
        name,
        body.len()
    );

    Ok(SynthesizedBlock {
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        body,
    })
}

fn emit_object(
    resource_type: &str,
    plan: &EmissionPlan,
    object: &Map<String, Value>,
    path: &str,
) -> SynthResult<Map<String, Value>> {
    let mut out = Map::new();

    for (field, value) in object {
        let field_path = if path.is_empty() {
            field.clone()
        } else {
            format!("{}.{}", path, field)
        };
        let rule = plan.rule(field).ok_or_else(|| SynthError::UnplannedField {
            resource_type: resource_type.to_string(),
            field: field_path.clone(),
        })?;

        let emitted = match (&rule.emit, value) {
            (Emit::Skip, _) => None,
            (Emit::Block(inner), Value::Object(nested)) => {
                let block = emit_object(resource_type, inner, nested, &field_path)?;
                (!block.is_empty()).then_some(Value::Object(block))
            }
            (Emit::RepeatedBlock(inner), Value::Array(items)) => {
                let mut blocks = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", field_path, i);
                    match item {
                        Value::Object(nested) => {
                            let block = emit_object(resource_type, inner, nested, &item_path)?;
                            if !block.is_empty() {
                                blocks.push(Value::Object(block));
                            }
                        }
                        other => blocks.extend(prune(other)),
                    }
                }
                (!blocks.is_empty()).then_some(Value::Array(blocks))
            }
            (_, other) => prune(other),
        };

        if let Some(value) = emitted {
            out.insert(rule.key.clone(), value);
        }
    }

    Ok(out)
}

/// Drop nulls and empty containers, recursively for maps.
fn prune(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(entries) => {
            let kept: Map<String, Value> = entries
                .iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k.clone(), v)))
                .collect();
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
        other => Some(other.clone()),
    }
}
