//! Emission plans: how a validated config maps onto Terraform JSON.

use strata_schema::{FieldType, Schema};

use crate::error::{SynthError, SynthResult};

/// How a single field is emitted.
#[derive(Debug, Clone)]
pub enum Emit {
    /// Flat key/value, including maps and scalar arrays.
    Attribute,
    /// Nested block built recursively from an object.
    Block(EmissionPlan),
    /// One nested block per element of an array of objects.
    RepeatedBlock(EmissionPlan),
    /// Consumed by validation only, never emitted.
    Skip,
}

/// Emission rule for one field.
#[derive(Debug, Clone)]
pub struct EmitRule {
    /// Canonical field name in the validated config.
    pub field: String,
    /// Key written to the synthesized block.
    pub key: String,
    pub emit: Emit,
}

/// Per-resource-type emission plan.
#[derive(Debug, Clone, Default)]
pub struct EmissionPlan {
    rules: Vec<EmitRule>,
    unmatched: Vec<String>,
}

impl EmissionPlan {
    /// Derive a plan from a schema.
    ///
    /// Objects become nested blocks, arrays of objects become repeated
    /// blocks and everything else is emitted flat under its own name.
    pub fn from_schema(schema: &Schema) -> Self {
        let rules = schema
            .fields()
            .iter()
            .map(|field| EmitRule {
                field: field.name.clone(),
                key: field.name.clone(),
                emit: emit_for(&field.ty),
            })
            .collect();
        Self {
            rules,
            unmatched: Vec::new(),
        }
    }

    pub fn rules(&self) -> &[EmitRule] {
        &self.rules
    }

    pub fn rule(&self, field: &str) -> Option<&EmitRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    /// Emit `field` under a different key (`taints` → `taint`).
    pub fn rename(self, field: &str, key: impl Into<String>) -> Self {
        let key = key.into();
        self.update(field, |rule| rule.key = key)
    }

    /// Keep `field` out of the synthesized block.
    pub fn skip(self, field: &str) -> Self {
        self.update(field, |rule| rule.emit = Emit::Skip)
    }

    /// Emit an object or array field as a plain attribute value.
    pub fn attribute(self, field: &str) -> Self {
        self.update(field, |rule| rule.emit = Emit::Attribute)
    }

    /// Adjust the plan of a nested or repeated block.
    pub fn nested(self, field: &str, adjust: impl FnOnce(EmissionPlan) -> EmissionPlan) -> Self {
        self.update(field, |rule| {
            rule.emit = match std::mem::replace(&mut rule.emit, Emit::Skip) {
                Emit::Block(plan) => Emit::Block(adjust(plan)),
                Emit::RepeatedBlock(plan) => Emit::RepeatedBlock(adjust(plan)),
                other => other,
            }
        })
    }

    fn update(mut self, field: &str, apply: impl FnOnce(&mut EmitRule)) -> Self {
        match self.rules.iter_mut().find(|r| r.field == field) {
            Some(rule) => apply(rule),
            None => self.unmatched.push(field.to_string()),
        }
        self
    }

    /// Check that every schema field has exactly one matching rule.
    pub fn verify(&self, resource_type: &str, schema: &Schema) -> SynthResult<()> {
        self.verify_at(resource_type, schema, "")
    }

    fn verify_at(&self, resource_type: &str, schema: &Schema, path: &str) -> SynthResult<()> {
        let qualified = |name: &str| {
            if path.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", path, name)
            }
        };

        if let Some(field) = self.unmatched.first() {
            return Err(SynthError::UnknownPlanField {
                resource_type: resource_type.to_string(),
                field: qualified(field),
            });
        }

        for rule in &self.rules {
            if schema.field(&rule.field).is_none() {
                return Err(SynthError::UnknownPlanField {
                    resource_type: resource_type.to_string(),
                    field: qualified(&rule.field),
                });
            }
        }

        for field in schema.fields() {
            let Some(rule) = self.rule(&field.name) else {
                return Err(SynthError::UnplannedField {
                    resource_type: resource_type.to_string(),
                    field: qualified(&field.name),
                });
            };
            let nested = match (&rule.emit, field.ty.object_schema(), field.ty.element_schema()) {
                (Emit::Block(plan), Some(inner), _) => Some((plan, inner)),
                (Emit::RepeatedBlock(plan), _, Some(inner)) => Some((plan, inner)),
                _ => None,
            };
            if let Some((plan, inner)) = nested {
                plan.verify_at(resource_type, inner, &qualified(&field.name))?;
            }
        }

        Ok(())
    }
}

fn emit_for(ty: &FieldType) -> Emit {
    if let Some(schema) = ty.object_schema() {
        Emit::Block(EmissionPlan::from_schema(schema))
    } else if let Some(schema) = ty.element_schema() {
        Emit::RepeatedBlock(EmissionPlan::from_schema(schema))
    } else {
        Emit::Attribute
    }
}
