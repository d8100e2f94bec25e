//! Resource references: placeholders and computed properties.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use strata_schema::ValidatedConfig;

use crate::error::SynthResult;
use crate::ident;

/// Computed property name → value.
pub type Computed = BTreeMap<String, Value>;

/// Interpolation placeholder for an output of a resource.
pub fn placeholder(resource_type: &str, name: &str, field: &str) -> String {
    format!("${{{}.{}.{}}}", resource_type, name, field)
}

/// Handle returned by every resource constructor.
///
/// Output placeholders are resolved by the external evaluator, never here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReference {
    resource_type: String,
    name: String,
    config: ValidatedConfig,
    outputs: BTreeMap<String, String>,
    computed: Computed,
}

impl ResourceReference {
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Terraform address, `type.name`.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    /// Placeholder for a documented output.
    pub fn output(&self, field: &str) -> Option<&str> {
        self.outputs.get(field).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.output("id")
    }

    pub fn arn(&self) -> Option<&str> {
        self.output("arn")
    }

    /// Placeholder for any attribute, documented or not.
    pub fn placeholder(&self, field: &str) -> SynthResult<String> {
        ident::check_output_name(field)?;
        Ok(placeholder(&self.resource_type, &self.name, field))
    }

    pub fn computed_properties(&self) -> &Computed {
        &self.computed
    }

    pub fn computed(&self, name: &str) -> Option<&Value> {
        self.computed.get(name)
    }

    pub fn computed_bool(&self, name: &str) -> Option<bool> {
        self.computed(name).and_then(Value::as_bool)
    }

    pub fn computed_f64(&self, name: &str) -> Option<f64> {
        self.computed(name).and_then(Value::as_f64)
    }
}

/// Build the reference for a freshly synthesized resource.
pub fn build_reference(
    resource_type: &str,
    name: &str,
    config: ValidatedConfig,
    output_fields: &[&str],
    computed: Computed,
) -> SynthResult<ResourceReference> {
    ident::check_resource_type(resource_type)?;
    ident::check_instance_name(name)?;

    let mut outputs = BTreeMap::new();
    for field in output_fields {
        ident::check_output_name(field)?;
        outputs.insert(field.to_string(), placeholder(resource_type, name, field));
    }

    Ok(ResourceReference {
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        config,
        outputs,
        computed,
    })
}
