//! The accumulating Terraform JSON document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SynthError, SynthResult};
use crate::ident;
use crate::synthesizer::SynthesizedBlock;

/// A Terraform `output` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
}

impl Output {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            description: None,
            sensitive: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Resource type → instance name → block, plus outputs.
///
/// Blocks are appended and never modified. Serializes directly to
/// Terraform JSON syntax.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "resource", skip_serializing_if = "BTreeMap::is_empty")]
    resources: BTreeMap<String, BTreeMap<String, Map<String, Value>>>,
    #[serde(rename = "output", skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, Output>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block. A second block with the same type and name is rejected.
    pub fn insert(&mut self, block: SynthesizedBlock) -> SynthResult<()> {
        let (resource_type, name, body) = block.into_parts();
        let instances = self.resources.entry(resource_type.clone()).or_default();
        if instances.contains_key(&name) {
            return Err(SynthError::DuplicateResource { resource_type, name });
        }
        debug!("Adding {}.{} to document", resource_type, name);
        instances.insert(name, body);
        Ok(())
    }

    pub fn add_output(&mut self, name: impl Into<String>, output: Output) -> SynthResult<()> {
        let name = name.into();
        ident::check_instance_name(&name)?;
        if self.outputs.contains_key(&name) {
            return Err(SynthError::DuplicateOutput(name));
        }
        self.outputs.insert(name, output);
        Ok(())
    }

    /// Merge a separately built document, e.g. one assembled in parallel.
    ///
    /// Fails without modifying `self` if any entry collides.
    pub fn merge(&mut self, other: Document) -> SynthResult<()> {
        for (resource_type, instances) in &other.resources {
            for name in instances.keys() {
                if self.contains(resource_type, name) {
                    return Err(SynthError::DuplicateResource {
                        resource_type: resource_type.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        if let Some(name) = other.outputs.keys().find(|n| self.outputs.contains_key(*n)) {
            return Err(SynthError::DuplicateOutput(name.clone()));
        }

        for (resource_type, instances) in other.resources {
            self.resources.entry(resource_type).or_default().extend(instances);
        }
        self.outputs.extend(other.outputs);
        Ok(())
    }

    pub fn resource(&self, resource_type: &str, name: &str) -> Option<&Map<String, Value>> {
        self.resources.get(resource_type).and_then(|i| i.get(name))
    }

    pub fn contains(&self, resource_type: &str, name: &str) -> bool {
        self.resource(resource_type, name).is_some()
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.get(name)
    }

    pub fn resource_types(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }

    pub fn to_value(&self) -> SynthResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> SynthResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
