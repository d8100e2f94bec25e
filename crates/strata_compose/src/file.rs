//! Declarative template files.
//!
//! A template file lists architectures to expand, resources to build and
//! outputs to export. String values may refer to an earlier resource with
//! `{{ instance.output }}`, which is rewritten to that output's placeholder:
//!
//! ```yaml
//! name: static-site
//! resources:
//!   - type: aws_s3_bucket
//!     name: site
//!     config:
//!       bucket: example-site
//! outputs:
//!   bucket_arn:
//!     value: "{{ site.arn }}"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use strata_synth::Output;

use crate::architectures;
use crate::error::{ComposeError, ComposeResult};
use crate::template::{References, Template};

/// A template as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expanded before `resources`, in order.
    #[serde(default)]
    pub architectures: Vec<ArchitectureSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputSpec>,
}

/// An architecture instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchitectureSpec {
    /// Architecture name, e.g. `web_application`.
    #[serde(alias = "type")]
    pub kind: String,
    /// Prefix for the instance names the architecture creates.
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

/// A single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
}

impl TemplateFile {
    /// Load a template from YAML (`.yaml`, `.yml`) or JSON (`.json`).
    pub fn load(path: &Path) -> ComposeResult<Self> {
        debug!("Loading template from {:?}", path);
        let content = fs::read_to_string(path)?;
        let invalid = |message: String| ComposeError::InvalidTemplate {
            path: path.to_path_buf(),
            message,
        };

        let file: TemplateFile = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => return Err(invalid("expected a .yaml, .yml or .json file".to_string())),
        };

        if file.architectures.is_empty() && file.resources.is_empty() {
            return Err(invalid("template defines no architectures or resources".to_string()));
        }
        Ok(file)
    }

    pub fn from_yaml_str(content: &str) -> ComposeResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> ComposeResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Turn the file into a runnable template.
    ///
    /// Architectures are expanded here; references are only resolved when
    /// the template is composed.
    pub fn into_template(self) -> ComposeResult<Template> {
        let interpolator = Arc::new(Interpolator::new()?);
        let mut template = Template::new(self.name);

        for architecture in self.architectures {
            template.extend(architectures::expand(
                &architecture.kind,
                &architecture.name,
                architecture.params,
            )?);
        }

        for resource in self.resources {
            let interpolator = Arc::clone(&interpolator);
            let config = resource.config;
            template = template.step(resource.resource_type, resource.name, move |refs| {
                interpolator.apply(&config, refs)
            });
        }

        for (name, spec) in self.outputs {
            let interpolator = Arc::clone(&interpolator);
            template = template.output(name, move |refs| {
                let mut output = Output::new(interpolator.apply(&spec.value, refs)?);
                if let Some(description) = &spec.description {
                    output = output.with_description(description.clone());
                }
                if spec.sensitive {
                    output = output.sensitive();
                }
                Ok(output)
            });
        }

        Ok(template)
    }
}

/// Rewrites `{{ instance.output }}` inside string values.
#[derive(Debug, Clone)]
pub struct Interpolator {
    pattern: Regex,
}

impl Interpolator {
    pub fn new() -> ComposeResult<Self> {
        Ok(Self {
            pattern: Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_-]*)\.([a-z0-9_]+)\s*\}\}")?,
        })
    }

    /// Rewrite every string inside `value`, recursing into arrays and objects.
    pub fn apply(&self, value: &Value, refs: &References) -> ComposeResult<Value> {
        Ok(match value {
            Value::String(text) => Value::String(self.render(text, refs)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.apply(item, refs))
                    .collect::<ComposeResult<_>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.apply(v, refs)?)))
                    .collect::<ComposeResult<Map<String, Value>>>()?,
            ),
            other => other.clone(),
        })
    }

    fn render(&self, text: &str, refs: &References) -> ComposeResult<String> {
        let mut rendered = String::with_capacity(text.len());
        let mut last = 0;
        for captures in self.pattern.captures_iter(text) {
            let Some(whole) = captures.get(0) else { continue };
            rendered.push_str(&text[last..whole.start()]);
            rendered.push_str(&refs.output(&captures[1], &captures[2])?);
            last = whole.end();
        }
        rendered.push_str(&text[last..]);
        Ok(rendered)
    }
}
