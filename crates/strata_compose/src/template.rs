//! Templates: ordered resource steps and the references they produce.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use strata_synth::{Output, ResourceReference};

use crate::error::{ComposeError, ComposeResult};

/// Builds a step's raw configuration from the references of earlier steps.
pub type ConfigFn = Box<dyn Fn(&References) -> ComposeResult<Value> + Send + Sync>;

/// Builds a template output from the references of every step.
pub type OutputFn = Box<dyn Fn(&References) -> ComposeResult<Output> + Send + Sync>;

/// References produced so far, keyed by instance name.
#[derive(Debug, Clone, Default)]
pub struct References {
    references: BTreeMap<String, ResourceReference>,
}

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reference under its instance name.
    pub(crate) fn insert(&mut self, reference: ResourceReference) -> ComposeResult<()> {
        let name = reference.name().to_string();
        if self.references.contains_key(&name) {
            return Err(ComposeError::DuplicateInstance(name));
        }
        self.references.insert(name, reference);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceReference> {
        self.references.get(name)
    }

    /// Get a reference by instance name, returning an error if no step produced it.
    pub fn get_required(&self, name: &str) -> ComposeResult<&ResourceReference> {
        self.get(name).ok_or_else(|| ComposeError::UnknownReference {
            reference: name.to_string(),
            reason: "no earlier step has this name".to_string(),
        })
    }

    /// Placeholder for a documented output of an earlier step.
    ///
    /// ```rust
    /// # use strata_compose::{Composer, Template};
    /// # use serde_json::json;
    /// let template = Template::new("net")
    ///     .step("aws_vpc", "main", |_| Ok(json!({"cidr_block": "10.0.0.0/16"})))
    ///     .step("aws_subnet", "public", |refs| {
    ///         Ok(json!({"vpc_id": refs.output("main", "id")?, "cidr_block": "10.0.1.0/24"}))
    ///     });
    /// let composition = Composer::standard().unwrap().compose(&template).unwrap();
    /// let subnet = composition.document().resource("aws_subnet", "public").unwrap();
    /// assert_eq!(subnet["vpc_id"], "${aws_vpc.main.id}");
    /// ```
    pub fn output(&self, name: &str, field: &str) -> ComposeResult<String> {
        let reference = self.get_required(name)?;
        reference
            .output(field)
            .map(str::to_string)
            .ok_or_else(|| ComposeError::UnknownReference {
                reference: format!("{}.{}", name, field),
                reason: format!(
                    "{} documents only: {}",
                    reference.resource_type(),
                    reference.outputs().keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.references.contains_key(name)
    }

    /// Instance names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.references.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceReference)> {
        self.references.iter().map(|(name, r)| (name.as_str(), r))
    }
}

/// One resource construction within a template.
pub struct Step {
    resource_type: String,
    name: String,
    config: ConfigFn,
}

impl Step {
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the step's configuration against earlier references.
    pub fn config(&self, references: &References) -> ComposeResult<Value> {
        (self.config)(references)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("resource_type", &self.resource_type)
            .field("name", &self.name)
            .finish()
    }
}

/// An ordered list of steps plus the outputs derived from them.
///
/// Steps run in the order they were added. Nothing is reordered and no
/// dependencies are inferred.
pub struct Template {
    name: String,
    steps: Vec<Step>,
    outputs: Vec<(String, OutputFn)>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Append a step.
    pub fn step<F>(mut self, resource_type: impl Into<String>, name: impl Into<String>, config: F) -> Self
    where
        F: Fn(&References) -> ComposeResult<Value> + Send + Sync + 'static,
    {
        self.steps.push(Step {
            resource_type: resource_type.into(),
            name: name.into(),
            config: Box::new(config),
        });
        self
    }

    /// Append a Terraform output, evaluated after every step has run.
    pub fn output<F>(mut self, name: impl Into<String>, output: F) -> Self
    where
        F: Fn(&References) -> ComposeResult<Output> + Send + Sync + 'static,
    {
        self.outputs.push((name.into(), Box::new(output)));
        self
    }

    /// Append the steps and outputs of another template after this one's.
    pub fn extend(&mut self, other: Template) {
        self.steps.extend(other.steps);
        self.outputs.extend(other.outputs);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn outputs(&self) -> &[(String, OutputFn)] {
        &self.outputs
    }

    /// Names of the template outputs, in declaration order.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("outputs", &self.output_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_steps_keep_declaration_order() {
        let template = Template::new("t")
            .step("aws_subnet", "b", |_| Ok(json!({})))
            .step("aws_vpc", "a", |_| Ok(json!({})));

        let names: Vec<_> = template.steps().iter().map(Step::name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(template.len(), 2);
    }

    #[test]
    fn test_extend_appends() {
        let mut first = Template::new("first")
            .step("aws_vpc", "a", |_| Ok(json!({})))
            .output("x", |_| Ok(Output::new("x")));
        let second = Template::new("second")
            .step("aws_vpc", "b", |_| Ok(json!({})))
            .output("y", |_| Ok(Output::new("y")));

        first.extend(second);

        assert_eq!(first.name(), "first");
        assert_eq!(first.len(), 2);
        assert_eq!(first.output_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_missing_reference() {
        let references = References::new();
        let err = references.output("vpc", "id").unwrap_err();
        assert!(matches!(err, ComposeError::UnknownReference { ref reference, .. } if reference == "vpc"));
    }

    #[test]
    fn test_step_debug_omits_closure() {
        let template = Template::new("t").step("aws_vpc", "main", |_| Ok(json!({})));
        let debug = format!("{:?}", template);
        assert!(debug.contains("aws_vpc"));
        assert!(debug.contains("main"));
    }
}
