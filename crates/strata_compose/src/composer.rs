//! The template composer.

use serde_json::Value;
use tracing::{debug, info};

use strata_resources::{BuiltResource, PricingCatalog, ResourceRegistry};
use strata_synth::{Document, ResourceReference};

use crate::error::{ComposeError, ComposeResult};
use crate::template::{References, Step, Template};

/// Runs templates against a resource registry.
#[derive(Debug)]
pub struct Composer {
    registry: ResourceRegistry,
    pricing: PricingCatalog,
}

impl Composer {
    pub fn new(registry: ResourceRegistry, pricing: PricingCatalog) -> Self {
        Self { registry, pricing }
    }

    /// Composer over every shipped resource type and the builtin price table.
    pub fn standard() -> ComposeResult<Self> {
        Ok(Self::new(ResourceRegistry::standard()?, PricingCatalog::builtin()))
    }

    pub fn with_pricing(mut self, pricing: PricingCatalog) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn pricing(&self) -> &PricingCatalog {
        &self.pricing
    }

    /// Build a single resource outside of any template.
    pub fn resource(&self, resource_type: &str, name: &str, raw: &Value) -> ComposeResult<BuiltResource> {
        Ok(self.registry.build(resource_type, name, raw, &self.pricing)?)
    }

    /// Run every step of `template` in order, then evaluate its outputs.
    ///
    /// The first failing step aborts the composition and nothing built so
    /// far is returned.
    pub fn compose(&self, template: &Template) -> ComposeResult<Composition> {
        info!(
            "Composing template {} ({} steps)",
            template.name(),
            template.steps().len()
        );

        let mut document = Document::new();
        let mut references = References::new();

        for step in template.steps() {
            self.run_step(step, &mut document, &mut references)
                .map_err(|e| e.in_step(step.name(), step.resource_type()))?;
        }

        for (name, output) in template.outputs() {
            let wrap = |e: ComposeError| ComposeError::Output {
                output: name.clone(),
                source: Box::new(e),
            };
            let value = output(&references).map_err(wrap)?;
            document
                .add_output(name.as_str(), value)
                .map_err(|e| wrap(e.into()))?;
        }

        info!(
            "Composed {}: {} resources, {} outputs",
            template.name(),
            document.resource_count(),
            document.output_count()
        );

        Ok(Composition { document, references })
    }

    fn run_step(&self, step: &Step, document: &mut Document, references: &mut References) -> ComposeResult<()> {
        if references.contains(step.name()) {
            return Err(ComposeError::DuplicateInstance(step.name().to_string()));
        }

        let raw = step.config(references)?;
        let built = self.resource(step.resource_type(), step.name(), &raw)?;
        debug!("Step {} built {}", step.name(), built.reference.address());

        document.insert(built.block)?;
        references.insert(built.reference)
    }
}

/// The result of a successful composition.
#[derive(Debug, Clone)]
pub struct Composition {
    document: Document,
    references: References,
}

impl Composition {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn references(&self) -> &References {
        &self.references
    }

    pub fn reference(&self, name: &str) -> Option<&ResourceReference> {
        self.references.get(name)
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Terraform JSON for the whole document.
    pub fn to_json_pretty(&self) -> ComposeResult<String> {
        Ok(self.document.to_json_pretty()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_synth::Output;

    fn composer() -> Composer {
        Composer::standard().unwrap()
    }

    #[test]
    fn test_compose_threads_references() {
        let template = Template::new("net")
            .step("aws_vpc", "main", |_| Ok(json!({"cidr_block": "10.0.0.0/16"})))
            .step("aws_security_group", "web", |refs| {
                Ok(json!({"name": "web", "vpc_id": refs.output("main", "id")?}))
            });

        let composition = composer().compose(&template).unwrap();

        assert_eq!(composition.references().len(), 2);
        let group = composition.document().resource("aws_security_group", "web").unwrap();
        assert_eq!(group["vpc_id"], "${aws_vpc.main.id}");
        assert_eq!(
            composition.reference("main").and_then(|r| r.computed_bool("is_private")),
            Some(true)
        );
    }

    #[test]
    fn test_duplicate_instance_name() {
        let template = Template::new("dup")
            .step("aws_vpc", "main", |_| Ok(json!({"cidr_block": "10.0.0.0/16"})))
            .step("aws_s3_bucket", "main", |_| Ok(json!({"bucket": "assets"})));

        let err = composer().compose(&template).unwrap_err();
        assert!(matches!(err.root(), ComposeError::DuplicateInstance(name) if name == "main"));
    }

    #[test]
    fn test_unknown_type_names_step() {
        let template = Template::new("bad").step("aws_nothing", "x", |_| Ok(json!({})));

        let err = composer().compose(&template).unwrap_err();
        assert_eq!(err.to_string(), "Step x (aws_nothing) failed");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_outputs_written_to_document() {
        let template = Template::new("out")
            .step("aws_vpc", "main", |_| Ok(json!({"cidr_block": "10.0.0.0/16"})))
            .output("vpc_id", |refs| {
                Ok(Output::new(refs.output("main", "id")?).with_description("VPC identifier"))
            });

        let composition = composer().compose(&template).unwrap();
        let output = composition.document().output("vpc_id").unwrap();
        assert_eq!(output.value, json!("${aws_vpc.main.id}"));
    }

    #[test]
    fn test_output_error_is_wrapped() {
        let template = Template::new("out")
            .step("aws_vpc", "main", |_| Ok(json!({"cidr_block": "10.0.0.0/16"})))
            .output("broken", |refs| Ok(Output::new(refs.output("main", "dns_name")?)));

        let err = composer().compose(&template).unwrap_err();
        assert!(matches!(err, ComposeError::Output { ref output, .. } if output == "broken"));
        assert!(matches!(err.root(), ComposeError::UnknownReference { .. }));
    }
}
