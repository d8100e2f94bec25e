//! The resource trait and the validate → synthesize → reference pipeline.

use serde_json::Value;
use tracing::debug;

use strata_schema::{validate, Schema, ValidatedConfig, ValidationResult};
use strata_synth::{build_reference, synthesize, Computed, EmissionPlan, ResourceReference, SynthesizedBlock};

use crate::error::{ResourceError, ResourceResult};
use crate::pricing::PricingCatalog;
use crate::provider::Provider;

/// A resource type that can be validated and synthesized.
///
/// Implementations are immutable descriptions of one Terraform resource
/// type. They are shared through the [`ResourceRegistry`](crate::ResourceRegistry).
pub trait Resource: Send + Sync {
    /// Terraform resource type, e.g. `aws_vpc`.
    fn resource_type(&self) -> &'static str;

    fn provider(&self) -> Provider;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    fn schema(&self) -> &Schema;

    /// How a validated config is written to the document.
    fn plan(&self) -> &EmissionPlan;

    /// Documented output fields, exposed as placeholders on the reference.
    fn outputs(&self) -> &'static [&'static str];

    /// Derived facts about a validated config.
    ///
    /// Must be total: every config accepted by the schema yields a value
    /// for every property this resource documents.
    fn computed(&self, _config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        Computed::new()
    }

    /// Checks against the local environment that run after validation.
    fn preflight(&self, _config: &ValidatedConfig) -> ValidationResult<()> {
        Ok(())
    }
}

/// A synthesized block together with its reference.
#[derive(Debug, Clone)]
pub struct BuiltResource {
    pub block: SynthesizedBlock,
    pub reference: ResourceReference,
}

/// Run one resource through validation, synthesis and reference building.
pub fn build(
    resource: &dyn Resource,
    name: &str,
    raw: &Value,
    pricing: &PricingCatalog,
) -> ResourceResult<BuiltResource> {
    let resource_type = resource.resource_type();
    let invalid = |error| ResourceError::Validation {
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        error,
    };

    let config = validate(resource.schema(), raw).map_err(invalid)?;
    resource.preflight(&config).map_err(invalid)?;

    let block = synthesize(resource_type, name, &config, resource.plan())?;
    let computed = resource.computed(&config, pricing);
    let reference = build_reference(resource_type, name, config, resource.outputs(), computed)?;

    debug!(
        "Built {} with {} outputs and {} computed properties",
        reference.address(),
        reference.outputs().len(),
        reference.computed_properties().len()
    );

    Ok(BuiltResource { block, reference })
}
