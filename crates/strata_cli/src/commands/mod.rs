//! CLI command definitions.
//!
//! Each subcommand maps to one use of the composer: synthesizing a document,
//! validating templates, or listing resource types.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::info;

use strata_compose::{Composer, Composition, TemplateFile};
use strata_resources::PricingCatalog;

pub mod resources;
pub mod synth;
pub mod validate;

/// Strata - schema-validated Terraform JSON synthesis
#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about = "Strata - schema-validated Terraform JSON synthesis")]
#[command(long_about = r#"
Strata validates infrastructure templates against typed resource schemas and
synthesizes Terraform JSON for AWS, Cloudflare and Hetzner Cloud.

COMMANDS:
  synth      → Compose a template and write Terraform JSON
  validate   → Check templates and show references and computed properties
  resources  → List the supported resource types

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Template error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose a template into a Terraform JSON document
    Synth(synth::SynthArgs),

    /// Validate one template or every template under a directory
    Validate(validate::ValidateArgs),

    /// List supported resource types
    Resources(resources::ResourcesArgs),
}

/// Bad command-line input that clap cannot detect on its own.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Composer over the standard registry, with an optional pricing overlay.
pub(crate) fn composer(pricing: Option<&Path>) -> Result<Composer> {
    let composer = Composer::standard().context("Failed to build the resource registry")?;
    match pricing {
        Some(path) => {
            info!("Using pricing overrides from {:?}", path);
            let catalog = PricingCatalog::from_file(path)
                .with_context(|| format!("Failed to load pricing catalog {}", path.display()))?;
            Ok(composer.with_pricing(catalog))
        }
        None => Ok(composer),
    }
}

/// Load and compose one template file.
pub(crate) fn compose_file(composer: &Composer, path: &Path) -> Result<Composition> {
    let template = TemplateFile::load(path)
        .and_then(TemplateFile::into_template)
        .with_context(|| format!("Failed to load template {}", path.display()))?;
    let composition = composer
        .compose(&template)
        .with_context(|| format!("Failed to compose template {}", path.display()))?;
    Ok(composition)
}
