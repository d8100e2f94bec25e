//! Validate command - Check templates without writing a document.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::{debug, info};
use walkdir::WalkDir;

use strata_compose::Composition;

use super::UsageError;

const TEMPLATE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Args)]
pub struct ValidateArgs {
    /// Template file, or a directory searched recursively for templates
    path: PathBuf,

    /// Pricing overrides (YAML, TOML or JSON)
    #[arg(long, env = "STRATA_PRICING")]
    pricing: Option<PathBuf>,

    /// Only report pass or fail per template
    #[arg(long)]
    summary: bool,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating templates under {:?}", args.path);

    let templates = collect_templates(&args.path)?;
    let composer = super::composer(args.pricing.as_deref())?;

    let total = templates.len();
    let mut failures = Vec::new();

    for path in &templates {
        println!("📋 {}", path.display());
        match super::compose_file(&composer, path) {
            Ok(composition) => {
                println!("   ✅ {} resources", composition.document().resource_count());
                if !args.summary {
                    print_references(&composition);
                }
            }
            Err(e) => {
                println!("   ❌ {:#}", e);
                failures.push(e);
            }
        }
    }

    println!();
    let failed = failures.len();
    match failures.into_iter().next() {
        None => {
            println!("✅ All {} templates are valid!", total);
            Ok(())
        }
        Some(first) if total == 1 => Err(first),
        Some(first) => Err(first.context(format!("{} of {} templates failed validation", failed, total))),
    }
}

/// Template files at `path`, sorted.
fn collect_templates(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(UsageError(format!("Path not found: {}", path.display())).into());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut templates: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| TEMPLATE_EXTENSIONS.contains(&e))
        })
        .collect();
    templates.sort();

    debug!("Found {} templates under {:?}", templates.len(), path);
    if templates.is_empty() {
        return Err(UsageError(format!("No templates found under {}", path.display())).into());
    }
    Ok(templates)
}

fn print_references(composition: &Composition) {
    for (_, reference) in composition.references().iter() {
        println!("   • {}", reference.address());
        for (field, placeholder) in reference.outputs() {
            println!("       {} = {}", field, placeholder);
        }
        for (name, value) in reference.computed_properties() {
            println!("       {}: {}", name, value);
        }
    }
}
