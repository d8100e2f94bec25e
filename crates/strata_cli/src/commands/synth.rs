//! Synth command - Compose a template into Terraform JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct SynthArgs {
    /// Template file (YAML or JSON)
    template: PathBuf,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Pricing overrides (YAML, TOML or JSON)
    #[arg(long, env = "STRATA_PRICING")]
    pricing: Option<PathBuf>,
}

pub fn execute(args: SynthArgs) -> Result<()> {
    info!("Synthesizing template: {:?}", args.template);

    let composer = super::composer(args.pricing.as_deref())?;
    let composition = super::compose_file(&composer, &args.template)?;
    let json = composition.to_json_pretty()?;

    match args.out {
        Some(path) => {
            fs::write(&path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let document = composition.document();
            println!(
                "✅ Wrote {} resources and {} outputs to {}",
                document.resource_count(),
                document.output_count(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_synth_writes_document() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("bucket.yaml");
        fs::write(
            &template,
            "name: bucket\nresources:\n  - type: aws_s3_bucket\n    name: logs\n    config:\n      bucket: app-logs\n",
        )
        .unwrap();
        let out = dir.path().join("main.tf.json");

        execute(SynthArgs {
            template,
            out: Some(out.clone()),
            pricing: None,
        })
        .unwrap();

        let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(document["resource"]["aws_s3_bucket"]["logs"]["bucket"], "app-logs");
    }

    #[test]
    fn test_synth_missing_template() {
        let dir = tempdir().unwrap();
        let err = execute(SynthArgs {
            template: dir.path().join("missing.yaml"),
            out: None,
            pricing: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to load template"));
    }
}
