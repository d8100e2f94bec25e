//! Resources command - List supported resource types.

use anyhow::Result;
use clap::Args;

use strata_compose::architectures;
use strata_resources::{Provider, ResourceRegistry};

use super::UsageError;

#[derive(Args)]
pub struct ResourcesArgs {
    /// Only list one provider (aws, cloudflare, hetzner)
    #[arg(short, long)]
    provider: Option<String>,

    /// Print the listing as JSON
    #[arg(long)]
    json: bool,
}

pub fn execute(args: ResourcesArgs) -> Result<()> {
    let providers = match args.provider.as_deref() {
        Some(name) => vec![Provider::parse(name).ok_or_else(|| {
            UsageError(format!(
                "Unknown provider: {} (expected one of: {})",
                name,
                Provider::all().iter().map(Provider::as_str).collect::<Vec<_>>().join(", ")
            ))
        })?],
        None => Provider::all(),
    };

    let registry = ResourceRegistry::standard()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing(&registry, &providers))?);
        return Ok(());
    }

    for provider in providers {
        println!("📦 {} ({})", provider, provider.source());
        for resource in registry.by_provider(provider) {
            println!("   {:<32} {}", resource.resource_type(), resource.description());
            println!("   {:<32} outputs: {}", "", resource.outputs().join(", "));
        }
        println!();
    }

    println!("🏗️  Architectures: {}", architectures::NAMES.join(", "));
    Ok(())
}

fn listing(registry: &ResourceRegistry, providers: &[Provider]) -> serde_json::Value {
    let resources: Vec<_> = providers
        .iter()
        .flat_map(|p| registry.by_provider(*p))
        .map(|r| {
            serde_json::json!({
                "type": r.resource_type(),
                "provider": r.provider().as_str(),
                "description": r.description(),
                "outputs": r.outputs(),
            })
        })
        .collect();
    serde_json::json!({
        "resources": resources,
        "architectures": architectures::NAMES,
    })
}
