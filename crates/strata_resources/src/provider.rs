//! Cloud provider definitions.

use serde::{Deserialize, Serialize};

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Cloudflare,
    Hetzner,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Cloudflare => "cloudflare",
            Provider::Hetzner => "hetzner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aws" => Some(Provider::Aws),
            "cloudflare" => Some(Provider::Cloudflare),
            "hetzner" | "hcloud" => Some(Provider::Hetzner),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Provider::Aws, Provider::Cloudflare, Provider::Hetzner]
    }

    /// Prefix shared by the provider's Terraform resource types.
    pub fn resource_prefix(&self) -> &'static str {
        match self {
            Provider::Aws => "aws_",
            Provider::Cloudflare => "cloudflare_",
            Provider::Hetzner => "hcloud_",
        }
    }

    /// Terraform registry source address.
    pub fn source(&self) -> &'static str {
        match self {
            Provider::Aws => "hashicorp/aws",
            Provider::Cloudflare => "cloudflare/cloudflare",
            Provider::Hetzner => "hetznercloud/hcloud",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
