//! Price tables used by cost-estimating computed properties.
//!
//! The builtin figures are illustrative list prices, not authoritative.
//! Deployments that care about accuracy load their own table with
//! [`PricingCatalog::from_file`], which overlays the builtin one.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};

/// Hourly and monthly prices keyed by SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingCatalog {
    pub hours_per_month: f64,
    /// EC2 on-demand USD per hour by instance type.
    pub aws_instance_hourly: BTreeMap<String, f64>,
    /// Load balancer USD per hour by `load_balancer_type`.
    pub aws_load_balancer_hourly: BTreeMap<String, f64>,
    /// Fraction saved by spot capacity relative to on-demand.
    pub aws_spot_discount: f64,
    /// EBS USD per GB-month.
    pub aws_ebs_gb_month: f64,
    /// Cloudflare zone plan USD per month.
    pub cloudflare_zone_monthly: BTreeMap<String, f64>,
    /// Hetzner Cloud server EUR per month by server type.
    pub hcloud_server_monthly: BTreeMap<String, f64>,
    /// Backup surcharge as a fraction of the server price.
    pub hcloud_backup_ratio: f64,
}

/// Partial price table read from a file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingOverrides {
    pub hours_per_month: Option<f64>,
    pub aws_instance_hourly: BTreeMap<String, f64>,
    pub aws_load_balancer_hourly: BTreeMap<String, f64>,
    pub aws_spot_discount: Option<f64>,
    pub aws_ebs_gb_month: Option<f64>,
    pub cloudflare_zone_monthly: BTreeMap<String, f64>,
    pub hcloud_server_monthly: BTreeMap<String, f64>,
    pub hcloud_backup_ratio: Option<f64>,
}

fn table(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl Default for PricingCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PricingCatalog {
    pub fn builtin() -> Self {
        Self {
            hours_per_month: 730.0,
            aws_instance_hourly: table(&[
                ("t3.nano", 0.0052),
                ("t3.micro", 0.0104),
                ("t3.small", 0.0208),
                ("t3.medium", 0.0416),
                ("t3.large", 0.0832),
                ("t3.xlarge", 0.1664),
                ("t4g.small", 0.0168),
                ("t4g.medium", 0.0336),
                ("m5.large", 0.096),
                ("m5.xlarge", 0.192),
                ("m6i.large", 0.096),
                ("m6i.xlarge", 0.192),
                ("c5.large", 0.085),
                ("c5.xlarge", 0.17),
                ("r5.large", 0.126),
                ("g4dn.xlarge", 0.526),
            ]),
            aws_load_balancer_hourly: table(&[
                ("application", 0.0225),
                ("network", 0.0225),
                ("gateway", 0.0125),
            ]),
            aws_spot_discount: 0.7,
            aws_ebs_gb_month: 0.08,
            cloudflare_zone_monthly: table(&[
                ("free", 0.0),
                ("pro", 25.0),
                ("business", 250.0),
                ("enterprise", 5000.0),
            ]),
            hcloud_server_monthly: table(&[
                ("cx22", 3.79),
                ("cx32", 6.80),
                ("cx42", 16.40),
                ("cx52", 32.40),
                ("cpx11", 4.35),
                ("cpx21", 7.55),
                ("cpx31", 13.60),
                ("cpx41", 25.20),
                ("cax11", 3.79),
                ("cax21", 6.49),
                ("ccx13", 12.49),
                ("ccx23", 24.49),
            ]),
            hcloud_backup_ratio: 0.2,
        }
    }

    /// Builtin table with `overrides` applied on top.
    pub fn with_overrides(mut self, overrides: PricingOverrides) -> Self {
        if let Some(hours) = overrides.hours_per_month {
            self.hours_per_month = hours;
        }
        if let Some(discount) = overrides.aws_spot_discount {
            self.aws_spot_discount = discount;
        }
        if let Some(ebs) = overrides.aws_ebs_gb_month {
            self.aws_ebs_gb_month = ebs;
        }
        if let Some(ratio) = overrides.hcloud_backup_ratio {
            self.hcloud_backup_ratio = ratio;
        }
        self.aws_instance_hourly.extend(overrides.aws_instance_hourly);
        self.aws_load_balancer_hourly.extend(overrides.aws_load_balancer_hourly);
        self.cloudflare_zone_monthly.extend(overrides.cloudflare_zone_monthly);
        self.hcloud_server_monthly.extend(overrides.hcloud_server_monthly);
        self
    }

    /// Load overrides from YAML, TOML or JSON (by extension) over the builtin table.
    pub fn from_file(path: &Path) -> ResourceResult<Self> {
        let content = fs::read_to_string(path)?;
        let invalid = |message: String| ResourceError::Pricing {
            path: path.to_path_buf(),
            message,
        };

        let overrides: PricingOverrides = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        };

        debug!("Loaded pricing overrides from {:?}", path);
        Ok(Self::builtin().with_overrides(overrides))
    }

    pub fn instance_hourly(&self, instance_type: &str) -> f64 {
        self.aws_instance_hourly.get(instance_type).copied().unwrap_or(0.0)
    }

    /// Monthly on-demand cost of an EC2 instance type, 0 when unknown.
    pub fn instance_monthly(&self, instance_type: &str) -> f64 {
        round_cents(self.instance_hourly(instance_type) * self.hours_per_month)
    }

    pub fn load_balancer_monthly(&self, kind: &str) -> f64 {
        let hourly = self.aws_load_balancer_hourly.get(kind).copied().unwrap_or(0.0);
        round_cents(hourly * self.hours_per_month)
    }

    pub fn ebs_monthly(&self, size_gb: f64) -> f64 {
        round_cents(size_gb * self.aws_ebs_gb_month)
    }

    pub fn cloudflare_plan_monthly(&self, plan: &str) -> f64 {
        self.cloudflare_zone_monthly.get(plan).copied().unwrap_or(0.0)
    }

    pub fn hcloud_server_monthly(&self, server_type: &str) -> f64 {
        self.hcloud_server_monthly.get(server_type).copied().unwrap_or(0.0)
    }
}

/// Round a currency amount to two decimals.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
