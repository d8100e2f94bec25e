//! Cloudflare resource types.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde_json::{json, Map, Value};

use strata_schema::formats::{dns_name, non_empty};
use strata_schema::{
    formats, is_interpolation, Attributes, Constraint, FieldType, Schema, SchemaResult, ValidatedConfig,
};
use strata_synth::{Computed, EmissionPlan};

use crate::pricing::PricingCatalog;
use crate::provider::Provider;
use crate::resource::Resource;

/// `cloudflare_zone`
pub struct Zone {
    schema: Schema,
    plan: EmissionPlan,
}

impl Zone {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("cloudflare_zone")
            .required("zone", dns_name()?)
            .required("account_id", non_empty())
            .with_default(
                "plan",
                FieldType::enumeration(&["free", "pro", "business", "enterprise"]),
                json!("free"),
            )
            .with_default("type", FieldType::enumeration(&["full", "partial"]), json!("full"))
            .with_default("paused", FieldType::Boolean, json!(false))
            .with_default("jump_start", FieldType::Boolean, json!(false))
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Zone {
    fn resource_type(&self) -> &'static str {
        "cloudflare_zone"
    }

    fn provider(&self) -> Provider {
        Provider::Cloudflare
    }

    fn description(&self) -> &'static str {
        "DNS zone managed by Cloudflare"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "name_servers", "status", "verification_key", "vanity_name_servers"]
    }

    fn computed(&self, config: &ValidatedConfig, pricing: &PricingCatalog) -> Computed {
        let plan = config.get_str("plan").unwrap_or("free");
        Computed::from([
            ("estimated_monthly_cost".to_string(), json!(pricing.cloudflare_plan_monthly(plan))),
            ("is_paid_plan".to_string(), json!(plan != "free")),
            ("is_partial_setup".to_string(), json!(config.get_str("type") == Some("partial"))),
        ])
    }
}

/// `cloudflare_record`
pub struct Record {
    schema: Schema,
    plan: EmissionPlan,
}

const PROXIABLE_TYPES: [&str; 3] = ["A", "AAAA", "CNAME"];

fn check_proxied(c: &Map<String, Value>) -> Result<(), String> {
    if !c.get_bool("proxied").unwrap_or(false) {
        return Ok(());
    }
    let record_type = c.get_str("type").unwrap_or_default();
    if !PROXIABLE_TYPES.contains(&record_type) {
        return Err(format!("{} records cannot be proxied", record_type));
    }
    match c.get_i64("ttl") {
        Some(ttl) if ttl != 1 => Err(format!("proxied records must use ttl 1 (automatic), got {}", ttl)),
        _ => Ok(()),
    }
}

fn check_content(c: &Map<String, Value>) -> Result<(), String> {
    let Some(content) = c.get_str("content") else {
        return Ok(());
    };
    if is_interpolation(content) {
        return Ok(());
    }
    let valid = match c.get_str("type") {
        Some("A") => content.parse::<Ipv4Addr>().is_ok(),
        Some("AAAA") => content.parse::<Ipv6Addr>().is_ok(),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(format!(
            "content {:?} is not a valid address for a {} record",
            content,
            c.get_str("type").unwrap_or_default()
        ))
    }
}

impl Record {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("cloudflare_record")
            .required("zone_id", non_empty())
            .required("name", non_empty())
            .required(
                "type",
                FieldType::enumeration(&["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA", "PTR"]),
            )
            .required("content", FieldType::String)
            .with_default("ttl", FieldType::Integer, json!(1))
            .optional("priority", FieldType::Integer.with(Constraint::between(0, 65535)))
            .with_default("proxied", FieldType::Boolean, json!(false))
            .optional("comment", FieldType::String.with(Constraint::length(None, Some(100))))
            .optional("tags", FieldType::array_of(FieldType::String))
            .rule("ttl_range", &["ttl"], |c| match c.get_i64("ttl") {
                Some(ttl) if ttl != 1 && !(60..=86_400).contains(&ttl) => Err(format!(
                    "ttl must be 1 (automatic) or between 60 and 86400, got {}",
                    ttl
                )),
                _ => Ok(()),
            })
            .rule("proxied_type", &["proxied", "type", "ttl"], check_proxied)
            .rule("mx_priority", &["type", "priority"], |c| {
                if c.get_str("type") == Some("MX") && !c.has("priority") {
                    return Err("priority is required for MX records".to_string());
                }
                Ok(())
            })
            .rule("content_address", &["type", "content"], check_content)
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Record {
    fn resource_type(&self) -> &'static str {
        "cloudflare_record"
    }

    fn provider(&self) -> Provider {
        Provider::Cloudflare
    }

    fn description(&self) -> &'static str {
        "DNS record in a Cloudflare zone"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "hostname", "proxiable", "created_on", "modified_on"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let name = config.get_str("name").unwrap_or_default();
        Computed::from([
            ("is_proxied".to_string(), json!(config.get_bool("proxied").unwrap_or(false))),
            ("is_apex".to_string(), json!(name == "@")),
            ("is_wildcard".to_string(), json!(name.starts_with('*'))),
            ("automatic_ttl".to_string(), json!(config.get_i64("ttl") == Some(1))),
        ])
    }
}

/// `cloudflare_list_item`
///
/// One entry of an account-level list: an IP, an ASN, a hostname or a
/// redirect, never more than one.
pub struct ListItem {
    schema: Schema,
    plan: EmissionPlan,
}

const LIST_ITEM_KINDS: [&str; 4] = ["ip", "asn", "hostname", "redirect"];

impl ListItem {
    pub fn new() -> SchemaResult<Self> {
        let hostname = Schema::builder("hostname")
            .required("url_hostname", non_empty())
            .build()?;

        let redirect = Schema::builder("redirect")
            .required("source_url", non_empty())
            .required("target_url", non_empty())
            .with_default(
                "status_code",
                FieldType::Integer.with(Constraint::predicate("redirect status", |v| {
                    matches!(v.as_i64(), Some(301 | 302 | 307 | 308))
                })),
                json!(301),
            )
            .optional("include_subdomains", FieldType::Boolean)
            .optional("subpath_matching", FieldType::Boolean)
            .optional("preserve_query_string", FieldType::Boolean)
            .optional("preserve_path_suffix", FieldType::Boolean)
            .build()?;

        let ip = FieldType::String.with(Constraint::predicate("IP address or CIDR", |v| {
            v.as_str().is_some_and(|s| {
                formats::is_ipv4_cidr(s) || formats::is_ipv6_cidr(s) || s.parse::<std::net::IpAddr>().is_ok()
            })
        }));

        let schema = Schema::builder("cloudflare_list_item")
            .required("account_id", non_empty())
            .required("list_id", non_empty())
            .optional("comment", FieldType::String)
            .optional("ip", ip)
            .optional("asn", FieldType::Integer.with(Constraint::between(1, 4_294_967_295)))
            .optional("hostname", FieldType::object(hostname))
            .optional("redirect", FieldType::object(redirect))
            .exactly_one_of(&LIST_ITEM_KINDS)
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for ListItem {
    fn resource_type(&self) -> &'static str {
        "cloudflare_list_item"
    }

    fn provider(&self) -> Provider {
        Provider::Cloudflare
    }

    fn description(&self) -> &'static str {
        "Entry in a Cloudflare account list"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        // Validation guarantees exactly one kind; "ip" covers the unreachable fallback.
        let kind = LIST_ITEM_KINDS
            .into_iter()
            .find(|k| config.has(k))
            .unwrap_or("ip");
        Computed::from([("item_kind".to_string(), json!(kind))])
    }
}
