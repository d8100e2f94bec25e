//! Hetzner Cloud resource types.

use serde_json::{json, Map, Value};

use strata_schema::formats::{self, any_cidr, ip_address, ipv4_cidr, non_empty};
use strata_schema::{is_interpolation, Attributes, Constraint, FieldType, Schema, SchemaResult, ValidatedConfig};
use strata_synth::{Computed, EmissionPlan};

use crate::common::{address_count, any_open_cidr, security_level};
use crate::pricing::{round_cents, PricingCatalog};
use crate::provider::Provider;
use crate::resource::Resource;

fn labels() -> FieldType {
    FieldType::map_of(FieldType::String)
}

/// `hcloud_network`
pub struct Network {
    schema: Schema,
    plan: EmissionPlan,
}

impl Network {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("hcloud_network")
            .required("name", non_empty())
            .required("ip_range", ipv4_cidr())
            .with_default("delete_protection", FieldType::Boolean, json!(false))
            .with_default("expose_routes_to_vswitch", FieldType::Boolean, json!(false))
            .optional("labels", labels())
            .rule("private_range", &["ip_range"], |c| match c.get_str("ip_range") {
                Some(range)
                    if !is_interpolation(range) && !formats::is_private_ipv4_cidr(range) =>
                {
                    Err(format!("ip_range {} must be a private (RFC 1918) network", range))
                }
                _ => Ok(()),
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Network {
    fn resource_type(&self) -> &'static str {
        "hcloud_network"
    }

    fn provider(&self) -> Provider {
        Provider::Hetzner
    }

    fn description(&self) -> &'static str {
        "Private network"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "name", "ip_range"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        Computed::from([(
            "address_count".to_string(),
            json!(address_count(config.attr("ip_range"))),
        )])
    }
}

/// `hcloud_firewall`
pub struct Firewall {
    schema: Schema,
    plan: EmissionPlan,
}

const PORTED_PROTOCOLS: [&str; 2] = ["tcp", "udp"];

fn has_items(c: &Map<String, Value>, key: &str) -> bool {
    c.get_array(key).is_some_and(|items| !items.is_empty())
}

fn check_firewall_rule(c: &Map<String, Value>) -> Result<(), String> {
    match c.get_str("direction") {
        Some("in") if !has_items(c, "source_ips") => {
            return Err("source_ips is required for inbound rules".to_string());
        }
        Some("out") if !has_items(c, "destination_ips") => {
            return Err("destination_ips is required for outbound rules".to_string());
        }
        _ => {}
    }

    let protocol = c.get_str("protocol").unwrap_or_default();
    let ported = PORTED_PROTOCOLS.contains(&protocol);
    if ported && !c.has("port") {
        return Err(format!("port is required for {} rules", protocol));
    }
    if !ported && c.has("port") {
        return Err(format!("port is not allowed for {} rules", protocol));
    }
    Ok(())
}

/// Parse a firewall port spec (`22`, `8000-8100`, `any`) into a range.
fn port_range(spec: &str) -> Option<(i64, i64)> {
    if spec == "any" {
        return Some((1, 65535));
    }
    match spec.split_once('-') {
        Some((from, to)) => Some((from.parse().ok()?, to.parse().ok()?)),
        None => spec.parse().ok().map(|p| (p, p)),
    }
}

impl Firewall {
    pub fn new() -> SchemaResult<Self> {
        let rule = Schema::builder("rule")
            .required("direction", FieldType::enumeration(&["in", "out"]))
            .required("protocol", FieldType::enumeration(&["tcp", "udp", "icmp", "esp", "gre"]))
            .optional(
                "port",
                FieldType::String.with(Constraint::pattern(
                    "port or port range",
                    r"^(any|[0-9]{1,5}(-[0-9]{1,5})?)$",
                )?),
            )
            .optional("source_ips", FieldType::array_of(any_cidr()))
            .optional("destination_ips", FieldType::array_of(any_cidr()))
            .optional("description", FieldType::String)
            .rule(
                "direction_and_port",
                &["direction", "protocol", "port", "source_ips", "destination_ips"],
                check_firewall_rule,
            )
            .build()?;

        let apply_to = Schema::builder("apply_to")
            .optional("server", FieldType::Integer)
            .optional("label_selector", FieldType::String)
            .exactly_one_of(&["server", "label_selector"])
            .build()?;

        let schema = Schema::builder("hcloud_firewall")
            .required("name", non_empty())
            .optional("labels", labels())
            .optional("rules", FieldType::array_bounded(FieldType::object(rule), None, Some(50)))
            .optional("apply_to", FieldType::array_of(FieldType::object(apply_to)))
            .build()?;
        let plan = EmissionPlan::from_schema(&schema).rename("rules", "rule");
        Ok(Self { schema, plan })
    }
}

impl Resource for Firewall {
    fn resource_type(&self) -> &'static str {
        "hcloud_firewall"
    }

    fn provider(&self) -> Provider {
        Provider::Hetzner
    }

    fn description(&self) -> &'static str {
        "Stateful firewall applied to servers"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "name"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let rules: Vec<&Map<String, Value>> = config
            .get_array("rules")
            .map(|r| r.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        let public_ports: Vec<(i64, i64)> = rules
            .iter()
            .filter(|r| r.get_str("direction") == Some("in"))
            .filter(|r| any_open_cidr(r.get_strings("source_ips")))
            // Portless protocols (icmp, esp, gre) do not expose services.
            .filter_map(|r| r.get_str("port"))
            .map(|spec| port_range(spec).unwrap_or((1, 65535)))
            .collect();
        let allows_public_ssh = public_ports.iter().any(|&(from, to)| from <= 22 && 22 <= to);

        Computed::from([
            (
                "inbound_rule_count".to_string(),
                json!(rules.iter().filter(|r| r.get_str("direction") == Some("in")).count()),
            ),
            ("allows_public_ssh".to_string(), json!(allows_public_ssh)),
            (
                "security_level".to_string(),
                json!(security_level(&public_ports)),
            ),
        ])
    }
}

/// `hcloud_server`
pub struct Server {
    schema: Schema,
    plan: EmissionPlan,
}

impl Server {
    pub fn new() -> SchemaResult<Self> {
        let network = Schema::builder("network")
            .required("network_id", FieldType::Integer)
            .optional("ip", ip_address())
            .optional("alias_ips", FieldType::array_of(ip_address()))
            .build()?;

        let public_net = Schema::builder("public_net")
            .with_default("ipv4_enabled", FieldType::Boolean, json!(true))
            .with_default("ipv6_enabled", FieldType::Boolean, json!(true))
            .optional("ipv4", FieldType::Integer)
            .optional("ipv6", FieldType::Integer)
            .build()?;

        let schema = Schema::builder("hcloud_server")
            .required(
                "name",
                FieldType::String.with(Constraint::pattern(
                    "server hostname",
                    r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$",
                )?),
            )
            .required("server_type", non_empty())
            .required("image", non_empty())
            .optional(
                "location",
                FieldType::enumeration(&["fsn1", "nbg1", "hel1", "ash", "hil", "sin"]),
            )
            .optional("datacenter", FieldType::String)
            .optional("ssh_keys", FieldType::array_of(FieldType::String))
            .optional("user_data", FieldType::String)
            .with_default("backups", FieldType::Boolean, json!(false))
            .optional("firewall_ids", FieldType::array_of(FieldType::Integer))
            .optional("placement_group_id", FieldType::Integer)
            .optional("network", FieldType::array_of(FieldType::object(network)))
            .optional("public_net", FieldType::object(public_net))
            .optional("labels", labels())
            .with_default("delete_protection", FieldType::Boolean, json!(false))
            .with_default("rebuild_protection", FieldType::Boolean, json!(false))
            .at_most_one_of(&["location", "datacenter"])
            .rule("protection_pair", &["delete_protection", "rebuild_protection"], |c| {
                if c.get_bool("delete_protection") != c.get_bool("rebuild_protection") {
                    return Err("delete_protection and rebuild_protection must be set together".to_string());
                }
                Ok(())
            })
            .rule("reachable", &["public_net", "network"], |c| {
                let public = match c.get_object("public_net") {
                    Some(p) => {
                        p.get_bool("ipv4_enabled").unwrap_or(true) || p.get_bool("ipv6_enabled").unwrap_or(true)
                    }
                    None => true,
                };
                let attached = has_items(c, "network");
                if !public && !attached {
                    return Err("a server without public IPv4 or IPv6 must be attached to a network".to_string());
                }
                Ok(())
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Server {
    fn resource_type(&self) -> &'static str {
        "hcloud_server"
    }

    fn provider(&self) -> Provider {
        Provider::Hetzner
    }

    fn description(&self) -> &'static str {
        "Cloud server"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "ipv4_address", "ipv6_address", "ipv6_network", "status", "backup_window"]
    }

    fn computed(&self, config: &ValidatedConfig, pricing: &PricingCatalog) -> Computed {
        let server_type = config.get_str("server_type").unwrap_or_default();
        let mut cost = pricing.hcloud_server_monthly(server_type);
        if config.get_bool("backups").unwrap_or(false) {
            cost *= 1.0 + pricing.hcloud_backup_ratio;
        }
        let architecture = if server_type.starts_with("cax") { "arm" } else { "x86" };
        let private_only = config.get_object("public_net").is_some_and(|p| {
            p.get_bool("ipv4_enabled") == Some(false) && p.get_bool("ipv6_enabled") == Some(false)
        });

        Computed::from([
            ("estimated_monthly_cost".to_string(), json!(round_cents(cost))),
            ("architecture".to_string(), json!(architecture)),
            ("is_private_only".to_string(), json!(private_only)),
        ])
    }
}
