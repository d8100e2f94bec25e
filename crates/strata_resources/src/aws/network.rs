//! VPC, subnet and security group.

use serde_json::{json, Value};

use strata_schema::formats::{self, any_cidr, aws_id, ipv4_cidr, port, tags};
use strata_schema::{Attributes, Constraint, FieldType, Schema, SchemaResult, ValidatedConfig};
use strata_synth::{Computed, EmissionPlan};

use crate::common::{address_count, security_level};
use crate::pricing::PricingCatalog;
use crate::provider::Provider;
use crate::resource::Resource;

/// `aws_vpc`
pub struct Vpc {
    schema: Schema,
    plan: EmissionPlan,
}

impl Vpc {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("aws_vpc")
            .required("cidr_block", ipv4_cidr())
            .with_default(
                "instance_tenancy",
                FieldType::enumeration(&["default", "dedicated"]),
                json!("default"),
            )
            .with_default("enable_dns_support", FieldType::Boolean, json!(true))
            .with_default("enable_dns_hostnames", FieldType::Boolean, json!(true))
            .optional("assign_generated_ipv6_cidr_block", FieldType::Boolean)
            .optional("tags", tags())
            .rule("cidr_prefix", &["cidr_block"], |c| {
                match c.attr("cidr_block").and_then(formats::ipv4_prefix_len) {
                    Some(prefix) if !(16..=28).contains(&prefix) => Err(format!(
                        "cidr_block prefix /{} must be between /16 and /28",
                        prefix
                    )),
                    _ => Ok(()),
                }
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Vpc {
    fn resource_type(&self) -> &'static str {
        "aws_vpc"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "Virtual private cloud"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &[
            "id",
            "arn",
            "cidr_block",
            "default_security_group_id",
            "default_route_table_id",
            "main_route_table_id",
            "owner_id",
        ]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let cidr = config.get_str("cidr_block").unwrap_or_default();
        Computed::from([
            ("address_count".to_string(), json!(address_count(config.attr("cidr_block")))),
            ("is_private".to_string(), json!(formats::is_private_ipv4_cidr(cidr))),
        ])
    }
}

/// `aws_subnet`
pub struct Subnet {
    schema: Schema,
    plan: EmissionPlan,
}

/// Addresses AWS reserves in every subnet.
const SUBNET_RESERVED_ADDRESSES: u64 = 5;

impl Subnet {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("aws_subnet")
            .required("vpc_id", aws_id("vpc")?)
            .required("cidr_block", ipv4_cidr())
            .optional("availability_zone", FieldType::String)
            .optional("availability_zone_id", FieldType::String)
            .with_default("map_public_ip_on_launch", FieldType::Boolean, json!(false))
            .optional("ipv6_cidr_block", any_cidr())
            .optional("tags", tags())
            .at_most_one_of(&["availability_zone", "availability_zone_id"])
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Subnet {
    fn resource_type(&self) -> &'static str {
        "aws_subnet"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "VPC subnet"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn", "availability_zone", "availability_zone_id", "cidr_block", "vpc_id"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let available = address_count(config.attr("cidr_block")).saturating_sub(SUBNET_RESERVED_ADDRESSES);
        Computed::from([
            ("available_ip_count".to_string(), json!(available)),
            (
                "is_public".to_string(),
                json!(config.get_bool("map_public_ip_on_launch").unwrap_or(false)),
            ),
        ])
    }
}

/// `aws_security_group`
pub struct SecurityGroup {
    schema: Schema,
    plan: EmissionPlan,
}

fn security_group_rule() -> SchemaResult<Schema> {
    Schema::builder("security_group_rule")
        .required("from_port", port())
        .required("to_port", port())
        .required(
            "protocol",
            FieldType::enumeration(&["-1", "all", "tcp", "udp", "icmp", "icmpv6"]),
        )
        .optional("cidr_blocks", FieldType::array_of(ipv4_cidr()))
        .optional("ipv6_cidr_blocks", FieldType::array_of(any_cidr()))
        .optional("security_groups", FieldType::array_of(FieldType::String))
        .optional("prefix_list_ids", FieldType::array_of(FieldType::String))
        .optional("self", FieldType::Boolean)
        .optional("description", FieldType::String)
        .rule("port_order", &["from_port", "to_port"], |c| {
            match (c.get_i64("from_port"), c.get_i64("to_port")) {
                (Some(from), Some(to)) if from > to => Err(format!(
                    "from_port ({}) cannot be greater than to_port ({})",
                    from, to
                )),
                _ => Ok(()),
            }
        })
        .build()
}

impl SecurityGroup {
    pub fn new() -> SchemaResult<Self> {
        let rule = security_group_rule()?;
        let schema = Schema::builder("aws_security_group")
            .optional("name", FieldType::String.with(Constraint::length(Some(1), Some(255))))
            .optional("name_prefix", FieldType::String.with(Constraint::length(Some(1), Some(100))))
            .with_default("description", FieldType::String, json!("Managed by Strata"))
            .optional("vpc_id", aws_id("vpc")?)
            .optional("ingress", FieldType::array_of(FieldType::object(rule.clone())))
            .optional("egress", FieldType::array_of(FieldType::object(rule)))
            .with_default("revoke_rules_on_delete", FieldType::Boolean, json!(false))
            .optional("tags", tags())
            .at_most_one_of(&["name", "name_prefix"])
            .build()?;
        // Terraform takes ingress and egress as attribute lists of objects.
        let plan = EmissionPlan::from_schema(&schema)
            .attribute("ingress")
            .attribute("egress");
        Ok(Self { schema, plan })
    }
}

/// Port ranges of ingress rules open to the whole internet.
fn public_ingress_ports(config: &ValidatedConfig) -> Vec<(i64, i64)> {
    let Some(rules) = config.get_array("ingress") else {
        return Vec::new();
    };
    rules
        .iter()
        .filter_map(Value::as_object)
        .filter(|rule| {
            let v4 = rule.get_strings("cidr_blocks");
            let v6 = rule.get_strings("ipv6_cidr_blocks");
            v4.into_iter().chain(v6).any(formats::is_open_cidr)
        })
        .map(|rule| {
            let all = matches!(rule.get_str("protocol"), Some("-1" | "all"));
            if all {
                (0, 65535)
            } else {
                (
                    rule.get_i64("from_port").unwrap_or(0),
                    rule.get_i64("to_port").unwrap_or(65535),
                )
            }
        })
        .collect()
}

impl Resource for SecurityGroup {
    fn resource_type(&self) -> &'static str {
        "aws_security_group"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "Stateful firewall for VPC resources"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn", "name", "owner_id"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let public = public_ingress_ports(config);
        let count = |key: &str| config.get_array(key).map_or(0, Vec::len);
        Computed::from([
            ("allows_public_ingress".to_string(), json!(!public.is_empty())),
            ("security_level".to_string(), json!(security_level(&public))),
            ("ingress_rule_count".to_string(), json!(count("ingress"))),
            ("egress_rule_count".to_string(), json!(count("egress"))),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::build;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vpc_defaults_and_computed() {
        let built = build(
            &Vpc::new().unwrap(),
            "main",
            &json!({"cidr_block": "10.0.0.0/16", "tags": {"Name": "main"}}),
            &PricingCatalog::builtin(),
        )
        .unwrap();

        assert_eq!(
            Value::Object(built.block.body().clone()),
            json!({
                "cidr_block": "10.0.0.0/16",
                "instance_tenancy": "default",
                "enable_dns_support": true,
                "enable_dns_hostnames": true,
                "tags": {"Name": "main"}
            })
        );
        assert_eq!(built.reference.computed_bool("is_private"), Some(true));
        assert_eq!(built.reference.computed("address_count"), Some(&json!(65536)));
    }

    #[test]
    fn test_vpc_prefix_rule() {
        let err = build(
            &Vpc::new().unwrap(),
            "main",
            &json!({"cidr_block": "10.0.0.0/8"}),
            &PricingCatalog::builtin(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/8 must be between /16 and /28"));
    }

    #[test]
    fn test_subnet_accepts_vpc_placeholder() {
        let built = build(
            &Subnet::new().unwrap(),
            "public_a",
            &json!({
                "vpc_id": "${aws_vpc.main.id}",
                "cidr_block": "10.0.1.0/24",
                "map_public_ip_on_launch": true
            }),
            &PricingCatalog::builtin(),
        )
        .unwrap();

        assert_eq!(built.block.get("vpc_id"), Some(&json!("${aws_vpc.main.id}")));
        assert_eq!(built.reference.computed("available_ip_count"), Some(&json!(251)));
        assert_eq!(built.reference.computed_bool("is_public"), Some(true));
    }

    #[test]
    fn test_subnet_rejects_malformed_vpc_id() {
        let err = build(
            &Subnet::new().unwrap(),
            "a",
            &json!({"vpc_id": "main", "cidr_block": "10.0.1.0/24"}),
            &PricingCatalog::builtin(),
        )
        .unwrap_err();
        assert_eq!(err.validation_error().and_then(|e| e.field()), Some("vpc_id"));
    }

    #[test]
    fn test_security_group_levels() {
        let group = SecurityGroup::new().unwrap();
        let pricing = PricingCatalog::builtin();

        let web = build(
            &group,
            "web",
            &json!({
                "name": "web",
                "ingress": [
                    {"from_port": 443, "to_port": 443, "protocol": "tcp", "cidr_blocks": ["0.0.0.0/0"]},
                    {"from_port": 22, "to_port": 22, "protocol": "tcp", "cidr_blocks": ["10.0.0.0/8"], "self": true}
                ]
            }),
            &pricing,
        )
        .unwrap();
        assert_eq!(web.reference.computed("security_level"), Some(&json!("medium")));
        let ingress = web.block.get("ingress").and_then(Value::as_array).unwrap();
        assert_eq!(ingress[1].get("self"), Some(&json!(true)));

        let open = build(
            &group,
            "open",
            &json!({"ingress": [{"from_port": 0, "to_port": 0, "protocol": "-1", "cidr_blocks": ["0.0.0.0/0"]}]}),
            &pricing,
        )
        .unwrap();
        assert_eq!(open.reference.computed("security_level"), Some(&json!("low")));
    }

    #[test]
    fn test_security_group_port_order() {
        let err = build(
            &SecurityGroup::new().unwrap(),
            "bad",
            &json!({"ingress": [{"from_port": 8080, "to_port": 80, "protocol": "tcp"}]}),
            &PricingCatalog::builtin(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("from_port (8080) cannot be greater than to_port (80)"));
        assert_eq!(
            err.validation_error().map(|e| e.fields()),
            Some(vec!["ingress[0].from_port", "ingress[0].to_port"])
        );
    }
}
