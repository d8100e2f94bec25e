//! EC2 instances, launch templates, autoscaling groups and EKS node groups.

use serde_json::json;

use strata_schema::formats::{arn, aws_id, tags};
use strata_schema::{Attributes, Constraint, FieldType, Schema, SchemaResult, ValidatedConfig};
use strata_synth::{Computed, EmissionPlan};

use crate::common::check_scaling;
use crate::pricing::{round_cents, PricingCatalog};
use crate::provider::Provider;
use crate::resource::Resource;

const DEFAULT_ROOT_VOLUME_GB: f64 = 8.0;

fn instance_type() -> SchemaResult<FieldType> {
    Ok(FieldType::String.with(Constraint::pattern(
        "EC2 instance type",
        r"^[a-z][a-z0-9-]*\.[a-z0-9]+$",
    )?))
}

/// Family part of an instance type (`t3` for `t3.medium`).
fn instance_family(instance_type: &str) -> &str {
    instance_type.split('.').next().unwrap_or(instance_type)
}

/// `aws_instance`
pub struct Instance {
    schema: Schema,
    plan: EmissionPlan,
}

impl Instance {
    pub fn new() -> SchemaResult<Self> {
        let root_block_device = Schema::builder("root_block_device")
            .optional("volume_size", FieldType::Integer.with(Constraint::between(1, 16_384)))
            .with_default(
                "volume_type",
                FieldType::enumeration(&["gp2", "gp3", "io1", "io2", "st1", "sc1", "standard"]),
                json!("gp3"),
            )
            .optional("iops", FieldType::Integer.with(Constraint::at_least(100)))
            .with_default("encrypted", FieldType::Boolean, json!(true))
            .with_default("delete_on_termination", FieldType::Boolean, json!(true))
            .rule("iops_volume_type", &["iops", "volume_type"], |c| {
                let provisioned = matches!(c.get_str("volume_type"), Some("io1" | "io2" | "gp3"));
                if c.has("iops") && !provisioned {
                    return Err("iops is only valid for io1, io2 and gp3 volumes".to_string());
                }
                Ok(())
            })
            .build()?;

        let spot_options = Schema::builder("spot_options")
            .optional("max_price", FieldType::String)
            .optional(
                "instance_interruption_behavior",
                FieldType::enumeration(&["terminate", "stop", "hibernate"]),
            )
            .build()?;
        let market_options = Schema::builder("instance_market_options")
            .with_default("market_type", FieldType::enumeration(&["spot"]), json!("spot"))
            .optional("spot_options", FieldType::object(spot_options))
            .build()?;

        let schema = Schema::builder("aws_instance")
            .required("ami", aws_id("ami")?)
            .required("instance_type", instance_type()?)
            .optional("subnet_id", aws_id("subnet")?)
            .optional("vpc_security_group_ids", FieldType::array_of(FieldType::String))
            .optional("key_name", FieldType::String)
            .optional("associate_public_ip_address", FieldType::Boolean)
            .optional("iam_instance_profile", FieldType::String)
            .optional("user_data", FieldType::String)
            .optional("user_data_base64", FieldType::String)
            .with_default("monitoring", FieldType::Boolean, json!(false))
            .optional("root_block_device", FieldType::object(root_block_device))
            .optional("instance_market_options", FieldType::object(market_options))
            .optional("tags", tags())
            .at_most_one_of(&["user_data", "user_data_base64"])
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Instance {
    fn resource_type(&self) -> &'static str {
        "aws_instance"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "EC2 virtual machine"
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
            "private_ip",
            "public_ip",
            "private_dns",
            "public_dns",
            "primary_network_interface_id",
        ]
    }

    fn computed(&self, config: &ValidatedConfig, pricing: &PricingCatalog) -> Computed {
        let instance_type = config.get_str("instance_type").unwrap_or_default();
        let is_spot = config.has("instance_market_options");

        let mut compute = pricing.instance_monthly(instance_type);
        if is_spot {
            compute *= 1.0 - pricing.aws_spot_discount;
        }
        let volume_gb = config
            .get_object("root_block_device")
            .and_then(|d| d.get_f64("volume_size"))
            .unwrap_or(DEFAULT_ROOT_VOLUME_GB);

        Computed::from([
            ("instance_family".to_string(), json!(instance_family(instance_type))),
            ("is_spot".to_string(), json!(is_spot)),
            (
                "estimated_monthly_cost".to_string(),
                json!(round_cents(compute + pricing.ebs_monthly(volume_gb))),
            ),
        ])
    }
}

/// `aws_launch_template`
pub struct LaunchTemplate {
    schema: Schema,
    plan: EmissionPlan,
}

impl LaunchTemplate {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("aws_launch_template")
            .optional("name", FieldType::String.with(Constraint::length(Some(3), Some(128))))
            .optional("name_prefix", FieldType::String)
            .optional("description", FieldType::String)
            .required("image_id", aws_id("ami")?)
            .required("instance_type", instance_type()?)
            .optional("key_name", FieldType::String)
            .optional("vpc_security_group_ids", FieldType::array_of(FieldType::String))
            .optional("user_data", FieldType::String)
            .with_default("update_default_version", FieldType::Boolean, json!(true))
            .optional("tags", tags())
            .at_most_one_of(&["name", "name_prefix"])
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for LaunchTemplate {
    fn resource_type(&self) -> &'static str {
        "aws_launch_template"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "EC2 launch template"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn", "latest_version", "default_version"]
    }

    fn computed(&self, config: &ValidatedConfig, pricing: &PricingCatalog) -> Computed {
        let instance_type = config.get_str("instance_type").unwrap_or_default();
        Computed::from([
            ("instance_family".to_string(), json!(instance_family(instance_type))),
            (
                "instance_monthly_cost".to_string(),
                json!(pricing.instance_monthly(instance_type)),
            ),
        ])
    }
}

/// `aws_autoscaling_group`
pub struct AutoscalingGroup {
    schema: Schema,
    plan: EmissionPlan,
}

impl AutoscalingGroup {
    pub fn new() -> SchemaResult<Self> {
        let launch_template = Schema::builder("launch_template")
            .optional("id", FieldType::String)
            .optional("name", FieldType::String)
            .with_default("version", FieldType::String, json!("$Latest"))
            .exactly_one_of(&["id", "name"])
            .build()?;

        let tag = Schema::builder("tag")
            .required("key", FieldType::String)
            .required("value", FieldType::String)
            .with_default("propagate_at_launch", FieldType::Boolean, json!(true))
            .build()?;

        let size = || FieldType::Integer.with(Constraint::at_least(0));
        let schema = Schema::builder("aws_autoscaling_group")
            .optional("name", FieldType::String)
            .optional("name_prefix", FieldType::String)
            .required("min_size", size())
            .required("max_size", size())
            .optional("desired_capacity", size())
            .optional("vpc_zone_identifier", FieldType::array_of(FieldType::String))
            .optional("availability_zones", FieldType::array_of(FieldType::String))
            .optional("target_group_arns", FieldType::array_of(FieldType::String))
            .with_default(
                "health_check_type",
                FieldType::enumeration(&["EC2", "ELB"]),
                json!("EC2"),
            )
            .with_default("health_check_grace_period", size(), json!(300))
            .required("launch_template", FieldType::object(launch_template))
            .optional("tags", FieldType::array_of(FieldType::object(tag)))
            .at_most_one_of(&["name", "name_prefix"])
            .exactly_one_of(&["vpc_zone_identifier", "availability_zones"])
            .rule("capacity_range", &["min_size", "max_size", "desired_capacity"], |c| {
                check_scaling(c, "min_size", "max_size", "desired_capacity")
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema).rename("tags", "tag");
        Ok(Self { schema, plan })
    }
}

impl Resource for AutoscalingGroup {
    fn resource_type(&self) -> &'static str {
        "aws_autoscaling_group"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "EC2 autoscaling group"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn", "name"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let (min, max) = (config.get_i64("min_size"), config.get_i64("max_size"));
        let subnets = config.get_array("vpc_zone_identifier").map_or(0, Vec::len);
        Computed::from([
            ("is_fixed_size".to_string(), json!(min.is_some() && min == max)),
            ("spans_multiple_subnets".to_string(), json!(subnets > 1)),
            (
                "uses_load_balancer".to_string(),
                json!(config.get_array("target_group_arns").is_some_and(|a| !a.is_empty())),
            ),
        ])
    }
}

/// `aws_eks_node_group`
pub struct EksNodeGroup {
    schema: Schema,
    plan: EmissionPlan,
}

impl EksNodeGroup {
    pub fn new() -> SchemaResult<Self> {
        let size = || FieldType::Integer.with(Constraint::at_least(0));
        let scaling_config = Schema::builder("scaling_config")
            .required("desired_size", size())
            .required("min_size", size())
            .required("max_size", size())
            .rule("size_range", &["min_size", "max_size", "desired_size"], |c| {
                check_scaling(c, "min_size", "max_size", "desired_size")
            })
            .build()?;

        let taint = Schema::builder("taint")
            .required("key", FieldType::String.with(Constraint::length(Some(1), Some(63))))
            .optional("value", FieldType::String.with(Constraint::length(None, Some(63))))
            .required(
                "effect",
                FieldType::enumeration(&["NO_SCHEDULE", "NO_EXECUTE", "PREFER_NO_SCHEDULE"]),
            )
            .build()?;

        let update_config = Schema::builder("update_config")
            .optional("max_unavailable", FieldType::Integer.with(Constraint::between(1, 100)))
            .optional(
                "max_unavailable_percentage",
                FieldType::Integer.with(Constraint::between(1, 100)),
            )
            .exactly_one_of(&["max_unavailable", "max_unavailable_percentage"])
            .build()?;

        let schema = Schema::builder("aws_eks_node_group")
            .required("cluster_name", FieldType::String)
            .optional("node_group_name", FieldType::String)
            .required("node_role_arn", arn()?)
            .required(
                "subnet_ids",
                FieldType::array_bounded(FieldType::String, Some(1), None),
            )
            .required("scaling_config", FieldType::object(scaling_config))
            .with_default(
                "instance_types",
                FieldType::array_bounded(instance_type()?, Some(1), None),
                json!(["t3.medium"]),
            )
            .with_default(
                "capacity_type",
                FieldType::enumeration(&["ON_DEMAND", "SPOT"]),
                json!("ON_DEMAND"),
            )
            .optional(
                "ami_type",
                FieldType::enumeration(&[
                    "AL2_x86_64",
                    "AL2_x86_64_GPU",
                    "AL2_ARM_64",
                    "AL2023_x86_64_STANDARD",
                    "AL2023_ARM_64_STANDARD",
                    "BOTTLEROCKET_x86_64",
                    "BOTTLEROCKET_ARM_64",
                ]),
            )
            .with_default("disk_size", FieldType::Integer.with(Constraint::at_least(1)), json!(20))
            .optional("labels", FieldType::map_of(FieldType::String))
            .optional("taints", FieldType::array_bounded(FieldType::object(taint), None, Some(50)))
            .optional("update_config", FieldType::object(update_config))
            .optional("tags", tags())
            .build()?;
        let plan = EmissionPlan::from_schema(&schema).rename("taints", "taint");
        Ok(Self { schema, plan })
    }
}

impl Resource for EksNodeGroup {
    fn resource_type(&self) -> &'static str {
        "aws_eks_node_group"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "EKS managed node group"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn", "status", "resources"]
    }

    fn computed(&self, config: &ValidatedConfig, pricing: &PricingCatalog) -> Computed {
        let is_spot = config.get_str("capacity_type") == Some("SPOT");
        let instance_type = config
            .get_strings("instance_types")
            .first()
            .copied()
            .unwrap_or_default();
        let scaling = config.get_object("scaling_config");
        let desired = scaling.and_then(|s| s.get_i64("desired_size")).unwrap_or(0);

        let mut per_node = pricing.instance_monthly(instance_type);
        if is_spot {
            per_node *= 1.0 - pricing.aws_spot_discount;
        }
        let disk_gb = config.get_f64("disk_size").unwrap_or(0.0);
        let cost = (per_node + pricing.ebs_monthly(disk_gb)) * desired as f64;

        Computed::from([
            ("is_spot".to_string(), json!(is_spot)),
            ("instance_family".to_string(), json!(instance_family(instance_type))),
            (
                "is_autoscaling".to_string(),
                json!(scaling.is_some_and(|s| s.get_i64("min_size") != s.get_i64("max_size"))),
            ),
            ("estimated_monthly_cost".to_string(), json!(round_cents(cost))),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::build;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use strata_schema::ValidationError;

    fn node_group(scaling: Value) -> Value {
        json!({
            "cluster_name": "prod",
            "node_role_arn": "arn:aws:iam::123456789012:role/eks-nodes",
            "subnet_ids": ["subnet-0123456789abcdef0"],
            "scaling_config": scaling
        })
    }

    #[test]
    fn test_instance_cost() {
        let instance = Instance::new().unwrap();
        let pricing = PricingCatalog::builtin();

        let on_demand = build(
            &instance,
            "web",
            &json!({"ami": "ami-0123456789abcdef0", "instance_type": "t3.medium"}),
            &pricing,
        )
        .unwrap();
        // 30.37 compute + 8 GB at 0.08
        assert_eq!(on_demand.reference.computed_f64("estimated_monthly_cost"), Some(31.01));
        assert_eq!(on_demand.reference.computed("instance_family"), Some(&json!("t3")));

        let spot = build(
            &instance,
            "batch",
            &json!({
                "ami": "ami-0123456789abcdef0",
                "instance_type": "m5.large",
                "instance_market_options": {},
                "root_block_device": {"volume_size": 100}
            }),
            &pricing,
        )
        .unwrap();
        assert_eq!(spot.reference.computed_bool("is_spot"), Some(true));
        assert_eq!(spot.reference.computed_f64("estimated_monthly_cost"), Some(29.02));
        assert_eq!(
            spot.block.get("instance_market_options"),
            Some(&json!({"market_type": "spot"}))
        );
    }

    #[test]
    fn test_unknown_instance_type_prices_compute_at_zero() {
        let built = build(
            &Instance::new().unwrap(),
            "x",
            &json!({"ami": "ami-0123456789abcdef0", "instance_type": "zz9.huge"}),
            &PricingCatalog::builtin(),
        )
        .unwrap();
        assert_eq!(built.reference.computed_f64("estimated_monthly_cost"), Some(0.64));
    }

    #[test]
    fn test_launch_template_cost() {
        let built = build(
            &LaunchTemplate::new().unwrap(),
            "web",
            &json!({"name_prefix": "web-", "image_id": "ami-0123456789abcdef0", "instance_type": "t3.small"}),
            &PricingCatalog::builtin(),
        )
        .unwrap();
        assert_eq!(built.reference.computed_f64("instance_monthly_cost"), Some(15.18));
        assert_eq!(built.reference.output("latest_version"), Some("${aws_launch_template.web.latest_version}"));
    }

    #[test]
    fn test_asg_launch_template_exclusive() {
        let asg = AutoscalingGroup::new().unwrap();
        let err = build(
            &asg,
            "web",
            &json!({
                "min_size": 1,
                "max_size": 3,
                "vpc_zone_identifier": ["subnet-a"],
                "launch_template": {"id": "lt-1", "name": "web"}
            }),
            &PricingCatalog::builtin(),
        )
        .unwrap_err();
        assert!(matches!(
            err.validation_error(),
            Some(ValidationError::AmbiguousVariant { scope, .. }) if scope == "launch_template"
        ));
    }

    #[test]
    fn test_asg_tags_emitted_as_tag_blocks() {
        let built = build(
            &AutoscalingGroup::new().unwrap(),
            "web",
            &json!({
                "min_size": 1,
                "max_size": 3,
                "desired_capacity": 2,
                "vpc_zone_identifier": ["subnet-a", "subnet-b"],
                "launch_template": {"name": "web"},
                "tags": [{"key": "Name", "value": "web"}]
            }),
            &PricingCatalog::builtin(),
        )
        .unwrap();

        assert_eq!(
            built.block.get("tag"),
            Some(&json!([{"key": "Name", "value": "web", "propagate_at_launch": true}]))
        );
        assert!(!built.block.contains_key("tags"));
        assert_eq!(
            built.block.get("launch_template"),
            Some(&json!({"name": "web", "version": "$Latest"}))
        );
        assert_eq!(built.reference.computed_bool("spans_multiple_subnets"), Some(true));
    }

    #[test]
    fn test_asg_desired_out_of_range() {
        let err = build(
            &AutoscalingGroup::new().unwrap(),
            "web",
            &json!({
                "min_size": 2,
                "max_size": 4,
                "desired_capacity": 5,
                "availability_zones": ["eu-west-1a"],
                "launch_template": {"id": "lt-1"}
            }),
            &PricingCatalog::builtin(),
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("desired_capacity (5) must be between min_size (2) and max_size (4)"));
    }

    #[test]
    fn test_node_group_scaling_rule() {
        let err = build(
            &EksNodeGroup::new().unwrap(),
            "workers",
            &node_group(json!({"min_size": 5, "max_size": 3, "desired_size": 4})),
            &PricingCatalog::builtin(),
        )
        .unwrap_err();
        let validation = err.validation_error().unwrap();
        assert_eq!(
            validation.to_string(),
            "min_size (5) cannot be greater than max_size (3)"
        );
        assert_eq!(
            validation.fields(),
            vec![
                "scaling_config.min_size",
                "scaling_config.max_size",
                "scaling_config.desired_size"
            ]
        );
    }

    #[test]
    fn test_node_group_scaled_to_zero() {
        let built = build(
            &EksNodeGroup::new().unwrap(),
            "workers",
            &node_group(json!({"min_size": 0, "max_size": 0, "desired_size": 0})),
            &PricingCatalog::builtin(),
        )
        .unwrap();
        assert_eq!(
            built.block.get("scaling_config"),
            Some(&json!({"desired_size": 0, "min_size": 0, "max_size": 0}))
        );
    }

    #[test]
    fn test_node_group_taints_and_cost() {
        let mut raw = node_group(json!({"min_size": 1, "max_size": 4, "desired_size": 2}));
        raw["capacity_type"] = json!("SPOT");
        raw["taints"] = json!([{"key": "gpu", "effect": "NO_SCHEDULE"}]);

        let built = build(&EksNodeGroup::new().unwrap(), "workers", &raw, &PricingCatalog::builtin()).unwrap();

        assert_eq!(built.block.get("taint"), Some(&json!([{"key": "gpu", "effect": "NO_SCHEDULE"}])));
        assert_eq!(built.block.get("instance_types"), Some(&json!(["t3.medium"])));
        assert_eq!(built.reference.computed_bool("is_spot"), Some(true));
        assert_eq!(built.reference.computed_bool("is_autoscaling"), Some(true));
        // 2 × (30.37 × 0.3 + 20 GB × 0.08)
        assert_eq!(built.reference.computed_f64("estimated_monthly_cost"), Some(21.42));
    }
}
