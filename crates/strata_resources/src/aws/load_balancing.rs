//! Application and network load balancers.

use serde_json::{json, Value};

use strata_schema::formats::{arn, listener_port, port, tags};
use strata_schema::{Attributes, Constraint, FieldType, Schema, SchemaResult, ValidatedConfig, VariantGroup};
use strata_synth::{Computed, EmissionPlan};

use crate::pricing::PricingCatalog;
use crate::provider::Provider;
use crate::resource::Resource;

/// `aws_lb`
pub struct LoadBalancer {
    schema: Schema,
    plan: EmissionPlan,
}

impl LoadBalancer {
    pub fn new() -> SchemaResult<Self> {
        let access_logs = Schema::builder("access_logs")
            .required("bucket", FieldType::String)
            .optional("prefix", FieldType::String)
            .with_default("enabled", FieldType::Boolean, json!(true))
            .build()?;

        let schema = Schema::builder("aws_lb")
            .optional(
                "name",
                FieldType::String.with(Constraint::pattern(
                    "load balancer name",
                    r"^[A-Za-z0-9]([A-Za-z0-9-]{0,30}[A-Za-z0-9])?$",
                )?),
            )
            .optional("name_prefix", FieldType::String.with(Constraint::length(Some(1), Some(6))))
            .with_default("internal", FieldType::Boolean, json!(false))
            .with_default(
                "load_balancer_type",
                FieldType::enumeration(&["application", "network", "gateway"]),
                json!("application"),
            )
            .optional("security_groups", FieldType::array_of(FieldType::String))
            .optional("subnets", FieldType::array_of(FieldType::String))
            .with_default("enable_deletion_protection", FieldType::Boolean, json!(false))
            .with_default("idle_timeout", FieldType::Integer.with(Constraint::between(1, 4000)), json!(60))
            .optional(
                "ip_address_type",
                FieldType::enumeration(&["ipv4", "dualstack"]),
            )
            .optional("access_logs", FieldType::object(access_logs))
            .optional("tags", tags())
            .at_most_one_of(&["name", "name_prefix"])
            .rule("alb_subnets", &["load_balancer_type", "subnets"], |c| {
                let literal = c.get_array("subnets").map_or(0, Vec::len);
                if c.get_str("load_balancer_type") == Some("application") && literal < 2 {
                    return Err(format!(
                        "application load balancers require at least two subnets, got {}",
                        literal
                    ));
                }
                Ok(())
            })
            .rule("security_groups_type", &["load_balancer_type", "security_groups"], |c| {
                if c.get_str("load_balancer_type") == Some("gateway") && c.has("security_groups") {
                    return Err("security_groups cannot be set on gateway load balancers".to_string());
                }
                Ok(())
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for LoadBalancer {
    fn resource_type(&self) -> &'static str {
        "aws_lb"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "Elastic load balancer (application, network or gateway)"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn", "arn_suffix", "dns_name", "zone_id"]
    }

    fn computed(&self, config: &ValidatedConfig, pricing: &PricingCatalog) -> Computed {
        let kind = config.get_str("load_balancer_type").unwrap_or("application");
        Computed::from([
            ("estimated_monthly_cost".to_string(), json!(pricing.load_balancer_monthly(kind))),
            ("is_public".to_string(), json!(!config.get_bool("internal").unwrap_or(false))),
            ("is_application".to_string(), json!(kind == "application")),
        ])
    }
}

/// `aws_lb_target_group`
pub struct TargetGroup {
    schema: Schema,
    plan: EmissionPlan,
}

impl TargetGroup {
    pub fn new() -> SchemaResult<Self> {
        let threshold = || FieldType::Integer.with(Constraint::between(2, 10));
        let health_check = Schema::builder("health_check")
            .with_default("enabled", FieldType::Boolean, json!(true))
            .optional("path", FieldType::String)
            .optional("port", FieldType::String)
            .optional(
                "protocol",
                FieldType::enumeration(&["HTTP", "HTTPS", "TCP"]),
            )
            .optional("matcher", FieldType::String)
            .with_default("healthy_threshold", threshold(), json!(3))
            .with_default("unhealthy_threshold", threshold(), json!(3))
            .with_default("interval", FieldType::Integer.with(Constraint::between(5, 300)), json!(30))
            .optional("timeout", FieldType::Integer.with(Constraint::between(2, 120)))
            .rule("timeout_below_interval", &["timeout", "interval"], |c| {
                match (c.get_i64("timeout"), c.get_i64("interval")) {
                    (Some(timeout), Some(interval)) if timeout >= interval => Err(format!(
                        "timeout ({}) must be less than interval ({})",
                        timeout, interval
                    )),
                    _ => Ok(()),
                }
            })
            .build()?;

        let stickiness = Schema::builder("stickiness")
            .required("type", FieldType::enumeration(&["lb_cookie", "app_cookie", "source_ip"]))
            .with_default("enabled", FieldType::Boolean, json!(true))
            .optional("cookie_duration", FieldType::Integer.with(Constraint::between(1, 604_800)))
            .optional("cookie_name", FieldType::String)
            .rule("app_cookie_name", &["type", "cookie_name"], |c| {
                if c.get_str("type") == Some("app_cookie") && !c.has("cookie_name") {
                    return Err("cookie_name is required for app_cookie stickiness".to_string());
                }
                Ok(())
            })
            .build()?;

        let schema = Schema::builder("aws_lb_target_group")
            .optional("name", FieldType::String.with(Constraint::length(Some(1), Some(32))))
            .optional("port", port())
            .optional(
                "protocol",
                FieldType::enumeration(&["HTTP", "HTTPS", "TCP", "TLS", "UDP", "TCP_UDP", "GENEVE"]),
            )
            .with_default(
                "target_type",
                FieldType::enumeration(&["instance", "ip", "lambda", "alb"]),
                json!("instance"),
            )
            .optional("vpc_id", FieldType::String)
            .with_default(
                "deregistration_delay",
                FieldType::Integer.with(Constraint::between(0, 3600)),
                json!(300),
            )
            .optional("health_check", FieldType::object(health_check))
            .optional("stickiness", FieldType::object(stickiness))
            .optional("tags", tags())
            .rule("lambda_targets", &["target_type", "port", "protocol", "vpc_id"], |c| {
                if c.get_str("target_type") == Some("lambda") {
                    return Ok(());
                }
                match ["port", "protocol", "vpc_id"].into_iter().find(|f| !c.has(f)) {
                    Some(field) => Err(format!(
                        "{} is required unless target_type is lambda",
                        field
                    )),
                    None => Ok(()),
                }
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for TargetGroup {
    fn resource_type(&self) -> &'static str {
        "aws_lb_target_group"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "Load balancer target group"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn", "arn_suffix", "name"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let health_checked = config
            .get_object("health_check")
            .is_some_and(|hc| hc.get_bool("enabled").unwrap_or(true));
        Computed::from([
            ("health_check_enabled".to_string(), json!(health_checked)),
            ("is_sticky".to_string(), json!(config.has("stickiness"))),
        ])
    }
}

/// `aws_lb_listener`
pub struct Listener {
    schema: Schema,
    plan: EmissionPlan,
}

const SECURE_PROTOCOLS: [&str; 2] = ["HTTPS", "TLS"];

fn listener_action() -> SchemaResult<Schema> {
    let redirect = Schema::builder("redirect")
        .required("status_code", FieldType::enumeration(&["HTTP_301", "HTTP_302"]))
        .optional("protocol", FieldType::enumeration(&["HTTP", "HTTPS", "#{protocol}"]))
        .optional("port", FieldType::String)
        .optional("host", FieldType::String)
        .optional("path", FieldType::String)
        .optional("query", FieldType::String)
        .build()?;

    let fixed_response = Schema::builder("fixed_response")
        .required(
            "content_type",
            FieldType::enumeration(&[
                "text/plain",
                "text/css",
                "text/html",
                "application/javascript",
                "application/json",
            ]),
        )
        .optional("message_body", FieldType::String.with(Constraint::length(None, Some(1024))))
        .optional(
            "status_code",
            FieldType::String.with(Constraint::pattern("HTTP status code", r"^[2-5][0-9]{2}$")?),
        )
        .build()?;

    Schema::builder("default_action")
        .required(
            "type",
            FieldType::enumeration(&["forward", "redirect", "fixed-response"]),
        )
        .optional("target_group_arn", FieldType::String)
        .optional("redirect", FieldType::object(redirect))
        .optional("fixed_response", FieldType::object(fixed_response))
        .optional("order", FieldType::Integer.with(Constraint::between(1, 50_000)))
        .exactly_one_of_groups(vec![
            VariantGroup::new("forward", &["target_group_arn"]),
            VariantGroup::single("redirect"),
            VariantGroup::single("fixed_response"),
        ])
        .rule(
            "type_matches_action",
            &["type", "target_group_arn", "redirect", "fixed_response"],
            |c| {
                let expected = match c.get_str("type") {
                    Some("forward") => "target_group_arn",
                    Some("redirect") => "redirect",
                    Some("fixed-response") => "fixed_response",
                    _ => return Ok(()),
                };
                if c.has(expected) {
                    Ok(())
                } else {
                    Err(format!(
                        "{} actions require {}",
                        c.get_str("type").unwrap_or_default(),
                        expected
                    ))
                }
            },
        )
        .build()
}

impl Listener {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("aws_lb_listener")
            .required("load_balancer_arn", FieldType::String)
            .required("port", listener_port())
            .with_default(
                "protocol",
                FieldType::enumeration(&["HTTP", "HTTPS", "TCP", "TLS", "UDP", "TCP_UDP"]),
                json!("HTTP"),
            )
            .optional("ssl_policy", FieldType::String)
            .optional("certificate_arn", arn()?)
            .optional("alpn_policy", FieldType::String)
            .required(
                "default_action",
                FieldType::array_bounded(FieldType::object(listener_action()?), Some(1), None),
            )
            .optional("tags", tags())
            .rule("secure_certificate", &["protocol", "certificate_arn"], |c| {
                match c.get_str("protocol") {
                    Some(protocol) if SECURE_PROTOCOLS.contains(&protocol) && !c.has("certificate_arn") => {
                        Err(format!("certificate_arn is required for {} listeners", protocol))
                    }
                    _ => Ok(()),
                }
            })
            .rule("ssl_policy_protocol", &["protocol", "ssl_policy"], |c| {
                let secure = c.get_str("protocol").is_some_and(|p| SECURE_PROTOCOLS.contains(&p));
                if c.has("ssl_policy") && !secure {
                    return Err("ssl_policy is only valid for HTTPS and TLS listeners".to_string());
                }
                Ok(())
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for Listener {
    fn resource_type(&self) -> &'static str {
        "aws_lb_listener"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "Load balancer listener"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "arn"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let secure = config
            .get_str("protocol")
            .is_some_and(|p| SECURE_PROTOCOLS.contains(&p));
        let redirects_to_https = config.get_array("default_action").is_some_and(|actions| {
            actions
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|a| a.get_object("redirect"))
                .any(|r| r.get_str("protocol") == Some("HTTPS"))
        });
        Computed::from([
            ("is_secure".to_string(), json!(secure)),
            ("redirects_to_https".to_string(), json!(redirects_to_https)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::build;
    use pretty_assertions::assert_eq;

    fn pricing() -> PricingCatalog {
        PricingCatalog::builtin()
    }

    #[test]
    fn test_alb_needs_two_subnets() {
        let lb = LoadBalancer::new().unwrap();
        let err = build(&lb, "web", &json!({"name": "web", "subnets": ["subnet-1"]}), &pricing()).unwrap_err();
        assert!(err.to_string().contains("at least two subnets, got 1"));

        let nlb = build(
            &lb,
            "tcp",
            &json!({"load_balancer_type": "network", "subnets": ["subnet-1"]}),
            &pricing(),
        )
        .unwrap();
        assert_eq!(nlb.reference.computed_f64("estimated_monthly_cost"), Some(16.43));
    }

    #[test]
    fn test_target_group_requires_port_unless_lambda() {
        let group = TargetGroup::new().unwrap();
        let err = build(&group, "web", &json!({"protocol": "HTTP", "vpc_id": "vpc-1"}), &pricing()).unwrap_err();
        assert!(err.to_string().contains("port is required unless target_type is lambda"));

        assert!(build(&group, "fn", &json!({"target_type": "lambda"}), &pricing()).is_ok());
    }

    #[test]
    fn test_target_group_health_check_and_stickiness() {
        let built = build(
            &TargetGroup::new().unwrap(),
            "web",
            &json!({
                "port": 80,
                "protocol": "HTTP",
                "vpc_id": "${aws_vpc.main.id}",
                "health_check": {"path": "/health"},
                "stickiness": {"type": "lb_cookie"}
            }),
            &pricing(),
        )
        .unwrap();

        assert_eq!(
            built.block.get("health_check"),
            Some(&json!({
                "enabled": true,
                "path": "/health",
                "healthy_threshold": 3,
                "unhealthy_threshold": 3,
                "interval": 30
            }))
        );
        assert_eq!(built.block.get("stickiness"), Some(&json!({"type": "lb_cookie", "enabled": true})));
        assert_eq!(built.reference.computed_bool("health_check_enabled"), Some(true));
    }

    #[test]
    fn test_health_check_timeout_rule() {
        let err = build(
            &TargetGroup::new().unwrap(),
            "web",
            &json!({"target_type": "lambda", "health_check": {"interval": 10, "timeout": 10}}),
            &pricing(),
        )
        .unwrap_err();
        assert_eq!(
            err.validation_error().and_then(|e| e.field()),
            Some("health_check.timeout")
        );
    }

    #[test]
    fn test_https_listener_requires_certificate() {
        let err = build(
            &Listener::new().unwrap(),
            "https",
            &json!({
                "load_balancer_arn": "${aws_lb.web.arn}",
                "port": 443,
                "protocol": "HTTPS",
                "default_action": [{"type": "forward", "target_group_arn": "${aws_lb_target_group.web.arn}"}]
            }),
            &pricing(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("certificate_arn is required for HTTPS listeners"));
    }

    #[test]
    fn test_listener_action_variants() {
        let listener = Listener::new().unwrap();
        let both = json!({
            "load_balancer_arn": "${aws_lb.web.arn}",
            "port": 80,
            "default_action": [{
                "type": "forward",
                "target_group_arn": "${aws_lb_target_group.web.arn}",
                "redirect": {"status_code": "HTTP_301", "protocol": "HTTPS"}
            }]
        });
        let err = build(&listener, "http", &both, &pricing()).unwrap_err();
        assert!(matches!(
            err.validation_error(),
            Some(strata_schema::ValidationError::AmbiguousVariant { .. })
        ));

        let redirect = json!({
            "load_balancer_arn": "${aws_lb.web.arn}",
            "port": 80,
            "default_action": [{
                "type": "redirect",
                "redirect": {"status_code": "HTTP_301", "protocol": "HTTPS", "port": "443"}
            }]
        });
        let built = build(&listener, "http", &redirect, &pricing()).unwrap();
        assert_eq!(built.reference.computed_bool("redirects_to_https"), Some(true));
        assert_eq!(built.reference.computed_bool("is_secure"), Some(false));
    }

    #[test]
    fn test_listener_action_type_must_match() {
        let err = build(
            &Listener::new().unwrap(),
            "http",
            &json!({
                "load_balancer_arn": "arn",
                "port": 80,
                "default_action": [{"type": "redirect", "target_group_arn": "tg"}]
            }),
            &pricing(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("redirect actions require redirect"));
    }
}
