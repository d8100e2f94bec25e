//! Load-balanced web application on AWS.
//!
//! A VPC with one public subnet per availability zone, an application load
//! balancer in front of an autoscaling group, and the security groups that
//! let traffic flow from the internet to the balancer and from the balancer
//! to the instances. With a certificate the HTTP listener redirects to an
//! HTTPS listener; without one it forwards directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strata_synth::Output;

use super::{bind, label, name_tags};
use crate::error::{ComposeError, ComposeResult};
use crate::template::{References, Template};

const OPEN: &str = "0.0.0.0/0";
const TLS_POLICY: &str = "ELBSecurityPolicy-TLS13-1-2-2021-06";

/// Parameters of the `web_application` architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebApplicationParams {
    #[serde(default = "default_vpc_cidr")]
    pub vpc_cidr: String,
    #[serde(default = "default_availability_zones")]
    pub availability_zones: Vec<String>,
    /// One per availability zone.
    #[serde(default = "default_public_subnet_cidrs")]
    pub public_subnet_cidrs: Vec<String>,
    pub ami: String,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    #[serde(default = "default_app_port")]
    pub app_port: u16,
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
    #[serde(default = "default_min_size")]
    pub min_size: i64,
    #[serde(default = "default_max_size")]
    pub max_size: i64,
    #[serde(default = "default_desired_capacity")]
    pub desired_capacity: i64,
    /// Enables the HTTPS listener.
    #[serde(default)]
    pub certificate_arn: Option<String>,
    #[serde(default)]
    pub user_data: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_vpc_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_availability_zones() -> Vec<String> {
    vec!["us-east-1a".to_string(), "us-east-1b".to_string()]
}

fn default_public_subnet_cidrs() -> Vec<String> {
    vec!["10.0.1.0/24".to_string(), "10.0.2.0/24".to_string()]
}

fn default_instance_type() -> String {
    "t3.micro".to_string()
}

fn default_app_port() -> u16 {
    8080
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_min_size() -> i64 {
    1
}

fn default_max_size() -> i64 {
    3
}

fn default_desired_capacity() -> i64 {
    2
}

impl WebApplicationParams {
    /// Defaults for everything except the machine image.
    pub fn new(ami: impl Into<String>) -> Self {
        Self {
            vpc_cidr: default_vpc_cidr(),
            availability_zones: default_availability_zones(),
            public_subnet_cidrs: default_public_subnet_cidrs(),
            ami: ami.into(),
            instance_type: default_instance_type(),
            app_port: default_app_port(),
            health_check_path: default_health_check_path(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            desired_capacity: default_desired_capacity(),
            certificate_arn: None,
            user_data: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_certificate(mut self, certificate_arn: impl Into<String>) -> Self {
        self.certificate_arn = Some(certificate_arn.into());
        self
    }

    fn check(&self) -> Result<(), String> {
        if self.public_subnet_cidrs.len() != self.availability_zones.len() {
            return Err(format!(
                "public_subnet_cidrs has {} entries but availability_zones has {}",
                self.public_subnet_cidrs.len(),
                self.availability_zones.len()
            ));
        }
        if self.availability_zones.len() < 2 {
            return Err("at least two availability zones are required".to_string());
        }
        Ok(())
    }
}

/// Instance names and settings shared by every step.
struct WebApplication {
    prefix: String,
    params: WebApplicationParams,
    vpc: String,
    subnets: Vec<String>,
    alb_security_group: String,
    app_security_group: String,
    alb: String,
    target_group: String,
    launch_template: String,
    autoscaling_group: String,
}

impl WebApplication {
    fn new(prefix: &str, params: WebApplicationParams) -> Self {
        let subnets = (1..=params.availability_zones.len())
            .map(|i| format!("{}_public_{}", prefix, i))
            .collect();
        Self {
            prefix: prefix.to_string(),
            vpc: format!("{}_vpc", prefix),
            subnets,
            alb_security_group: format!("{}_alb_sg", prefix),
            app_security_group: format!("{}_app_sg", prefix),
            alb: format!("{}_alb", prefix),
            target_group: format!("{}_tg", prefix),
            launch_template: format!("{}_lt", prefix),
            autoscaling_group: format!("{}_asg", prefix),
            params,
        }
    }

    fn tags(&self, suffix: &str) -> Value {
        name_tags(&self.params.tags, &format!("{}-{}", label(&self.prefix), suffix))
    }

    fn subnet_ids(&self, refs: &References) -> ComposeResult<Vec<String>> {
        self.subnets.iter().map(|s| refs.output(s, "id")).collect()
    }

    fn vpc_config(&self, _refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "cidr_block": self.params.vpc_cidr,
            "tags": self.tags("vpc"),
        }))
    }

    fn subnet_config(&self, index: usize, refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "vpc_id": refs.output(&self.vpc, "id")?,
            "cidr_block": self.params.public_subnet_cidrs[index],
            "availability_zone": self.params.availability_zones[index],
            "map_public_ip_on_launch": true,
            "tags": self.tags(&format!("public-{}", index + 1)),
        }))
    }

    fn alb_security_group_config(&self, refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "name": format!("{}-alb", label(&self.prefix)),
            "description": "Load balancer ingress",
            "vpc_id": refs.output(&self.vpc, "id")?,
            "ingress": [
                {"from_port": 80, "to_port": 80, "protocol": "tcp", "cidr_blocks": [OPEN]},
                {"from_port": 443, "to_port": 443, "protocol": "tcp", "cidr_blocks": [OPEN]},
            ],
            "egress": [
                {"from_port": 0, "to_port": 0, "protocol": "-1", "cidr_blocks": [OPEN]},
            ],
            "tags": self.tags("alb"),
        }))
    }

    fn app_security_group_config(&self, refs: &References) -> ComposeResult<Value> {
        let port = self.params.app_port;
        Ok(json!({
            "name": format!("{}-app", label(&self.prefix)),
            "description": "Application traffic from the load balancer",
            "vpc_id": refs.output(&self.vpc, "id")?,
            "ingress": [{
                "from_port": port,
                "to_port": port,
                "protocol": "tcp",
                "security_groups": [refs.output(&self.alb_security_group, "id")?],
            }],
            "egress": [
                {"from_port": 0, "to_port": 0, "protocol": "-1", "cidr_blocks": [OPEN]},
            ],
            "tags": self.tags("app"),
        }))
    }

    fn alb_config(&self, refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "name": format!("{}-alb", label(&self.prefix)),
            "load_balancer_type": "application",
            "security_groups": [refs.output(&self.alb_security_group, "id")?],
            "subnets": self.subnet_ids(refs)?,
            "tags": self.tags("alb"),
        }))
    }

    fn target_group_config(&self, refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "name": format!("{}-tg", label(&self.prefix)),
            "port": self.params.app_port,
            "protocol": "HTTP",
            "vpc_id": refs.output(&self.vpc, "id")?,
            "health_check": {
                "path": self.params.health_check_path,
                "matcher": "200",
            },
            "tags": self.tags("tg"),
        }))
    }

    fn launch_template_config(&self, refs: &References) -> ComposeResult<Value> {
        let mut config = json!({
            "name_prefix": format!("{}-", label(&self.prefix)),
            "image_id": self.params.ami,
            "instance_type": self.params.instance_type,
            "vpc_security_group_ids": [refs.output(&self.app_security_group, "id")?],
            "tags": self.tags("app"),
        });
        if let Some(user_data) = &self.params.user_data {
            config["user_data"] = json!(user_data);
        }
        Ok(config)
    }

    fn autoscaling_group_config(&self, refs: &References) -> ComposeResult<Value> {
        let name = format!("{}-app", label(&self.prefix));
        Ok(json!({
            "name_prefix": format!("{}-", name),
            "min_size": self.params.min_size,
            "max_size": self.params.max_size,
            "desired_capacity": self.params.desired_capacity,
            "vpc_zone_identifier": self.subnet_ids(refs)?,
            "target_group_arns": [refs.output(&self.target_group, "arn")?],
            "health_check_type": "ELB",
            "launch_template": {"id": refs.output(&self.launch_template, "id")?},
            "tags": [{"key": "Name", "value": name}],
        }))
    }

    fn http_listener_config(&self, refs: &References) -> ComposeResult<Value> {
        let action = if self.params.certificate_arn.is_some() {
            json!({
                "type": "redirect",
                "redirect": {"status_code": "HTTP_301", "protocol": "HTTPS", "port": "443"},
            })
        } else {
            self.forward(refs)?
        };
        Ok(json!({
            "load_balancer_arn": refs.output(&self.alb, "arn")?,
            "port": 80,
            "protocol": "HTTP",
            "default_action": [action],
        }))
    }

    fn https_listener_config(&self, refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "load_balancer_arn": refs.output(&self.alb, "arn")?,
            "port": 443,
            "protocol": "HTTPS",
            "ssl_policy": TLS_POLICY,
            "certificate_arn": self.params.certificate_arn,
            "default_action": [self.forward(refs)?],
        }))
    }

    fn forward(&self, refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "type": "forward",
            "target_group_arn": refs.output(&self.target_group, "arn")?,
        }))
    }
}

/// Expand `web_application` under the instance prefix `prefix`.
pub fn template(prefix: &str, params: WebApplicationParams) -> ComposeResult<Template> {
    params.check().map_err(|message| ComposeError::InvalidParameters {
        architecture: "web_application".to_string(),
        message,
    })?;

    let secure = params.certificate_arn.is_some();
    let app = Arc::new(WebApplication::new(prefix, params));

    let mut template = Template::new(format!("web_application:{}", prefix))
        .step("aws_vpc", app.vpc.clone(), bind(&app, WebApplication::vpc_config));

    for (index, subnet) in app.subnets.iter().enumerate() {
        template = template.step(
            "aws_subnet",
            subnet.clone(),
            bind(&app, move |app: &WebApplication, refs: &References| app.subnet_config(index, refs)),
        );
    }

    template = template
        .step(
            "aws_security_group",
            app.alb_security_group.clone(),
            bind(&app, WebApplication::alb_security_group_config),
        )
        .step(
            "aws_security_group",
            app.app_security_group.clone(),
            bind(&app, WebApplication::app_security_group_config),
        )
        .step("aws_lb", app.alb.clone(), bind(&app, WebApplication::alb_config))
        .step(
            "aws_lb_target_group",
            app.target_group.clone(),
            bind(&app, WebApplication::target_group_config),
        )
        .step(
            "aws_launch_template",
            app.launch_template.clone(),
            bind(&app, WebApplication::launch_template_config),
        )
        .step(
            "aws_autoscaling_group",
            app.autoscaling_group.clone(),
            bind(&app, WebApplication::autoscaling_group_config),
        )
        .step(
            "aws_lb_listener",
            format!("{}_http", prefix),
            bind(&app, WebApplication::http_listener_config),
        );

    if secure {
        template = template.step(
            "aws_lb_listener",
            format!("{}_https", prefix),
            bind(&app, WebApplication::https_listener_config),
        );
    }

    let alb = app.alb.clone();
    let vpc = app.vpc.clone();
    Ok(template
        .output(format!("{}_alb_dns_name", prefix), move |refs| {
            Ok(Output::new(refs.output(&alb, "dns_name")?).with_description("Load balancer DNS name"))
        })
        .output(format!("{}_vpc_id", prefix), move |refs| {
            Ok(Output::new(refs.output(&vpc, "id")?))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Composer;

    const AMI: &str = "ami-0abcdef1234567890";

    #[test]
    fn test_mismatched_subnets() {
        let mut params = WebApplicationParams::new(AMI);
        params.public_subnet_cidrs.pop();

        let err = template("web", params).unwrap_err();
        assert!(err.to_string().contains("public_subnet_cidrs has 1 entries"));
    }

    #[test]
    fn test_plain_http() {
        let template = template("web", WebApplicationParams::new(AMI)).unwrap();
        let composition = Composer::standard().unwrap().compose(&template).unwrap();
        let document = composition.document();

        assert_eq!(document.resource_count(), 10);
        assert!(!document.contains("aws_lb_listener", "web_https"));

        let listener = document.resource("aws_lb_listener", "web_http").unwrap();
        assert_eq!(listener["default_action"][0]["type"], "forward");
        assert_eq!(
            listener["default_action"][0]["target_group_arn"],
            "${aws_lb_target_group.web_tg.arn}"
        );
    }

    #[test]
    fn test_https_redirect() {
        let params = WebApplicationParams::new(AMI)
            .with_certificate("arn:aws:acm:us-east-1:123456789012:certificate/abc");
        let template = template("web", params).unwrap();
        let composition = Composer::standard().unwrap().compose(&template).unwrap();
        let document = composition.document();

        let http = document.resource("aws_lb_listener", "web_http").unwrap();
        assert_eq!(http["default_action"][0]["type"], "redirect");
        assert_eq!(http["default_action"][0]["redirect"]["protocol"], "HTTPS");

        let https = composition.reference("web_https").unwrap();
        assert_eq!(https.computed_bool("is_secure"), Some(true));
    }

    #[test]
    fn test_scaling_errors_surface_from_autoscaling_group() {
        let mut params = WebApplicationParams::new(AMI);
        params.min_size = 5;

        let template = template("web", params).unwrap();
        let err = Composer::standard().unwrap().compose(&template).unwrap_err();

        assert!(err.is_validation());
        assert!(matches!(
            err,
            ComposeError::Step { ref step, .. } if step == "web_asg"
        ));
    }
}
