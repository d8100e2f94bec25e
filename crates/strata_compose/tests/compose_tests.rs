//! Integration tests for template composition.

use std::fs;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::tempdir;

use strata_compose::{ComposeError, Composer, Template, TemplateFile};
use strata_resources::{PricingCatalog, PricingOverrides};

fn composer() -> Composer {
    Composer::standard().unwrap()
}

#[test]
fn test_placeholder_embedded_verbatim() {
    let template = Template::new("alb")
        .step("aws_security_group", "alb", |_| {
            Ok(json!({"name": "alb", "vpc_id": "vpc-0123456789abcdef0"}))
        })
        .step("aws_lb", "front", |refs| {
            Ok(json!({
                "name": "front",
                "security_groups": [refs.output("alb", "id")?],
                "subnets": ["subnet-a", "subnet-b"]
            }))
        });

    let composition = composer().compose(&template).unwrap();
    let document = composition.document().to_value().unwrap();

    assert_eq!(
        document["resource"]["aws_lb"]["front"]["security_groups"],
        json!(["${aws_security_group.alb.id}"])
    );
}

#[test]
fn test_failure_aborts_composition() {
    let template = Template::new("broken")
        .step("aws_vpc", "main", |_| Ok(json!({"cidr_block": "10.0.0.0/16"})))
        .step("aws_autoscaling_group", "app", |_| {
            Ok(json!({
                "min_size": 5,
                "max_size": 3,
                "availability_zones": ["us-east-1a"],
                "launch_template": {"name": "app"}
            }))
        })
        .step("aws_s3_bucket", "never", |_| Ok(json!({"bucket": "never-built"})));

    let err = composer().compose(&template).unwrap_err();

    assert!(err.is_validation());
    match &err {
        ComposeError::Step { step, resource_type, .. } => {
            assert_eq!(step, "app");
            assert_eq!(resource_type, "aws_autoscaling_group");
        }
        other => panic!("expected a step error, got {:?}", other),
    }
    let message = err.root().to_string();
    assert!(message.contains("min_size (5) cannot be greater than max_size (3)"));
}

#[test]
fn test_config_fn_error_stops_before_build() {
    let template = Template::new("refs").step("aws_subnet", "a", |refs| {
        Ok(json!({"vpc_id": refs.output("missing", "id")?, "cidr_block": "10.0.1.0/24"}))
    });

    let err = composer().compose(&template).unwrap_err();
    assert!(matches!(err.root(), ComposeError::UnknownReference { .. }));
    assert!(!err.is_validation());
}

#[test]
fn test_pricing_reaches_computed_properties() {
    let pricing = PricingCatalog::builtin().with_overrides(PricingOverrides {
        hcloud_server_monthly: [("cx22".to_string(), 10.0)].into_iter().collect(),
        ..Default::default()
    });
    let built = composer()
        .with_pricing(pricing)
        .resource(
            "hcloud_server",
            "web",
            &json!({"name": "web", "server_type": "cx22", "image": "ubuntu-24.04"}),
        )
        .unwrap();

    assert_eq!(built.reference.computed_f64("estimated_monthly_cost"), Some(10.0));
}

#[test]
fn test_yaml_file_with_architecture() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cluster.yaml");
    fs::write(
        &path,
        r#"
name: cluster
architectures:
  - kind: hetzner_cluster
    name: edge
    params:
      server_count: 2
      allow_ssh_from: ["203.0.113.0/24"]
resources:
  - type: cloudflare_record
    name: www
    config:
      zone_id: "0123456789abcdef0123456789abcdef"
      name: www
      type: A
      content: "{{ edge_server_1.ipv4_address }}"
      proxied: true
outputs:
  www:
    value: "{{ www.hostname }}"
"#,
    )
    .unwrap();

    let template = TemplateFile::load(&path).unwrap().into_template().unwrap();
    assert_eq!(template.len(), 5);

    let composition = composer().compose(&template).unwrap();
    let document = composition.document();

    let record = document.resource("cloudflare_record", "www").unwrap();
    assert_eq!(record["content"], "${hcloud_server.edge_server_1.ipv4_address}");
    assert!(document.output("edge_server_ipv4").is_some());
    assert_eq!(
        document.output("www").map(|o| o.value.clone()),
        Some(json!("${cloudflare_record.www.hostname}"))
    );

    let firewall = composition.reference("edge_firewall").unwrap();
    assert_eq!(firewall.computed_bool("allows_public_ssh"), Some(false));
}

#[test]
fn test_json_file_with_web_application() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("web.json");
    let file = json!({
        "name": "shop",
        "architectures": [{
            "kind": "web_application",
            "name": "shop",
            "params": {"ami": "ami-0abcdef1234567890", "instance_type": "t3.small"}
        }]
    });
    fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();

    let template = TemplateFile::load(&path).unwrap().into_template().unwrap();
    let composition = composer().compose(&template).unwrap();
    let rendered: Value = serde_json::from_str(&composition.to_json_pretty().unwrap()).unwrap();

    assert_eq!(
        rendered["output"]["shop_alb_dns_name"]["value"],
        json!("${aws_lb.shop_alb.dns_name}")
    );
    assert_eq!(
        rendered["resource"]["aws_autoscaling_group"]["shop_asg"]["launch_template"]["id"],
        json!("${aws_launch_template.shop_lt.id}")
    );
    assert_eq!(
        rendered["resource"]["aws_launch_template"]["shop_lt"]["instance_type"],
        json!("t3.small")
    );
}

#[test]
fn test_load_rejects_unknown_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("template.txt");
    fs::write(&path, "name: x").unwrap();

    let err = TemplateFile::load(&path).unwrap_err();
    assert!(matches!(err, ComposeError::InvalidTemplate { .. }));
}

#[test]
fn test_load_rejects_empty_template() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.yaml");
    fs::write(&path, "name: empty\n").unwrap();

    let err = TemplateFile::load(&path).unwrap_err();
    assert!(err.to_string().contains("defines no architectures or resources"));
}
