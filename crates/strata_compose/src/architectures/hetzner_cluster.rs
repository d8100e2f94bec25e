//! A cluster of Hetzner Cloud servers on a private network.
//!
//! Every server joins the network and sits behind one firewall that opens
//! HTTP and HTTPS to everyone and SSH to `allow_ssh_from` only.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strata_synth::Output;

use super::{bind, label};
use crate::error::{ComposeError, ComposeResult};
use crate::template::{References, Template};

const ANYWHERE: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// Parameters of the `hetzner_cluster` architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HetznerClusterParams {
    #[serde(default = "default_network_cidr")]
    pub network_cidr: String,
    #[serde(default = "default_server_count")]
    pub server_count: usize,
    #[serde(default = "default_server_type")]
    pub server_type: String,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    /// Source ranges allowed to reach port 22. Empty closes SSH.
    #[serde(default)]
    pub allow_ssh_from: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

fn default_network_cidr() -> String {
    "10.10.0.0/16".to_string()
}

fn default_server_count() -> usize {
    3
}

fn default_server_type() -> String {
    "cx22".to_string()
}

fn default_image() -> String {
    "ubuntu-24.04".to_string()
}

fn default_location() -> String {
    "nbg1".to_string()
}

impl Default for HetznerClusterParams {
    fn default() -> Self {
        Self {
            network_cidr: default_network_cidr(),
            server_count: default_server_count(),
            server_type: default_server_type(),
            image: default_image(),
            location: default_location(),
            ssh_keys: Vec::new(),
            allow_ssh_from: Vec::new(),
            labels: BTreeMap::new(),
        }
    }
}

struct HetznerCluster {
    prefix: String,
    params: HetznerClusterParams,
    network: String,
    firewall: String,
}

impl HetznerCluster {
    fn labels(&self) -> Value {
        let mut labels = self.params.labels.clone();
        labels.insert("cluster".to_string(), label(&self.prefix));
        json!(labels)
    }

    fn network_config(&self, _refs: &References) -> ComposeResult<Value> {
        Ok(json!({
            "name": format!("{}-net", label(&self.prefix)),
            "ip_range": self.params.network_cidr,
            "labels": self.labels(),
        }))
    }

    fn firewall_config(&self, _refs: &References) -> ComposeResult<Value> {
        let mut rules = vec![
            json!({"direction": "in", "protocol": "tcp", "port": "80", "source_ips": ANYWHERE}),
            json!({"direction": "in", "protocol": "tcp", "port": "443", "source_ips": ANYWHERE}),
        ];
        if !self.params.allow_ssh_from.is_empty() {
            rules.push(json!({
                "direction": "in",
                "protocol": "tcp",
                "port": "22",
                "source_ips": self.params.allow_ssh_from,
                "description": "SSH",
            }));
        }
        Ok(json!({
            "name": format!("{}-fw", label(&self.prefix)),
            "rules": rules,
            "labels": self.labels(),
        }))
    }

    fn server_config(&self, index: usize, refs: &References) -> ComposeResult<Value> {
        let mut config = json!({
            "name": format!("{}-{}", label(&self.prefix), index),
            "server_type": self.params.server_type,
            "image": self.params.image,
            "location": self.params.location,
            "firewall_ids": [refs.output(&self.firewall, "id")?],
            "network": [{"network_id": refs.output(&self.network, "id")?}],
            "labels": self.labels(),
        });
        if !self.params.ssh_keys.is_empty() {
            config["ssh_keys"] = json!(self.params.ssh_keys);
        }
        Ok(config)
    }
}

fn server_name(prefix: &str, index: usize) -> String {
    format!("{}_server_{}", prefix, index)
}

/// Expand `hetzner_cluster` under the instance prefix `prefix`.
pub fn template(prefix: &str, params: HetznerClusterParams) -> ComposeResult<Template> {
    if params.server_count == 0 {
        return Err(ComposeError::InvalidParameters {
            architecture: "hetzner_cluster".to_string(),
            message: "server_count must be at least 1".to_string(),
        });
    }

    let count = params.server_count;
    let cluster = Arc::new(HetznerCluster {
        prefix: prefix.to_string(),
        network: format!("{}_network", prefix),
        firewall: format!("{}_firewall", prefix),
        params,
    });

    let mut template = Template::new(format!("hetzner_cluster:{}", prefix))
        .step("hcloud_network", cluster.network.clone(), bind(&cluster, HetznerCluster::network_config))
        .step("hcloud_firewall", cluster.firewall.clone(), bind(&cluster, HetznerCluster::firewall_config));

    for index in 1..=count {
        template = template.step(
            "hcloud_server",
            server_name(prefix, index),
            bind(&cluster, move |c: &HetznerCluster, refs: &References| c.server_config(index, refs)),
        );
    }

    let servers: Vec<String> = (1..=count).map(|i| server_name(prefix, i)).collect();
    let costed = servers.clone();
    Ok(template
        .output(format!("{}_server_ipv4", prefix), move |refs| {
            let addresses = servers
                .iter()
                .map(|s| refs.output(s, "ipv4_address"))
                .collect::<ComposeResult<Vec<_>>>()?;
            Ok(Output::new(addresses).with_description("Public IPv4 addresses"))
        })
        .output(format!("{}_monthly_cost", prefix), move |refs| {
            let mut total = 0.0;
            for server in &costed {
                total += refs
                    .get_required(server)?
                    .computed_f64("estimated_monthly_cost")
                    .unwrap_or(0.0);
            }
            Ok(Output::new(strata_resources::pricing::round_cents(total))
                .with_description("Estimated monthly server cost in EUR"))
        }))
}
