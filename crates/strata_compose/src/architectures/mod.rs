//! Architecture templates.
//!
//! An architecture expands into a [`Template`] whose instance names all
//! start with the architecture instance's name, so several instances can
//! share one composition.

pub mod hetzner_cluster;
pub mod web_application;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{ComposeError, ComposeResult};
use crate::template::{References, Template};

pub use hetzner_cluster::HetznerClusterParams;
pub use web_application::WebApplicationParams;

/// Architectures known to [`expand`].
pub const NAMES: &[&str] = &["hetzner_cluster", "web_application"];

/// Expand the architecture `kind` under the instance prefix `name`.
pub fn expand(kind: &str, name: &str, params: Value) -> ComposeResult<Template> {
    match kind {
        "web_application" => web_application::template(name, parse_params(kind, params)?),
        "hetzner_cluster" => hetzner_cluster::template(name, parse_params(kind, params)?),
        other => Err(ComposeError::UnknownArchitecture(other.to_string())),
    }
}

fn parse_params<T: DeserializeOwned>(architecture: &str, params: Value) -> ComposeResult<T> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| ComposeError::InvalidParameters {
        architecture: architecture.to_string(),
        message: e.to_string(),
    })
}

/// Step config closure calling a method on shared architecture state.
pub(crate) fn bind<T, F>(state: &Arc<T>, f: F) -> impl Fn(&References) -> ComposeResult<Value> + Send + Sync + 'static
where
    T: Send + Sync + 'static,
    F: Fn(&T, &References) -> ComposeResult<Value> + Send + Sync + 'static,
{
    let state = Arc::clone(state);
    move |refs| f(&state, refs)
}

/// `base` plus a `Name` tag.
pub(crate) fn name_tags(base: &BTreeMap<String, String>, name: &str) -> Value {
    let mut tags = base.clone();
    tags.insert("Name".to_string(), name.to_string());
    json!(tags)
}

/// Instance prefix turned into a hostname-safe label.
pub(crate) fn label(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}
