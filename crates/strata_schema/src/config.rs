//! Validated configuration and typed attribute access.

use serde::Serialize;
use serde_json::{Map, Value};

/// Typed read access to a JSON object's attributes.
///
/// `null` values are treated the same as absent keys.
pub trait Attributes {
    fn attr(&self, key: &str) -> Option<&Value>;

    fn has(&self, key: &str) -> bool {
        self.attr(key).is_some_and(|v| !v.is_null())
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(Value::as_str)
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(Value::as_i64)
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.attr(key).and_then(Value::as_f64)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.attr(key).and_then(Value::as_bool)
    }

    fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.attr(key).and_then(Value::as_array)
    }

    fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.attr(key).and_then(Value::as_object)
    }

    /// Array of strings, skipping non-string elements.
    fn get_strings(&self, key: &str) -> Vec<&str> {
        self.get_array(key)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl Attributes for Map<String, Value> {
    fn attr(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}

/// A configuration that passed schema validation.
///
/// Keys are canonical, defaults are applied and unknown keys are handled.
/// Instances only come out of [`crate::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedConfig(Map<String, Value>);

impl ValidatedConfig {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Attributes for ValidatedConfig {
    fn attr(&self, key: &str) -> Option<&Value> {
        self.0.attr(key)
    }
}
