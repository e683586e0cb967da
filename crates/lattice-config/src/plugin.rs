//! Per-plugin configuration blobs handed to `initialize`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::loader::{ConfigError, ConfigMap};

/// Settings supplied to a plugin when it is initialised.
///
/// A blob is built from the plugin's defaults file with the host's
/// per-plugin overrides layered on top. Nested mappings merge key by key;
/// any other value in the overlay replaces the baseline value outright.
///
/// # Example
///
/// ```
/// use lattice_config::{ConfigMap, PluginConfig};
/// use serde_json::json;
///
/// let mut defaults = ConfigMap::new();
/// defaults.insert("retries".into(), json!(3));
/// let mut overrides = ConfigMap::new();
/// overrides.insert("retries".into(), json!(5));
///
/// let config = PluginConfig::layered(defaults, &overrides);
/// assert_eq!(config.get("retries"), Some(&json!(5)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfig {
    values: ConfigMap,
}

impl PluginConfig {
    /// Wraps an existing mapping.
    #[must_use]
    pub const fn new(values: ConfigMap) -> Self {
        Self { values }
    }

    /// Builds a blob from `baseline` with `overlay` merged on top.
    #[must_use]
    pub fn layered(mut baseline: ConfigMap, overlay: &ConfigMap) -> Self {
        merge_into(&mut baseline, overlay);
        Self { values: baseline }
    }

    /// Looks up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Looks up a top-level key holding a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Returns the underlying mapping.
    #[must_use]
    pub const fn as_map(&self) -> &ConfigMap {
        &self.values
    }

    /// Returns `true` when no settings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deserialises the blob into a plugin-defined settings type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when the blob does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(|error| {
            ConfigError::Schema {
                message: error.to_string(),
            }
        })
    }
}

impl From<ConfigMap> for PluginConfig {
    fn from(values: ConfigMap) -> Self {
        Self::new(values)
    }
}

fn merge_into(target: &mut ConfigMap, overlay: &ConfigMap) {
    for (key, value) in overlay {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn overlay_wins_for_scalars() {
        let config = PluginConfig::layered(
            map(json!({ "network": "test", "retries": 3 })),
            &map(json!({ "network": "finney" })),
        );
        assert_eq!(config.get_str("network"), Some("finney"));
        assert_eq!(config.get("retries"), Some(&json!(3)));
    }

    #[test]
    fn nested_mappings_merge_key_by_key() {
        let config = PluginConfig::layered(
            map(json!({ "endpoint": { "host": "localhost", "port": 9944 } })),
            &map(json!({ "endpoint": { "port": 443 } })),
        );
        assert_eq!(
            config.get("endpoint"),
            Some(&json!({ "host": "localhost", "port": 443 }))
        );
    }

    #[test]
    fn empty_overlay_keeps_baseline() {
        let baseline = map(json!({ "a": 1 }));
        let config = PluginConfig::layered(baseline.clone(), &ConfigMap::new());
        assert_eq!(config.as_map(), &baseline);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct EndpointSettings {
        host: String,
        port: u16,
    }

    #[test]
    fn deserialize_applies_plugin_schema() {
        let config = PluginConfig::new(map(json!({ "host": "localhost", "port": 9944 })));
        let settings: EndpointSettings = config.deserialize().expect("schema matches");
        assert_eq!(
            settings,
            EndpointSettings {
                host: "localhost".into(),
                port: 9944,
            }
        );
    }

    #[test]
    fn deserialize_rejects_schema_mismatch() {
        let config = PluginConfig::new(map(json!({ "host": "localhost", "port": "high" })));
        let err = config
            .deserialize::<EndpointSettings>()
            .expect_err("port is not a number");
        assert!(matches!(err, ConfigError::Schema { .. }), "got {err}");
    }
}
