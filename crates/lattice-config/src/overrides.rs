//! Per-plugin override directives.
//!
//! A directive has the form `<plugin>.<key>=<value>`. Dotted keys address
//! nested mappings, so `relay.retry.limit=5` yields `{"retry": {"limit": 5}}`
//! for the `relay` plugin. Values are read as JSON where possible and fall
//! back to plain strings, so `prefix=cfg:` needs no quoting.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::loader::ConfigMap;

/// Errors produced when parsing a [`PluginOverride`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginOverrideParseError {
    /// The `=` separating the target from its value was missing.
    #[error("override '{0}' is missing the value assignment '='")]
    MissingValue(String),
    /// The target did not name both a plugin and a key.
    #[error("override '{0}' must name a plugin and a key as '<plugin>.<key>'")]
    MissingKey(String),
    /// A segment of the dotted key was empty.
    #[error("override '{0}' contains an empty key segment")]
    EmptySegment(String),
}

/// A single `<plugin>.<key>=<value>` override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginOverride {
    plugin: String,
    key: String,
    value: Value,
    raw: String,
}

impl PluginOverride {
    /// Plugin the override applies to.
    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Dotted key inside the plugin's configuration.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Parsed value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for PluginOverride {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}={}", self.plugin, self.key, self.raw)
    }
}

impl FromStr for PluginOverride {
    type Err = PluginOverrideParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (target, raw) = input
            .split_once('=')
            .ok_or_else(|| PluginOverrideParseError::MissingValue(input.to_owned()))?;
        let (plugin, key) = target
            .split_once('.')
            .filter(|(plugin, key)| !plugin.is_empty() && !key.is_empty())
            .ok_or_else(|| PluginOverrideParseError::MissingKey(input.to_owned()))?;
        if key.split('.').any(str::is_empty) {
            return Err(PluginOverrideParseError::EmptySegment(input.to_owned()));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
        Ok(Self {
            plugin: plugin.to_owned(),
            key: key.to_owned(),
            value,
            raw: raw.to_owned(),
        })
    }
}

impl TryFrom<String> for PluginOverride {
    type Error = PluginOverrideParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PluginOverride> for String {
    fn from(directive: PluginOverride) -> Self {
        directive.to_string()
    }
}

/// Folds directives into one mapping per plugin.
///
/// Later directives win when two address the same key.
#[must_use]
pub fn overrides_by_plugin<'a, I>(directives: I) -> BTreeMap<String, ConfigMap>
where
    I: IntoIterator<Item = &'a PluginOverride>,
{
    let mut grouped: BTreeMap<String, ConfigMap> = BTreeMap::new();
    for directive in directives {
        let map = grouped.entry(directive.plugin.clone()).or_default();
        insert_nested(map, &directive.key, directive.value.clone());
    }
    grouped
}

fn insert_nested(map: &mut ConfigMap, key: &str, value: Value) {
    if let Some((head, rest)) = key.split_once('.') {
        let slot = map
            .entry(head.to_owned())
            .or_insert_with(|| Value::Object(ConfigMap::new()));
        if !slot.is_object() {
            *slot = Value::Object(ConfigMap::new());
        }
        if let Value::Object(inner) = slot {
            insert_nested(inner, rest, value);
        }
        return;
    }
    map.insert(key.to_owned(), value);
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn directive(text: &str) -> PluginOverride {
        text.parse().expect("directive should parse")
    }

    #[rstest]
    #[case::number("relay.retries=5", json!(5))]
    #[case::boolean("relay.verbose=true", json!(true))]
    #[case::plain_text("relay.prefix=cfg:", json!("cfg:"))]
    #[case::quoted("relay.prefix=\"42\"", json!("42"))]
    #[case::empty("relay.prefix=", json!(""))]
    fn values_prefer_json(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(directive(text).value(), &expected);
    }

    #[rstest]
    #[case::no_assignment("relay.prefix")]
    #[case::no_key("relay=1")]
    #[case::empty_plugin(".prefix=1")]
    fn malformed_directives_are_rejected(#[case] text: &str) {
        assert!(text.parse::<PluginOverride>().is_err(), "{text} parsed");
    }

    #[test]
    fn empty_nested_segment_is_rejected() {
        let error = "relay.retry..limit=1"
            .parse::<PluginOverride>()
            .expect_err("empty segment must fail");
        assert!(matches!(error, PluginOverrideParseError::EmptySegment(_)));
    }

    #[test]
    fn dotted_keys_build_nested_mappings() {
        let directives = [
            directive("relay.retry.limit=5"),
            directive("relay.retry.backoff=fixed"),
            directive("mirror.prefix=m:"),
        ];
        let grouped = overrides_by_plugin(&directives);

        assert_eq!(
            Value::Object(grouped["relay"].clone()),
            json!({"retry": {"limit": 5, "backoff": "fixed"}})
        );
        assert_eq!(Value::Object(grouped["mirror"].clone()), json!({"prefix": "m:"}));
    }

    #[test]
    fn later_directives_win() {
        let directives = [directive("relay.prefix=a"), directive("relay.prefix=b")];
        let grouped = overrides_by_plugin(&directives);
        assert_eq!(grouped["relay"].get("prefix"), Some(&json!("b")));
    }

    #[test]
    fn display_keeps_the_original_value_text() {
        assert_eq!(directive("relay.prefix=\"x\"").to_string(), "relay.prefix=\"x\"");
    }
}
