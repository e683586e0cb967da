//! Safe YAML loading for plugin configuration blobs.
//!
//! Configuration files are parsed with `serde-saphyr` into plain JSON values.
//! Nothing in a file can name a type to construct, so loading untrusted
//! configuration never executes code. Typed access goes through
//! [`PluginConfig::deserialize`](crate::PluginConfig::deserialize), which
//! applies the plugin's own schema.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ortho_config::OrthoError;
use serde_json::Value;
use thiserror::Error;

/// Key-value mapping produced by configuration loading.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The file is not valid YAML or does not match the expected schema.
    #[error("failed to parse configuration '{path}': {message}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// The document parsed but its top level is not a mapping.
    #[error("configuration '{path}' must contain a mapping at the top level, found {found}")]
    NotAMapping {
        /// Path that was parsed.
        path: PathBuf,
        /// Description of the value that was found instead.
        found: &'static str,
    },

    /// A settings layer could not be read or did not fit the schema.
    #[error(transparent)]
    Load(Arc<OrthoError>),

    /// A configuration blob did not match the schema requested by a plugin.
    #[error("configuration does not match the expected schema: {message}")]
    Schema {
        /// Deserialiser diagnostic.
        message: String,
    },
}

/// Loads a YAML configuration file into a key-value mapping.
///
/// An empty document or an explicit YAML null yields an empty mapping.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] when the file cannot be read,
/// [`ConfigError::Parse`] for malformed YAML, and
/// [`ConfigError::NotAMapping`] when the document is a scalar or sequence.
pub fn load_config(path: &Path) -> Result<ConfigMap, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    parse_config(path, &text)
}

/// Parses YAML text into a key-value mapping, attributing errors to `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed YAML and
/// [`ConfigError::NotAMapping`] when the document is not a mapping.
pub fn parse_config(path: &Path, text: &str) -> Result<ConfigMap, ConfigError> {
    if text.trim().is_empty() {
        return Ok(ConfigMap::new());
    }
    let value: Value = serde_saphyr::from_str(text).map_err(|error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ConfigMap::new()),
        other => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
            found: value_kind(&other),
        }),
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Collaborator that turns a configuration path into a mapping.
///
/// The registry calls the loader once per plugin initialisation with the
/// plugin's defaults file. Tests substitute doubles to observe calls or to
/// inject failures.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed.
    fn load(&self, path: &Path) -> Result<ConfigMap, ConfigError>;
}

/// Loader that reads YAML files from disk with [`load_config`].
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlConfigLoader;

impl ConfigLoader for YamlConfigLoader {
    fn load(&self, path: &Path) -> Result<ConfigMap, ConfigError> {
        load_config(path)
    }
}
