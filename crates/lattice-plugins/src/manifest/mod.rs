//! Main module manifests describing what a plugin directory exports.
//!
//! Every plugin directory carries a main module named after the directory,
//! for example `memory_plugin/memory_plugin.yml`. The main module is plain
//! data: it lists the class names the plugin exports plus optional metadata.
//! Class names are resolved against a
//! [`FactoryTable`](crate::FactoryTable); the manifest never names code to
//! load.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;
use crate::plugin::PluginKind;

/// File extension of main modules and defaults files.
pub const MANIFEST_EXTENSION: &str = "yml";

/// Name of the optional per-plugin defaults file.
pub const DEFAULTS_FILE: &str = "defaults.yml";

/// Parsed contents of a plugin's main module.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use lattice_plugins::{ModuleManifest, PluginKind};
///
/// let manifest = ModuleManifest::parse(
///     "memory",
///     Path::new("memory_plugin/memory_plugin.yml"),
///     "classes: [MemoryTransport, Helper]\nversion: 0.3.1\n",
/// )
/// .unwrap();
///
/// assert_eq!(manifest.version(), Some("0.3.1"));
/// assert_eq!(
///     manifest.select_class("memory", PluginKind::Transport).unwrap(),
///     "MemoryTransport",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
    classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl ModuleManifest {
    /// Creates a manifest exporting `classes`.
    #[must_use]
    pub const fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            version: None,
            description: None,
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reads and parses the main module at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Unreadable`] when the file cannot be read
    /// and [`DiscoveryError::InvalidManifest`] when it does not parse or
    /// validate.
    pub fn load(name: &str, path: &Path) -> Result<Self, DiscoveryError> {
        let text = fs::read_to_string(path).map_err(|source| DiscoveryError::Unreadable {
            name: name.to_owned(),
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::parse(name, path, &text)
    }

    /// Parses main module text, attributing errors to `name` and `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidManifest`] for malformed YAML,
    /// unknown keys, an empty class list, or a blank class name.
    pub fn parse(name: &str, path: &Path, text: &str) -> Result<Self, DiscoveryError> {
        let invalid = |message: String| DiscoveryError::InvalidManifest {
            name: name.to_owned(),
            path: path.to_path_buf(),
            message,
        };
        let manifest: Self =
            serde_saphyr::from_str(text).map_err(|error| invalid(error.to_string()))?;
        manifest.validate().map_err(invalid)?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err(String::from("'classes' must list at least one class"));
        }
        if let Some(bad) = self
            .classes
            .iter()
            .find(|class| class.is_empty() || class.chars().any(char::is_whitespace))
        {
            return Err(format!("class name {bad:?} is not a valid identifier"));
        }
        Ok(())
    }

    /// Picks the single exported class whose name contains the kind label.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NoMatchingClass`] when no class carries the
    /// label and [`DiscoveryError::AmbiguousClass`] when several do.
    pub fn select_class(&self, name: &str, kind: PluginKind) -> Result<&str, DiscoveryError> {
        let label = kind.class_label();
        let mut matches = self
            .classes
            .iter()
            .filter(|class| class.contains(label));
        match (matches.next(), matches.next()) {
            (Some(class), None) => Ok(class.as_str()),
            (None, _) => Err(DiscoveryError::NoMatchingClass {
                name: name.to_owned(),
                label,
            }),
            (Some(first), Some(second)) => {
                let candidates = [first, second]
                    .into_iter()
                    .chain(matches)
                    .cloned()
                    .collect();
                Err(DiscoveryError::AmbiguousClass {
                    name: name.to_owned(),
                    candidates,
                })
            }
        }
    }

    /// Returns the exported class names.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Returns the declared version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the declared description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
