//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. Underlying causes are shared
//! behind `Arc` so every error stays `Send + Sync` and cheap to move between
//! threads.

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::LifecycleHook;
use crate::plugin::PluginKind;

/// Shared, type-erased cause attached to lifecycle failures.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Errors arising from registry and lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// A live plugin is already registered under this name.
    #[error("plugin '{name}' is already registered")]
    DuplicateName {
        /// Name that was registered twice.
        name: String,
    },

    /// The requested plugin was not found in the registry.
    #[error("plugin '{name}' not found in registry")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The plugin previously failed and must be re-registered before use.
    #[error("plugin '{name}' has failed and is not ready; deregister and register it again")]
    NotReady {
        /// Plugin name.
        name: String,
    },

    /// The plugin is executing and cannot accept the call.
    #[error("plugin '{name}' is busy")]
    Busy {
        /// Plugin name.
        name: String,
    },

    /// Instantiation, configuration loading, or `initialize` failed.
    #[error("plugin '{name}' failed to initialise: {message}")]
    Initialization {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<SharedError>,
    },

    /// One of the execution hooks failed.
    #[error("plugin '{name}' failed during {hook}: {message}")]
    Execution {
        /// Plugin name.
        name: String,
        /// Hook that failed.
        hook: LifecycleHook,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<SharedError>,
    },

    /// A discovery candidate or the discovery root was rejected.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// A descriptor failed validation.
    #[error("invalid plugin descriptor: {message}")]
    InvalidDescriptor {
        /// Description of the validation failure.
        message: String,
    },

    /// A descriptor of the wrong kind was offered to a registry.
    #[error("plugin '{name}' is a {found} plugin but this registry holds {expected} plugins")]
    KindMismatch {
        /// Plugin name.
        name: String,
        /// Kind served by the registry.
        expected: PluginKind,
        /// Kind declared by the descriptor.
        found: PluginKind,
    },

    /// Registry bookkeeping failed.
    #[error("internal registry error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl PluginError {
    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_owned(),
        }
    }

    pub(crate) fn busy(name: &str) -> Self {
        Self::Busy {
            name: name.to_owned(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the plugin name the error refers to, when there is one.
    #[must_use]
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateName { name }
            | Self::NotFound { name }
            | Self::NotReady { name }
            | Self::Busy { name }
            | Self::Initialization { name, .. }
            | Self::Execution { name, .. }
            | Self::KindMismatch { name, .. } => Some(name.as_str()),
            Self::Discovery(error) => error.plugin_name(),
            Self::InvalidDescriptor { .. } | Self::Internal { .. } => None,
        }
    }
}

/// Errors raised while scanning a plugin directory.
///
/// Every variant except [`DiscoveryError::RootUnreadable`] concerns a single
/// candidate and never stops the scan of its siblings.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// The discovery root could not be listed.
    #[error("cannot read plugin directory '{path}': {source}")]
    RootUnreadable {
        /// Root that was scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A candidate directory or its main module could not be read.
    #[error("cannot read plugin '{name}' at '{path}': {source}")]
    Unreadable {
        /// Plugin name derived from the directory.
        name: String,
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A `*_plugin` directory whose name leaves no usable plugin name, either
    /// because nothing precedes the suffix or because it is not UTF-8.
    #[error("plugin directory '{}' does not name a plugin", path.display())]
    InvalidName {
        /// Offending directory.
        path: PathBuf,
    },

    /// The candidate directory has no main module.
    #[error("plugin '{name}' is missing its main module '{expected}'")]
    MissingMainModule {
        /// Plugin name derived from the directory.
        name: String,
        /// Path where the main module was expected.
        expected: PathBuf,
    },

    /// The main module is not valid or does not match the manifest schema.
    #[error("plugin '{name}' has an invalid main module '{path}': {message}")]
    InvalidManifest {
        /// Plugin name derived from the directory.
        name: String,
        /// Main module path.
        path: PathBuf,
        /// Parser or validation diagnostic.
        message: String,
    },

    /// No exported class name carries the registry's kind label.
    #[error("plugin '{name}' exports no class containing '{label}'")]
    NoMatchingClass {
        /// Plugin name derived from the directory.
        name: String,
        /// Kind label that was searched for.
        label: &'static str,
    },

    /// More than one exported class carries the registry's kind label.
    #[error("plugin '{name}' exports several candidate classes: {}", candidates.join(", "))]
    AmbiguousClass {
        /// Plugin name derived from the directory.
        name: String,
        /// The competing class names.
        candidates: Vec<String>,
    },

    /// The selected class has no factory in the factory table.
    #[error("plugin '{name}' names class '{class}' which has no registered factory")]
    UnknownClass {
        /// Plugin name derived from the directory.
        name: String,
        /// Class name that could not be resolved.
        class: String,
    },

    /// The plugin name is reserved for a system plugin.
    #[error("plugin name '{name}' is reserved for a system plugin")]
    ReservedName {
        /// Offending name.
        name: String,
    },
}

impl DiscoveryError {
    /// Returns the plugin name of the rejected candidate, if any.
    #[must_use]
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::RootUnreadable { .. } | Self::InvalidName { .. } => None,
            Self::Unreadable { name, .. }
            | Self::MissingMainModule { name, .. }
            | Self::InvalidManifest { name, .. }
            | Self::NoMatchingClass { name, .. }
            | Self::AmbiguousClass { name, .. }
            | Self::UnknownClass { name, .. }
            | Self::ReservedName { name } => Some(name.as_str()),
        }
    }
}

#[cfg(test)]
mod tests;
