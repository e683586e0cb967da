//! Plugin descriptors and the factories that build plugin instances.
//!
//! A [`PluginDescriptor`] identifies a plugin before it is instantiated. The
//! instance itself is produced by a [`PluginFactory`], a typed constructor
//! compiled into the host. Discovery resolves on-disk class names to
//! factories through a [`FactoryTable`], so nothing found on disk is ever
//! executed as code.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PluginError;
use crate::plugin::{Plugin, PluginKind};

type BuildFn = dyn Fn() -> Box<dyn Plugin> + Send + Sync;

/// Typed constructor for plugin instances.
///
/// # Example
///
/// ```
/// use lattice_plugins::PluginFactory;
/// use lattice_plugins::builtin::EchoTransportPlugin;
///
/// let factory = PluginFactory::of::<EchoTransportPlugin>();
/// let _instance = factory.build();
/// ```
#[derive(Clone)]
pub struct PluginFactory {
    build: Arc<BuildFn>,
}

impl PluginFactory {
    /// Wraps a closure producing plugin instances.
    pub fn new<F, P>(build: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: Plugin + 'static,
    {
        Self {
            build: Arc::new(move || Box::new(build()) as Box<dyn Plugin>),
        }
    }

    /// Factory for a plugin type with a [`Default`] constructor.
    #[must_use]
    pub fn of<P>() -> Self
    where
        P: Plugin + Default + 'static,
    {
        Self::new(P::default)
    }

    /// Builds a fresh instance.
    #[must_use]
    pub fn build(&self) -> Box<dyn Plugin> {
        (self.build)()
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PluginFactory(..)")
    }
}

/// Explicit mapping from class names to factories.
///
/// The table is the only way a discovered plugin can become an instance: a
/// main module names a class and the scanner looks it up here.
#[derive(Debug, Clone, Default)]
pub struct FactoryTable {
    factories: BTreeMap<String, PluginFactory>,
}

impl FactoryTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory, returning the one it replaced.
    pub fn insert(
        &mut self,
        class: impl Into<String>,
        factory: PluginFactory,
    ) -> Option<PluginFactory> {
        self.factories.insert(class.into(), factory)
    }

    /// Builder-style [`FactoryTable::insert`].
    #[must_use]
    pub fn with(mut self, class: impl Into<String>, factory: PluginFactory) -> Self {
        self.insert(class, factory);
        self
    }

    /// Looks up the factory for `class`.
    #[must_use]
    pub fn get(&self, class: &str) -> Option<&PluginFactory> {
        self.factories.get(class)
    }

    /// Iterates over the registered class names in lexical order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Returns the number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` when no classes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Identity and constructor of a plugin, prior to instantiation.
///
/// Descriptors are immutable once built; registries own them.
///
/// # Example
///
/// ```
/// use lattice_plugins::{PluginDescriptor, PluginFactory, PluginKind};
/// use lattice_plugins::builtin::EchoTransportPlugin;
///
/// let descriptor = PluginDescriptor::new(
///     "echo",
///     PluginKind::Transport,
///     PluginFactory::of::<EchoTransportPlugin>(),
/// )
/// .with_version("1.0.0");
///
/// assert_eq!(descriptor.name(), "echo");
/// assert!(descriptor.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    name: String,
    kind: PluginKind,
    factory: PluginFactory,
    class: Option<String>,
    source: Option<PathBuf>,
    defaults: Option<PathBuf>,
    version: Option<String>,
    description: Option<String>,
}

impl PluginDescriptor {
    /// Creates a descriptor with no on-disk origin.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PluginKind, factory: PluginFactory) -> Self {
        Self {
            name: name.into(),
            kind,
            factory,
            class: None,
            source: None,
            defaults: None,
            version: None,
            description: None,
        }
    }

    /// Records the class name the factory was resolved from.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Records the plugin directory.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Records the defaults file loaded as baseline configuration.
    #[must_use]
    pub fn with_defaults(mut self, defaults: impl Into<PathBuf>) -> Self {
        self.defaults = Some(defaults.into());
        self
    }

    /// Records the plugin version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Records a one-line description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDescriptor`] when the name is empty or
    /// contains characters other than ASCII letters, digits, `_`, and `-`.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.is_empty() {
            return Err(PluginError::InvalidDescriptor {
                message: String::from("plugin name must not be empty"),
            });
        }
        if let Some(bad) = self
            .name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(PluginError::InvalidDescriptor {
                message: format!(
                    "plugin name '{}' contains invalid character {bad:?}",
                    self.name
                ),
            });
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin kind.
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Returns the factory.
    #[must_use]
    pub const fn factory(&self) -> &PluginFactory {
        &self.factory
    }

    /// Returns the class name the factory was resolved from.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Returns the plugin directory.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Returns the defaults file path.
    #[must_use]
    pub fn defaults(&self) -> Option<&Path> {
        self.defaults.as_deref()
    }

    /// Returns the plugin version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
