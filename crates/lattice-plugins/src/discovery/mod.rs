//! Filesystem discovery of plugin directories.
//!
//! A discovery root holds one directory per plugin, named `<name>_plugin`.
//! Inside, the main module `<name>_plugin.yml` lists the exported classes and
//! an optional `defaults.yml` supplies baseline configuration:
//!
//! ```text
//! transports/
//! ├── memory_plugin/
//! │   ├── memory_plugin.yml
//! │   └── defaults.yml
//! └── README.md          (ignored)
//! ```
//!
//! A directory carrying the suffix but no usable name (`_plugin` itself, or
//! a name that is not UTF-8) is reported as an error, not skipped.
//!
//! The root is listed once and sorted by name. Candidates are then evaluated
//! lazily as the [`Scan`] iterator is advanced, so a broken candidate yields
//! an error item without disturbing its siblings.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::vec;

use tracing::{debug, warn};

use crate::descriptor::{FactoryTable, PluginDescriptor};
use crate::error::DiscoveryError;
use crate::manifest::{DEFAULTS_FILE, MANIFEST_EXTENSION, ModuleManifest};
use crate::plugin::PluginKind;

const DISCOVERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::discovery");

/// Suffix identifying plugin directories.
pub const PLUGIN_DIR_SUFFIX: &str = "_plugin";

/// Walks discovery roots and turns plugin directories into descriptors.
///
/// # Example
///
/// ```
/// use lattice_plugins::{FactoryTable, PluginKind, Scanner};
///
/// let root = tempfile::tempdir().unwrap();
/// let plugin = root.path().join("echo2_plugin");
/// std::fs::create_dir(&plugin).unwrap();
/// std::fs::write(plugin.join("echo2_plugin.yml"), "classes: [EchoTransportPlugin]\n").unwrap();
///
/// let scanner = Scanner::new(FactoryTable::with_builtins());
/// let found: Vec<_> = scanner
///     .scan(root.path(), PluginKind::Transport)
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(found[0].name(), "echo2");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    factories: FactoryTable,
    reserved: BTreeSet<String>,
}

impl Scanner {
    /// Creates a scanner resolving classes through `factories`.
    #[must_use]
    pub fn new(factories: FactoryTable) -> Self {
        Self {
            factories,
            reserved: BTreeSet::new(),
        }
    }

    /// Reserves names that discovered plugins may not claim.
    #[must_use]
    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    /// Returns the factory table.
    #[must_use]
    pub const fn factories(&self) -> &FactoryTable {
        &self.factories
    }

    /// Returns `true` when `name` is reserved.
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Lists `root` and returns an iterator over its plugin candidates.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::RootUnreadable`] when `root` cannot be
    /// listed.
    pub fn scan(&self, root: &Path, kind: PluginKind) -> Result<Scan<'_>, DiscoveryError> {
        let entries = fs::read_dir(root).map_err(|source| DiscoveryError::RootUnreadable {
            path: root.to_path_buf(),
            source: Arc::new(source),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(error) => warn!(
                    target: DISCOVERY_TARGET,
                    root = %root.display(),
                    %error,
                    "skipping unreadable directory entry"
                ),
            }
        }
        paths.sort();

        debug!(
            target: DISCOVERY_TARGET,
            root = %root.display(),
            kind = kind.as_str(),
            entries = paths.len(),
            "scanning plugin directory"
        );

        Ok(Scan {
            scanner: self,
            kind,
            paths: paths.into_iter(),
        })
    }

    /// Evaluates one directory entry. `None` means the entry is not a plugin
    /// candidate at all.
    fn evaluate(
        &self,
        path: &Path,
        kind: PluginKind,
    ) -> Option<Result<PluginDescriptor, DiscoveryError>> {
        if !path.is_dir() {
            return None;
        }
        let raw = path.file_name()?;
        if !raw.to_string_lossy().ends_with(PLUGIN_DIR_SUFFIX) {
            return None;
        }
        let named = raw.to_str().and_then(|dir_name| {
            dir_name
                .strip_suffix(PLUGIN_DIR_SUFFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (dir_name, name))
        });
        Some(match named {
            Some((dir_name, name)) => self.describe(path, dir_name, name, kind),
            None => Err(DiscoveryError::InvalidName {
                path: path.to_path_buf(),
            }),
        })
    }

    fn describe(
        &self,
        dir: &Path,
        dir_name: &str,
        name: &str,
        kind: PluginKind,
    ) -> Result<PluginDescriptor, DiscoveryError> {
        if self.is_reserved(name) {
            return Err(DiscoveryError::ReservedName {
                name: name.to_owned(),
            });
        }

        let main_module = main_module_path(dir, dir_name);
        if !main_module.is_file() {
            return Err(DiscoveryError::MissingMainModule {
                name: name.to_owned(),
                expected: main_module,
            });
        }

        let manifest = ModuleManifest::load(name, &main_module)?;
        let class = manifest.select_class(name, kind)?;
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| DiscoveryError::UnknownClass {
                name: name.to_owned(),
                class: class.to_owned(),
            })?;

        let mut descriptor = PluginDescriptor::new(name, kind, factory.clone())
            .with_class(class)
            .with_source(dir);
        let defaults = dir.join(DEFAULTS_FILE);
        if defaults.is_file() {
            descriptor = descriptor.with_defaults(defaults);
        }
        if let Some(version) = manifest.version() {
            descriptor = descriptor.with_version(version);
        }
        if let Some(description) = manifest.description() {
            descriptor = descriptor.with_description(description);
        }

        debug!(
            target: DISCOVERY_TARGET,
            plugin = name,
            class,
            "discovered plugin"
        );
        Ok(descriptor)
    }
}

fn main_module_path(dir: &Path, dir_name: &str) -> PathBuf {
    dir.join(format!("{dir_name}.{MANIFEST_EXTENSION}"))
}

/// Lazy iterator over the candidates of one discovery root.
///
/// Yields a descriptor for each valid plugin directory and an error for each
/// rejected one, in lexical directory order.
#[derive(Debug)]
pub struct Scan<'a> {
    scanner: &'a Scanner,
    kind: PluginKind,
    paths: vec::IntoIter<PathBuf>,
}

impl Iterator for Scan<'_> {
    type Item = Result<PluginDescriptor, DiscoveryError>;

    fn next(&mut self) -> Option<Self::Item> {
        for path in self.paths.by_ref() {
            if let Some(result) = self.scanner.evaluate(&path, self.kind) {
                return Some(result);
            }
            debug!(
                target: DISCOVERY_TARGET,
                path = %path.display(),
                "ignoring non-plugin entry"
            );
        }
        None
    }
}
