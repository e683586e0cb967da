//! Registries owning plugin instances and driving their lifecycle.
//!
//! A [`PluginRegistry`] maps plugin names to descriptors and, once
//! initialised, to a single live instance. The registry is generic over a
//! [`RegistryKind`] marker which fixes the plugin kind it accepts and its
//! [`LoadingPolicy`]:
//!
//! - [`CommandRegistry`] loads lazily. An instance is created and
//!   initialised on the first `execute`.
//! - [`TransportRegistry`] loads eagerly. `register` initialises the
//!   instance before it returns.
//!
//! All operations take `&self`, so a registry can be shared between threads
//! behind an `Arc`. First-use initialisation runs exactly once per entry;
//! racing callers block until it completes. Each instance runs at most one
//! execution chain at a time and distinct names run independently.

mod entry;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lattice_config::{ConfigLoader, ConfigMap, PluginConfig, YamlConfigLoader};
use serde_json::Value;
use tracing::{info, info_span, warn};

use self::entry::{Activity, ActivityKind, Entry, Slot};
use crate::builtin::RESERVED_NAMES;
use crate::context::ExecutionContext;
use crate::descriptor::{FactoryTable, PluginDescriptor};
use crate::discovery::Scanner;
use crate::dispatch;
use crate::error::PluginError;
use crate::lifecycle::PluginState;
use crate::plugin::{Plugin, PluginKind};

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// When a registry creates and initialises plugin instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingPolicy {
    /// On the first `execute` of each name.
    Lazy,
    /// During `register`.
    Eager,
}

/// How an `execute` on a plugin that is already executing is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// Block until the running call completes, then run.
    #[default]
    Queue,
    /// Fail immediately with [`PluginError::Busy`].
    Reject,
}

/// Compile-time description of a registry flavour.
pub trait RegistryKind: Send + Sync + 'static {
    /// Kind of plugin the registry accepts.
    const KIND: PluginKind;
    /// When instances are created.
    const LOADING: LoadingPolicy;
}

/// Marker for the lazy command registry.
#[derive(Debug, Clone, Copy)]
pub enum Commands {}

impl RegistryKind for Commands {
    const KIND: PluginKind = PluginKind::Command;
    const LOADING: LoadingPolicy = LoadingPolicy::Lazy;
}

/// Marker for the eager transport registry.
#[derive(Debug, Clone, Copy)]
pub enum Transports {}

impl RegistryKind for Transports {
    const KIND: PluginKind = PluginKind::Transport;
    const LOADING: LoadingPolicy = LoadingPolicy::Eager;
}

/// Registry of command plugins, loaded lazily.
pub type CommandRegistry = PluginRegistry<Commands>;

/// Registry of transport plugins, loaded eagerly.
pub type TransportRegistry = PluginRegistry<Transports>;

/// A candidate that discovery could not register.
#[derive(Debug, Clone)]
pub struct DiscoveryFailure {
    /// Plugin name derived from the candidate directory. Empty when the
    /// directory names no plugin.
    pub name: String,
    /// Why the candidate was rejected.
    pub error: PluginError,
}

/// Outcome of [`PluginRegistry::discover`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Names registered by this scan, in directory order.
    pub registered: Vec<String>,
    /// Candidates that failed discovery or registration.
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoveryReport {
    /// Returns `true` when every candidate was registered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry owning the plugins of one kind.
///
/// # Example
///
/// ```
/// use lattice_plugins::{PluginDescriptor, PluginFactory, PluginKind, PluginState, TransportRegistry};
/// use lattice_plugins::builtin::EchoTransportPlugin;
/// use serde_json::json;
///
/// let registry = TransportRegistry::new();
/// registry
///     .register(PluginDescriptor::new(
///         "loop",
///         PluginKind::Transport,
///         PluginFactory::of::<EchoTransportPlugin>(),
///     ))
///     .expect("registration succeeds");
///
/// assert_eq!(registry.status("loop").unwrap(), PluginState::Initialized);
/// assert_eq!(registry.execute("loop", &json!("ping")).unwrap(), json!("ping"));
/// ```
pub struct PluginRegistry<K: RegistryKind> {
    entries: Mutex<HashMap<String, Arc<Entry>>>,
    loader: Arc<dyn ConfigLoader>,
    overrides: BTreeMap<String, ConfigMap>,
    policy: ConcurrencyPolicy,
    scanner: Scanner,
    kind: PhantomData<fn() -> K>,
}

impl<K: RegistryKind> Default for PluginRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RegistryKind> PluginRegistry<K> {
    /// Creates an empty registry reading defaults files as YAML and
    /// discovering built-in classes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            loader: Arc::new(YamlConfigLoader),
            overrides: BTreeMap::new(),
            policy: ConcurrencyPolicy::default(),
            scanner: Scanner::new(FactoryTable::with_builtins())
                .with_reserved(RESERVED_NAMES.iter().copied()),
            kind: PhantomData,
        }
    }

    /// Replaces the loader used for defaults files.
    #[must_use]
    pub fn with_config_loader(mut self, loader: Arc<dyn ConfigLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Sets per-plugin overrides layered over each plugin's defaults.
    #[must_use]
    pub fn with_overrides(mut self, overrides: BTreeMap<String, ConfigMap>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Sets how concurrent calls to a busy plugin are handled.
    #[must_use]
    pub const fn with_concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the scanner used by [`PluginRegistry::discover`].
    #[must_use]
    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Kind of plugin this registry accepts.
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        K::KIND
    }

    /// Loading policy of this registry.
    #[must_use]
    pub const fn loading(&self) -> LoadingPolicy {
        K::LOADING
    }

    /// Adds `descriptor` to the registry.
    ///
    /// A name may be reused once its previous entry has been shut down. An
    /// eager registry initialises the plugin before returning; if that
    /// fails the name stays reserved in the `Failed` state until it is
    /// deregistered.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDescriptor`] or
    /// [`PluginError::KindMismatch`] for unacceptable descriptors,
    /// [`PluginError::DuplicateName`] when the name is live, and
    /// [`PluginError::Initialization`] when eager initialisation fails.
    pub fn register(&self, descriptor: PluginDescriptor) -> Result<(), PluginError> {
        descriptor.validate()?;
        if descriptor.kind() != K::KIND {
            return Err(PluginError::KindMismatch {
                name: descriptor.name().to_owned(),
                expected: K::KIND,
                found: descriptor.kind(),
            });
        }

        let name = descriptor.name().to_owned();
        let entry = Arc::new(Entry::new(descriptor));
        {
            let mut entries = self.entries();
            if let Some(existing) = entries.get(&name)
                && !existing.lock().state.allows_reregistration()
            {
                return Err(PluginError::DuplicateName { name });
            }
            entries.insert(name.clone(), Arc::clone(&entry));
        }
        info!(
            target: REGISTRY_TARGET,
            plugin = name.as_str(),
            kind = K::KIND.as_str(),
            "registered plugin"
        );

        if K::LOADING == LoadingPolicy::Eager {
            let span = Self::span(&name);
            let _entered = span.enter();
            // Registration never reports Busy; it queues behind a racing first use.
            drop(self.ensure_initialized(&entry, ConcurrencyPolicy::Queue)?);
        }
        Ok(())
    }

    /// Shuts down and removes the plugin registered as `name`.
    ///
    /// Waits for an in-flight execution to finish first, unless the
    /// registry rejects busy plugins. A failing `shutdown` is logged and
    /// does not prevent removal.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown names and
    /// [`PluginError::Busy`] when the plugin is executing under
    /// [`ConcurrencyPolicy::Reject`] or the call comes from inside the
    /// plugin itself.
    pub fn deregister(&self, name: &str) -> Result<(), PluginError> {
        let span = Self::span(name);
        let _entered = span.enter();
        self.remove(name, self.policy)
    }

    /// Scans `root` and registers every plugin found there.
    ///
    /// Rejected candidates and failed registrations are collected in the
    /// report; they never stop the rest of the scan.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Discovery`] only when `root` itself cannot be
    /// read.
    pub fn discover(&self, root: &Path) -> Result<DiscoveryReport, PluginError> {
        let scan = self.scanner.scan(root, K::KIND)?;
        let mut report = DiscoveryReport::default();
        for candidate in scan {
            let (name, outcome) = match candidate {
                Ok(descriptor) => {
                    let name = descriptor.name().to_owned();
                    (name, self.register(descriptor))
                }
                Err(error) => (
                    error.plugin_name().unwrap_or_default().to_owned(),
                    Err(error.into()),
                ),
            };
            match outcome {
                Ok(()) => report.registered.push(name),
                Err(error) => {
                    warn!(
                        target: REGISTRY_TARGET,
                        plugin = name.as_str(),
                        root = %root.display(),
                        %error,
                        "plugin discovery failed"
                    );
                    report.failures.push(DiscoveryFailure { name, error });
                }
            }
        }
        info!(
            target: REGISTRY_TARGET,
            root = %root.display(),
            kind = K::KIND.as_str(),
            registered = report.registered.len(),
            failed = report.failures.len(),
            "plugin discovery finished"
        );
        Ok(report)
    }

    /// Runs the plugin registered as `name` on `input`.
    ///
    /// # Errors
    ///
    /// See [`PluginRegistry::execute_with`].
    pub fn execute(&self, name: &str, input: &Value) -> Result<Value, PluginError> {
        self.execute_with(name, input, &ExecutionContext::new())
    }

    /// Runs the plugin registered as `name` on `input`, forwarding `ctx`.
    ///
    /// A lazy registry initialises the plugin first if this is its first
    /// use. Any hook failure marks the plugin `Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown names,
    /// [`PluginError::NotReady`] for failed plugins,
    /// [`PluginError::Busy`] for rejected concurrent or re-entrant calls,
    /// [`PluginError::Initialization`] when first-use initialisation fails,
    /// and [`PluginError::Execution`] when a hook fails.
    pub fn execute_with(
        &self,
        name: &str,
        input: &Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, PluginError> {
        let span = Self::span(name);
        let _entered = span.enter();

        let entry = self.lookup(name)?;
        let mut slot = self.ensure_initialized(&entry, self.policy)?;
        let mut instance = slot
            .instance
            .take()
            .ok_or_else(|| PluginError::internal(format!("plugin '{name}' has no instance")))?;
        slot.activity = Some(Activity::current(ActivityKind::Executing));
        entry.transition(&mut slot, PluginState::Executing);
        drop(slot);

        let result = dispatch::execute_chain(name, instance.as_mut(), input, ctx);

        let mut slot = entry.lock();
        slot.instance = Some(instance);
        let next = if result.is_ok() {
            PluginState::Initialized
        } else {
            PluginState::Failed
        };
        entry.transition(&mut slot, next);
        entry.finish(&mut slot);
        result
    }

    /// Registered names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries().keys().cloned().collect();
        names.sort();
        names
    }

    /// Current lifecycle state of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown names.
    pub fn status(&self, name: &str) -> Result<PluginState, PluginError> {
        let entry = self.lookup(name)?;
        let state = entry.lock().state;
        Ok(state)
    }

    /// Descriptor registered as `name`.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<PluginDescriptor> {
        self.entries()
            .get(name)
            .map(|entry| entry.descriptor().clone())
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Deregisters every plugin, waiting for in-flight executions.
    ///
    /// Called automatically when the registry is dropped.
    pub fn shutdown_all(&self) {
        for name in self.names() {
            let span = Self::span(&name);
            let _entered = span.enter();
            match self.remove(&name, ConcurrencyPolicy::Queue) {
                Ok(()) | Err(PluginError::NotFound { .. }) => {}
                Err(error) => warn!(
                    target: REGISTRY_TARGET,
                    plugin = name.as_str(),
                    %error,
                    "failed to shut down plugin"
                ),
            }
        }
    }

    fn span(name: &str) -> tracing::Span {
        info_span!(
            target: REGISTRY_TARGET,
            "plugin",
            plugin = name,
            kind = K::KIND.as_str()
        )
    }

    /// Locks the name map. Poisoning is recovered because no plugin code
    /// runs while the map is locked.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<Entry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, name: &str) -> Result<Arc<Entry>, PluginError> {
        self.entries()
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::not_found(name))
    }

    /// Returns the idle, initialised slot of `entry`, initialising it first
    /// when it is still `Registered`.
    fn ensure_initialized<'a>(
        &self,
        entry: &'a Entry,
        policy: ConcurrencyPolicy,
    ) -> Result<MutexGuard<'a, Slot>, PluginError> {
        let mut slot = entry.lock();
        loop {
            slot = entry.wait_idle(slot, policy)?;
            match slot.state {
                PluginState::Initialized => return Ok(slot),
                PluginState::Registered => slot = self.initialize_entry(entry, slot)?,
                PluginState::Failed => {
                    return Err(PluginError::NotReady {
                        name: entry.name().to_owned(),
                    });
                }
                PluginState::ShutDown => return Err(PluginError::not_found(entry.name())),
                PluginState::Discovered | PluginState::Executing => {
                    return Err(PluginError::internal(format!(
                        "plugin '{}' is idle in state {}",
                        entry.name(),
                        slot.state
                    )));
                }
            }
        }
    }

    fn initialize_entry<'a>(
        &self,
        entry: &'a Entry,
        mut slot: MutexGuard<'a, Slot>,
    ) -> Result<MutexGuard<'a, Slot>, PluginError> {
        slot.activity = Some(Activity::current(ActivityKind::Initializing));
        drop(slot);

        let outcome = self.bring_up(entry.descriptor());

        let mut slot = entry.lock();
        match outcome {
            Ok(instance) => {
                slot.instance = Some(instance);
                entry.transition(&mut slot, PluginState::Initialized);
                entry.finish(&mut slot);
                info!(
                    target: REGISTRY_TARGET,
                    plugin = entry.name(),
                    "plugin initialised"
                );
                Ok(slot)
            }
            Err(error) => {
                entry.transition(&mut slot, PluginState::Failed);
                entry.finish(&mut slot);
                Err(error)
            }
        }
    }

    /// Resolves configuration, instantiates, and initialises a plugin.
    ///
    /// On a failed `initialize` the instance is shut down best-effort and
    /// dropped.
    fn bring_up(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn Plugin>, PluginError> {
        let name = descriptor.name();
        let config = self.resolve_config(descriptor)?;
        let mut instance = dispatch::instantiate(descriptor)?;
        if let Err(error) = dispatch::initialize(name, instance.as_mut(), &config) {
            dispatch::shutdown(name, instance.as_mut());
            return Err(error);
        }
        Ok(instance)
    }

    fn resolve_config(&self, descriptor: &PluginDescriptor) -> Result<PluginConfig, PluginError> {
        let name = descriptor.name();
        let baseline = match descriptor.defaults() {
            Some(path) => dispatch::load_defaults(name, self.loader.as_ref(), path)?,
            None => ConfigMap::new(),
        };
        Ok(match self.overrides.get(name) {
            Some(overlay) => PluginConfig::layered(baseline, overlay),
            None => PluginConfig::new(baseline),
        })
    }

    fn remove(&self, name: &str, policy: ConcurrencyPolicy) -> Result<(), PluginError> {
        let entry = self.lookup(name)?;
        let mut slot = entry.wait_idle(entry.lock(), policy)?;
        if slot.state == PluginState::ShutDown {
            return Err(PluginError::not_found(name));
        }
        let instance = slot.instance.take();
        slot.activity = Some(Activity::current(ActivityKind::ShuttingDown));
        drop(slot);

        let clean = instance.map(|mut plugin| dispatch::shutdown(name, plugin.as_mut()));

        let mut slot = entry.lock();
        entry.transition(&mut slot, PluginState::ShutDown);
        entry.finish(&mut slot);
        drop(slot);

        let mut entries = self.entries();
        if entries
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, &entry))
        {
            entries.remove(name);
        }
        drop(entries);

        info!(
            target: REGISTRY_TARGET,
            plugin = name,
            shutdown_ran = clean.is_some(),
            shutdown_clean = clean.unwrap_or(true),
            "deregistered plugin"
        );
        Ok(())
    }
}

impl<K: RegistryKind> Drop for PluginRegistry<K> {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

impl<K: RegistryKind> fmt::Debug for PluginRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("kind", &K::KIND)
            .field("loading", &K::LOADING)
            .field("policy", &self.policy)
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}
