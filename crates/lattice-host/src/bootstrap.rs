//! Host bootstrap: builds both registries from resolved settings.
//!
//! Built-in plugins are registered first so that their reserved names are
//! taken before discovery runs. Each discovery root is then scanned; a root
//! that does not exist simply contributes no plugins.

use std::path::Path;

use lattice_config::Settings;
use lattice_plugins::{
    CommandRegistry, DiscoveryReport, ExecutionContext, PluginError, PluginKind, PluginRegistry,
    PluginState, RegistryKind, TransportRegistry, builtin,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A built-in plugin could not be registered.
    #[error("failed to register built-in {kind} plugin: {source}")]
    Builtin {
        /// Registry the plugin belongs to.
        kind: PluginKind,
        /// Underlying registry error.
        #[source]
        source: PluginError,
    },
    /// A discovery root exists but could not be scanned.
    #[error("failed to discover {kind} plugins: {source}")]
    Discovery {
        /// Registry being populated.
        kind: PluginKind,
        /// Underlying registry error.
        #[source]
        source: PluginError,
    },
}

/// One row of [`PluginHost::listing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginListing {
    /// Registry the plugin belongs to.
    pub kind: PluginKind,
    /// Plugin name.
    pub name: String,
    /// Current lifecycle state.
    pub state: PluginState,
}

/// Both registries, populated and ready for dispatch.
#[derive(Debug)]
pub struct PluginHost {
    commands: CommandRegistry,
    transports: TransportRegistry,
    reports: Vec<(PluginKind, DiscoveryReport)>,
}

impl PluginHost {
    /// Command registry.
    #[must_use]
    pub const fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Transport registry.
    #[must_use]
    pub const fn transports(&self) -> &TransportRegistry {
        &self.transports
    }

    /// Discovery reports gathered during bootstrap.
    #[must_use]
    pub fn reports(&self) -> &[(PluginKind, DiscoveryReport)] {
        &self.reports
    }

    /// Every registered plugin with its state, commands first.
    #[must_use]
    pub fn listing(&self) -> Vec<PluginListing> {
        let mut rows = listing_of(&self.commands);
        rows.extend(listing_of(&self.transports));
        rows
    }

    /// Runs the plugin `name` from the registry for `kind`.
    ///
    /// # Errors
    ///
    /// Propagates the registry's [`PluginError`].
    pub fn execute(
        &self,
        kind: PluginKind,
        name: &str,
        input: &Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, PluginError> {
        match kind {
            PluginKind::Command => self.commands.execute_with(name, input, ctx),
            PluginKind::Transport => self.transports.execute_with(name, input, ctx),
        }
    }
}

fn listing_of<K: RegistryKind>(registry: &PluginRegistry<K>) -> Vec<PluginListing> {
    registry
        .names()
        .into_iter()
        .filter_map(|name| {
            let state = registry.status(&name).ok()?;
            Some(PluginListing {
                kind: registry.kind(),
                name,
                state,
            })
        })
        .collect()
}

/// Builds the host from `settings`.
///
/// # Errors
///
/// Returns [`BootstrapError`] when a built-in fails to register or an
/// existing discovery root cannot be read.
pub fn bootstrap(settings: &Settings) -> Result<PluginHost, BootstrapError> {
    let overrides = settings.plugin_overrides_map();
    let commands = CommandRegistry::new().with_overrides(overrides.clone());
    let transports = TransportRegistry::new().with_overrides(overrides);

    populate(&commands)?;
    populate(&transports)?;

    let mut reports = Vec::new();
    if let Some(report) = discover(&commands, settings.command_plugin_dir().as_std_path())? {
        reports.push((PluginKind::Command, report));
    }
    if let Some(report) = discover(&transports, settings.transport_plugin_dir().as_std_path())? {
        reports.push((PluginKind::Transport, report));
    }

    info!(
        target: HOST_TARGET,
        commands = commands.len(),
        transports = transports.len(),
        "plugin host ready"
    );
    Ok(PluginHost {
        commands,
        transports,
        reports,
    })
}

fn populate<K: RegistryKind>(registry: &PluginRegistry<K>) -> Result<(), BootstrapError> {
    debug!(
        target: HOST_TARGET,
        kind = K::KIND.as_str(),
        "registering built-in plugins"
    );
    for descriptor in builtin::descriptors(K::KIND) {
        registry
            .register(descriptor)
            .map_err(|source| BootstrapError::Builtin {
                kind: K::KIND,
                source,
            })?;
    }
    Ok(())
}

fn discover<K: RegistryKind>(
    registry: &PluginRegistry<K>,
    root: &Path,
) -> Result<Option<DiscoveryReport>, BootstrapError> {
    if !root.exists() {
        info!(
            target: HOST_TARGET,
            kind = K::KIND.as_str(),
            root = %root.display(),
            "plugin directory does not exist; skipping discovery"
        );
        return Ok(None);
    }
    registry
        .discover(root)
        .map(Some)
        .map_err(|source| BootstrapError::Discovery {
            kind: K::KIND,
            source,
        })
}
