//! Plugin runtime for Lattice.
//!
//! The `lattice-plugins` crate hosts two families of plugins inside one
//! process: **command** plugins, which handle user-facing commands, and
//! **transport** plugins, which wrap network protocol clients. Both share the
//! [`Plugin`] contract and the lifecycle described by [`PluginState`]; they
//! differ only in how their registry loads them.
//!
//! # Architecture
//!
//! - A [`Scanner`] walks a discovery root and turns each `<name>_plugin`
//!   directory into a [`PluginDescriptor`]. Class names listed in the
//!   directory's main module are resolved through a [`FactoryTable`] of
//!   constructors compiled into the host, so nothing on disk is ever loaded
//!   as code.
//! - A [`PluginRegistry`] owns descriptors and live instances.
//!   [`CommandRegistry`] initialises plugins on first use;
//!   [`TransportRegistry`] initialises them at registration.
//! - Every call into plugin code is isolated: errors and panics become a
//!   typed [`PluginError`], the plugin is marked `Failed`, and the host
//!   carries on. Isolation does not limit CPU, memory, or file handles, and
//!   cannot stop a plugin from corrupting state it was handed.
//!
//! # Example
//!
//! ```
//! use lattice_plugins::{CommandRegistry, PluginDescriptor, PluginFactory, PluginKind, PluginState};
//! use lattice_plugins::builtin::EchoCommandPlugin;
//! use serde_json::json;
//!
//! let registry = CommandRegistry::new();
//! registry
//!     .register(PluginDescriptor::new(
//!         "table",
//!         PluginKind::Command,
//!         PluginFactory::of::<EchoCommandPlugin>(),
//!     ))
//!     .expect("registration succeeds");
//!
//! assert_eq!(registry.status("table").unwrap(), PluginState::Registered);
//! let output = registry.execute("table", &json!({"rows": 3})).unwrap();
//! assert_eq!(output, json!({"rows": 3}));
//! assert_eq!(registry.status("table").unwrap(), PluginState::Initialized);
//! ```

pub mod builtin;
pub mod context;
pub mod descriptor;
pub mod discovery;
mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod plugin;
pub mod registry;

#[cfg(test)]
mod tests;

pub use self::context::{CancellationToken, ExecutionContext};
pub use self::descriptor::{FactoryTable, PluginDescriptor, PluginFactory};
pub use self::discovery::{Scan, Scanner};
pub use self::error::{DiscoveryError, PluginError};
pub use self::lifecycle::{LifecycleHook, PluginState};
pub use self::manifest::ModuleManifest;
pub use self::plugin::{BoxError, Plugin, PluginKind};
pub use self::registry::{
    CommandRegistry, Commands, ConcurrencyPolicy, DiscoveryFailure, DiscoveryReport,
    LoadingPolicy, PluginRegistry, RegistryKind, TransportRegistry, Transports,
};
