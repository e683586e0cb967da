//! System plugins compiled into the runtime.
//!
//! Built-ins are registered under [`RESERVED_NAMES`]; discovered plugins
//! cannot claim those names. Their classes are available to discovery
//! through [`FactoryTable::with_builtins`].

use lattice_config::PluginConfig;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::descriptor::{FactoryTable, PluginDescriptor, PluginFactory};
use crate::plugin::{BoxError, Plugin, PluginKind};

/// Names reserved for system plugins.
pub const RESERVED_NAMES: &[&str] = &["echo"];

/// Class name of [`EchoCommandPlugin`].
pub const ECHO_COMMAND_CLASS: &str = "EchoCommandPlugin";

/// Class name of [`EchoTransportPlugin`].
pub const ECHO_TRANSPORT_CLASS: &str = "EchoTransportPlugin";

/// Command plugin returning its input unchanged.
#[derive(Debug, Default)]
pub struct EchoCommandPlugin {
    ready: bool,
}

impl Plugin for EchoCommandPlugin {
    fn initialize(&mut self, _config: &PluginConfig) -> Result<(), BoxError> {
        self.ready = true;
        Ok(())
    }

    fn execute(&mut self, input: &Value, _ctx: &ExecutionContext) -> Result<Value, BoxError> {
        if !self.ready {
            return Err("echo command used before initialisation".into());
        }
        Ok(input.clone())
    }

    fn shutdown(&mut self) -> Result<(), BoxError> {
        self.ready = false;
        Ok(())
    }
}

/// Transport plugin that loops every payload straight back.
///
/// An optional `prefix` string in the configuration is prepended to string
/// payloads, which makes configuration layering observable end to end.
#[derive(Debug, Default)]
pub struct EchoTransportPlugin {
    prefix: Option<String>,
    open: bool,
}

impl Plugin for EchoTransportPlugin {
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
        self.prefix = config.get_str("prefix").map(str::to_owned);
        self.open = true;
        Ok(())
    }

    fn execute(&mut self, input: &Value, ctx: &ExecutionContext) -> Result<Value, BoxError> {
        if !self.open {
            return Err("echo transport is closed".into());
        }
        if ctx.is_cancelled() {
            return Err("echo transport call cancelled".into());
        }
        match (&self.prefix, input) {
            (Some(prefix), Value::String(text)) => Ok(Value::String(format!("{prefix}{text}"))),
            _ => Ok(input.clone()),
        }
    }

    fn shutdown(&mut self) -> Result<(), BoxError> {
        self.open = false;
        Ok(())
    }
}

impl FactoryTable {
    /// Table holding the classes of every built-in plugin.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .with(
                ECHO_COMMAND_CLASS,
                PluginFactory::of::<EchoCommandPlugin>(),
            )
            .with(
                ECHO_TRANSPORT_CLASS,
                PluginFactory::of::<EchoTransportPlugin>(),
            )
    }
}

/// Descriptors for the built-in plugins of `kind`.
#[must_use]
pub fn descriptors(kind: PluginKind) -> Vec<PluginDescriptor> {
    let descriptor = match kind {
        PluginKind::Command => PluginDescriptor::new(
            "echo",
            kind,
            PluginFactory::of::<EchoCommandPlugin>(),
        )
        .with_class(ECHO_COMMAND_CLASS),
        PluginKind::Transport => PluginDescriptor::new(
            "echo",
            kind,
            PluginFactory::of::<EchoTransportPlugin>(),
        )
        .with_class(ECHO_TRANSPORT_CLASS),
    };
    vec![
        descriptor
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_description("returns its input unchanged"),
    ]
}
