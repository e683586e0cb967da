//! Isolation boundary between registries and plugin code.
//!
//! Every call into a plugin goes through [`guard`], which turns both returned
//! errors and panics into a [`Fault`]. Callers then map the fault onto the
//! typed [`PluginError`] for the hook that failed, so a misbehaving plugin
//! can never unwind through a registry.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use lattice_config::{ConfigLoader, ConfigMap, PluginConfig};
use serde_json::Value;
use tracing::{error, warn};

use crate::context::ExecutionContext;
use crate::descriptor::PluginDescriptor;
use crate::error::{PluginError, SharedError};
use crate::lifecycle::LifecycleHook;
use crate::plugin::{BoxError, Plugin};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Why a guarded plugin call did not complete normally.
#[derive(Debug)]
pub(crate) enum Fault {
    /// The plugin returned an error.
    Error(BoxError),
    /// The plugin panicked; holds the panic message.
    Panic(String),
}

impl Fault {
    fn message(&self) -> String {
        match self {
            Self::Error(source) => source.to_string(),
            Self::Panic(message) => format!("panicked: {message}"),
        }
    }

    fn into_source(self) -> Option<SharedError> {
        match self {
            Self::Error(source) => Some(Arc::from(source)),
            Self::Panic(_) => None,
        }
    }

    fn log(&self, name: &str, hook: LifecycleHook) {
        match self {
            Self::Error(source) => warn!(
                target: DISPATCH_TARGET,
                plugin = name,
                hook = hook.as_str(),
                error = %source,
                "plugin hook returned an error"
            ),
            Self::Panic(message) => error!(
                target: DISPATCH_TARGET,
                plugin = name,
                hook = hook.as_str(),
                panic = %message,
                "plugin hook panicked"
            ),
        }
    }
}

/// Runs `call`, converting errors and panics into a [`Fault`].
pub(crate) fn guard<T, F>(call: F) -> Result<T, Fault>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(Fault::Error(source)),
        Err(payload) => Err(Fault::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string panic payload"))
}

fn initialization_failure(
    name: &str,
    hook: LifecycleHook,
    stage: &str,
    fault: Fault,
) -> PluginError {
    fault.log(name, hook);
    PluginError::Initialization {
        name: name.to_owned(),
        message: format!("{stage} failed: {}", fault.message()),
        source: fault.into_source(),
    }
}

fn execution_failure(name: &str, hook: LifecycleHook, fault: Fault) -> PluginError {
    fault.log(name, hook);
    PluginError::Execution {
        name: name.to_owned(),
        hook,
        message: fault.message(),
        source: fault.into_source(),
    }
}

/// Builds a fresh instance through the descriptor's factory.
pub(crate) fn instantiate(descriptor: &PluginDescriptor) -> Result<Box<dyn Plugin>, PluginError> {
    guard(|| Ok(descriptor.factory().build())).map_err(|fault| {
        initialization_failure(
            descriptor.name(),
            LifecycleHook::Instantiate,
            "instantiation",
            fault,
        )
    })
}

/// Loads the defaults file at `path` through `loader`.
pub(crate) fn load_defaults(
    name: &str,
    loader: &dyn ConfigLoader,
    path: &Path,
) -> Result<ConfigMap, PluginError> {
    guard(|| loader.load(path).map_err(BoxError::from)).map_err(|fault| {
        initialization_failure(name, LifecycleHook::Initialize, "configuration loading", fault)
    })
}

/// Runs `initialize`.
pub(crate) fn initialize(
    name: &str,
    plugin: &mut dyn Plugin,
    config: &PluginConfig,
) -> Result<(), PluginError> {
    guard(|| plugin.initialize(config))
        .map_err(|fault| initialization_failure(name, LifecycleHook::Initialize, "initialize", fault))
}

/// Runs `before_execute`, `execute`, and `after_execute` in order.
///
/// The chain stops at the first failing hook. In particular a failing
/// `before_execute` skips both `execute` and `after_execute`.
pub(crate) fn execute_chain(
    name: &str,
    plugin: &mut dyn Plugin,
    input: &Value,
    ctx: &ExecutionContext,
) -> Result<Value, PluginError> {
    guard(|| plugin.before_execute(input))
        .map_err(|fault| execution_failure(name, LifecycleHook::BeforeExecute, fault))?;
    let output = guard(|| plugin.execute(input, ctx))
        .map_err(|fault| execution_failure(name, LifecycleHook::Execute, fault))?;
    guard(|| plugin.after_execute(input, &output))
        .map_err(|fault| execution_failure(name, LifecycleHook::AfterExecute, fault))?;
    Ok(output)
}

/// Runs `shutdown`, logging a failure instead of returning it.
///
/// Returns `true` when shutdown completed cleanly.
pub(crate) fn shutdown(name: &str, plugin: &mut dyn Plugin) -> bool {
    match guard(|| plugin.shutdown()) {
        Ok(()) => true,
        Err(fault) => {
            fault.log(name, LifecycleHook::Shutdown);
            false
        }
    }
}
