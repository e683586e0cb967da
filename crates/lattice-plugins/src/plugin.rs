//! The contract every plugin implements.
//!
//! A plugin is a stateful object driven through a fixed lifecycle by the
//! registry that owns it: [`Plugin::initialize`] once, then any number of
//! `before_execute → execute → after_execute` chains, then
//! [`Plugin::shutdown`] once. Command plugins and transport plugins share
//! this contract; they differ only in how their registry loads them.

use std::error::Error as StdError;

use lattice_config::PluginConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;

/// Error type returned by plugin lifecycle methods.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Category of a plugin, which selects the registry that owns it.
///
/// # Example
///
/// ```
/// use lattice_plugins::PluginKind;
///
/// assert_eq!(PluginKind::Transport.as_str(), "transport");
/// assert_eq!(PluginKind::Transport.class_label(), "Transport");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Handles a user-facing command; loaded lazily on first use.
    Command,
    /// Wraps a network protocol client; loaded eagerly at registration.
    Transport,
}

impl PluginKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Transport => "transport",
        }
    }

    /// Substring a discovered class name must contain to be of this kind.
    #[must_use]
    pub const fn class_label(self) -> &'static str {
        match self {
            Self::Command => "Command",
            Self::Transport => "Transport",
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle contract implemented by every plugin.
///
/// The registry calls these methods; plugin code never calls them on itself.
/// Any error or panic from a method is caught at the registry boundary, the
/// plugin is marked failed, and the caller receives a typed error.
///
/// `shutdown` may be called after a partially failed `initialize` and must
/// release whatever was acquired before the failure point.
///
/// When `before_execute` fails, neither `execute` nor `after_execute` runs.
/// Cleanup that must happen regardless belongs in `shutdown`.
///
/// # Example
///
/// ```
/// use lattice_config::PluginConfig;
/// use lattice_plugins::{BoxError, ExecutionContext, Plugin};
/// use serde_json::Value;
///
/// struct Upper;
///
/// impl Plugin for Upper {
///     fn initialize(&mut self, _config: &PluginConfig) -> Result<(), BoxError> {
///         Ok(())
///     }
///
///     fn execute(&mut self, input: &Value, _ctx: &ExecutionContext) -> Result<Value, BoxError> {
///         let text = input.as_str().ok_or("expected a string")?;
///         Ok(Value::String(text.to_uppercase()))
///     }
///
///     fn shutdown(&mut self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send {
    /// Prepares the plugin for use with its resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the plugin cannot become ready.
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), BoxError>;

    /// Performs the plugin's work on `input`.
    ///
    /// Long-running plugins should poll [`ExecutionContext::is_cancelled`]
    /// and return promptly once it reports `true`.
    ///
    /// # Errors
    ///
    /// Returns an error when the work fails.
    fn execute(&mut self, input: &Value, ctx: &ExecutionContext) -> Result<Value, BoxError>;

    /// Releases resources held by the plugin.
    ///
    /// # Errors
    ///
    /// Returns an error when cleanup fails. The registry logs it and removes
    /// the plugin anyway.
    fn shutdown(&mut self) -> Result<(), BoxError>;

    /// Hook run before every [`Plugin::execute`].
    ///
    /// # Errors
    ///
    /// Returns an error to abort the call before `execute` runs.
    fn before_execute(&mut self, input: &Value) -> Result<(), BoxError> {
        let _ = input;
        Ok(())
    }

    /// Hook run after every successful [`Plugin::execute`].
    ///
    /// # Errors
    ///
    /// Returns an error to fail the call even though `execute` succeeded.
    fn after_execute(&mut self, input: &Value, output: &Value) -> Result<(), BoxError> {
        let _ = (input, output);
        Ok(())
    }
}
