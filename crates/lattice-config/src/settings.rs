//! Global settings shared by the host and both plugin registries.

use std::collections::BTreeMap;
use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_command_plugin_dir, default_log_filter_string, default_log_format,
    default_transport_plugin_dir,
};
use crate::loader::{ConfigError, ConfigMap};
use crate::logging::LogFormat;
use crate::overrides::{PluginOverride, overrides_by_plugin};

/// Environment variable naming the settings file.
pub const ENV_CONFIG_PATH: &str = "LATTICE_CONFIG_PATH";
/// Environment variable overriding the command plugin directory.
pub const ENV_COMMAND_PLUGIN_DIR: &str = "LATTICE_COMMAND_PLUGIN_DIR";
/// Environment variable overriding the transport plugin directory.
pub const ENV_TRANSPORT_PLUGIN_DIR: &str = "LATTICE_TRANSPORT_PLUGIN_DIR";
/// Environment variable overriding the log filter.
pub const ENV_LOG_FILTER: &str = "LATTICE_LOG_FILTER";
/// Environment variable overriding the log format.
pub const ENV_LOG_FORMAT: &str = "LATTICE_LOG_FORMAT";

/// Command-line flags consumed by the settings layer.
///
/// Every flag takes a value, either inline (`--flag=value`) or as the next
/// argument.
pub const SETTINGS_FLAGS: &[&str] = &[
    "--config-path",
    "--command-plugin-dir",
    "--transport-plugin-dir",
    "--log-filter",
    "--log-format",
    "--plugin-overrides",
];

/// Resolved global settings.
///
/// Values are layered by `ortho_config`: built-in defaults, then the TOML
/// file named by `--config-path` or `LATTICE_CONFIG_PATH`, then `LATTICE_*`
/// environment variables, then command-line flags. Each layer replaces the
/// one before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "LATTICE")]
pub struct Settings {
    /// Directory scanned for command plugins.
    pub command_plugin_dir: Utf8PathBuf,
    /// Directory scanned for transport plugins.
    pub transport_plugin_dir: Utf8PathBuf,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// `<plugin>.<key>=<value>` overrides layered over plugin defaults.
    pub plugin_overrides: Vec<PluginOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_plugin_dir: default_command_plugin_dir(),
            transport_plugin_dir: default_transport_plugin_dir(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            plugin_overrides: Vec::new(),
        }
    }
}

impl Settings {
    /// Resolves settings from `args` and the process environment.
    ///
    /// `args` starts with the program name, like `std::env::args_os`, and
    /// should hold only the flags listed in [`SETTINGS_FLAGS`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer cannot be read or a value
    /// does not fit its field.
    pub fn resolve<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = OsString>,
    {
        Self::load_from_iter(args).map_err(ConfigError::Load)
    }

    /// Directory scanned for command plugins.
    #[must_use]
    pub fn command_plugin_dir(&self) -> &Utf8Path {
        self.command_plugin_dir.as_path()
    }

    /// Directory scanned for transport plugins.
    #[must_use]
    pub fn transport_plugin_dir(&self) -> &Utf8Path {
        self.transport_plugin_dir.as_path()
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Overrides configured for the named plugin, if any.
    #[must_use]
    pub fn plugin_overrides(&self, name: &str) -> Option<ConfigMap> {
        self.plugin_overrides_map().remove(name)
    }

    /// All per-plugin overrides keyed by plugin name.
    #[must_use]
    pub fn plugin_overrides_map(&self) -> BTreeMap<String, ConfigMap> {
        overrides_by_plugin(&self.plugin_overrides)
    }
}

/// Splits the leading settings flags from the rest of a command line.
///
/// Returns the program name followed by every settings flag (and its value)
/// that appears before the first other argument, and the program name
/// followed by everything else.
#[must_use]
pub fn split_settings_arguments(args: &[OsString]) -> (Vec<OsString>, Vec<OsString>) {
    let mut remaining = args.iter();
    let program: Vec<OsString> = remaining.next().cloned().into_iter().collect();
    let mut settings = program.clone();
    let mut rest = program;
    while let Some(argument) = remaining.next() {
        match settings_flag(argument) {
            Some(FlagValue::Inline) => settings.push(argument.clone()),
            Some(FlagValue::Separate) => {
                settings.push(argument.clone());
                settings.extend(remaining.next().cloned());
            }
            None => {
                rest.push(argument.clone());
                rest.extend(remaining.by_ref().cloned());
                break;
            }
        }
    }
    (settings, rest)
}

enum FlagValue {
    Inline,
    Separate,
}

fn settings_flag(argument: &OsString) -> Option<FlagValue> {
    let text = argument.to_str()?;
    SETTINGS_FLAGS.iter().find_map(|flag| {
        if text == *flag {
            Some(FlagValue::Separate)
        } else {
            text.strip_prefix(*flag)
                .filter(|tail| tail.starts_with('='))
                .map(|_| FlagValue::Inline)
        }
    })
}
