//! Configuration for the lattice plugin runtime.
//!
//! This crate owns three concerns:
//!
//! - [`Settings`]: the host-wide settings, layered by `ortho_config` from
//!   defaults, an optional TOML file, `LATTICE_*` variables and command-line
//!   flags. Per-plugin overrides are [`PluginOverride`] directives.
//! - [`load_config`] and the [`ConfigLoader`] seam: safe YAML loading of a
//!   plugin's defaults file into a key-value mapping.
//! - [`PluginConfig`]: the blob handed to a plugin's `initialize`, built by
//!   layering host overrides over the plugin's defaults.

mod defaults;
mod loader;
mod logging;
mod overrides;
mod plugin;
mod settings;

pub use defaults::{
    COMMAND_PLUGIN_SUBDIR, DEFAULT_LOG_FILTER, TRANSPORT_PLUGIN_SUBDIR, default_command_plugin_dir,
    default_log_filter, default_log_filter_string, default_log_format, default_plugin_root,
    default_transport_plugin_dir,
};
pub use loader::{ConfigError, ConfigLoader, ConfigMap, YamlConfigLoader, load_config, parse_config};
pub use logging::LogFormat;
pub use overrides::{PluginOverride, PluginOverrideParseError, overrides_by_plugin};
pub use plugin::PluginConfig;
pub use settings::{
    ENV_COMMAND_PLUGIN_DIR, ENV_CONFIG_PATH, ENV_LOG_FILTER, ENV_LOG_FORMAT,
    ENV_TRANSPORT_PLUGIN_DIR, SETTINGS_FLAGS, Settings, split_settings_arguments,
};
