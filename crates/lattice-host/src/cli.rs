//! Command-line interface definitions for the plugin host.

use clap::{Parser, Subcommand, ValueEnum};
use lattice_plugins::PluginKind;

const SETTINGS_HELP: &str = "\
Settings flags go before the subcommand and override LATTICE_* variables:
  --config-path <PATH>           TOML settings file
  --command-plugin-dir <DIR>     Directory scanned for command plugins
  --transport-plugin-dir <DIR>   Directory scanned for transport plugins
  --log-filter <FILTER>          tracing filter expression
  --log-format <json|compact>    Log record format
  --plugin-overrides <DIRECTIVE> <plugin>.<key>=<value>, repeatable";

/// Command-line interface for the Lattice plugin host.
#[derive(Parser, Debug)]
#[command(
    name = "lattice-host",
    version,
    disable_help_subcommand = true,
    after_help = SETTINGS_HELP
)]
pub(crate) struct Cli {
    /// Action to perform.
    #[command(subcommand)]
    pub(crate) command: HostCommand,
}

/// Host subcommands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum HostCommand {
    /// Lists every registered plugin with its kind and state.
    List,
    /// Executes one plugin and prints its JSON result.
    Run {
        /// Registry to dispatch through.
        #[arg(value_enum)]
        kind: KindArg,
        /// Registered plugin name.
        name: String,
        /// JSON input. Text that is not valid JSON is passed as a string.
        #[arg(value_name = "INPUT")]
        input: Option<String>,
        /// Deadline handed to the plugin, in milliseconds.
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
}

/// Plugin kind as spelled on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum KindArg {
    /// Command registry.
    Command,
    /// Transport registry.
    Transport,
}

impl From<KindArg> for PluginKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Command => Self::Command,
            KindArg::Transport => Self::Transport,
        }
    }
}
