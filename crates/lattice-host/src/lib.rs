//! Process host for Lattice plugins.
//!
//! Settings flags placed before the subcommand are split off and handed to
//! [`Settings::resolve`](lattice_config::Settings::resolve), which layers
//! them over the `LATTICE_*` environment and an optional TOML file. The host
//! then installs telemetry on standard error, builds both registries, and
//! runs a single subcommand:
//!
//! - `list` prints one `<kind>\t<name>\t<state>` line per registered plugin.
//! - `run <command|transport> <NAME> [INPUT]` executes one plugin and prints
//!   its JSON output.
//!
//! Every failure is written to standard error and yields a non-zero exit code.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use lattice_config::{ConfigError, Settings, split_settings_arguments};
use lattice_plugins::{ExecutionContext, PluginError, PluginKind};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

mod bootstrap;
mod cli;
mod telemetry;

pub use self::bootstrap::{BootstrapError, PluginHost, PluginListing, bootstrap};
pub use self::telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

use self::cli::{Cli, HostCommand};

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cli");

/// Failures reported by [`run`].
#[derive(Debug, Error)]
pub enum HostError {
    /// The command line could not be parsed.
    #[error("{0}")]
    Usage(#[from] clap::Error),
    /// Settings could not be resolved.
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Registries could not be built.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The requested plugin failed or is unavailable.
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// Plugin output could not be serialised.
    #[error("failed to render plugin output: {0}")]
    Render(#[source] serde_json::Error),
    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

/// Runs the host with `args`, writing results to `stdout` and diagnostics
/// to `stderr`.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let (settings_args, command_args) = split_settings_arguments(&args);
    let cli = match Cli::try_parse_from(command_args) {
        Ok(cli) => cli,
        Err(error) if is_informational(&error) => {
            return match write!(stdout, "{}", error.render()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(stderr, &HostError::Usage(error)),
    };

    match dispatch(cli, settings_args, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error),
    }
}

fn is_informational(error: &clap::Error) -> bool {
    matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn report<E: Write>(stderr: &mut E, error: &HostError) -> ExitCode {
    let _ = writeln!(stderr, "{error}");
    ExitCode::FAILURE
}

fn dispatch<W: Write>(
    cli: Cli,
    settings_args: Vec<OsString>,
    stdout: &mut W,
) -> Result<(), HostError> {
    let settings = Settings::resolve(settings_args)?;
    let telemetry = telemetry::initialise(&settings)?;
    debug!(target: CLI_TARGET, format = %telemetry.format(), "telemetry ready");
    let host = bootstrap(&settings)?;

    match cli.command {
        HostCommand::List => list(&host, stdout),
        HostCommand::Run {
            kind,
            name,
            input,
            timeout_ms,
        } => {
            let input = parse_input(input.as_deref());
            let mut ctx = ExecutionContext::new();
            if let Some(millis) = timeout_ms {
                ctx = ctx.with_timeout(Duration::from_millis(millis));
            }
            let kind = PluginKind::from(kind);
            debug!(target: CLI_TARGET, plugin = %name, kind = kind.as_str(), "running plugin");
            let output = host.execute(kind, &name, &input, &ctx)?;
            let rendered = serde_json::to_string(&output).map_err(HostError::Render)?;
            writeln!(stdout, "{rendered}").map_err(HostError::Output)
        }
    }
}

fn list<W: Write>(host: &PluginHost, stdout: &mut W) -> Result<(), HostError> {
    for row in host.listing() {
        writeln!(stdout, "{}\t{}\t{}", row.kind, row.name, row.state).map_err(HostError::Output)?;
    }
    Ok(())
}

/// Interprets the optional INPUT argument.
///
/// Valid JSON is used as is; anything else becomes a JSON string. A missing
/// argument yields `null`.
fn parse_input(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests;
