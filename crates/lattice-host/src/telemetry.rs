//! Log subscriber installation for the host.
//!
//! Records go to standard error so that standard output carries only
//! command results.

use std::io::{self, IsTerminal};

use lattice_config::{LogFormat, Settings};
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Describes the subscriber serving this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format chosen by the first successful installation.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while installing the log subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression is invalid.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Expression taken from settings.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another global subscriber was installed first.
    #[error("failed to install log subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Installs the global subscriber once per process.
///
/// Only the first call reads `settings`; later calls report the format that
/// is already active.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Install`] when a foreign subscriber is already set.
pub fn initialise(settings: &Settings) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(settings))
        .map(|format| TelemetryHandle { format: *format })
}

fn filter_for(settings: &Settings) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(settings.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: settings.log_filter().to_owned(),
        message: error.to_string(),
    })
}

fn install(settings: &Settings) -> Result<LogFormat, TelemetryError> {
    let filter = filter_for(settings)?;
    let format = settings.log_format();

    let structured = format.is_structured().then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(io::stderr)
    });
    let readable = (!format.is_structured()).then(|| {
        fmt::layer()
            .compact()
            .with_timer(UtcTime::rfc_3339())
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(structured)
        .with(readable)
        .try_init()?;
    Ok(format)
}
