//! Log output formats accepted by the host.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// How the host renders log records on standard error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record, with event fields flattened.
    #[default]
    Json,
    /// Single-line records for people reading a terminal.
    Compact,
}

impl LogFormat {
    /// Every supported format.
    pub const ALL: [Self; 2] = [Self::Json, Self::Compact];

    /// Name used in settings files, environment variables and flags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Compact => "compact",
        }
    }

    /// Whether records are machine-readable.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
