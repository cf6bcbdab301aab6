//! Request log levels and entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric log level; lower values are more severe.
///
/// A message is written to the output sink when its level is at or below
/// the context threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(pub u8);

impl LogLevel {
    /// Errors.
    pub const ERROR: Self = Self(10);
    /// Warnings.
    pub const WARN: Self = Self(20);
    /// Informational messages.
    pub const INFO: Self = Self(30);
    /// Debug output.
    pub const DEBUG: Self = Self(40);
    /// Very verbose tracing output.
    pub const TRACE: Self = Self(50);

    /// Returns the display label for this level.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::ERROR => "ERROR".to_string(),
            Self::WARN => "WARN".to_string(),
            Self::INFO => "INFO".to_string(),
            Self::DEBUG => "DEBUG".to_string(),
            Self::TRACE => "TRACE".to_string(),
            Self(other) => format!("CLVL {other}"),
        }
    }

    /// Writes a formatted line at the matching tracing level.
    pub(crate) fn emit(self, line: &str) {
        match self.0 {
            0..=10 => tracing::error!(target: "botflow::request", "{line}"),
            11..=20 => tracing::warn!(target: "botflow::request", "{line}"),
            21..=30 => tracing::info!(target: "botflow::request", "{line}"),
            31..=40 => tracing::debug!(target: "botflow::request", "{line}"),
            _ => tracing::trace!(target: "botflow::request", "{line}"),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::INFO
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::ERROR),
            "warn" | "warning" => Ok(Self::WARN),
            "info" => Ok(Self::INFO),
            "debug" => Ok(Self::DEBUG),
            "trace" => Ok(Self::TRACE),
            other => other
                .parse::<u8>()
                .map(Self)
                .map_err(|_| format!("unknown log level '{s}'")),
        }
    }
}

/// A single structured entry of the request log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the request started.
    pub elapsed_ms: u64,
    /// The component that logged the message.
    pub source: String,
    /// The severity.
    pub level: LogLevel,
    /// The message.
    pub message: String,
}

impl LogEntry {
    /// Formats the entry as a human-readable line.
    #[must_use]
    pub fn format_line(&self, request_id: &str) -> String {
        format!(
            "[+{}ms | {} | {}] {} {}",
            self.elapsed_ms, self.source, request_id, self.level, self.message
        )
    }
}
