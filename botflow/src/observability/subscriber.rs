//! Process-wide tracing subscriber setup.

use crate::config::{BotConfig, LogFormat};
use crate::context::LogLevel;
use crate::errors::ConfigurationError;
use tracing_subscriber::EnvFilter;

/// Returns the filter directive matching a request log threshold.
#[must_use]
pub fn default_directive(level: LogLevel) -> &'static str {
    match level.0 {
        0..=10 => "error",
        11..=20 => "warn",
        21..=30 => "info",
        31..=40 => "debug",
        _ => "trace",
    }
}

/// Installs the global tracing subscriber described by `config`.
///
/// The filter is taken from `config.tracing_filter`, then `RUST_LOG`, then
/// derived from `config.log_level`.
///
/// # Errors
///
/// Returns [`ConfigurationError::InvalidValue`] for a malformed filter and
/// [`ConfigurationError::Tracing`] if a global subscriber is already set.
pub fn init_tracing(config: &BotConfig) -> Result<(), ConfigurationError> {
    let filter = match &config.tracing_filter {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|_| ConfigurationError::invalid_value("tracing_filter", directive))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(config.log_level))),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.log_colors)
        .with_target(true);

    let result = match config.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|err| ConfigurationError::Tracing(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(LogLevel::ERROR), "error");
        assert_eq!(default_directive(LogLevel::INFO), "info");
        assert_eq!(default_directive(LogLevel(35)), "debug");
        assert_eq!(default_directive(LogLevel::TRACE), "trace");
    }
}
