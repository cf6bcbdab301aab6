//! Bot configuration.

use crate::context::LogLevel;
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Environment variable holding the request log threshold.
pub const ENV_LOG_LEVEL: &str = "BOT_LOG_LEVEL";
/// Environment variable toggling auto-respond.
pub const ENV_AUTO_RESPOND: &str = "BOT_AUTO_RESPOND";
/// Environment variable enabling ANSI colours in log output.
pub const ENV_LOG_COLORS: &str = "LOG_COLORS";
/// Environment variable selecting the log output format.
pub const ENV_LOG_FORMAT: &str = "BOT_LOG_FORMAT";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigurationError::invalid_value(ENV_LOG_FORMAT, s)),
        }
    }
}

/// Configuration shared by every request of a bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Threshold for the human-readable request log.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Whether requests respond automatically once the stack completes.
    #[serde(default = "default_auto_respond")]
    pub auto_respond: bool,
    /// Whether log output uses ANSI colours.
    #[serde(default)]
    pub log_colors: bool,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Optional `tracing` filter directive overriding `RUST_LOG`.
    #[serde(default)]
    pub tracing_filter: Option<String>,
}

fn default_auto_respond() -> bool {
    true
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            auto_respond: default_auto_respond(),
            log_colors: false,
            log_format: LogFormat::default(),
            tracing_filter: None,
        }
    }
}

impl BotConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidValue`] for unparseable values.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, starting from the defaults.
    ///
    /// Unset variables keep their default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidValue`] for unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            config.log_level = value
                .parse()
                .map_err(|_| ConfigurationError::invalid_value(ENV_LOG_LEVEL, &value))?;
        }

        if let Some(value) = lookup(ENV_AUTO_RESPOND) {
            config.auto_respond = parse_bool(ENV_AUTO_RESPOND, &value)?;
        }

        // Colours are opt-in: anything but "true" leaves them off.
        if let Some(value) = lookup(ENV_LOG_COLORS) {
            config.log_colors = value.trim() == "true";
        }

        if let Some(value) = lookup(ENV_LOG_FORMAT) {
            config.log_format = value.parse()?;
        }

        Ok(config)
    }

    /// Sets the request log threshold.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Enables or disables auto-respond.
    #[must_use]
    pub fn with_auto_respond(mut self, auto_respond: bool) -> Self {
        self.auto_respond = auto_respond;
        self
    }

    /// Enables or disables coloured output.
    #[must_use]
    pub fn with_log_colors(mut self, log_colors: bool) -> Self {
        self.log_colors = log_colors;
        self
    }

    /// Sets the log format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Sets the tracing filter directive.
    #[must_use]
    pub fn with_tracing_filter(mut self, filter: impl Into<String>) -> Self {
        self.tracing_filter = Some(filter.into());
        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigurationError::invalid_value(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.log_level, LogLevel::INFO);
        assert!(config.auto_respond);
        assert!(!config.log_colors);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: BotConfig = serde_json::from_str(r#"{"log_level": 40}"#).unwrap();
        assert_eq!(config.log_level, LogLevel::DEBUG);
        assert!(config.auto_respond);
    }

    #[test]
    fn test_from_lookup() {
        let config = BotConfig::from_lookup(lookup(&[
            (ENV_LOG_LEVEL, "debug"),
            (ENV_AUTO_RESPOND, "false"),
            (ENV_LOG_COLORS, "true"),
            (ENV_LOG_FORMAT, "json"),
        ]))
        .unwrap();

        assert_eq!(config.log_level, LogLevel::DEBUG);
        assert!(!config.auto_respond);
        assert!(config.log_colors);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_from_lookup_empty_keeps_defaults() {
        let config = BotConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, BotConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = BotConfig::from_lookup(lookup(&[(ENV_AUTO_RESPOND, "maybe")])).unwrap_err();
        assert_eq!(err, ConfigurationError::invalid_value(ENV_AUTO_RESPOND, "maybe"));

        let err = BotConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn test_builders() {
        let config = BotConfig::new()
            .with_log_level(LogLevel::TRACE)
            .with_auto_respond(false)
            .with_tracing_filter("botflow=debug");

        assert_eq!(config.log_level, LogLevel::TRACE);
        assert!(!config.auto_respond);
        assert_eq!(config.tracing_filter.as_deref(), Some("botflow=debug"));
    }
}
