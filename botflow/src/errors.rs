//! Error types for the botflow runtime.
//!
//! The taxonomy follows how failures are meant to be handled:
//!
//! - [`ConfigurationError`]: misuse detected while wiring the bot together.
//! - [`AbortError`]: a business failure latched on a request by a middleware.
//! - [`IntegrationError`]: failures talking to the chat platform.
//! - [`SessionError`]: failures of the session storage backend.
//! - [`FlagError`]: missing or mistyped execution-context flags.
//! - [`ConversationError`]: conversation-context store misuse or corruption.
//!
//! [`BotError`] wraps all of them and is what middleware and
//! [`Bot::execute`](crate::pipeline::Bot::execute) return.

use crate::context::ExecutionContext;
use thiserror::Error;

/// The main error type for botflow operations.
#[derive(Debug, Error)]
pub enum BotError {
    /// A middleware aborted the request.
    ///
    /// The partially populated context is kept for diagnostics.
    #[error("Request aborted: {reason}")]
    Aborted {
        /// The latched abort reason.
        reason: AbortError,
        /// The context as it was when the pipeline stopped.
        context: Box<ExecutionContext>,
    },

    /// The bot was configured incorrectly.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The chat integration failed.
    #[error("{0}")]
    Integration(#[from] IntegrationError),

    /// The session store failed.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// A flag was missing or held an unexpected type.
    #[error("{0}")]
    Flag(#[from] FlagError),

    /// The conversation-context store was misused.
    #[error("{0}")]
    Conversation(#[from] ConversationError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Returns true if this error is a latched abort rather than a hard failure.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Returns the context of an aborted request.
    #[must_use]
    pub fn aborted_context(&self) -> Option<&ExecutionContext> {
        match self {
            Self::Aborted { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Consumes the error, returning the context of an aborted request.
    #[must_use]
    pub fn into_context(self) -> Option<ExecutionContext> {
        match self {
            Self::Aborted { context, .. } => Some(*context),
            _ => None,
        }
    }
}

/// A business-level failure recorded on a request with
/// [`ExecutionContext::abort`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AbortError {
    /// The abort message.
    pub message: String,
}

impl AbortError {
    /// Creates a new abort error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for AbortError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for AbortError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Errors raised while setting the bot up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// An event observer was registered twice.
    #[error("An event observer has already been registered")]
    ObserverAlreadySet,

    /// The event consumer needs a tokio runtime to run on.
    #[error("No tokio runtime is available to start the event consumer")]
    NoRuntime,

    /// A configuration value could not be parsed.
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue {
        /// The configuration key.
        key: String,
        /// The offending value.
        value: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialise tracing: {0}")]
    Tracing(String),
}

impl ConfigurationError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Errors raised by chat platform integrations.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The inbound request could not be understood.
    #[error("Request extraction failed: {0}")]
    Extraction(String),

    /// A response could not be delivered.
    #[error("Response delivery failed: {0}")]
    Delivery(String),

    /// Any other integration failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by session stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No session exists for the given id.
    #[error("Session '{0}' does not exist")]
    NotFound(String),

    /// The storage backend failed.
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Errors raised by typed flag access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// The flag is not set.
    #[error("Flag '{key}' is not set")]
    Missing {
        /// The flag key.
        key: String,
    },

    /// The flag holds a value of another type.
    #[error("Flag '{key}' holds {found}, expected {expected}")]
    TypeMismatch {
        /// The flag key.
        key: String,
        /// The requested type.
        expected: &'static str,
        /// The JSON type actually stored.
        found: &'static str,
    },

    /// A value could not be converted to a flag value.
    #[error("Flag '{key}' could not be serialized: {message}")]
    Serialization {
        /// The flag key.
        key: String,
        /// The serializer message.
        message: String,
    },
}

impl FlagError {
    /// Creates a missing flag error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Creates a type mismatch error for the value found under `key`.
    #[must_use]
    pub fn type_mismatch(
        key: impl Into<String>,
        expected: &'static str,
        found: &serde_json::Value,
    ) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected,
            found: json_type_name(found),
        }
    }
}

/// Errors raised by the conversation-context store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    /// The conversation middleware has not run for this request.
    #[error("Conversation contexts are not initialised; install the conversation middleware upstream")]
    NotInitialized,

    /// The persisted store could not be decoded or encoded.
    #[error("Conversation context codec error: {0}")]
    Codec(String),
}

/// Returns the JSON type name of a value, for diagnostics.
#[must_use]
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "float",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
