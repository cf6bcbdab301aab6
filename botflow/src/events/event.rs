//! Event types emitted while a request runs.

use crate::context::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest value summary carried by a flag event.
const SUMMARY_MAX_CHARS: usize = 80;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A request entered the pipeline.
    RequestStart,
    /// A request left the pipeline.
    RequestEnd {
        /// Whether a middleware aborted the request.
        aborted: bool,
    },
    /// A middleware or routed handler was invoked.
    HandlerInvoked {
        /// Handler name.
        handler: String,
        /// Position in the middleware stack.
        stack_position: usize,
    },
    /// A flag was written.
    FlagSet {
        /// Flag key.
        flag: String,
        /// Truncated rendering of the new value.
        value: String,
    },
    /// A flag was read.
    FlagRead {
        /// Flag key.
        flag: String,
        /// True for `has_flag`, false for value reads.
        existence_check: bool,
    },
    /// Flags were cleared.
    FlagCleared {
        /// The keys passed to `clear_flag`.
        flags: Vec<String>,
    },
    /// A request log line was recorded.
    LogEmitted {
        /// Severity.
        level: LogLevel,
        /// Logging component.
        source: String,
        /// Message text.
        message: String,
    },
}

/// The request an event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOrigin {
    /// Request ID.
    pub request_id: String,
    /// User ID, empty if unknown.
    pub user_id: String,
    /// Milliseconds since the request started.
    pub elapsed_ms: u64,
}

/// An event published on the [`EventBus`](super::EventBus).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The originating request.
    pub origin: EventOrigin,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// The event kind and payload.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(origin: EventOrigin, kind: EventKind) -> Self {
        Self {
            origin,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Returns the dotted event name (e.g. "flag.set").
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::RequestStart => "request.start",
            EventKind::RequestEnd { .. } => "request.end",
            EventKind::HandlerInvoked { .. } => "handler.invoked",
            EventKind::FlagSet { .. } => "flag.set",
            EventKind::FlagRead { .. } => "flag.read",
            EventKind::FlagCleared { .. } => "flag.cleared",
            EventKind::LogEmitted { .. } => "log.emitted",
        }
    }
}

/// Renders a flag value for an event payload, truncated to a fixed length.
#[must_use]
pub fn summarize_value(value: &serde_json::Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= SUMMARY_MAX_CHARS {
        return rendered;
    }

    let mut summary: String = rendered.chars().take(SUMMARY_MAX_CHARS).collect();
    summary.push('…');
    summary
}
