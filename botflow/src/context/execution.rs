//! The mutable context for one request.

use super::flags::{FlagStore, LOGS_FLAG};
use super::{LogEntry, LogLevel, RequestIdentity};
use crate::errors::{AbortError, FlagError};
use crate::events::{summarize_value, Event, EventBus, EventKind, EventOrigin};
use crate::integration::{GenericRequest, Integration, Response, User};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The state one request carries through the middleware stack.
///
/// Flags are guarded by a mutex and owned by this context alone. The abort
/// state is latched: once set it is never cleared for the rest of the
/// request.
pub struct ExecutionContext {
    /// Request identity.
    identity: RequestIdentity,
    /// Monotonic start, for elapsed time.
    started: Instant,
    /// Threshold for the human-readable log sink.
    log_level: LogLevel,
    /// Request flags.
    flags: FlagStore,
    /// Latched abort reason.
    abort: Mutex<Option<AbortError>>,
    /// Whether the pipeline should respond once the stack completes.
    auto_respond: AtomicBool,
    /// The user that sent the request.
    user: User,
    /// The platform-independent request.
    request: GenericRequest,
    /// The raw inbound request.
    raw_request: serde_json::Value,
    /// The integration that received the request.
    integration: Arc<dyn Integration>,
    /// Outgoing messages.
    response: Response,
    /// Event bus for observers.
    events: Arc<EventBus>,
}

impl ExecutionContext {
    /// Creates a new context for a raw request received by `integration`.
    #[must_use]
    pub fn new(integration: Arc<dyn Integration>, raw_request: serde_json::Value) -> Self {
        Self {
            identity: RequestIdentity::new(),
            started: Instant::now(),
            log_level: LogLevel::default(),
            flags: FlagStore::new(),
            abort: Mutex::new(None),
            auto_respond: AtomicBool::new(true),
            user: User::default(),
            request: GenericRequest::default(),
            raw_request,
            integration,
            response: Response::new(),
            events: Arc::new(EventBus::new()),
        }
    }

    /// Sets the request identity.
    #[must_use]
    pub fn with_identity(mut self, identity: RequestIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the user.
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    /// Sets the generic request.
    #[must_use]
    pub fn with_request(mut self, request: GenericRequest) -> Self {
        self.request = request;
        self
    }

    /// Sets the log threshold.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Sets the initial auto-respond flag.
    #[must_use]
    pub fn with_auto_respond(self, auto_respond: bool) -> Self {
        self.auto_respond.store(auto_respond, Ordering::SeqCst);
        self
    }

    /// Sets the event bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Returns the request identity.
    #[must_use]
    pub fn identity(&self) -> &RequestIdentity {
        &self.identity
    }

    /// Returns the short request ID.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.identity.request_id
    }

    /// Returns when the request entered the pipeline.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.identity.created_at
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the elapsed time in whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Returns the log threshold.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Returns the user.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the generic request.
    #[must_use]
    pub fn request(&self) -> &GenericRequest {
        &self.request
    }

    /// Returns the raw inbound request.
    #[must_use]
    pub fn raw_request(&self) -> &serde_json::Value {
        &self.raw_request
    }

    /// Returns the integration.
    #[must_use]
    pub fn integration(&self) -> &Arc<dyn Integration> {
        &self.integration
    }

    /// Returns the response buffer.
    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the event bus.
    #[must_use]
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Returns whether the pipeline will respond when the stack completes.
    #[must_use]
    pub fn auto_respond(&self) -> bool {
        self.auto_respond.load(Ordering::SeqCst)
    }

    /// Enables or disables automatic responding.
    pub fn set_auto_respond(&self, auto_respond: bool) {
        self.auto_respond.store(auto_respond, Ordering::SeqCst);
    }

    // Flags

    /// Sets a flag, overwriting any previous value.
    pub fn flag(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        let key = key.into();
        let value = value.into();
        let summary = self.events.has_observer().then(|| summarize_value(&value));

        self.flags.insert(key.clone(), value);

        if let Some(value) = summary {
            self.publish(|| EventKind::FlagSet { flag: key, value });
        }
    }

    /// Serializes `value` and stores it as a flag.
    pub fn flag_serialized<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<(), FlagError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|err| FlagError::Serialization {
            key: key.clone(),
            message: err.to_string(),
        })?;
        self.flag(key, value);
        Ok(())
    }

    /// Checks if a flag is set.
    #[must_use]
    pub fn has_flag(&self, key: &str) -> bool {
        let present = self.flags.contains(key);
        self.publish(|| EventKind::FlagRead {
            flag: key.to_string(),
            existence_check: true,
        });
        present
    }

    /// Gets a copy of a flag value.
    #[must_use]
    pub fn get_flag(&self, key: &str) -> Option<serde_json::Value> {
        let value = self.flags.get(key);
        self.publish(|| EventKind::FlagRead {
            flag: key.to_string(),
            existence_check: false,
        });
        value
    }

    fn require_flag(&self, key: &str) -> Result<serde_json::Value, FlagError> {
        self.get_flag(key).ok_or_else(|| FlagError::missing(key))
    }

    /// Gets a string flag.
    pub fn get_string_flag(&self, key: &str) -> Result<String, FlagError> {
        match self.require_flag(key)? {
            serde_json::Value::String(s) => Ok(s),
            other => Err(FlagError::type_mismatch(key, "string", &other)),
        }
    }

    /// Gets an integer flag.
    pub fn get_int_flag(&self, key: &str) -> Result<i64, FlagError> {
        let value = self.require_flag(key)?;
        value
            .as_i64()
            .ok_or_else(|| FlagError::type_mismatch(key, "integer", &value))
    }

    /// Gets a numeric flag as a float.
    pub fn get_float_flag(&self, key: &str) -> Result<f64, FlagError> {
        let value = self.require_flag(key)?;
        value
            .as_f64()
            .ok_or_else(|| FlagError::type_mismatch(key, "float", &value))
    }

    /// Gets a boolean flag.
    pub fn get_bool_flag(&self, key: &str) -> Result<bool, FlagError> {
        let value = self.require_flag(key)?;
        value
            .as_bool()
            .ok_or_else(|| FlagError::type_mismatch(key, "boolean", &value))
    }

    /// Gets a flag decoded as `T`.
    pub fn get_flag_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, FlagError> {
        let value = self.require_flag(key)?;
        let found = crate::errors::json_type_name(&value);
        serde_json::from_value(value).map_err(|_| FlagError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
            found,
        })
    }

    /// Decodes a flag as `T`, applies `f` and stores the result under one lock.
    pub fn update_flag<T, R, F>(&self, key: &str, f: F) -> Result<R, FlagError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> R,
    {
        let output = self.flags.update(key, f)?;
        self.publish(|| EventKind::FlagSet {
            flag: key.to_string(),
            value: self
                .flags
                .get(key)
                .map(|v| summarize_value(&v))
                .unwrap_or_default(),
        });
        Ok(output)
    }

    /// Removes zero or more flags. Absent keys are ignored.
    pub fn clear_flag<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        self.flags.remove_all(&keys);
        self.publish(|| EventKind::FlagCleared { flags: keys });
    }

    /// Returns all flags whose key starts with `prefix`.
    #[must_use]
    pub fn flags_with_prefix(&self, prefix: &str) -> Vec<(String, serde_json::Value)> {
        self.flags.with_prefix(prefix)
    }

    /// Returns all flag keys.
    #[must_use]
    pub fn flag_keys(&self) -> Vec<String> {
        self.flags.keys()
    }

    // Abort

    /// Aborts the request.
    ///
    /// No further middleware runs once the dispatcher observes the abort.
    /// Calling this again replaces the message but cannot undo the abort.
    pub fn abort(&self, reason: impl Into<AbortError>) {
        let reason = reason.into();
        tracing::debug!(request_id = %self.identity.request_id, reason = %reason, "Request aborted");
        *self.abort.lock() = Some(reason);
    }

    /// Returns true if the request has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort.lock().is_some()
    }

    /// Returns the abort reason, if any.
    #[must_use]
    pub fn abort_error(&self) -> Option<AbortError> {
        self.abort.lock().clone()
    }

    // Logging

    /// Records a log entry for this request.
    ///
    /// The entry is always appended to the `__logs` flag. It is also written
    /// to the output sink when `level` is at or below the context threshold.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, source: &str) {
        let entry = LogEntry {
            elapsed_ms: self.elapsed_ms(),
            source: source.to_string(),
            level,
            message: message.into(),
        };

        if level <= self.log_level {
            level.emit(&entry.format_line(&self.identity.request_id));
        }

        match serde_json::to_value(&entry) {
            Ok(value) => self.flags.append(LOGS_FLAG, value),
            Err(err) => tracing::warn!(error = %err, "Failed to record request log entry"),
        }

        self.publish(|| EventKind::LogEmitted {
            level: entry.level,
            source: entry.source,
            message: entry.message,
        });
    }

    /// Logs at ERROR level.
    pub fn error(&self, source: &str, message: impl Into<String>) {
        self.log(LogLevel::ERROR, message, source);
    }

    /// Logs at WARN level.
    pub fn warn(&self, source: &str, message: impl Into<String>) {
        self.log(LogLevel::WARN, message, source);
    }

    /// Logs at INFO level.
    pub fn info(&self, source: &str, message: impl Into<String>) {
        self.log(LogLevel::INFO, message, source);
    }

    /// Logs at DEBUG level.
    pub fn debug(&self, source: &str, message: impl Into<String>) {
        self.log(LogLevel::DEBUG, message, source);
    }

    /// Logs at TRACE level.
    pub fn trace(&self, source: &str, message: impl Into<String>) {
        self.log(LogLevel::TRACE, message, source);
    }

    /// Returns the structured log recorded so far.
    #[must_use]
    pub fn logs(&self) -> Vec<LogEntry> {
        self.flags
            .get(LOGS_FLAG)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    // Events

    /// Publishes an event if an observer is listening.
    ///
    /// The payload is only built when someone will receive it.
    pub(crate) fn publish(&self, kind: impl FnOnce() -> EventKind) {
        if !self.events.has_observer() {
            return;
        }

        let origin = EventOrigin {
            request_id: self.identity.request_id.clone(),
            user_id: self.user.id.clone(),
            elapsed_ms: self.elapsed_ms(),
        };
        self.events.publish(Event::new(origin, kind()));
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.identity.request_id)
            .field("user", &self.user.id)
            .field("flags", &self.flags.len())
            .field("aborted", &self.is_aborted())
            .field("auto_respond", &self.auto_respond())
            .finish_non_exhaustive()
    }
}
