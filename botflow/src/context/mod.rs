//! Per-request execution state.
//!
//! This module provides:
//! - The [`ExecutionContext`] every middleware receives
//! - A lock-guarded flag store for request-scoped values
//! - Request identity and structured request logging

#[cfg(test)]
mod context_tests;
mod execution;
mod flags;
mod identity;
mod logging;

pub use execution::ExecutionContext;
pub use flags::{FlagStore, LOGS_FLAG, SESSION_PREFIX};
pub use identity::{generate_request_id, RequestIdentity};
pub use logging::{LogEntry, LogLevel};
