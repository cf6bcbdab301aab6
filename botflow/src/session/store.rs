//! The session storage contract.

use crate::errors::SessionError;
use async_trait::async_trait;
use std::collections::HashMap;

/// The contents of one session.
pub type SessionData = HashMap<String, serde_json::Value>;

/// Storage backend for sessions, keyed by user ID.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session, replacing any existing one.
    async fn create(&self, id: &str, data: SessionData) -> Result<(), SessionError>;

    /// Returns a session.
    ///
    /// Fails with [`SessionError::NotFound`] if no session exists.
    async fn get(&self, id: &str) -> Result<SessionData, SessionError>;

    /// Merges `data` into a session, creating it if needed.
    ///
    /// Keys absent from `data` keep their stored values.
    async fn update(&self, id: &str, data: SessionData) -> Result<(), SessionError>;

    /// Removes a session. Removing a missing session is not an error.
    async fn destroy(&self, id: &str) -> Result<(), SessionError>;
}
