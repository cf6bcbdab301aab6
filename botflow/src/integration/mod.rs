//! The contract between the pipeline and a chat platform.
//!
//! Integrations turn a raw inbound request into a [`User`] and a
//! [`GenericRequest`], and deliver the finished [`Response`]. Concrete
//! platforms live outside this crate.

use crate::context::ExecutionContext;
use crate::errors::IntegrationError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A chat platform adapter.
///
/// Extraction must be deterministic for a given raw request and free of
/// side effects. Only [`Integration::respond`] talks to the outside world.
#[async_trait]
pub trait Integration: Send + Sync {
    /// Extracts the platform-independent request.
    fn generic_request(&self, raw: &serde_json::Value) -> Result<GenericRequest, IntegrationError>;

    /// Extracts the user that sent the request.
    fn user(&self, raw: &serde_json::Value) -> Result<User, IntegrationError>;

    /// Delivers the response accumulated on the context.
    async fn respond(&self, ctx: &ExecutionContext) -> Result<(), IntegrationError>;
}

/// A request in a form every middleware understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericRequest {
    /// The message text.
    pub text: String,
    /// Structured payload, e.g. a postback.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl GenericRequest {
    /// Creates a text request.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// The user on the other end of the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform user ID; also the session key.
    pub id: String,
    /// First name, if known.
    #[serde(default)]
    pub first_name: String,
    /// Last name, if known.
    #[serde(default)]
    pub last_name: String,
    /// Email, if known.
    #[serde(default)]
    pub email: String,
}

impl User {
    /// Creates a user with only an ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the user's name.
    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }
}

/// What the integration layer hands to [`Bot::execute`](crate::pipeline::Bot::execute).
#[derive(Clone)]
pub struct InputContext {
    /// The raw inbound request.
    pub raw_request: serde_json::Value,
    /// The integration that received it.
    pub integration: Arc<dyn Integration>,
}

impl InputContext {
    /// Creates a new input context.
    #[must_use]
    pub fn new(integration: Arc<dyn Integration>, raw_request: serde_json::Value) -> Self {
        Self {
            raw_request,
            integration,
        }
    }
}

impl std::fmt::Debug for InputContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputContext")
            .field("raw_request", &self.raw_request)
            .finish_non_exhaustive()
    }
}

/// Text messages queued for delivery.
#[derive(Debug, Default)]
pub struct Response {
    messages: Mutex<Vec<String>>,
}

impl Response {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a text message.
    pub fn text(&self, text: impl Into<String>) -> &Self {
        self.messages.lock().push(text.into());
        self
    }

    /// Returns the queued messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Removes and returns the queued messages.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}
