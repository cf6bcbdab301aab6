//! Mock integration and middleware for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::errors::{json_type_name, IntegrationError};
use crate::integration::{GenericRequest, Integration, User};
use crate::pipeline::{Middleware, MiddlewareResult, Next};

/// A log shared between recording middleware and the test.
pub type SharedLog = Arc<Mutex<Vec<String>>>;

/// User ID used when a raw request does not name one.
pub const TEST_USER_ID: &str = "test-user";

/// An integration that reads JSON requests and records responses.
///
/// A raw request is either a string (the message text) or an object with
/// optional `text`, `payload` and `user` fields. `user` may be an ID string
/// or a full user object.
#[derive(Debug, Default)]
pub struct MockIntegration {
    responses: Mutex<Vec<Vec<String>>>,
    fail_respond: AtomicBool,
}

impl MockIntegration {
    /// Creates a new mock integration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock integration whose `respond` always fails.
    #[must_use]
    pub fn failing() -> Self {
        let integration = Self::default();
        integration.set_fail_respond(true);
        integration
    }

    /// Makes `respond` fail or succeed.
    pub fn set_fail_respond(&self, fail: bool) {
        self.fail_respond.store(fail, Ordering::SeqCst);
    }

    /// Returns the messages of every response delivered so far.
    #[must_use]
    pub fn responses(&self) -> Vec<Vec<String>> {
        self.responses.lock().clone()
    }

    /// Returns how many times `respond` succeeded.
    #[must_use]
    pub fn respond_count(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl Integration for MockIntegration {
    fn generic_request(&self, raw: &serde_json::Value) -> Result<GenericRequest, IntegrationError> {
        match raw {
            serde_json::Value::Null => Ok(GenericRequest::default()),
            serde_json::Value::String(text) => Ok(GenericRequest::text(text.clone())),
            serde_json::Value::Object(fields) => {
                let text = fields
                    .get("text")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default();
                let payload = fields.get("payload").cloned().unwrap_or_default();
                Ok(GenericRequest::text(text).with_payload(payload))
            }
            other => Err(IntegrationError::Extraction(format!(
                "unsupported request of type {}",
                json_type_name(other)
            ))),
        }
    }

    fn user(&self, raw: &serde_json::Value) -> Result<User, IntegrationError> {
        match raw.get("user") {
            None => Ok(User::new(TEST_USER_ID)),
            Some(serde_json::Value::String(id)) => Ok(User::new(id.clone())),
            Some(user) => serde_json::from_value(user.clone())
                .map_err(|err| IntegrationError::Extraction(err.to_string())),
        }
    }

    async fn respond(&self, ctx: &ExecutionContext) -> Result<(), IntegrationError> {
        if self.fail_respond.load(Ordering::SeqCst) {
            return Err(IntegrationError::Delivery("mock delivery failure".to_string()));
        }
        self.responses.lock().push(ctx.response().messages());
        Ok(())
    }
}

/// A middleware that records when it runs.
///
/// Continuing middleware log `name:before` and `name:after` around the rest
/// of the stack; terminal ones log `name` and stop.
#[derive(Debug)]
pub struct RecordingMiddleware {
    name: String,
    log: SharedLog,
    continues: bool,
}

impl RecordingMiddleware {
    /// Creates a recording middleware that continues the stack.
    #[must_use]
    pub fn new(name: impl Into<String>, log: SharedLog) -> Self {
        Self {
            name: name.into(),
            log,
            continues: true,
        }
    }

    /// Creates a recording middleware that ends the stack.
    #[must_use]
    pub fn terminal(name: impl Into<String>, log: SharedLog) -> Self {
        Self {
            name: name.into(),
            log,
            continues: false,
        }
    }
}

#[async_trait]
impl Middleware for RecordingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        if !self.continues {
            self.log.lock().push(self.name.clone());
            return Ok(());
        }

        self.log.lock().push(format!("{}:before", self.name));
        let result = next.run(ctx).await;
        self.log.lock().push(format!("{}:after", self.name));
        result
    }
}

/// A middleware that aborts the request, then tries to continue.
#[derive(Debug)]
pub struct AbortingMiddleware {
    name: String,
    message: String,
}

impl AbortingMiddleware {
    /// Creates a new aborting middleware.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Middleware for AbortingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        ctx.abort(self.message.as_str());
        next.run(ctx).await
    }
}

/// A middleware that never continues the stack.
#[derive(Debug)]
pub struct StopMiddleware {
    name: String,
}

impl StopMiddleware {
    /// Creates a new stop middleware.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Middleware for StopMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _ctx: &ExecutionContext, _next: Next<'_>) -> MiddlewareResult {
        Ok(())
    }
}
