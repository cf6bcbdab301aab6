//! Testing utilities for bots.
//!
//! This module provides:
//! - A mock integration that records responses
//! - Recording, aborting and stopping middleware
//! - A ready-made execution context

mod mocks;

pub use mocks::{
    AbortingMiddleware, MockIntegration, RecordingMiddleware, SharedLog, StopMiddleware, TEST_USER_ID,
};

use crate::context::ExecutionContext;
use crate::integration::{InputContext, User};
use std::sync::Arc;

/// Creates a context for a request from the test user.
#[must_use]
pub fn test_context() -> ExecutionContext {
    ExecutionContext::new(Arc::new(MockIntegration::new()), serde_json::Value::Null)
        .with_user(User::new(TEST_USER_ID))
}

/// Wraps a raw request for [`Bot::execute`](crate::pipeline::Bot::execute).
#[must_use]
pub fn test_input(integration: &Arc<MockIntegration>, raw_request: serde_json::Value) -> InputContext {
    InputContext::new(Arc::clone(integration) as Arc<dyn crate::integration::Integration>, raw_request)
}
