//! Routing on the intent flag alone.

use super::current_intent;
use crate::context::ExecutionContext;
use crate::pipeline::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps intents to handlers.
///
/// A request without an intent, or with one nobody registered, continues
/// down the stack.
pub struct IntentRouter {
    name: String,
    handlers: HashMap<String, Arc<dyn Middleware>>,
}

impl IntentRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "intent-router".to_string(),
            handlers: HashMap::new(),
        }
    }

    /// Routes `intent` to `handler`, replacing any earlier handler.
    pub fn intent<M>(&mut self, intent: impl Into<String>, handler: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.handlers.insert(intent.into(), Arc::new(handler));
        self
    }

    /// Returns the number of routed intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no intent is routed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentRouter")
            .field("intents", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Middleware for IntentRouter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        let handler = current_intent(ctx)?.and_then(|intent| self.handlers.get(&intent));

        match handler {
            Some(handler) => next.delegate(handler.as_ref(), ctx).await,
            None => next.run(ctx).await,
        }
    }
}
