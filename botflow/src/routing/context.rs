//! Routing on predicates over the active conversation contexts.

use crate::context::ExecutionContext;
use crate::conversation::{self, ConversationState};
use crate::pipeline::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

type Matcher = Box<dyn Fn(&ConversationState) -> bool + Send + Sync>;

/// Runs the handler of the first matcher that accepts the conversation
/// state.
///
/// Needs the conversation middleware upstream; without it the router
/// fails with [`ConversationError::NotInitialized`](crate::errors::ConversationError::NotInitialized).
pub struct ContextRouter {
    name: String,
    routes: Vec<(Matcher, Arc<dyn Middleware>)>,
}

impl ContextRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "context-router".to_string(),
            routes: Vec::new(),
        }
    }

    /// Adds a route. Routes are tried in registration order.
    pub fn route<P, M>(&mut self, matcher: P, handler: M) -> &mut Self
    where
        P: Fn(&ConversationState) -> bool + Send + Sync + 'static,
        M: Middleware + 'static,
    {
        self.routes.push((Box::new(matcher), Arc::new(handler)));
        self
    }
}

impl Default for ContextRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRouter")
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[async_trait]
impl Middleware for ContextRouter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        let state = conversation::snapshot(ctx)?;
        let handler = self
            .routes
            .iter()
            .find(|(matcher, _)| matcher(&state))
            .map(|(_, handler)| handler);

        match handler {
            Some(handler) => next.delegate(handler.as_ref(), ctx).await,
            None => next.run(ctx).await,
        }
    }
}
