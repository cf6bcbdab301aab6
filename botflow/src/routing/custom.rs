//! Routing on arbitrary predicates over the request.

use crate::context::ExecutionContext;
use crate::pipeline::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

type Predicate = Box<dyn Fn(&ExecutionContext) -> bool + Send + Sync>;

/// Runs the handler of the first predicate that holds.
pub struct CustomRouter {
    name: String,
    routes: Vec<(Predicate, Arc<dyn Middleware>)>,
}

impl CustomRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "custom-router".to_string(),
            routes: Vec::new(),
        }
    }

    /// Adds a route. Routes are tried in registration order.
    pub fn route<P, M>(&mut self, predicate: P, handler: M) -> &mut Self
    where
        P: Fn(&ExecutionContext) -> bool + Send + Sync + 'static,
        M: Middleware + 'static,
    {
        self.routes.push((Box::new(predicate), Arc::new(handler)));
        self
    }
}

impl Default for CustomRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CustomRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRouter")
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[async_trait]
impl Middleware for CustomRouter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        let handler = self
            .routes
            .iter()
            .find(|(predicate, _)| predicate(ctx))
            .map(|(_, handler)| handler);

        match handler {
            Some(handler) => next.delegate(handler.as_ref(), ctx).await,
            None => next.run(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_context, RecordingMiddleware, SharedLog};

    #[tokio::test]
    async fn test_first_matching_predicate_wins() {
        let log = SharedLog::default();
        let mut router = CustomRouter::new();
        router
            .route(|ctx| ctx.request().text.starts_with('/'), RecordingMiddleware::terminal("command", Arc::clone(&log)))
            .route(|_| true, RecordingMiddleware::terminal("catch-all", Arc::clone(&log)));

        let stack: Vec<Arc<dyn Middleware>> = vec![Arc::new(router)];
        let ctx = test_context().with_request(crate::integration::GenericRequest::text("/start"));
        Next::new(&stack, 0).run(&ctx).await.unwrap();

        assert_eq!(*log.lock(), vec!["command"]);
    }

    #[tokio::test]
    async fn test_no_match_continues() {
        let log = SharedLog::default();
        let mut router = CustomRouter::new();
        router.route(|ctx| ctx.has_flag("never"), RecordingMiddleware::terminal("never", Arc::clone(&log)));

        let stack: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(router),
            Arc::new(RecordingMiddleware::new("tail", Arc::clone(&log))),
        ];
        Next::new(&stack, 0).run(&test_context()).await.unwrap();

        assert_eq!(*log.lock(), vec!["tail:before", "tail:after"]);
    }
}
