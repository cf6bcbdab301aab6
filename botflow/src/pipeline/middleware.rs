//! Middleware trait and continuation-passing dispatch.

use crate::context::ExecutionContext;
use crate::errors::BotError;
use crate::events::EventKind;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

/// The result of running a middleware.
///
/// `Err` is a hard failure and unwinds the whole stack. Business failures
/// are latched with [`ExecutionContext::abort`] instead.
pub type MiddlewareResult = Result<(), BotError>;

/// A unit of request processing.
///
/// A middleware receives the request context and a [`Next`] handle. Running
/// the handle continues with the rest of the stack; dropping it
/// short-circuits the request without an error. Work placed after
/// `next.run(ctx).await` runs once the downstream middleware have finished.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Returns the name used in events and logs.
    fn name(&self) -> &str;

    /// Handles the request.
    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult;
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        (**self).handle(ctx, next).await
    }
}

/// Continuation into the rest of the middleware stack.
///
/// `Next` is consumed when run, so a middleware cannot continue the chain
/// twice.
pub struct Next<'a> {
    stack: &'a [Arc<dyn Middleware>],
    index: usize,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stack: &'a [Arc<dyn Middleware>], index: usize) -> Self {
        Self { stack, index }
    }

    /// Returns the stack position this handle will run.
    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Returns the number of middleware left to run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stack.len().saturating_sub(self.index)
    }

    /// Runs the rest of the stack.
    pub async fn run(self, ctx: &ExecutionContext) -> MiddlewareResult {
        dispatch(self.stack, self.index, ctx).await
    }

    /// Hands control to `handler`, passing this continuation along.
    ///
    /// Routers use this to invoke the handler they selected. The handler
    /// is reported at the router's own stack position.
    pub async fn delegate(self, handler: &dyn Middleware, ctx: &ExecutionContext) -> MiddlewareResult {
        let position = self.index.saturating_sub(1);
        ctx.publish(|| EventKind::HandlerInvoked {
            handler: handler.name().to_string(),
            stack_position: position,
        });
        handler.handle(ctx, self).await
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("len", &self.stack.len())
            .finish()
    }
}

/// Runs the middleware at `index`, unless the request was aborted or the
/// stack is exhausted.
pub(crate) fn dispatch<'a>(
    stack: &'a [Arc<dyn Middleware>],
    index: usize,
    ctx: &'a ExecutionContext,
) -> BoxFuture<'a, MiddlewareResult> {
    async move {
        if ctx.is_aborted() {
            tracing::trace!(request_id = %ctx.request_id(), index, "Skipping middleware after abort");
            return Ok(());
        }

        let Some(middleware) = stack.get(index) else {
            return Ok(());
        };

        ctx.publish(|| EventKind::HandlerInvoked {
            handler: middleware.name().to_string(),
            stack_position: index,
        });

        middleware.handle(ctx, Next::new(stack, index + 1)).await
    }
    .boxed()
}

/// A middleware built from a closure.
pub struct FnMiddleware<F> {
    name: String,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a ExecutionContext, Next<'a>) -> BoxFuture<'a, MiddlewareResult> + Send + Sync,
{
    /// Creates a new function-based middleware.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a ExecutionContext, Next<'a>) -> BoxFuture<'a, MiddlewareResult> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        (self.func)(ctx, next).await
    }
}

/// Creates a middleware from a closure returning a boxed future.
///
/// ```rust,ignore
/// let greet = from_fn("greet", |ctx, next| {
///     async move {
///         ctx.response().text("Hello!");
///         next.run(ctx).await
///     }
///     .boxed()
/// });
/// ```
pub fn from_fn<F>(name: impl Into<String>, func: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a ExecutionContext, Next<'a>) -> BoxFuture<'a, MiddlewareResult> + Send + Sync,
{
    FnMiddleware::new(name, func)
}
