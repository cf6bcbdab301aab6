//! Middleware that delivers the response once the stack below it finishes.

use super::{Middleware, MiddlewareResult, Next};
use crate::context::ExecutionContext;
use async_trait::async_trait;

/// Responds through the integration after downstream middleware ran.
///
/// Placing the responder in the stack moves delivery to its position, so
/// upstream middleware can still observe the request after the reply is
/// out. It turns off the pipeline's own auto-respond for the request, so
/// the reply is sent once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Responder;

#[async_trait]
impl Middleware for Responder {
    fn name(&self) -> &str {
        "responder"
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        next.run(ctx).await?;

        if ctx.is_aborted() || !ctx.auto_respond() {
            return Ok(());
        }

        ctx.set_auto_respond(false);
        if let Err(err) = ctx.integration().respond(ctx).await {
            ctx.error("responder", format!("Error during responding process: {err}"));
        }

        Ok(())
    }
}

/// Creates a responder middleware.
#[must_use]
pub fn responder() -> Responder {
    Responder
}
