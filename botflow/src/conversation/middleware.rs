//! Loads, decays and persists the conversation store around each turn.

use super::{ConversationState, SESSION_FLAG, STATE_FLAG};
use crate::context::ExecutionContext;
use crate::pipeline::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;

const SOURCE: &str = "conversation";

/// Middleware managing conversation contexts.
///
/// Must run after the session middleware, so the persisted store is
/// available as the `sess:_bctx` flag. The store is written back after the
/// rest of the stack returns, including when it aborted or failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationMiddleware;

#[async_trait]
impl Middleware for ConversationMiddleware {
    fn name(&self) -> &str {
        "conversation"
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        let mut state = load(ctx);
        state.begin_turn();

        match state.encode() {
            Ok(encoded) => ctx.flag(STATE_FLAG, encoded),
            Err(err) => {
                ctx.error(SOURCE, format!("Context encode error: {err}"));
                return next.run(ctx).await;
            }
        }

        ctx.trace(
            SOURCE,
            format!("Turn {} with contexts {:?}", state.sequence, state.active_names()),
        );

        let result = next.run(ctx).await;
        persist(ctx);
        result
    }
}

/// Creates the conversation middleware.
#[must_use]
pub fn middleware() -> ConversationMiddleware {
    ConversationMiddleware
}

fn load(ctx: &ExecutionContext) -> ConversationState {
    let Some(stored) = ctx.get_flag(SESSION_FLAG) else {
        return ConversationState::default();
    };

    ConversationState::decode(&stored).unwrap_or_else(|err| {
        ctx.error(SOURCE, format!("Context decode error, starting over: {err}"));
        ConversationState::default()
    })
}

fn persist(ctx: &ExecutionContext) {
    let Some(current) = ctx.get_flag(STATE_FLAG) else {
        ctx.error(SOURCE, "__bctx flag was removed; contexts of this turn are lost");
        return;
    };

    match ConversationState::decode(&current).and_then(|state| state.encode()) {
        Ok(encoded) => ctx.flag(SESSION_FLAG, encoded),
        Err(err) => ctx.error(SOURCE, format!("Error encoding updated context: {err}")),
    }
}
