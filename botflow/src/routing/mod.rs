//! Routers: middleware that pick one handler for the current request.
//!
//! Every router hands its own [`Next`](crate::pipeline::Next) to the handler
//! it selects, so the handler decides whether the rest of the stack runs.
//! When nothing matches, the router continues the stack itself.

mod context;
mod context_intent;
mod custom;
mod intent;

pub use context::ContextRouter;
pub use context_intent::ContextIntentRouter;
pub use custom::CustomRouter;
pub use intent::IntentRouter;

use crate::context::ExecutionContext;
use crate::errors::{BotError, FlagError};

/// Flag holding the intent resolved for the current request.
pub const INTENT_FLAG: &str = "intent";

/// Reads the intent flag. A missing flag is `None`; a non-string one is an
/// error.
fn current_intent(ctx: &ExecutionContext) -> Result<Option<String>, BotError> {
    match ctx.get_string_flag(INTENT_FLAG) {
        Ok(intent) => Ok(Some(intent)),
        Err(FlagError::Missing { .. }) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
