//! Conversation contexts: named, turn-scoped state kept in the session.
//!
//! The [`middleware`] loads the store from the `sess:_bctx` flag at the start
//! of a turn, decays it and exposes it under the internal `__bctx` flag.
//! Handlers use the free functions in this module to read and change it.
//! Once the rest of the stack is done the store is written back to the
//! session flag.
//!
//! ```rust,ignore
//! conversation::add(ctx, "booking", Lifetime::Turns(2))?;
//! conversation::set(ctx, "booking", "city", "Oslo")?;
//! ```

mod middleware;
mod state;

pub use middleware::{middleware, ConversationMiddleware};
pub use state::{ConversationContext, ConversationState, Lifetime};

use crate::context::ExecutionContext;
use crate::errors::{ConversationError, FlagError};

/// Session key the store is persisted under.
pub const SESSION_KEY: &str = "_bctx";

/// Flag mirroring [`SESSION_KEY`] in the session.
pub const SESSION_FLAG: &str = "sess:_bctx";

/// Internal flag holding the decoded store during a turn.
pub const STATE_FLAG: &str = "__bctx";

/// Source label used by [`add`].
pub const DEFAULT_SOURCE: &str = "none";

fn map_flag_error(err: FlagError) -> ConversationError {
    match err {
        FlagError::Missing { .. } => ConversationError::NotInitialized,
        other => ConversationError::Codec(other.to_string()),
    }
}

fn modify<R>(
    ctx: &ExecutionContext,
    f: impl FnOnce(&mut ConversationState) -> R,
) -> Result<R, ConversationError> {
    ctx.update_flag(STATE_FLAG, f).map_err(map_flag_error)
}

/// Returns a copy of the current store.
///
/// # Errors
///
/// [`ConversationError::NotInitialized`] if the conversation middleware
/// has not run for this request.
pub fn snapshot(ctx: &ExecutionContext) -> Result<ConversationState, ConversationError> {
    ctx.get_flag_as(STATE_FLAG).map_err(map_flag_error)
}

/// Adds or replaces a context born in the current turn.
pub fn add(ctx: &ExecutionContext, name: &str, lifetime: Lifetime) -> Result<(), ConversationError> {
    add_sourced(ctx, name, lifetime, DEFAULT_SOURCE)
}

/// Adds or replaces a context, recording where it came from.
pub fn add_sourced(
    ctx: &ExecutionContext,
    name: &str,
    lifetime: Lifetime,
    source: &str,
) -> Result<(), ConversationError> {
    modify(ctx, |state| state.add(name, lifetime, source))
}

/// Removes one context. Returns true if it was active.
pub fn clear(ctx: &ExecutionContext, name: &str) -> Result<bool, ConversationError> {
    modify(ctx, |state| state.remove(name))
}

/// Removes every context.
pub fn clear_all(ctx: &ExecutionContext) -> Result<(), ConversationError> {
    modify(ctx, ConversationState::clear)
}

/// Reads a value from a context's data bag.
///
/// Returns an empty string when the context or the key is absent.
pub fn get(ctx: &ExecutionContext, name: &str, key: &str) -> Result<String, ConversationError> {
    snapshot(ctx).map(|state| state.get_data(name, key))
}

/// Writes a value to a context's data bag.
///
/// Does nothing and returns false when the context is not active.
pub fn set(
    ctx: &ExecutionContext,
    name: &str,
    key: &str,
    value: impl Into<String>,
) -> Result<bool, ConversationError> {
    let value = value.into();
    modify(ctx, |state| state.set_data(name, key, value))
}

/// Returns true if the named context is active.
pub fn has(ctx: &ExecutionContext, name: &str) -> Result<bool, ConversationError> {
    snapshot(ctx).map(|state| state.contains(name))
}

/// Returns the names of all active contexts.
pub fn active(ctx: &ExecutionContext) -> Result<Vec<String>, ConversationError> {
    snapshot(ctx).map(|state| state.active_names())
}
