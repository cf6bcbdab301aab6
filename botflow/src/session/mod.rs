//! Per-user sessions mirrored into `sess:` flags.
//!
//! The [`middleware`] loads the user's session before the rest of the stack
//! runs, exposing every session key `k` as the flag `sess:k`, and writes the
//! `sess:` flags back to the store afterwards.

mod memory;
mod middleware;
mod store;

pub use memory::InMemorySessionStore;
pub use middleware::{clear_session, middleware, SessionMiddleware};
pub use store::{SessionData, SessionStore};

#[cfg(test)]
pub use store::MockSessionStore;
