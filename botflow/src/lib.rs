//! # Botflow
//!
//! The request-processing core of a conversational bot.
//!
//! Botflow provides:
//!
//! - **Middleware dispatch**: an ordered stack where each middleware decides
//!   whether the rest of the stack runs
//! - **Execution contexts**: per-request flags, abort, logging and events
//! - **Conversation contexts**: named state that expires after a number of
//!   turns, persisted in the user's session
//! - **Routing**: handler selection from the intent and active contexts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use botflow::prelude::*;
//!
//! let store = Arc::new(InMemorySessionStore::new());
//!
//! let mut router = ContextIntentRouter::new();
//! router
//!     .no_context(&["book_flight"], AskOrigin)
//!     .any(&["book_flight"], &["origin"], AskDestination);
//!
//! let mut bot = Bot::new();
//! bot.use_middleware(session::middleware(store))
//!     .use_middleware(conversation::middleware())
//!     .use_middleware(Nlu::new())
//!     .use_middleware(router);
//!
//! let ctx = bot.execute(InputContext::new(integration, raw_request)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod conversation;
pub mod errors;
pub mod events;
pub mod integration;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod session;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BotConfig, LogFormat};
    pub use crate::context::{ExecutionContext, LogEntry, LogLevel};
    pub use crate::conversation::{self, ConversationState, Lifetime};
    pub use crate::errors::{
        AbortError, BotError, ConfigurationError, ConversationError, FlagError, IntegrationError,
        SessionError,
    };
    pub use crate::events::{
        CollectingObserver, Event, EventKind, EventObserver, LoggingObserver,
    };
    pub use crate::integration::{GenericRequest, InputContext, Integration, Response, User};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{from_fn, responder, Bot, Middleware, MiddlewareResult, Next};
    pub use crate::routing::{
        ContextIntentRouter, ContextRouter, CustomRouter, IntentRouter, INTENT_FLAG,
    };
    pub use crate::session::{self, InMemorySessionStore, SessionStore};
}
