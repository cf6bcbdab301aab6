//! Middleware dispatch and the bot pipeline.
//!
//! This module provides:
//! - The [`Middleware`] trait and the [`Next`] continuation
//! - The [`Bot`] that owns the stack and executes requests
//! - A [`Responder`] middleware for explicit response placement

mod bot;
mod middleware;
mod responder;


pub use bot::Bot;
pub use middleware::{from_fn, FnMiddleware, Middleware, MiddlewareResult, Next};
pub use responder::{responder, Responder};
