//! Observability utilities.

mod subscriber;

pub use subscriber::{default_directive, init_tracing};
