//! Request events for observability.
//!
//! Every [`ExecutionContext`](crate::context::ExecutionContext) publishes
//! structured events (request start/end, handler calls, flag access, log
//! lines) onto an [`EventBus`]. The bus forwards them, in publish order, to a
//! single observer running on a background task.

mod bus;
mod event;
mod observers;

pub use bus::EventBus;
pub use event::{summarize_value, Event, EventKind, EventOrigin};
pub use observers::{CollectingObserver, EventObserver, LoggingObserver};
