//! Event observer trait and implementations.

use super::Event;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Level};

/// Receives events from the [`EventBus`](super::EventBus).
///
/// Called synchronously on the consumer task, one event at a time. A slow
/// observer delays every later event, so keep it cheap.
pub trait EventObserver: Send + 'static {
    /// Handles one event.
    fn on_event(&mut self, event: Event);
}

impl<F> EventObserver for F
where
    F: FnMut(Event) + Send + 'static,
{
    fn on_event(&mut self, event: Event) {
        self(event);
    }
}

/// An observer that writes events to the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingObserver {
    /// Creates a new logging observer with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates an info-level logging observer.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventObserver for LoggingObserver {
    fn on_event(&mut self, event: Event) {
        if self.level == Level::INFO {
            info!(
                event_type = event.name(),
                request_id = %event.origin.request_id,
                event_data = ?event.kind,
                "Event: {}", event.name()
            );
        } else {
            debug!(
                event_type = event.name(),
                request_id = %event.origin.request_id,
                event_data = ?event.kind,
                "Event: {}", event.name()
            );
        }
    }
}

/// A collecting observer for tests.
///
/// Clones share the same buffer, so keep one clone and hand the other to
/// the bus.
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Returns the names of all collected events.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::name).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Waits until at least `count` events arrived or `timeout` passed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.len() < count {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }
}

impl EventObserver for CollectingObserver {
    fn on_event(&mut self, event: Event) {
        self.events.lock().push(event);
    }
}
