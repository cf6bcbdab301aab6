//! Single-consumer event bus.

use super::{Event, EventObserver};
use crate::errors::ConfigurationError;
use std::fmt;
use std::sync::OnceLock;
use tokio::sync::mpsc;

/// Forwards events to at most one observer.
///
/// Publishing never blocks: events go onto an unbounded channel drained by a
/// single background task, which calls the observer in publish order. Until
/// an observer is registered, [`EventBus::has_observer`] is false and
/// callers skip building events entirely.
#[derive(Default)]
pub struct EventBus {
    sender: OnceLock<mpsc::UnboundedSender<Event>>,
}

impl EventBus {
    /// Creates a bus with no observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus and registers `observer` on it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::NoRuntime` outside a tokio runtime.
    pub fn with_observer<O: EventObserver>(observer: O) -> Result<Self, ConfigurationError> {
        let bus = Self::new();
        bus.set_observer(observer)?;
        Ok(bus)
    }

    /// Registers the observer and starts the consumer task.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::ObserverAlreadySet` on a second call and
    /// `ConfigurationError::NoRuntime` when called outside a tokio runtime.
    pub fn set_observer<O: EventObserver>(&self, mut observer: O) -> Result<(), ConfigurationError> {
        if self.has_observer() {
            return Err(ConfigurationError::ObserverAlreadySet);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ConfigurationError::NoRuntime)?;
        let (sender, mut receiver) = mpsc::unbounded_channel::<Event>();

        self.sender
            .set(sender)
            .map_err(|_| ConfigurationError::ObserverAlreadySet)?;

        runtime.spawn(async move {
            while let Some(event) = receiver.recv().await {
                observer.on_event(event);
            }
            tracing::debug!("Event consumer stopped");
        });

        Ok(())
    }

    /// Returns true once an observer is registered.
    #[must_use]
    pub fn has_observer(&self) -> bool {
        self.sender.get().is_some()
    }

    /// Queues an event for the observer. A no-op without one.
    pub fn publish(&self, event: Event) {
        if let Some(sender) = self.sender.get() {
            if sender.send(event).is_err() {
                tracing::warn!("Event consumer is gone; dropping event");
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("has_observer", &self.has_observer())
            .finish()
    }
}
