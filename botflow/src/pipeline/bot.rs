//! The bot: an ordered middleware stack shared by all requests.

use super::middleware::{dispatch, Middleware};
use crate::config::BotConfig;
use crate::context::ExecutionContext;
use crate::errors::{BotError, ConfigurationError};
use crate::events::{EventBus, EventKind, EventObserver};
use crate::integration::InputContext;
use std::fmt;
use std::sync::Arc;

/// Runs requests through an ordered middleware stack.
///
/// Middleware are appended during setup with [`Bot::use_middleware`], which
/// takes `&mut self`. Once the bot is shared (typically as `Arc<Bot>`) the
/// stack is read-only and any number of requests may execute concurrently.
pub struct Bot {
    config: BotConfig,
    middleware: Vec<Arc<dyn Middleware>>,
    events: Arc<EventBus>,
}

impl Bot {
    /// Creates a bot with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BotConfig::default())
    }

    /// Creates a bot with the given configuration.
    #[must_use]
    pub fn with_config(config: BotConfig) -> Self {
        Self {
            config,
            middleware: Vec::new(),
            events: Arc::new(EventBus::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Appends a middleware to the stack.
    pub fn use_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        tracing::debug!(middleware = middleware.name(), position = self.middleware.len(), "Registered middleware");
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registers the event observer for every request of this bot.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::ObserverAlreadySet`] if an observer
    /// is already registered.
    pub fn set_observer<O: EventObserver>(&self, observer: O) -> Result<(), ConfigurationError> {
        self.events.set_observer(observer)
    }

    /// Returns the event bus shared by all requests.
    #[must_use]
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Returns the number of registered middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns true if no middleware are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Returns the middleware names in stack order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Executes one request.
    ///
    /// Builds a fresh [`ExecutionContext`] from the input, runs the stack
    /// and, unless the request was aborted or a middleware disabled it,
    /// responds through the integration.
    ///
    /// # Errors
    ///
    /// - [`BotError::Aborted`] if a middleware aborted the request; the
    ///   error carries the context.
    /// - Any hard error returned by a middleware or by request extraction.
    ///
    /// Failures while responding are logged on the context and do not fail
    /// the request.
    pub async fn execute(&self, input: InputContext) -> Result<ExecutionContext, BotError> {
        let InputContext {
            raw_request,
            integration,
        } = input;

        let user = integration.user(&raw_request)?;
        let request = integration.generic_request(&raw_request)?;

        let ctx = ExecutionContext::new(Arc::clone(&integration), raw_request)
            .with_user(user)
            .with_request(request)
            .with_log_level(self.config.log_level)
            .with_auto_respond(self.config.auto_respond)
            .with_event_bus(Arc::clone(&self.events));

        tracing::debug!(
            request_id = %ctx.request_id(),
            user_id = %ctx.user().id,
            middleware = self.middleware.len(),
            "Executing request"
        );
        ctx.publish(|| EventKind::RequestStart);

        let result = dispatch(&self.middleware, 0, &ctx).await;
        let aborted = ctx.is_aborted();

        if result.is_ok() && !aborted && ctx.auto_respond() {
            if let Err(err) = integration.respond(&ctx).await {
                ctx.error("bot", format!("Error while auto responding: {err}"));
            }
        }

        ctx.publish(|| EventKind::RequestEnd { aborted });

        if let Err(err) = result {
            tracing::warn!(request_id = %ctx.request_id(), error = %err, "Request failed");
            return Err(err);
        }

        if let Some(reason) = ctx.abort_error() {
            tracing::debug!(request_id = %ctx.request_id(), reason = %reason, "Request aborted");
            return Err(BotError::Aborted {
                reason,
                context: Box::new(ctx),
            });
        }

        tracing::debug!(
            request_id = %ctx.request_id(),
            elapsed_ms = ctx.elapsed_ms(),
            "Request completed"
        );

        Ok(ctx)
    }
}

impl Default for Bot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("config", &self.config)
            .field("middleware", &self.middleware_names())
            .field("events", &self.events)
            .finish()
    }
}
