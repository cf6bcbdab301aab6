//! Routing on the current intent and the active conversation contexts.

use super::current_intent;
use crate::context::ExecutionContext;
use crate::conversation::{self, ConversationState};
use crate::pipeline::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Condition {
    IntentOnly,
    All(Vec<String>),
    Any(Vec<String>),
    NoContext,
}

impl Condition {
    fn matches(&self, state: &ConversationState) -> bool {
        match self {
            Self::IntentOnly => true,
            Self::All(contexts) => state.has_all(contexts),
            Self::Any(contexts) => state.has_any(contexts),
            // Only considered once everything else failed.
            Self::NoContext => false,
        }
    }
}

struct Rule {
    condition: Condition,
    handler: Arc<dyn Middleware>,
}

/// Selects a handler from the intent flag and the active contexts.
///
/// For one request the router tries, in order:
///
/// 1. Without an `intent` flag, nothing: the stack continues.
/// 2. The rules registered for the intent, in registration order.
/// 3. The fallback rules, in registration order, whatever the intent.
/// 4. The first no-context rule of the intent, if no context is active.
///
/// The first match receives the router's continuation. Without a match
/// the stack continues.
///
/// All and any rules of the same intent have no priority over each other;
/// whichever was registered first is tried first.
pub struct ContextIntentRouter {
    name: String,
    rules: HashMap<String, Vec<Rule>>,
    fallbacks: Vec<Rule>,
}

impl ContextIntentRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::named("context-intent-router")
    }

    /// Creates an empty router with a custom name for events and logs.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: HashMap::new(),
            fallbacks: Vec::new(),
        }
    }

    fn add_for_intents(&mut self, intents: &[&str], condition: Condition, handler: Arc<dyn Middleware>) {
        for intent in intents {
            self.rules.entry((*intent).to_string()).or_default().push(Rule {
                condition: condition.clone(),
                handler: Arc::clone(&handler),
            });
        }
    }

    /// Matches when the intent is one of `intents`, whatever the contexts.
    pub fn intent_only<M>(&mut self, intents: &[&str], handler: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.add_for_intents(intents, Condition::IntentOnly, Arc::new(handler));
        self
    }

    /// Matches when the intent is one of `intents` and every context in
    /// `contexts` is active.
    pub fn all<M>(&mut self, intents: &[&str], contexts: &[&str], handler: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.add_for_intents(intents, Condition::All(to_owned(contexts)), Arc::new(handler));
        self
    }

    /// Matches when the intent is one of `intents` and at least one context
    /// in `contexts` is active.
    pub fn any<M>(&mut self, intents: &[&str], contexts: &[&str], handler: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.add_for_intents(intents, Condition::Any(to_owned(contexts)), Arc::new(handler));
        self
    }

    /// Matches when the intent is one of `intents` and no context is active.
    pub fn no_context<M>(&mut self, intents: &[&str], handler: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.add_for_intents(intents, Condition::NoContext, Arc::new(handler));
        self
    }

    /// Matches any intent when at least one of `contexts` is active.
    pub fn fallback_any<M>(&mut self, contexts: &[&str], handler: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.fallbacks.push(Rule {
            condition: Condition::Any(to_owned(contexts)),
            handler: Arc::new(handler),
        });
        self
    }

    /// Matches any intent when all of `contexts` are active.
    pub fn fallback_all<M>(&mut self, contexts: &[&str], handler: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.fallbacks.push(Rule {
            condition: Condition::All(to_owned(contexts)),
            handler: Arc::new(handler),
        });
        self
    }

    fn select(&self, intent: &str, state: &ConversationState) -> Option<&Rule> {
        let intent_rules = self.rules.get(intent);

        intent_rules
            .and_then(|rules| rules.iter().find(|rule| rule.condition.matches(state)))
            .or_else(|| self.fallbacks.iter().find(|rule| rule.condition.matches(state)))
            .or_else(|| {
                if !state.is_empty() {
                    return None;
                }
                intent_rules.and_then(|rules| {
                    rules
                        .iter()
                        .find(|rule| matches!(rule.condition, Condition::NoContext))
                })
            })
    }
}

fn to_owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

impl Default for ContextIntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextIntentRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut intents: Vec<&String> = self.rules.keys().collect();
        intents.sort();
        f.debug_struct("ContextIntentRouter")
            .field("name", &self.name)
            .field("intents", &intents)
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}

#[async_trait]
impl Middleware for ContextIntentRouter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        let state = conversation::snapshot(ctx)?;

        let Some(intent) = current_intent(ctx)? else {
            return next.run(ctx).await;
        };

        match self.select(&intent, &state) {
            Some(rule) => {
                ctx.debug(
                    &self.name,
                    format!("Intent '{intent}' routed to {}", rule.handler.name()),
                );
                next.delegate(rule.handler.as_ref(), ctx).await
            }
            None => {
                ctx.trace(&self.name, format!("No route for intent '{intent}'"));
                next.run(ctx).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Lifetime, STATE_FLAG};
    use crate::errors::{BotError, ConversationError};
    use crate::routing::INTENT_FLAG;
    use crate::testing::{test_context, RecordingMiddleware, SharedLog};
    use pretty_assertions::assert_eq;

    fn request(intent: Option<&str>, contexts: &[&str]) -> ExecutionContext {
        let ctx = test_context();
        let mut state = ConversationState::new();
        state.begin_turn();
        for name in contexts {
            state.add(*name, Lifetime::Turns(1), "test");
        }
        ctx.flag(STATE_FLAG, state.encode().unwrap());
        if let Some(intent) = intent {
            ctx.flag(INTENT_FLAG, intent);
        }
        ctx
    }

    async fn route(router: ContextIntentRouter, ctx: &ExecutionContext, log: &SharedLog) -> MiddlewareResult {
        let stack: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(router),
            Arc::new(RecordingMiddleware::new("tail", Arc::clone(log))),
        ];
        Next::new(&stack, 0).run(ctx).await
    }

    #[tokio::test]
    async fn test_all_registered_before_any_wins() {
        let log = SharedLog::default();
        let mut router = ContextIntentRouter::new();
        router
            .all(&["book_flight"], &["origin", "destination"], RecordingMiddleware::terminal("A", Arc::clone(&log)))
            .any(&["book_flight"], &["origin"], RecordingMiddleware::terminal("B", Arc::clone(&log)));

        let ctx = request(Some("book_flight"), &["origin", "destination"]);
        route(router, &ctx, &log).await.unwrap();

        assert_eq!(*log.lock(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_any_registered_first_wins() {
        let log = SharedLog::default();
        let mut router = ContextIntentRouter::new();
        router
            .any(&["book_flight"], &["origin"], RecordingMiddleware::terminal("B", Arc::clone(&log)))
            .all(&["book_flight"], &["origin", "destination"], RecordingMiddleware::terminal("A", Arc::clone(&log)));

        let ctx = request(Some("book_flight"), &["origin", "destination"]);
        route(router, &ctx, &log).await.unwrap();

        assert_eq!(*log.lock(), vec!["B"]);
    }

    #[tokio::test]
    async fn test_no_context_rule() {
        let build = |log: &SharedLog| {
            let mut router = ContextIntentRouter::new();
            router.no_context(&["greet"], RecordingMiddleware::terminal("C", Arc::clone(log)));
            router
        };

        let log = SharedLog::default();
        route(build(&log), &request(Some("greet"), &[]), &log).await.unwrap();
        assert_eq!(*log.lock(), vec!["C"]);

        let log = SharedLog::default();
        route(build(&log), &request(Some("greet"), &["booking"]), &log).await.unwrap();
        assert_eq!(*log.lock(), vec!["tail:before", "tail:after"]);
    }

    #[tokio::test]
    async fn test_missing_intent_falls_through() {
        let log = SharedLog::default();
        let mut router = ContextIntentRouter::new();
        router.fallback_any(&["booking"], RecordingMiddleware::terminal("F", Arc::clone(&log)));

        route(router, &request(None, &["booking"]), &log).await.unwrap();

        assert_eq!(*log.lock(), vec!["tail:before", "tail:after"]);
    }

    #[tokio::test]
    async fn test_fallbacks_after_intent_rules() {
        let log = SharedLog::default();
        let mut router = ContextIntentRouter::new();
        router
            .fallback_all(&["booking", "payment"], RecordingMiddleware::terminal("all", Arc::clone(&log)))
            .fallback_any(&["booking"], RecordingMiddleware::terminal("any", Arc::clone(&log)))
            .any(&["cancel"], &["payment"], RecordingMiddleware::terminal("cancel", Arc::clone(&log)));

        let ctx = request(Some("unknown"), &["booking"]);
        route(router, &ctx, &log).await.unwrap();

        assert_eq!(*log.lock(), vec!["any"]);
    }

    #[tokio::test]
    async fn test_fallback_beats_no_context() {
        let log = SharedLog::default();
        let mut router = ContextIntentRouter::new();
        router
            .no_context(&["greet"], RecordingMiddleware::terminal("C", Arc::clone(&log)))
            .fallback_all(&[], RecordingMiddleware::terminal("catch-all", Arc::clone(&log)));

        route(router, &request(Some("greet"), &[]), &log).await.unwrap();

        assert_eq!(*log.lock(), vec!["catch-all"]);
    }

    #[tokio::test]
    async fn test_intent_only_and_multiple_intents() {
        let log = SharedLog::default();
        let mut router = ContextIntentRouter::new();
        router.intent_only(&["hi", "hello"], RecordingMiddleware::terminal("greeter", Arc::clone(&log)));

        route(router, &request(Some("hello"), &["anything"]), &log).await.unwrap();

        assert_eq!(*log.lock(), vec!["greeter"]);
    }

    #[tokio::test]
    async fn test_handler_may_continue_chain() {
        let log = SharedLog::default();
        let mut router = ContextIntentRouter::new();
        router.intent_only(&["hi"], RecordingMiddleware::new("handler", Arc::clone(&log)));

        route(router, &request(Some("hi"), &[]), &log).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["handler:before", "tail:before", "tail:after", "handler:after"]
        );
    }

    #[tokio::test]
    async fn test_requires_conversation_state() {
        let log = SharedLog::default();
        let ctx = test_context();
        ctx.flag(INTENT_FLAG, "greet");

        let err = route(ContextIntentRouter::new(), &ctx, &log).await.unwrap_err();

        assert!(matches!(err, BotError::Conversation(ConversationError::NotInitialized)));
        assert!(log.lock().is_empty());
    }
}
