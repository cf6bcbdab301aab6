//! Maps the user's session to `sess:` flags around each request.

use super::{SessionData, SessionStore};
use crate::context::{ExecutionContext, SESSION_PREFIX};
use crate::errors::SessionError;
use crate::pipeline::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

const SOURCE: &str = "session";

/// Loads and saves the session of the requesting user.
///
/// Store failures are logged on the context and never fail the request.
/// When the session cannot be loaded it is not written back either, so a
/// failed read never overwrites stored keys. Keys whose `sess:` flag was cleared during the request are removed from
/// the store by replacing the session; otherwise it is merged.
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
}

impl SessionMiddleware {
    /// Creates a session middleware over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

impl fmt::Debug for SessionMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMiddleware").finish_non_exhaustive()
    }
}

/// Creates a session middleware over `store`.
pub fn middleware<S>(store: Arc<S>) -> SessionMiddleware
where
    S: SessionStore + 'static,
{
    SessionMiddleware::new(store)
}

#[async_trait]
impl Middleware for SessionMiddleware {
    fn name(&self) -> &str {
        "session"
    }

    async fn handle(&self, ctx: &ExecutionContext, next: Next<'_>) -> MiddlewareResult {
        let user_id = ctx.user().id.clone();

        let session = match self.store.get(&user_id).await {
            Ok(session) => session,
            Err(SessionError::NotFound(_)) => SessionData::new(),
            Err(err) => {
                ctx.error(SOURCE, format!("Error while loading the session: {err}"));
                let result = next.run(ctx).await;
                ctx.warn(SOURCE, "Session was not loaded; skipping write-back");
                return result;
            }
        };

        let loaded: Vec<String> = session.keys().cloned().collect();
        for (key, value) in session {
            ctx.flag(format!("{SESSION_PREFIX}{key}"), value);
        }

        let result = next.run(ctx).await;

        let data = read_session_flags(ctx);
        let cleared = loaded.iter().any(|key| !data.contains_key(key));

        let saved = if cleared {
            self.store.create(&user_id, data).await
        } else {
            self.store.update(&user_id, data).await
        };

        if let Err(err) = saved {
            ctx.error(SOURCE, format!("Error while updating the session: {err}"));
        }

        result
    }
}

fn read_session_flags(ctx: &ExecutionContext) -> SessionData {
    ctx.flags_with_prefix(SESSION_PREFIX)
        .into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(SESSION_PREFIX)
                .map(|stripped| (stripped.to_string(), value))
        })
        .collect()
}

/// Clears every session flag of the request.
///
/// With the session middleware installed the cleared keys are also removed
/// from the store when the request completes.
pub fn clear_session(ctx: &ExecutionContext) {
    let keys: Vec<String> = ctx
        .flags_with_prefix(SESSION_PREFIX)
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    ctx.clear_flag(keys);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{self, ConversationState, Lifetime};
    use crate::pipeline::from_fn;
    use crate::session::{InMemorySessionStore, MockSessionStore};
    use crate::testing::test_context;
    use futures::FutureExt;
    use serde_json::json;

    async fn run(store: Arc<dyn SessionStore>, handler: Arc<dyn Middleware>) -> ExecutionContext {
        let stack: Vec<Arc<dyn Middleware>> = vec![Arc::new(SessionMiddleware::new(store)), handler];
        let ctx = test_context();
        Next::new(&stack, 0).run(&ctx).await.unwrap();
        ctx
    }

    fn counter() -> Arc<dyn Middleware> {
        Arc::new(from_fn("counter", |ctx, next| {
            async move {
                let visits = ctx.get_int_flag("sess:visits").unwrap_or(0);
                ctx.flag("sess:visits", visits + 1);
                next.run(ctx).await
            }
            .boxed()
        }))
    }

    #[tokio::test]
    async fn test_round_trips_session_flags() {
        let store = Arc::new(InMemorySessionStore::new());

        let first = run(store.clone(), counter()).await;
        assert_eq!(first.get_int_flag("sess:visits").unwrap(), 1);

        let second = run(store.clone(), counter()).await;
        assert_eq!(second.get_int_flag("sess:visits").unwrap(), 2);

        let user_id = second.user().id.clone();
        let session = store.get(&user_id).await.unwrap();
        assert_eq!(session.get("visits"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_clear_session_removes_stored_keys() {
        let store = Arc::new(InMemorySessionStore::new());
        run(store.clone(), counter()).await;

        let clearing: Arc<dyn Middleware> = Arc::new(from_fn("clearing", |ctx, next| {
            async move {
                clear_session(ctx);
                next.run(ctx).await
            }
            .boxed()
        }));
        let ctx = run(store.clone(), clearing).await;

        assert!(!ctx.has_flag("sess:visits"));
        let session = store.get(&ctx.user().id).await.unwrap();
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_store_failures_are_logged() {
        let mut store = MockSessionStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Ok(SessionData::new()));
        store
            .expect_update()
            .times(1)
            .returning(|_, _| Err(SessionError::Backend("offline".to_string())));

        let ctx = run(Arc::new(store), counter()).await;

        let errors: Vec<String> = ctx
            .logs()
            .into_iter()
            .filter(|entry| entry.source == SOURCE)
            .map(|entry| entry.message)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("offline"));
        assert_eq!(ctx.get_int_flag("sess:visits").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_skips_write_back() {
        let mut store = MockSessionStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Err(SessionError::Backend("timeout".to_string())));
        store.expect_update().never();
        store.expect_create().never();

        let ctx = run(Arc::new(store), counter()).await;

        assert!(ctx
            .logs()
            .iter()
            .any(|entry| entry.message.contains("timeout")));
        assert_eq!(ctx.get_int_flag("sess:visits").unwrap(), 1);
    }

    /// Store whose reads fail while writes go through to memory.
    struct UnreadableStore {
        inner: InMemorySessionStore,
    }

    #[async_trait]
    impl SessionStore for UnreadableStore {
        async fn create(&self, id: &str, data: SessionData) -> Result<(), SessionError> {
            self.inner.create(id, data).await
        }

        async fn get(&self, _id: &str) -> Result<SessionData, SessionError> {
            Err(SessionError::Backend("timeout".to_string()))
        }

        async fn update(&self, id: &str, data: SessionData) -> Result<(), SessionError> {
            self.inner.update(id, data).await
        }

        async fn destroy(&self, id: &str) -> Result<(), SessionError> {
            self.inner.destroy(id).await
        }
    }

    #[tokio::test]
    async fn test_failed_load_keeps_stored_conversation() {
        let mut stored = ConversationState::new();
        stored.sequence = 5;
        stored.add("profile", Lifetime::Forever, "signup");
        let inner = InMemorySessionStore::new();
        let user_id = test_context().user().id.clone();
        let mut session = SessionData::new();
        session.insert(conversation::SESSION_KEY.to_string(), stored.encode().unwrap());
        inner.create(&user_id, session).await.unwrap();

        let store = Arc::new(UnreadableStore { inner });
        let stack: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(SessionMiddleware::new(store.clone())),
            Arc::new(conversation::middleware()),
        ];
        let ctx = test_context();
        Next::new(&stack, 0).run(&ctx).await.unwrap();

        let kept = store.inner.get(&user_id).await.unwrap();
        let state = ConversationState::decode(&kept[conversation::SESSION_KEY]).unwrap();
        assert_eq!(state.sequence, 5);
        assert!(state.contains("profile"));
    }
}
