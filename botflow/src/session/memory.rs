//! In-memory session store.

use super::{SessionData, SessionStore};
use crate::errors::SessionError;
use async_trait::async_trait;
use dashmap::DashMap;

/// A session store backed by a concurrent map.
///
/// Sessions live as long as the store; suitable for tests and single-process
/// bots.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionData>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, id: &str, data: SessionData) -> Result<(), SessionError> {
        self.sessions.insert(id.to_string(), data);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<SessionData, SessionError> {
        self.sessions
            .get(id)
            .map(|session| session.value().clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, data: SessionData) -> Result<(), SessionError> {
        self.sessions.entry(id.to_string()).or_default().extend(data);
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(pairs: &[(&str, serde_json::Value)]) -> SessionData {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_get_missing_session() {
        let store = InMemorySessionStore::new();
        assert_eq!(
            store.get("u1").await,
            Err(SessionError::NotFound("u1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_creates_then_merges() {
        let store = InMemorySessionStore::new();
        store.update("u1", data(&[("a", json!(1)), ("b", json!(2))])).await.unwrap();
        store.update("u1", data(&[("b", json!(3)), ("c", json!(4))])).await.unwrap();

        let session = store.get("u1").await.unwrap();
        assert_eq!(session, data(&[("a", json!(1)), ("b", json!(3)), ("c", json!(4))]));
    }

    #[tokio::test]
    async fn test_create_replaces() {
        let store = InMemorySessionStore::new();
        store.create("u1", data(&[("a", json!(1))])).await.unwrap();
        store.create("u1", data(&[("b", json!(2))])).await.unwrap();

        assert_eq!(store.get("u1").await.unwrap(), data(&[("b", json!(2))]));
    }

    #[tokio::test]
    async fn test_destroy() {
        let store = InMemorySessionStore::new();
        store.create("u1", SessionData::new()).await.unwrap();
        store.destroy("u1").await.unwrap();
        store.destroy("u1").await.unwrap();

        assert!(store.is_empty());
    }
}
