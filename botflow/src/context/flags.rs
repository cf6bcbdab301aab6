//! Thread-safe flag store.

use crate::errors::{json_type_name, FlagError};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Prefix of flags mirrored to and from the session store.
pub const SESSION_PREFIX: &str = "sess:";

/// Flag holding the structured request log.
pub const LOGS_FLAG: &str = "__logs";

/// A mutex-guarded map of request flags.
///
/// Unlike a plain map, every operation takes the lock exactly once, so
/// read-modify-write helpers such as [`FlagStore::update`] are atomic with
/// respect to other writers of the same request.
#[derive(Debug, Default)]
pub struct FlagStore {
    flags: Mutex<HashMap<String, serde_json::Value>>,
}

impl FlagStore {
    /// Creates a new empty flag store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a flag, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
        self.flags.lock().insert(key.into(), value)
    }

    /// Gets a copy of a flag value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.flags.lock().get(key).cloned()
    }

    /// Checks if a flag is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.flags.lock().contains_key(key)
    }

    /// Removes every listed key that is present, returning the removed ones.
    pub fn remove_all(&self, keys: &[String]) -> Vec<String> {
        let mut flags = self.flags.lock();
        keys.iter()
            .filter(|key| flags.remove(key.as_str()).is_some())
            .cloned()
            .collect()
    }

    /// Appends a value to an array flag, creating the array if needed.
    ///
    /// A non-array value under `key` is replaced.
    pub fn append(&self, key: &str, value: serde_json::Value) {
        let mut flags = self.flags.lock();
        let slot = flags
            .entry(key.to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));

        match slot {
            serde_json::Value::Array(items) => items.push(value),
            other => *other = serde_json::Value::Array(vec![value]),
        }
    }

    /// Decodes a flag, applies `f` to it and stores the result.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::Missing` if the flag is not set, and
    /// `FlagError::TypeMismatch` if it does not decode as `T`.
    pub fn update<T, R, F>(&self, key: &str, f: F) -> Result<R, FlagError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> R,
    {
        let mut flags = self.flags.lock();
        let slot = flags.get_mut(key).ok_or_else(|| FlagError::missing(key))?;

        let found = json_type_name(slot);
        let mut decoded: T =
            serde_json::from_value(slot.clone()).map_err(|_| FlagError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
                found,
            })?;

        let output = f(&mut decoded);

        *slot = serde_json::to_value(&decoded).map_err(|err| FlagError::Serialization {
            key: key.to_string(),
            message: err.to_string(),
        })?;

        Ok(output)
    }

    /// Returns all flags whose key starts with `prefix`.
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Vec<(String, serde_json::Value)> {
        self.flags
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns all keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.flags.lock().keys().cloned().collect()
    }

    /// Returns the number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.lock().len()
    }

    /// Returns true if no flags are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Counter {
        hits: u32,
    }

    #[test]
    fn test_insert_and_get() {
        let store = FlagStore::new();
        assert!(store.insert("intent", serde_json::json!("greet")).is_none());

        assert_eq!(store.get("intent"), Some(serde_json::json!("greet")));
        assert!(store.contains("intent"));
        assert!(!store.contains("other"));
    }

    #[test]
    fn test_insert_overwrites() {
        let store = FlagStore::new();
        store.insert("k", serde_json::json!(1));
        let previous = store.insert("k", serde_json::json!(2));

        assert_eq!(previous, Some(serde_json::json!(1)));
        assert_eq!(store.get("k"), Some(serde_json::json!(2)));
    }

    #[test]
    fn test_remove_all_reports_removed_keys() {
        let store = FlagStore::new();
        store.insert("a", serde_json::json!(1));
        store.insert("b", serde_json::json!(2));

        let removed = store.remove_all(&["a".to_string(), "missing".to_string()]);
        assert_eq!(removed, vec!["a".to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_creates_array() {
        let store = FlagStore::new();
        store.append(LOGS_FLAG, serde_json::json!("first"));
        store.append(LOGS_FLAG, serde_json::json!("second"));

        assert_eq!(store.get(LOGS_FLAG), Some(serde_json::json!(["first", "second"])));
    }

    #[test]
    fn test_append_replaces_non_array() {
        let store = FlagStore::new();
        store.insert(LOGS_FLAG, serde_json::json!("oops"));
        store.append(LOGS_FLAG, serde_json::json!(1));

        assert_eq!(store.get(LOGS_FLAG), Some(serde_json::json!([1])));
    }

    #[test]
    fn test_update_round_trips_typed_value() {
        let store = FlagStore::new();
        store.insert("counter", serde_json::json!({"hits": 1}));

        let hits = store
            .update("counter", |c: &mut Counter| {
                c.hits += 1;
                c.hits
            })
            .unwrap();

        assert_eq!(hits, 2);
        assert_eq!(store.get("counter"), Some(serde_json::json!({"hits": 2})));
    }

    #[test]
    fn test_update_missing_flag() {
        let store = FlagStore::new();
        let result = store.update("counter", |c: &mut Counter| c.hits);
        assert_eq!(result, Err(FlagError::missing("counter")));
    }

    #[test]
    fn test_update_type_mismatch_leaves_value() {
        let store = FlagStore::new();
        store.insert("counter", serde_json::json!("nope"));

        let result = store.update("counter", |c: &mut Counter| c.hits);
        assert!(matches!(result, Err(FlagError::TypeMismatch { found: "string", .. })));
        assert_eq!(store.get("counter"), Some(serde_json::json!("nope")));
    }

    #[test]
    fn test_with_prefix() {
        let store = FlagStore::new();
        store.insert("sess:name", serde_json::json!("Ada"));
        store.insert("sess:_bctx", serde_json::json!({}));
        store.insert("intent", serde_json::json!("greet"));

        let mut keys: Vec<String> = store
            .with_prefix(SESSION_PREFIX)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        keys.sort();

        assert_eq!(keys, vec!["sess:_bctx".to_string(), "sess:name".to_string()]);
    }
}
