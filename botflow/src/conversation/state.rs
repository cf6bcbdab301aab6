//! The persisted conversation-context store.

use crate::errors::ConversationError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Remaining lifetime of a conversation context.
///
/// Persisted as an integer: `-1` never expires, anything else counts turns.
/// Negative values other than `-1` decode as an expired context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Lifetime {
    /// Expires after the given number of turns.
    Turns(u32),
    /// Never expires.
    Forever,
}

impl Lifetime {
    /// Returns true while the context should stay visible.
    #[must_use]
    pub fn is_alive(self) -> bool {
        match self {
            Self::Turns(turns) => turns > 0,
            Self::Forever => true,
        }
    }

    /// Returns the lifetime after one more turn has passed.
    #[must_use]
    pub fn decremented(self) -> Self {
        match self {
            Self::Turns(turns) => Self::Turns(turns.saturating_sub(1)),
            Self::Forever => Self::Forever,
        }
    }
}

impl From<i64> for Lifetime {
    fn from(value: i64) -> Self {
        match value {
            -1 => Self::Forever,
            n if n <= 0 => Self::Turns(0),
            n => Self::Turns(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }
}

impl From<Lifetime> for i64 {
    fn from(lifetime: Lifetime) -> Self {
        match lifetime {
            Lifetime::Turns(turns) => i64::from(turns),
            Lifetime::Forever => -1,
        }
    }
}

/// A named context attached to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    /// The context name.
    #[serde(alias = "n")]
    pub name: String,
    /// Where the context was added from, for debugging.
    #[serde(default, alias = "s")]
    pub source: String,
    /// The turn in which the context was added.
    #[serde(default, alias = "bs")]
    pub birth_sequence: u64,
    /// Turns left before the context expires.
    #[serde(alias = "cl")]
    pub current_lifetime: Lifetime,
    /// Handler-defined payload.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// All conversation contexts of one user, plus the turn counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Number of turns processed so far.
    #[serde(default, alias = "s")]
    pub sequence: u64,
    /// Live contexts by name.
    #[serde(default, alias = "c", deserialize_with = "null_as_empty")]
    pub contexts: BTreeMap<String, ConversationContext>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, ConversationContext>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<BTreeMap<String, ConversationContext>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl ConversationState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a persisted state.
    ///
    /// Accepts the object layout, a JSON-encoded string of it, and null
    /// (an empty state).
    pub fn decode(value: &serde_json::Value) -> Result<Self, ConversationError> {
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::String(encoded) if encoded.trim().is_empty() => Ok(Self::default()),
            serde_json::Value::String(encoded) => {
                serde_json::from_str(encoded).map_err(|err| ConversationError::Codec(err.to_string()))
            }
            serde_json::Value::Object(_) => {
                Self::deserialize(value).map_err(|err| ConversationError::Codec(err.to_string()))
            }
            other => Err(ConversationError::Codec(format!(
                "expected an object, found {}",
                crate::errors::json_type_name(other)
            ))),
        }
    }

    /// Encodes the state for the session.
    pub fn encode(&self) -> Result<serde_json::Value, ConversationError> {
        serde_json::to_value(self).map_err(|err| ConversationError::Codec(err.to_string()))
    }

    /// Starts a new turn.
    ///
    /// Increments the sequence, then takes one turn off every context born
    /// in an earlier turn and drops the ones that expired.
    pub fn begin_turn(&mut self) {
        self.sequence += 1;
        let sequence = self.sequence;

        for context in self.contexts.values_mut() {
            if context.birth_sequence < sequence {
                context.current_lifetime = context.current_lifetime.decremented();
            }
        }

        self.contexts.retain(|_, context| context.current_lifetime.is_alive());
    }

    /// Adds or replaces a context, born in the current turn.
    pub fn add(&mut self, name: impl Into<String>, lifetime: Lifetime, source: impl Into<String>) {
        let name = name.into();
        self.contexts.insert(
            name.clone(),
            ConversationContext {
                name,
                source: source.into(),
                birth_sequence: self.sequence,
                current_lifetime: lifetime,
                data: BTreeMap::new(),
            },
        );
    }

    /// Removes a context, returning true if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.contexts.remove(name).is_some()
    }

    /// Removes every context.
    pub fn clear(&mut self) {
        self.contexts.clear();
    }

    /// Returns the named context.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConversationContext> {
        self.contexts.get(name)
    }

    /// Returns true if the named context is active.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    /// Reads a value from a context's data bag; empty if either is absent.
    #[must_use]
    pub fn get_data(&self, name: &str, key: &str) -> String {
        self.contexts
            .get(name)
            .and_then(|context| context.data.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Writes a value to a context's data bag.
    ///
    /// Returns false, and changes nothing, when the context does not exist.
    pub fn set_data(&mut self, name: &str, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.contexts.get_mut(name) {
            Some(context) => {
                context.data.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Returns the names of all active contexts, sorted.
    #[must_use]
    pub fn active_names(&self) -> Vec<String> {
        self.contexts.keys().cloned().collect()
    }

    /// Returns true if every listed context is active.
    ///
    /// An empty list is trivially satisfied.
    #[must_use]
    pub fn has_all<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|name| self.contains(name.as_ref()))
    }

    /// Returns true if at least one listed context is active.
    #[must_use]
    pub fn has_any<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.contains(name.as_ref()))
    }

    /// Returns true if no context is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Returns the number of active contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }
}
