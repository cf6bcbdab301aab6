//! Request identity for tracking individual turns.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of generated request identifiers.
const REQUEST_ID_LEN: usize = 8;

/// Identifies a single request flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIdentity {
    /// Short random identifier, used to correlate log lines.
    pub request_id: String,

    /// Wall-clock time the request entered the pipeline.
    pub created_at: DateTime<Utc>,
}

impl RequestIdentity {
    /// Creates a new identity with a generated request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: generate_request_id(),
            created_at: Utc::now(),
        }
    }

    /// Creates an identity with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            created_at: Utc::now(),
        }
    }
}

impl Default for RequestIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a short alphanumeric request identifier.
#[must_use]
pub fn generate_request_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LEN)
        .map(char::from)
        .collect()
}
