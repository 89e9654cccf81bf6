//! Domain events broadcast to subscribers during operation execution.
//!
//! Events are never persisted. One exists only for the duration of its
//! synchronous delivery to the subscribers current at emit time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fact broadcast after or during operation execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Event kind, e.g. `"workspace:closed"`.
    kind: String,
    /// Arbitrary JSON payload.
    payload: Value,
}

impl DomainEvent {
    /// Create an event with a payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create an event with no payload (`null`).
    #[must_use]
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// The event kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

impl std::fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.kind)
    }
}
