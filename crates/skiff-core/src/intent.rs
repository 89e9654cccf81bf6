//! Intent — a typed request for the system to do or compute something.
//!
//! The `kind` string is the dispatch routing key: exactly one operation may
//! be registered per kind. Kinds are namespaced by convention, e.g.
//! `"workspace:open"` or `"app:shutdown"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed request routed through the dispatcher to one operation.
///
/// Intents are immutable from the caller's perspective. An interceptor that
/// wants to change one constructs a replacement via [`Intent::with_payload`]
/// (or [`Intent::new`]); nothing mutates an intent in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Routing key. Maps to exactly one registered operation.
    kind: String,
    /// Arbitrary JSON payload interpreted by the operation.
    payload: Value,
}

impl Intent {
    /// Create an intent with a payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create an intent with no payload (`null`).
    #[must_use]
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// The routing key.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Build a replacement intent with the same kind and a new payload.
    ///
    /// This is the transformation primitive for interceptors: the original
    /// intent is left untouched.
    #[must_use]
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            kind: self.kind.clone(),
            payload,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.kind)
    }
}
