//! Read-only context passed to hook handlers.

use serde_json::Value;

use skiff_core::causation::CausationChain;
use skiff_core::intent::Intent;

/// Snapshot of the execution state a hook handler may inspect.
///
/// Fields are private and exposed through accessors only, and handlers
/// receive the context by shared reference. Mutating the caller's state from
/// inside a handler is therefore not writable: handlers contribute through
/// their return values, never by editing shared state.
#[derive(Clone, Debug)]
pub struct HookContext {
    intent: Intent,
    causation: CausationChain,
    data: Value,
}

impl HookContext {
    /// Build a context for an intent and its causation chain.
    #[must_use]
    pub fn new(intent: Intent, causation: CausationChain) -> Self {
        Self {
            intent,
            causation,
            data: Value::Null,
        }
    }

    /// Attach operation-supplied data for handlers at this point.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// The intent being executed.
    #[must_use]
    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    /// Why the operation is running.
    #[must_use]
    pub fn causation(&self) -> &CausationChain {
        &self.causation
    }

    /// Data the operation chose to expose at this hook point.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }
}
