//! Operation trait.

use async_trait::async_trait;
use serde_json::Value;

use skiff_core::errors::OperationError;

use crate::context::OperationContext;

/// The single registered handler that fulfills one intent kind.
///
/// `id` is a separate identifier used to scope hooks: handlers registered
/// against this ID run inside `execute` wherever the operation opens a hook
/// point. In practice each operation owns its ID, though multiple intent
/// kinds could share hook wiring through one.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Identifier scoping this operation's hooks.
    fn id(&self) -> &str;

    /// Execute the operation.
    ///
    /// Errors propagate to the dispatch caller wrapped with this
    /// operation's ID. Events already emitted through the context stay
    /// delivered regardless.
    async fn execute(&self, ctx: OperationContext) -> Result<Value, OperationError>;
}
