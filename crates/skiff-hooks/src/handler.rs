//! Hook handler trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::HookContext;
use crate::errors::HookError;

/// A handler contributed at one `(operation id, hook point)` pair.
///
/// Handlers fire in registration order. Each handler's outcome is isolated
/// by the registry: returning an error never stops later handlers and never
/// aborts the operation.
///
/// A handler with nothing to contribute returns `Value::Null`.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Execute against a read-only context.
    async fn call(&self, ctx: &HookContext) -> Result<Value, HookError>;
}

/// Wrap a synchronous closure as a hook handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn HookHandler>
where
    F: Fn(&HookContext) -> Result<Value, HookError> + Send + Sync + 'static,
{
    struct FnHandler<F>(F);

    #[async_trait]
    impl<F> HookHandler for FnHandler<F>
    where
        F: Fn(&HookContext) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        async fn call(&self, ctx: &HookContext) -> Result<Value, HookError> {
            (self.0)(ctx)
        }
    }

    Arc::new(FnHandler(f))
}
