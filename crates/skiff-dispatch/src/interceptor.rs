//! Interceptors — ordered policies that run before an operation resolves.

use async_trait::async_trait;

use skiff_core::intent::Intent;

/// Decision returned by [`Interceptor::before`].
#[derive(Debug, Clone, PartialEq)]
pub enum InterceptDecision {
    /// Continue the dispatch with this intent (the original or a
    /// replacement built by the interceptor).
    Forward(Intent),
    /// Cancel the dispatch. The operation never runs, no events fire, and
    /// the handle resolves to nothing — a policy decision, not an error.
    Cancel,
}

impl InterceptDecision {
    /// Whether this decision cancels the dispatch.
    #[must_use]
    pub fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancel)
    }
}

/// A named, ordered policy that may transform or cancel an intent before
/// its operation runs.
///
/// Interceptors execute in ascending [`order`](Interceptor::order); equal
/// orders keep registration order. They receive the intent by value and
/// forward a (possibly replaced) intent to the next interceptor; nothing is
/// ever mutated in place.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Diagnostic identifier. Appears in log fields; never deduplicated on.
    fn id(&self) -> &str;

    /// Execution order. Lower runs first. Default: 0.
    fn order(&self) -> i32 {
        0
    }

    /// Inspect the intent before its operation resolves.
    async fn before(&self, intent: Intent) -> InterceptDecision;
}
