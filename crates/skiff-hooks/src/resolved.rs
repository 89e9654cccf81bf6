//! Per-operation hook execution view.
//!
//! [`ResolvedHooks`] is the view a dispatcher hands to an operation. Its two
//! execution modes differ only in what happens to handler outcomes:
//!
//! - [`run`](ResolvedHooks::run) — side-effect fan-out; failures are logged
//!   and dropped so every subsystem gets its turn.
//! - [`collect`](ResolvedHooks::collect) — outcomes are returned to the
//!   operation, which owns merge policy and error policy.
//!
//! In both modes every handler runs; there is no short-circuiting.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::context::HookContext;
use crate::errors::HookError;
use crate::handler::HookHandler;

/// Handlers for one operation, snapshotted at resolve time.
pub struct ResolvedHooks {
    operation_id: String,
    points: HashMap<String, Vec<Arc<dyn HookHandler>>>,
}

impl ResolvedHooks {
    pub(crate) fn new(
        operation_id: String,
        points: HashMap<String, Vec<Arc<dyn HookHandler>>>,
    ) -> Self {
        Self {
            operation_id,
            points,
        }
    }

    /// The operation this view is bound to.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Whether the operation has any handlers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.values().all(Vec::is_empty)
    }

    /// Number of handlers registered at a point.
    #[must_use]
    pub fn count_at(&self, point: &str) -> usize {
        self.points.get(point).map_or(0, Vec::len)
    }

    /// Invoke every handler at `point` in registration order, ignoring
    /// individual failures.
    ///
    /// Failures are logged and dropped. Use this for best-effort fan-out
    /// where each subsystem's side effect must be attempted regardless of
    /// the others.
    pub async fn run(&self, point: &str, ctx: &HookContext) {
        let Some(handlers) = self.points.get(point) else {
            return;
        };
        for handler in handlers {
            if let Err(error) = handler.call(ctx).await {
                warn!(
                    operation_id = %self.operation_id,
                    point,
                    %error,
                    "Hook handler failed; continuing"
                );
            }
        }
    }

    /// Invoke every handler at `point` in registration order and return all
    /// outcomes.
    ///
    /// `results` holds successful values in registration order; `errors`
    /// holds failures in the order they occurred. Every handler runs. Zero
    /// registered handlers yields two empty lists, which is success.
    pub async fn collect(&self, point: &str, ctx: &HookContext) -> HookOutcome {
        let mut outcome = HookOutcome::default();
        let Some(handlers) = self.points.get(point) else {
            return outcome;
        };
        for handler in handlers {
            match handler.call(ctx).await {
                Ok(value) => outcome.results.push(value),
                Err(error) => outcome.errors.push(error),
            }
        }
        outcome
    }
}

impl std::fmt::Debug for ResolvedHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHooks")
            .field("operation_id", &self.operation_id)
            .field("point_count", &self.points.len())
            .finish()
    }
}

/// Outcomes of a [`collect`](ResolvedHooks::collect) pass.
///
/// The registry is agnostic to what these mean; the operation decides
/// whether errors are fatal and how multiple results merge.
#[derive(Debug, Default)]
pub struct HookOutcome {
    /// Successful handler values, registration order.
    pub results: Vec<Value>,
    /// Handler failures, occurrence order.
    pub errors: Vec<HookError>,
}

impl HookOutcome {
    /// Whether no handler failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Last successful value — the conventional last-registered-wins merge.
    #[must_use]
    pub fn last(&self) -> Option<&Value> {
        self.results.last()
    }
}
