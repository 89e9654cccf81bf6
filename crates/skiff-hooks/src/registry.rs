//! Hook registry.
//!
//! Stores handlers keyed by `(operation id, hook point)` and resolves a
//! per-operation view for execution. Registration order within a pair is
//! preserved; it is the execution order and part of the contract.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::handler::HookHandler;
use crate::resolved::ResolvedHooks;

type PointMap = HashMap<String, Vec<Arc<dyn HookHandler>>>;

/// Registry of hook handlers, shared between the wiring layer and the
/// dispatcher.
///
/// Cloning the registry clones a handle to the same underlying state.
/// Registration is expected during startup; `resolve` takes a snapshot so
/// execution never holds the registry lock.
#[derive(Clone, Default)]
pub struct HookRegistry {
    inner: Arc<RwLock<HashMap<String, PointMap>>>,
}

impl HookRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `(operation_id, point)`.
    ///
    /// Appends to the pair's list. The registry never deduplicates: the same
    /// handler registered twice runs twice.
    pub fn register(&self, operation_id: &str, point: &str, handler: Arc<dyn HookHandler>) {
        let mut map = self.inner.write();
        map.entry(operation_id.to_owned())
            .or_default()
            .entry(point.to_owned())
            .or_default()
            .push(handler);
        debug!(operation_id, point, "Registered hook handler");
    }

    /// Snapshot the handlers for one operation.
    ///
    /// The returned view is bound to `operation_id` and unaffected by
    /// registrations made after this call.
    #[must_use]
    pub fn resolve(&self, operation_id: &str) -> ResolvedHooks {
        let points = self
            .inner
            .read()
            .get(operation_id)
            .cloned()
            .unwrap_or_default();
        ResolvedHooks::new(operation_id.to_owned(), points)
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner
            .read()
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Number of handlers registered for one `(operation_id, point)` pair.
    #[must_use]
    pub fn count_for(&self, operation_id: &str, point: &str) -> usize {
        self.inner
            .read()
            .get(operation_id)
            .and_then(|points| points.get(point))
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("handler_count", &self.count())
            .finish()
    }
}
