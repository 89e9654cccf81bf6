//! Dispatch handle — the dual-resolution result of one dispatch call.

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use skiff_core::errors::DispatchError;
use skiff_core::ids::DispatchId;

/// Handle for one dispatch call, separating "accepted by policy" from
/// "fully completed".
///
/// [`accepted`](IntentHandle::accepted) resolves as soon as the interceptor
/// chain has passed the intent and its operation is resolved — before the
/// operation's own work completes. Awaiting the handle itself (it is
/// [`IntoFuture`]) resolves to the final outcome:
///
/// - `Ok(Some(value))` — the operation completed,
/// - `Ok(None)` — an interceptor cancelled the dispatch (not an error),
/// - `Err(_)` — routing failed or the operation failed.
pub struct IntentHandle {
    dispatch_id: DispatchId,
    accepted_rx: Option<oneshot::Receiver<bool>>,
    accepted: Option<bool>,
    task: JoinHandle<Result<Option<Value>, DispatchError>>,
}

impl IntentHandle {
    pub(crate) fn new(
        dispatch_id: DispatchId,
        accepted_rx: oneshot::Receiver<bool>,
        task: JoinHandle<Result<Option<Value>, DispatchError>>,
    ) -> Self {
        Self {
            dispatch_id,
            accepted_rx: Some(accepted_rx),
            accepted: None,
            task,
        }
    }

    /// ID of this dispatch call, for log correlation.
    #[must_use]
    pub fn dispatch_id(&self) -> &DispatchId {
        &self.dispatch_id
    }

    /// Whether the dispatch was accepted: interceptors passed and an
    /// operation will execute.
    ///
    /// Resolves before the operation's own work completes. Reports `false`
    /// for a cancelled dispatch and for one that failed before execution
    /// began (the failure itself arrives through the handle's future).
    /// Repeated calls return the memoized answer.
    pub async fn accepted(&mut self) -> bool {
        if let Some(value) = self.accepted {
            return value;
        }
        let value = match self.accepted_rx.take() {
            Some(rx) => rx.await.unwrap_or(false),
            None => false,
        };
        self.accepted = Some(value);
        value
    }

    /// Wait for the final outcome of the dispatch.
    pub async fn outcome(self) -> Result<Option<Value>, DispatchError> {
        match self.task.await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Terminated),
        }
    }
}

impl IntoFuture for IntentHandle {
    type Output = Result<Option<Value>, DispatchError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.outcome())
    }
}

impl std::fmt::Debug for IntentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentHandle")
            .field("dispatch_id", &self.dispatch_id)
            .field("accepted", &self.accepted)
            .finish()
    }
}
