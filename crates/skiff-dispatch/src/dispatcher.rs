//! The dispatcher — operation registry, interceptor chain, event
//! subscribers, and the dispatch pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use skiff_core::causation::CausationChain;
use skiff_core::errors::DispatchError;
use skiff_core::event::DomainEvent;
use skiff_core::ids::DispatchId;
use skiff_core::intent::Intent;
use skiff_hooks::registry::HookRegistry;

use crate::context::OperationContext;
use crate::handle::IntentHandle;
use crate::interceptor::{InterceptDecision, Interceptor};
use crate::operation::Operation;

/// A subscriber invoked synchronously for each matching event.
///
/// Delivery is "fire and forward": `emit` calls every subscriber inline and
/// returns once all have been invoked. A subscriber that needs async work
/// spawns it itself; the dispatcher does not await anything on its behalf.
pub trait EventSubscriber: Send + Sync {
    /// Handle one delivered event.
    fn on_event(&self, event: &DomainEvent);
}

impl<F> EventSubscriber for F
where
    F: Fn(&DomainEvent) + Send + Sync,
{
    fn on_event(&self, event: &DomainEvent) {
        self(event);
    }
}

struct SubscriberEntry {
    seq: u64,
    subscriber: Arc<dyn EventSubscriber>,
}

struct Inner {
    operations: RwLock<HashMap<String, Arc<dyn Operation>>>,
    /// Kept sorted by `order()` ascending; ties keep insertion order.
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
    subscribers: RwLock<HashMap<String, Vec<SubscriberEntry>>>,
    hooks: HookRegistry,
    next_seq: AtomicU64,
}

/// The intent dispatch core.
///
/// A cheap-clone handle: registrants and operation contexts hold clones of
/// the same underlying instance. Construct one explicitly and pass it to
/// everything that registers — there is no process-global dispatcher, so
/// independent cores can coexist (and tests get a fresh one each).
///
/// Registration (`register_operation`, `add_interceptor`, `subscribe`,
/// `register_module`) is expected during startup; `dispatch` may be called
/// from anywhere inside a Tokio runtime.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Create a dispatcher with its own empty hook registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hooks(HookRegistry::new())
    }

    /// Create a dispatcher over an existing hook registry.
    #[must_use]
    pub fn with_hooks(hooks: HookRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                operations: RwLock::new(HashMap::new()),
                interceptors: RwLock::new(Vec::new()),
                subscribers: RwLock::new(HashMap::new()),
                hooks,
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// The hook registry this dispatcher resolves operation hooks from.
    #[must_use]
    pub fn hooks(&self) -> &HookRegistry {
        &self.inner.hooks
    }

    /// Register the operation for an intent kind.
    ///
    /// Fails with [`DispatchError::DuplicateOperation`] if the kind already
    /// has one. Duplicate registration is a programmer error, fatal at
    /// startup.
    pub fn register_operation(
        &self,
        kind: &str,
        operation: Arc<dyn Operation>,
    ) -> Result<(), DispatchError> {
        let mut operations = self.inner.operations.write();
        if operations.contains_key(kind) {
            return Err(DispatchError::DuplicateOperation {
                kind: kind.to_owned(),
            });
        }
        debug!(kind, operation_id = operation.id(), "Registered operation");
        let _ = operations.insert(kind.to_owned(), operation);
        Ok(())
    }

    /// Whether an operation is registered for a kind.
    #[must_use]
    pub fn has_operation(&self, kind: &str) -> bool {
        self.inner.operations.read().contains_key(kind)
    }

    /// Add an interceptor to the chain.
    ///
    /// The chain is re-sorted by `order()` ascending with a stable sort, so
    /// equal-order interceptors keep their insertion order. Interceptor IDs
    /// are diagnostic only; registering two with the same ID is cumulative.
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        let mut interceptors = self.inner.interceptors.write();
        debug!(
            interceptor = interceptor.id(),
            order = interceptor.order(),
            "Added interceptor"
        );
        interceptors.push(interceptor);
        interceptors.sort_by_key(|i| i.order());
    }

    /// Subscribe to an event kind.
    ///
    /// Every call is an independent registration, even for the same
    /// subscriber value: each returns its own [`Subscription`] removing
    /// exactly that entry.
    #[must_use]
    pub fn subscribe(
        &self,
        event_kind: &str,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Subscription {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .write()
            .entry(event_kind.to_owned())
            .or_default()
            .push(SubscriberEntry { seq, subscriber });
        Subscription {
            inner: Arc::clone(&self.inner),
            event_kind: event_kind.to_owned(),
            seq,
        }
    }

    /// Deliver an event synchronously to the subscribers current at this
    /// moment.
    ///
    /// By the time this returns, every current subscriber has been invoked.
    /// Delivery is inline during operation execution: events emitted before
    /// a later failure are not retracted.
    pub fn emit(&self, event: &DomainEvent) {
        let subscribers: Vec<Arc<dyn EventSubscriber>> = {
            let map = self.inner.subscribers.read();
            map.get(event.kind())
                .map(|entries| entries.iter().map(|e| Arc::clone(&e.subscriber)).collect())
                .unwrap_or_default()
        };
        for subscriber in subscribers {
            subscriber.on_event(event);
        }
    }

    /// Dispatch a top-level intent.
    ///
    /// Must be called within a Tokio runtime; the pipeline runs on a
    /// spawned task and the returned handle resolves acceptance and outcome
    /// separately.
    #[must_use]
    pub fn dispatch(&self, intent: Intent) -> IntentHandle {
        self.dispatch_with_causation(intent, CausationChain::root())
    }

    /// Dispatch an intent with an existing causation chain.
    ///
    /// The intent's own kind is appended to `causation` after the chain is
    /// assembled, so nested dispatches produce transitive chains such as
    /// `a:x -> b:y`.
    #[must_use]
    pub fn dispatch_with_causation(
        &self,
        intent: Intent,
        causation: CausationChain,
    ) -> IntentHandle {
        let dispatch_id = DispatchId::new();
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let task = tokio::spawn(self.clone().run_pipeline(
            intent,
            causation,
            dispatch_id.clone(),
            accepted_tx,
        ));
        IntentHandle::new(dispatch_id, accepted_rx, task)
    }

    /// The dispatch pipeline, one spawned task per call.
    ///
    /// Steps are strictly sequential: interceptors in order, operation
    /// resolution, hook resolution, then execution. Acceptance is signalled
    /// before `execute` is awaited; dropping the sender without sending
    /// reads as "not accepted" on the handle.
    async fn run_pipeline(
        self,
        mut intent: Intent,
        causation: CausationChain,
        dispatch_id: DispatchId,
        accepted_tx: oneshot::Sender<bool>,
    ) -> Result<Option<Value>, DispatchError> {
        let interceptors: Vec<Arc<dyn Interceptor>> = self.inner.interceptors.read().clone();
        for interceptor in interceptors {
            let kind = intent.kind().to_owned();
            match interceptor.before(intent).await {
                InterceptDecision::Forward(next) => intent = next,
                InterceptDecision::Cancel => {
                    debug!(
                        dispatch_id = %dispatch_id,
                        kind = %kind,
                        interceptor = interceptor.id(),
                        "Dispatch cancelled by interceptor"
                    );
                    let _ = accepted_tx.send(false);
                    return Ok(None);
                }
            }
        }

        let operation = self.inner.operations.read().get(intent.kind()).cloned();
        let Some(operation) = operation else {
            warn!(
                dispatch_id = %dispatch_id,
                kind = intent.kind(),
                "No operation registered for intent"
            );
            return Err(DispatchError::UnregisteredIntent {
                kind: intent.kind().to_owned(),
            });
        };

        let operation_id = operation.id().to_owned();
        let causation = causation.child(intent.kind());
        let hooks = self.inner.hooks.resolve(&operation_id);
        debug!(
            dispatch_id = %dispatch_id,
            kind = intent.kind(),
            operation_id = %operation_id,
            causation = %causation,
            "Intent accepted"
        );
        let ctx = OperationContext::new(intent, causation, hooks, self.clone(), dispatch_id);
        let _ = accepted_tx.send(true);

        match operation.execute(ctx).await {
            Ok(value) => Ok(Some(value)),
            Err(source) => Err(DispatchError::Operation {
                id: operation_id,
                source,
            }),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("operation_count", &self.inner.operations.read().len())
            .field("interceptor_count", &self.inner.interceptors.read().len())
            .field(
                "subscriber_count",
                &self
                    .inner
                    .subscribers
                    .read()
                    .values()
                    .map(Vec::len)
                    .sum::<usize>(),
            )
            .finish()
    }
}

/// Handle for one event subscription.
///
/// Two subscriptions of the same subscriber are independent; each cancels
/// only its own entry.
pub struct Subscription {
    inner: Arc<Inner>,
    event_kind: String,
    seq: u64,
}

impl Subscription {
    /// The event kind this subscription is bound to.
    #[must_use]
    pub fn event_kind(&self) -> &str {
        &self.event_kind
    }

    /// Remove exactly this subscription.
    pub fn cancel(self) {
        let mut map = self.inner.subscribers.write();
        if let Some(entries) = map.get_mut(&self.event_kind) {
            entries.retain(|entry| entry.seq != self.seq);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event_kind", &self.event_kind)
            .field("seq", &self.seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use skiff_core::errors::OperationError;

    /// Operation returning a fixed value, recording each execution.
    struct Recording {
        id: String,
        value: Value,
        executions: Arc<Mutex<Vec<CausationChain>>>,
    }

    #[async_trait]
    impl Operation for Recording {
        fn id(&self) -> &str {
            &self.id
        }
        async fn execute(&self, ctx: OperationContext) -> Result<Value, OperationError> {
            self.executions.lock().push(ctx.causation().clone());
            Ok(self.value.clone())
        }
    }

    fn recording(id: &str, value: Value) -> (Arc<Recording>, Arc<Mutex<Vec<CausationChain>>>) {
        let executions = Arc::new(Mutex::new(Vec::new()));
        let op = Arc::new(Recording {
            id: id.to_owned(),
            value,
            executions: Arc::clone(&executions),
        });
        (op, executions)
    }

    /// Interceptor recording its ID into a shared trace.
    struct Tracing {
        id: String,
        order: i32,
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Tracing {
        fn id(&self) -> &str {
            &self.id
        }
        fn order(&self) -> i32 {
            self.order
        }
        async fn before(&self, intent: Intent) -> InterceptDecision {
            self.trace.lock().push(self.id.clone());
            InterceptDecision::Forward(intent)
        }
    }

    struct CancelAll;

    #[async_trait]
    impl Interceptor for CancelAll {
        fn id(&self) -> &str {
            "cancel-all"
        }
        async fn before(&self, _intent: Intent) -> InterceptDecision {
            InterceptDecision::Cancel
        }
    }

    #[tokio::test]
    async fn test_dispatch_unregistered_intent_rejects_naming_kind() {
        let dispatcher = Dispatcher::new();
        let err = dispatcher
            .dispatch(Intent::bare("ghost:intent"))
            .await
            .unwrap_err();
        assert_matches!(err, DispatchError::UnregisteredIntent { ref kind } if kind == "ghost:intent");
        assert!(err.to_string().contains("ghost:intent"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails_second_time() {
        let dispatcher = Dispatcher::new();
        let (first, _) = recording("op-a", json!(1));
        let (second, _) = recording("op-b", json!(2));
        dispatcher.register_operation("a:x", first).unwrap();
        let err = dispatcher.register_operation("a:x", second).unwrap_err();
        assert_matches!(err, DispatchError::DuplicateOperation { ref kind } if kind == "a:x");
        assert!(dispatcher.has_operation("a:x"));
    }

    #[tokio::test]
    async fn test_dispatch_returns_operation_result() {
        let dispatcher = Dispatcher::new();
        let (op, _) = recording("op", json!({"ok": true}));
        dispatcher.register_operation("a:x", op).unwrap();

        let mut handle = dispatcher.dispatch(Intent::bare("a:x"));
        assert!(handle.accepted().await);
        let value = handle.outcome().await.unwrap().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_interceptors_run_in_ascending_order() {
        let dispatcher = Dispatcher::new();
        let (op, _) = recording("op", json!(null));
        dispatcher.register_operation("a:x", op).unwrap();

        let trace = Arc::new(Mutex::new(Vec::new()));
        for (id, order) in [("thirty", 30), ("ten", 10), ("twenty", 20)] {
            dispatcher.add_interceptor(Arc::new(Tracing {
                id: id.to_owned(),
                order,
                trace: Arc::clone(&trace),
            }));
        }

        let _ = dispatcher.dispatch(Intent::bare("a:x")).await.unwrap();
        assert_eq!(*trace.lock(), ["ten", "twenty", "thirty"]);
    }

    #[tokio::test]
    async fn test_equal_order_interceptors_keep_insertion_order() {
        let dispatcher = Dispatcher::new();
        let (op, _) = recording("op", json!(null));
        dispatcher.register_operation("a:x", op).unwrap();

        let trace = Arc::new(Mutex::new(Vec::new()));
        for id in ["first", "second", "third"] {
            dispatcher.add_interceptor(Arc::new(Tracing {
                id: id.to_owned(),
                order: 0,
                trace: Arc::clone(&trace),
            }));
        }

        let _ = dispatcher.dispatch(Intent::bare("a:x")).await.unwrap();
        assert_eq!(*trace.lock(), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_is_silent_short_circuit() {
        let dispatcher = Dispatcher::new();
        let (op, executions) = recording("op", json!(null));
        dispatcher.register_operation("a:x", op).unwrap();
        dispatcher.add_interceptor(Arc::new(CancelAll));

        let delivered = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&delivered);
        let _sub = dispatcher.subscribe(
            "a:done",
            Arc::new(move |_event: &DomainEvent| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let mut handle = dispatcher.dispatch(Intent::bare("a:x"));
        assert!(!handle.accepted().await);
        let outcome = handle.outcome().await.unwrap();
        assert!(outcome.is_none());
        assert!(executions.lock().is_empty(), "operation never ran");
        assert_eq!(delivered.load(Ordering::SeqCst), 0, "no events fired");
    }

    #[tokio::test]
    async fn test_accepted_resolves_while_operation_still_pending() {
        struct Gated {
            release: Mutex<Option<oneshot::Receiver<()>>>,
        }

        #[async_trait]
        impl Operation for Gated {
            fn id(&self) -> &str {
                "gated"
            }
            async fn execute(&self, _ctx: OperationContext) -> Result<Value, OperationError> {
                let rx = self.release.lock().take().expect("executed once");
                rx.await.map_err(|_| OperationError::failed("gate dropped"))?;
                Ok(json!("released"))
            }
        }

        let dispatcher = Dispatcher::new();
        let (gate_tx, gate_rx) = oneshot::channel();
        dispatcher
            .register_operation(
                "a:slow",
                Arc::new(Gated {
                    release: Mutex::new(Some(gate_rx)),
                }),
            )
            .unwrap();

        let mut handle = dispatcher.dispatch(Intent::bare("a:slow"));
        // The gate has not been opened: the operation cannot have finished.
        assert!(handle.accepted().await);
        gate_tx.send(()).unwrap();
        let value = handle.outcome().await.unwrap().unwrap();
        assert_eq!(value, json!("released"));
    }

    #[tokio::test]
    async fn test_interceptor_replacement_reaches_operation() {
        struct Redacting;

        #[async_trait]
        impl Interceptor for Redacting {
            fn id(&self) -> &str {
                "redacting"
            }
            async fn before(&self, intent: Intent) -> InterceptDecision {
                InterceptDecision::Forward(intent.with_payload(json!({"token": "***"})))
            }
        }

        struct Echo;

        #[async_trait]
        impl Operation for Echo {
            fn id(&self) -> &str {
                "echo"
            }
            async fn execute(&self, ctx: OperationContext) -> Result<Value, OperationError> {
                Ok(ctx.intent().payload().clone())
            }
        }

        let dispatcher = Dispatcher::new();
        dispatcher.register_operation("a:x", Arc::new(Echo)).unwrap();
        dispatcher.add_interceptor(Arc::new(Redacting));

        let value = dispatcher
            .dispatch(Intent::new("a:x", json!({"token": "secret"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value["token"], "***");
    }

    #[tokio::test]
    async fn test_nested_dispatch_extends_causation() {
        struct Outer {
            seen: Arc<Mutex<Vec<CausationChain>>>,
        }

        #[async_trait]
        impl Operation for Outer {
            fn id(&self) -> &str {
                "outer"
            }
            async fn execute(&self, ctx: OperationContext) -> Result<Value, OperationError> {
                self.seen.lock().push(ctx.causation().clone());
                let _ = ctx.dispatch(Intent::bare("b:y")).await?;
                Ok(Value::Null)
            }
        }

        let dispatcher = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .register_operation(
                "a:x",
                Arc::new(Outer {
                    seen: Arc::clone(&seen),
                }),
            )
            .unwrap();
        let (inner, inner_executions) = recording("inner", Value::Null);
        dispatcher.register_operation("b:y", inner).unwrap();

        let _ = dispatcher.dispatch(Intent::bare("a:x")).await.unwrap();

        assert_eq!(seen.lock()[0].kinds(), ["a:x"]);
        assert_eq!(inner_executions.lock()[0].kinds(), ["a:x", "b:y"]);
    }

    #[tokio::test]
    async fn test_events_emitted_before_failure_stay_delivered() {
        struct EmitsThenFails;

        #[async_trait]
        impl Operation for EmitsThenFails {
            fn id(&self) -> &str {
                "emits-then-fails"
            }
            async fn execute(&self, ctx: OperationContext) -> Result<Value, OperationError> {
                ctx.emit(&DomainEvent::new("download:started", json!({"n": 1})));
                Err(OperationError::failed("disk full"))
            }
        }

        let dispatcher = Dispatcher::new();
        dispatcher
            .register_operation("a:x", Arc::new(EmitsThenFails))
            .unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let _sub = dispatcher.subscribe(
            "download:started",
            Arc::new(move |event: &DomainEvent| {
                sink.lock().push(event.clone());
            }),
        );

        let err = dispatcher.dispatch(Intent::bare("a:x")).await.unwrap_err();
        assert_matches!(err, DispatchError::Operation { ref id, .. } if id == "emits-then-fails");
        assert_eq!(received.lock().len(), 1, "event delivered despite failure");
    }

    #[tokio::test]
    async fn test_emit_only_reaches_matching_kind() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let _sub = dispatcher.subscribe(
            "x:one",
            Arc::new(move |_event: &DomainEvent| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        dispatcher.emit(&DomainEvent::bare("x:one"));
        dispatcher.emit(&DomainEvent::bare("x:two"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_subscriber_twice_is_two_registrations() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let subscriber: Arc<dyn EventSubscriber> = Arc::new(move |_event: &DomainEvent| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        });

        let first = dispatcher.subscribe("x:one", Arc::clone(&subscriber));
        let _second = dispatcher.subscribe("x:one", subscriber);

        dispatcher.emit(&DomainEvent::bare("x:one"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        first.cancel();
        dispatcher.emit(&DomainEvent::bare("x:one"));
        assert_eq!(hits.load(Ordering::SeqCst), 3, "one registration survives");
    }

    #[tokio::test]
    async fn test_operation_panic_surfaces_as_terminated() {
        struct Panics;

        #[async_trait]
        impl Operation for Panics {
            fn id(&self) -> &str {
                "panics"
            }
            async fn execute(&self, _ctx: OperationContext) -> Result<Value, OperationError> {
                panic!("operation bug");
            }
        }

        let dispatcher = Dispatcher::new();
        dispatcher.register_operation("a:x", Arc::new(Panics)).unwrap();

        let err = dispatcher.dispatch(Intent::bare("a:x")).await.unwrap_err();
        assert_matches!(err, DispatchError::Terminated);
    }

    #[tokio::test]
    async fn test_operation_hooks_are_resolved_by_operation_id() {
        struct Collecting;

        #[async_trait]
        impl Operation for Collecting {
            fn id(&self) -> &str {
                "collecting"
            }
            async fn execute(&self, ctx: OperationContext) -> Result<Value, OperationError> {
                let outcome = ctx
                    .hooks()
                    .collect("gather", &ctx.hook_context())
                    .await;
                Ok(json!({"contributions": outcome.results}))
            }
        }

        let dispatcher = Dispatcher::new();
        dispatcher
            .register_operation("a:x", Arc::new(Collecting))
            .unwrap();
        dispatcher.hooks().register(
            "collecting",
            "gather",
            skiff_hooks::handler::handler_fn(|_| Ok(json!("from-hook"))),
        );

        let value = dispatcher.dispatch(Intent::bare("a:x")).await.unwrap().unwrap();
        assert_eq!(value["contributions"], json!(["from-hook"]));
    }

    #[tokio::test]
    async fn test_independent_dispatchers_do_not_share_state() {
        let first = Dispatcher::new();
        let second = Dispatcher::new();
        let (op, _) = recording("op", json!(null));
        first.register_operation("a:x", op).unwrap();
        assert!(first.has_operation("a:x"));
        assert!(!second.has_operation("a:x"));
    }

    #[test]
    fn test_debug_impl() {
        let dispatcher = Dispatcher::new();
        let debug = format!("{dispatcher:?}");
        assert!(debug.contains("Dispatcher"));
        assert!(debug.contains("operation_count"));
    }
}
