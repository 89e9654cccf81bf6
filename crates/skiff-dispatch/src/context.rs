//! Execution context handed to an operation.

use serde_json::Value;

use skiff_core::causation::CausationChain;
use skiff_core::event::DomainEvent;
use skiff_core::ids::DispatchId;
use skiff_core::intent::Intent;
use skiff_hooks::context::HookContext;
use skiff_hooks::resolved::ResolvedHooks;

use crate::dispatcher::Dispatcher;
use crate::handle::IntentHandle;

/// Everything an operation needs while executing one intent.
///
/// The context carries the (post-interceptor) intent, the causation chain
/// that led here, the operation's resolved hooks, and a dispatcher handle
/// for emitting events and dispatching nested intents.
pub struct OperationContext {
    intent: Intent,
    causation: CausationChain,
    hooks: ResolvedHooks,
    dispatcher: Dispatcher,
    dispatch_id: DispatchId,
}

impl OperationContext {
    pub(crate) fn new(
        intent: Intent,
        causation: CausationChain,
        hooks: ResolvedHooks,
        dispatcher: Dispatcher,
        dispatch_id: DispatchId,
    ) -> Self {
        Self {
            intent,
            causation,
            hooks,
            dispatcher,
            dispatch_id,
        }
    }

    /// The intent being executed, as the interceptor chain forwarded it.
    #[must_use]
    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    /// The chain of intent kinds that led to this execution, innermost
    /// last. Ends with this intent's own kind.
    #[must_use]
    pub fn causation(&self) -> &CausationChain {
        &self.causation
    }

    /// Hooks registered against this operation's ID.
    #[must_use]
    pub fn hooks(&self) -> &ResolvedHooks {
        &self.hooks
    }

    /// ID of the enclosing dispatch call.
    #[must_use]
    pub fn dispatch_id(&self) -> &DispatchId {
        &self.dispatch_id
    }

    /// Publish an event to current subscribers.
    ///
    /// Delivery is synchronous and inline: every current subscriber has
    /// been invoked by the time this returns. Events stay delivered even if
    /// the operation fails afterwards.
    pub fn emit(&self, event: &DomainEvent) {
        self.dispatcher.emit(event);
    }

    /// Dispatch a nested intent, extending this dispatch's causation chain.
    #[must_use]
    pub fn dispatch(&self, intent: Intent) -> IntentHandle {
        self.dispatcher
            .dispatch_with_causation(intent, self.causation.clone())
    }

    /// Dispatch a nested intent with extra causation appended after this
    /// dispatch's own chain.
    #[must_use]
    pub fn dispatch_with_causation(
        &self,
        intent: Intent,
        causation: &CausationChain,
    ) -> IntentHandle {
        self.dispatcher
            .dispatch_with_causation(intent, self.causation.extended(causation))
    }

    /// Build a hook context for this execution.
    #[must_use]
    pub fn hook_context(&self) -> HookContext {
        HookContext::new(self.intent.clone(), self.causation.clone())
    }

    /// Build a hook context carrying operation-supplied data.
    #[must_use]
    pub fn hook_context_with(&self, data: Value) -> HookContext {
        self.hook_context().with_data(data)
    }
}

impl std::fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContext")
            .field("intent", &self.intent)
            .field("causation", &self.causation)
            .field("dispatch_id", &self.dispatch_id)
            .finish()
    }
}
