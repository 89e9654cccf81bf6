//! Idempotency policy factory — duplicate-suppression rules compiled into
//! one module.
//!
//! Each [`IdempotencyRule`] governs one intent kind: either a singleton flag
//! (one dispatch until reset) or a per-key set (one dispatch per derived
//! key). [`idempotency_module`] merges a rule set into a single interceptor
//! plus reset-event subscribers, delivered as one [`Module`]; the caller
//! wires it with [`Dispatcher::register_module`](crate::dispatcher::Dispatcher::register_module).
//!
//! The factory is built entirely from dispatcher primitives. It owns the
//! flag and key-set state it drives; nothing else touches it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use skiff_core::event::DomainEvent;
use skiff_core::intent::Intent;

use crate::interceptor::{InterceptDecision, Interceptor};
use crate::module::Module;

/// Derives a tracking key from an intent payload (and, for resets, from an
/// event payload). Returning `None` leaves the dispatch untracked.
pub type KeyFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Decides whether a dispatch bypasses an existing block. A forced dispatch
/// is a one-time override: the tracked state stays in place.
pub type ForceFn = Arc<dyn Fn(&Intent) -> bool + Send + Sync>;

/// Duplicate-suppression configuration for one intent kind.
///
/// Rules are configuration, not runtime state. The flag or key set a rule
/// drives is created when [`idempotency_module`] compiles the rule and is
/// mutated only by the resulting interceptor and its reset subscribers.
pub struct IdempotencyRule {
    intent_kind: String,
    key_fn: Option<KeyFn>,
    reset_on: Option<String>,
    force_fn: Option<ForceFn>,
}

impl IdempotencyRule {
    /// Singleton mode: the first dispatch of `intent_kind` passes, every
    /// later one is cancelled until a reset event fires.
    #[must_use]
    pub fn singleton(intent_kind: impl Into<String>) -> Self {
        Self {
            intent_kind: intent_kind.into(),
            key_fn: None,
            reset_on: None,
            force_fn: None,
        }
    }

    /// Per-key mode: the first dispatch per derived key passes, repeats of
    /// the same key are cancelled. Intents whose key derives to `None` pass
    /// through untracked.
    #[must_use]
    pub fn per_key<F>(intent_kind: impl Into<String>, key_fn: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            intent_kind: intent_kind.into(),
            key_fn: Some(Arc::new(key_fn)),
            reset_on: None,
            force_fn: None,
        }
    }

    /// Reset tracked state when this event kind fires. A singleton clears
    /// its flag; a per-key rule removes only the key derived from the
    /// event's payload.
    #[must_use]
    pub fn reset_on(mut self, event_kind: impl Into<String>) -> Self {
        self.reset_on = Some(event_kind.into());
        self
    }

    /// Let matching dispatches bypass an existing block. The override is
    /// one-time: tracked state is left in place, so a later unforced
    /// duplicate is still cancelled.
    #[must_use]
    pub fn force_when<F>(mut self, force_fn: F) -> Self
    where
        F: Fn(&Intent) -> bool + Send + Sync + 'static,
    {
        self.force_fn = Some(Arc::new(force_fn));
        self
    }
}

impl std::fmt::Debug for IdempotencyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyRule")
            .field("intent_kind", &self.intent_kind)
            .field(
                "mode",
                &if self.key_fn.is_some() {
                    "per-key"
                } else {
                    "singleton"
                },
            )
            .field("reset_on", &self.reset_on)
            .finish()
    }
}

/// One rule's compiled form: its configuration plus the state it owns.
struct RuleRuntime {
    intent_kind: String,
    reset_on: Option<String>,
    force_fn: Option<ForceFn>,
    tracking: Tracking,
}

enum Tracking {
    Flag(Mutex<bool>),
    Keys {
        key_fn: KeyFn,
        seen: Mutex<HashSet<String>>,
    },
}

impl RuleRuntime {
    fn new(rule: IdempotencyRule) -> Self {
        let tracking = match rule.key_fn {
            Some(key_fn) => Tracking::Keys {
                key_fn,
                seen: Mutex::new(HashSet::new()),
            },
            None => Tracking::Flag(Mutex::new(false)),
        };
        Self {
            intent_kind: rule.intent_kind,
            reset_on: rule.reset_on,
            force_fn: rule.force_fn,
            tracking,
        }
    }

    fn is_forced(&self, intent: &Intent) -> bool {
        self.force_fn.as_ref().is_some_and(|f| f(intent))
    }

    /// Whether this dispatch passes. A first sighting records itself; a
    /// repeat passes only when forced, and stays recorded either way.
    fn admit(&self, intent: &Intent) -> bool {
        match &self.tracking {
            Tracking::Flag(flag) => {
                let mut dispatched = flag.lock();
                if !*dispatched {
                    *dispatched = true;
                    return true;
                }
                if self.is_forced(intent) {
                    debug!(kind = %self.intent_kind, "Forced dispatch bypassed singleton block");
                    return true;
                }
                debug!(kind = %self.intent_kind, "Duplicate dispatch suppressed");
                false
            }
            Tracking::Keys { key_fn, seen } => {
                let Some(key) = key_fn(intent.payload()) else {
                    return true;
                };
                if seen.lock().insert(key.clone()) {
                    return true;
                }
                if self.is_forced(intent) {
                    debug!(kind = %self.intent_kind, key, "Forced dispatch bypassed per-key block");
                    return true;
                }
                debug!(kind = %self.intent_kind, key, "Duplicate dispatch suppressed");
                false
            }
        }
    }

    /// Apply one reset event to this rule's state.
    fn reset(&self, event: &DomainEvent) {
        match &self.tracking {
            Tracking::Flag(flag) => {
                *flag.lock() = false;
                debug!(kind = %self.intent_kind, event = event.kind(), "Singleton flag reset");
            }
            Tracking::Keys { key_fn, seen } => {
                if let Some(key) = key_fn(event.payload()) {
                    if seen.lock().remove(&key) {
                        debug!(kind = %self.intent_kind, key, event = event.kind(), "Tracked key reset");
                    }
                }
            }
        }
    }
}

/// All rules merged into one interceptor. Intent kinds with no rule pass
/// through unconditionally.
struct IdempotencyInterceptor {
    rules: HashMap<String, Arc<RuleRuntime>>,
}

#[async_trait]
impl Interceptor for IdempotencyInterceptor {
    fn id(&self) -> &str {
        "idempotency"
    }

    async fn before(&self, intent: Intent) -> InterceptDecision {
        match self.rules.get(intent.kind()) {
            Some(runtime) if !runtime.admit(&intent) => InterceptDecision::Cancel,
            _ => InterceptDecision::Forward(intent),
        }
    }
}

/// Compile a rule set into one module: a single `"idempotency"` interceptor
/// at default order, plus one reset subscriber per distinct reset event kind
/// (rules sharing a reset event are cleared together in one delivery).
#[must_use]
pub fn idempotency_module(rules: impl IntoIterator<Item = IdempotencyRule>) -> Module {
    let mut by_kind: HashMap<String, Arc<RuleRuntime>> = HashMap::new();
    let mut by_reset: HashMap<String, Vec<Arc<RuleRuntime>>> = HashMap::new();

    for rule in rules {
        let runtime = Arc::new(RuleRuntime::new(rule));
        if let Some(reset_kind) = &runtime.reset_on {
            by_reset
                .entry(reset_kind.clone())
                .or_default()
                .push(Arc::clone(&runtime));
        }
        let _ = by_kind.insert(runtime.intent_kind.clone(), runtime);
    }

    let mut builder = Module::builder("idempotency")
        .interceptor(Arc::new(IdempotencyInterceptor { rules: by_kind }));

    for (event_kind, group) in by_reset {
        builder = builder.on_event(
            event_kind,
            Arc::new(move |event: &DomainEvent| {
                for runtime in &group {
                    runtime.reset(event);
                }
            }),
        );
    }

    builder.build()
}
