//! Module wiring — declarative bundles of hooks, event subscriptions, and
//! interceptors.
//!
//! A [`Module`] is a passive declaration: building one registers nothing.
//! [`Dispatcher::register_module`] walks the bundle and wires each part into
//! the dispatcher and its hook registry. Wiring holds no state of its own;
//! registering the same module twice accumulates handlers, so callers wire a
//! module once unless duplicate execution is intended.

use std::sync::Arc;

use tracing::debug;

use skiff_core::event::DomainEvent;
use skiff_hooks::handler::HookHandler;

use crate::dispatcher::{Dispatcher, EventSubscriber, Subscription};
use crate::interceptor::Interceptor;

struct HookBinding {
    operation_id: String,
    point: String,
    handler: Arc<dyn HookHandler>,
}

struct EventBinding {
    event_kind: String,
    subscriber: Arc<dyn EventSubscriber>,
}

/// A declarative bundle of hooks, event subscriptions, and interceptors.
///
/// Modules let a subsystem describe everything it contributes in one value:
/// hook handlers keyed by `(operation id, hook point)`, event subscribers
/// keyed by event kind, and any interceptors it ships (a policy module such
/// as the idempotency factory delivers its interceptor this way).
pub struct Module {
    name: String,
    hooks: Vec<HookBinding>,
    events: Vec<EventBinding>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Module {
    /// Start building a module.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder {
            module: Module {
                name: name.into(),
                hooks: Vec::new(),
                events: Vec::new(),
                interceptors: Vec::new(),
            },
        }
    }

    /// The module's name, used in log fields.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of declared hook bindings.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Number of declared event bindings.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of declared interceptors.
    #[must_use]
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("hook_count", &self.hooks.len())
            .field("event_count", &self.events.len())
            .field("interceptor_count", &self.interceptors.len())
            .finish()
    }
}

/// Builder for [`Module`].
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    /// Declare a hook handler for `(operation_id, point)`.
    #[must_use]
    pub fn hook(
        mut self,
        operation_id: impl Into<String>,
        point: impl Into<String>,
        handler: Arc<dyn HookHandler>,
    ) -> Self {
        self.module.hooks.push(HookBinding {
            operation_id: operation_id.into(),
            point: point.into(),
            handler,
        });
        self
    }

    /// Declare an event subscriber for `event_kind`.
    #[must_use]
    pub fn on_event(
        mut self,
        event_kind: impl Into<String>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Self {
        self.module.events.push(EventBinding {
            event_kind: event_kind.into(),
            subscriber,
        });
        self
    }

    /// Declare an interceptor the module ships.
    #[must_use]
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.module.interceptors.push(interceptor);
        self
    }

    /// Finish the declaration.
    #[must_use]
    pub fn build(self) -> Module {
        self.module
    }
}

/// Wrap a subscriber so it only sees events whose runtime kind matches its
/// binding. The dispatcher already routes by kind; this is the wiring
/// contract's double-check against accidental cross-kind delivery.
fn kind_checked(event_kind: String, subscriber: Arc<dyn EventSubscriber>) -> Arc<dyn EventSubscriber> {
    Arc::new(move |event: &DomainEvent| {
        if event.kind() == event_kind {
            subscriber.on_event(event);
        }
    })
}

impl Dispatcher {
    /// Wire a module: register its hooks, add its interceptors, and
    /// subscribe its event bindings.
    ///
    /// Returns the subscriptions created for the module's event bindings, in
    /// declaration order. Wiring accumulates: registering the same module
    /// twice registers everything twice.
    pub fn register_module(&self, module: Module) -> Vec<Subscription> {
        debug!(
            module = module.name(),
            hooks = module.hook_count(),
            events = module.event_count(),
            interceptors = module.interceptor_count(),
            "Registering module"
        );

        for binding in module.hooks {
            self.hooks()
                .register(&binding.operation_id, &binding.point, binding.handler);
        }

        for interceptor in module.interceptors {
            self.add_interceptor(interceptor);
        }

        module
            .events
            .into_iter()
            .map(|binding| {
                let subscriber = kind_checked(binding.event_kind.clone(), binding.subscriber);
                self.subscribe(&binding.event_kind, subscriber)
            })
            .collect()
    }
}
