//! # skiff-dispatch
//!
//! The intent dispatch core of Skiff.
//!
//! Every application action is an [`Intent`](skiff_core::intent::Intent)
//! routed through an ordered interceptor chain to exactly one registered
//! [`Operation`](operation::Operation). Operations extend through hook
//! points, publish [`DomainEvent`](skiff_core::event::DomainEvent)s to
//! subscribers, and may dispatch further intents; the dispatcher tracks the
//! causal chain across that nesting.
//!
//! ## Dispatch pipeline
//!
//! 1. Interceptors run in ascending order; any one of them can replace the
//!    intent or cancel the dispatch (a policy decision, not an error).
//! 2. The operation is resolved by intent kind; acceptance is signalled on
//!    the returned [`IntentHandle`](handle::IntentHandle) before execution.
//! 3. The operation executes with an
//!    [`OperationContext`](context::OperationContext) that can emit events,
//!    run its hooks, and dispatch nested intents with an extended causation
//!    chain.
//!
//! ## Example
//!
//! ```rust
//! use skiff_dispatch::dispatcher::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! // Register operations, interceptors, and modules, then dispatch intents.
//! ```

#![deny(unsafe_code)]

pub mod context;
pub mod dispatcher;
pub mod handle;
pub mod idempotency;
pub mod interceptor;
pub mod module;
pub mod operation;
