//! # skiff-hooks
//!
//! Hook registry for the Skiff dispatch core.
//!
//! Operations expose named **hook points**; independently registered
//! subsystems contribute handlers at those points without touching the
//! operation or each other. Handlers are keyed by
//! `(operation id, hook point)` and fire in registration order.
//!
//! ## Isolation
//!
//! A failing handler never prevents later handlers from running and never
//! aborts the operation. [`ResolvedHooks::run`](resolved::ResolvedHooks::run)
//! drops failures after logging (side-effect fan-out);
//! [`ResolvedHooks::collect`](resolved::ResolvedHooks::collect) hands every
//! outcome back so the operation decides what failure means.
//!
//! Handlers see the execution context only through [`HookContext`]
//! (context::HookContext) accessors: the caller's context cannot be mutated
//! from inside a handler, so handlers compose through return values.

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod handler;
pub mod registry;
pub mod resolved;
