//! # skiff-core
//!
//! Foundation types for the Skiff intent dispatch core.
//!
//! This crate provides the shared vocabulary that the dispatch crates and
//! every registering subsystem depend on:
//!
//! - **[`Intent`](intent::Intent)**: a typed request routed to exactly one operation
//! - **[`DomainEvent`](event::DomainEvent)**: a fact broadcast to current subscribers
//! - **[`CausationChain`](causation::CausationChain)**: the nesting history of a dispatch
//! - **[`DispatchId`](ids::DispatchId)**: branded per-dispatch ID for log correlation
//! - **Errors**: [`DispatchError`](errors::DispatchError) and
//!   [`OperationError`](errors::OperationError) hierarchies via `thiserror`

#![deny(unsafe_code)]

pub mod causation;
pub mod errors;
pub mod event;
pub mod ids;
pub mod intent;
