//! Error hierarchy for the dispatch core.
//!
//! Two enums split the taxonomy along the caller boundary:
//!
//! - [`DispatchError`]: what a `dispatch` caller can see — registration and
//!   routing failures, plus an operation failure wrapped with its ID.
//! - [`OperationError`]: what an operation's `execute` can return.
//!
//! Cancellation is deliberately absent: a cancelled dispatch is a normal
//! short-circuit, signalled by the handle, never an error.

use thiserror::Error;

/// Errors surfaced to a dispatch caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A second operation was registered for an intent kind.
    #[error("an operation is already registered for intent kind '{kind}'")]
    DuplicateOperation {
        /// The contested routing key.
        kind: String,
    },

    /// An intent was dispatched with no operation registered for its kind.
    #[error("no operation registered for intent kind '{kind}'")]
    UnregisteredIntent {
        /// The unroutable kind.
        kind: String,
    },

    /// The resolved operation ran and failed.
    #[error("operation '{id}' failed: {source}")]
    Operation {
        /// ID of the failing operation.
        id: String,
        /// The operation's own error.
        #[source]
        source: OperationError,
    },

    /// The dispatch task died without producing a result (e.g. a panic
    /// inside the operation).
    #[error("dispatch terminated before producing a result")]
    Terminated,
}

/// Errors an operation's `execute` can return.
///
/// The core never decides whether a failure is fatal; these variants are the
/// vocabulary operation authors use to say so themselves.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Domain-specific failure.
    #[error("{0}")]
    Failed(String),

    /// Hook handler failures the operation chose to surface as an aggregate.
    #[error("{failed} of {total} '{point}' hook handlers failed")]
    Hooks {
        /// Hook point the handlers ran at.
        point: String,
        /// Number of failing handlers.
        failed: usize,
        /// Number of handlers invoked.
        total: usize,
    },

    /// A nested dispatch failed and the operation chose to propagate it.
    #[error(transparent)]
    Dispatch(Box<DispatchError>),
}

impl OperationError {
    /// Create a domain failure from a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<DispatchError> for OperationError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(Box::new(err))
    }
}
