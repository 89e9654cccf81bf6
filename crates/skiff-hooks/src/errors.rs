//! Hook error types.

use thiserror::Error;

/// Errors produced by hook handlers.
///
/// These never propagate out of the registry on their own; `run` drops them
/// after logging and `collect` returns them alongside the successful results.
#[derive(Debug, Error)]
pub enum HookError {
    /// Handler reported a failure.
    #[error("hook handler failed: {message}")]
    Handler {
        /// Message from the handler.
        message: String,
    },

    /// Handler could not interpret the context it was given.
    #[error("hook handler rejected context: {0}")]
    Context(String),
}

impl HookError {
    /// Create a handler failure from a message.
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }
}
