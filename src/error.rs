//! Error types for the grid allocator

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bootstrapping or running the core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed bootstrap data: unknown source kind, negative capacity or
    /// demand, or a duplicate identifier. Fatal, abort before the event loop
    /// starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation would violate I1–I4: flow exceeding capacity, negative
    /// load, allocated exceeding demand + epsilon, or a forward/reverse index
    /// divergence. Should be unreachable; treat as a programming bug.
    #[error("invariant violation during {operation}: {detail}")]
    InvariantViolation {
        /// The operation that was attempted
        operation: String,
        /// What invariant was about to break and why
        detail: String,
    },

    /// An event referenced a source or consumer id not currently in the core.
    /// Not fatal: the caller logs a warning and treats the event as a no-op.
    #[error("not found: {kind} '{id}'")]
    NotFound {
        /// "source" or "consumer"
        kind: &'static str,
        /// The identifier that was not found
        id: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Create a "source not found" error
    pub fn source_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "source",
            id: id.into(),
        }
    }

    /// Create a "consumer not found" error
    pub fn consumer_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "consumer",
            id: id.into(),
        }
    }
}
