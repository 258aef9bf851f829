//! Error types for backend operations.

use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur during backend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The key holds a value of a different kind than the command expects.
    #[error("WRONGTYPE operation against key {key} holding the wrong kind of value")]
    WrongType {
        /// The offending key.
        key: String,
    },

    /// `INCR` was applied to a value that is not a decimal integer.
    #[error("value at key {key} is not an integer or out of range")]
    NotAnInteger {
        /// The offending key.
        key: String,
    },

    /// The backend connection was closed.
    #[error("backend connection is closed")]
    Closed,

    /// A failure injected by a test wrapper.
    #[error("injected failure during {operation}")]
    Injected {
        /// Name of the operation that was made to fail.
        operation: String,
    },

    /// Any other backend-specific failure.
    #[error("backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Creates a wrong-type error.
    pub fn wrong_type(key: impl Into<String>) -> Self {
        Self::WrongType { key: key.into() }
    }

    /// Creates a not-an-integer error.
    pub fn not_an_integer(key: impl Into<String>) -> Self {
        Self::NotAnInteger { key: key.into() }
    }

    /// Creates an injected failure.
    pub fn injected(operation: impl Into<String>) -> Self {
        Self::Injected {
            operation: operation.into(),
        }
    }
}
