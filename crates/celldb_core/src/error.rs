//! Error types for the store engine.

use thiserror::Error;

/// Result type for store operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations.
///
/// Absence of a requested subject or predicate is never an error; it
/// is reported as `None` or an empty result. The error taxonomy only
/// covers contention, exhaustion, bad arguments, and physical
/// failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("backend error: {0}")]
    Backend(#[from] celldb_backend::BackendError),

    /// Another open transaction holds the subject's lock.
    ///
    /// Recoverable: the caller may retry, typically via the retry
    /// combinator.
    #[error("transaction contention: subject {subject:?} is locked")]
    Contention {
        /// The subject whose lock was held.
        subject: String,
    },

    /// The retry combinator consumed its attempt budget.
    ///
    /// Fatal to the enclosing operation; never swallowed.
    #[error("Retry number exceeded.")]
    RetryExceeded,

    /// Malformed filter, pattern, or query input.
    ///
    /// Always surfaced immediately, never retried.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was malformed.
        message: String,
    },

    /// A typed value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,
}

impl CoreError {
    /// Creates a contention error for a subject.
    pub fn contention(subject: impl Into<String>) -> Self {
        Self::Contention {
            subject: subject.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true if this is the recoverable contention error.
    #[must_use]
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }
}
