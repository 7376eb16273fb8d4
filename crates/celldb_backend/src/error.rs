//! Error types for backend operations.

use std::io;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur inside a storage backend.
///
/// Absence of a subject or predicate is never an error; reads report
/// it as `None` or an empty result.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted store image could not be decoded.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store's exclusive lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// The backend has been closed.
    #[error("backend is closed")]
    Closed,
}
