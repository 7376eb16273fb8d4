//! Storage backend trait definition.

use crate::error::BackendResult;
use crate::types::{SubjectData, WriteBatch};

/// A physical store for the multi-version cell space.
///
/// Backends hold cells — `(subject, predicate, timestamp) -> value`
/// triples — and know nothing about transactions, filters, or queries.
/// All of that interpretation lives above the backend, so the same
/// upper layers run against memory, files, or an external service.
///
/// # Invariants
///
/// - `apply` is atomic per subject: a concurrent `read_subject` sees
///   either none or all of a batch's operations.
/// - `subjects_with_prefix` returns subjects in ascending bytewise
///   order of the key.
/// - A subject left with zero predicates by `apply` no longer exists:
///   it is absent from reads and prefix scans.
/// - After `flush` returns, all prior writes on the calling path are
///   durable and visible to subsequent reads. Absent a flush, a
///   backend may buffer or delay writes relative to reads from a
///   different execution path.
/// - Backends must be `Send + Sync` for concurrent access.
///
/// # Implementors
///
/// - [`super::MemoryBackend`] - For tests and ephemeral stores
/// - [`super::FileBackend`] - For persistent storage
pub trait Backend: Send + Sync {
    /// Atomically applies a batch of mutations to one subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutations cannot be recorded. On error
    /// the subject is left in its pre-batch state.
    fn apply(&self, subject: &str, batch: &WriteBatch) -> BackendResult<()>;

    /// Reads every stored attribute of a subject.
    ///
    /// Returns `None` for a subject with no stored cells.
    ///
    /// # Errors
    ///
    /// Returns an error only on physical read failure, never for
    /// absence.
    fn read_subject(&self, subject: &str) -> BackendResult<Option<SubjectData>>;

    /// Removes a subject and every predicate and version under it.
    ///
    /// Deleting an absent subject is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion cannot be recorded.
    fn delete_subject(&self, subject: &str) -> BackendResult<()>;

    /// Enumerates subjects whose key starts with `prefix`, in
    /// ascending bytewise order. An empty prefix enumerates every
    /// subject.
    ///
    /// # Errors
    ///
    /// Returns an error on physical read failure.
    fn subjects_with_prefix(&self, prefix: &str) -> BackendResult<Vec<String>>;

    /// Synchronization barrier: all prior writes become durable and
    /// visible to subsequent reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the barrier cannot be established.
    fn flush(&self) -> BackendResult<()>;
}
