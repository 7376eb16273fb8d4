//! In-memory storage backend.

use crate::backend::Backend;
use crate::error::BackendResult;
use crate::types::{SubjectData, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory storage backend.
///
/// Suitable for unit tests, integration tests, and ephemeral stores
/// that do not need persistence. The subject map is a `BTreeMap`, so
/// prefix enumeration falls out of the key ordering.
///
/// # Thread Safety
///
/// All state sits behind a single `RwLock`, which is what makes
/// `apply` atomic with respect to concurrent readers: a batch is
/// applied under the write guard as one step.
///
/// # Example
///
/// ```rust
/// use celldb_backend::{Backend, CellWrite, MemoryBackend, Timestamp, WriteBatch};
///
/// let backend = MemoryBackend::new();
/// let mut batch = WriteBatch::new();
/// batch.write(CellWrite {
///     predicate: "metadata:size".into(),
///     value: b"144".to_vec(),
///     timestamp: Timestamp::from_micros(1000),
///     replace: true,
/// });
/// backend.apply("host/fs/os/etc/passwd", &batch).unwrap();
/// assert!(backend.read_subject("host/fs/os/etc/passwd").unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    subjects: RwLock<BTreeMap<String, SubjectData>>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored subjects.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.subjects.read().len()
    }

    /// Clears all stored cells.
    pub fn clear(&self) {
        self.subjects.write().clear();
    }
}

impl Backend for MemoryBackend {
    fn apply(&self, subject: &str, batch: &WriteBatch) -> BackendResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut subjects = self.subjects.write();
        let data = subjects.entry(subject.to_string()).or_default();
        data.apply(batch);
        if data.is_empty() {
            subjects.remove(subject);
        }
        Ok(())
    }

    fn read_subject(&self, subject: &str) -> BackendResult<Option<SubjectData>> {
        Ok(self.subjects.read().get(subject).cloned())
    }

    fn delete_subject(&self, subject: &str) -> BackendResult<()> {
        self.subjects.write().remove(subject);
        Ok(())
    }

    fn subjects_with_prefix(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let subjects = self.subjects.read();
        Ok(subjects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn flush(&self) -> BackendResult<()> {
        // Nothing buffered; writes are visible as soon as apply returns.
        Ok(())
    }
}
