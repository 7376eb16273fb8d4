//! Test fixtures and store helpers.
//!
//! Convenience constructors for test stores over both backends, and a
//! seeded subject-space fixture shared by the query tests.

use celldb_backend::{FileBackend, Timestamp};
use celldb_core::{CellStore, Config, SetOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store handle.
    pub store: CellStore,
    /// The temporary directory, kept alive to delay cleanup.
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a test store over a fresh in-memory backend.
    pub fn memory() -> Self {
        Self {
            store: CellStore::open_in_memory(),
            _temp_dir: None,
        }
    }

    /// Creates a test store over a file backend in a temp directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let backend = FileBackend::open(&temp_dir.path().join("cells.db"))
            .expect("failed to open file backend");
        Self {
            store: CellStore::open_with_config(Arc::new(backend), fast_config()),
            _temp_dir: Some(temp_dir),
        }
    }

    /// The store file path, `None` for an in-memory store.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir
            .as_ref()
            .map(|dir| dir.path().join("cells.db"))
    }
}

impl std::ops::Deref for TestStore {
    type Target = CellStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// A configuration with millisecond retry delays, so contention tests
/// run fast.
pub fn fast_config() -> Config {
    Config::new().retry_delay(Duration::from_millis(1))
}

/// Runs a test against a fresh in-memory store.
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&CellStore) -> R,
{
    let test = TestStore::memory();
    f(&test.store)
}

/// Runs a test against a fresh file-backed store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&CellStore, &std::path::Path) -> R,
{
    let test = TestStore::file();
    let path = test.path().expect("file store has a path");
    f(&test.store, &path)
}

/// Seeds `count` subjects `row:00`, `row:01`, ... each carrying an
/// `aff4:type`, a `metadata:name` echoing the subject, and an
/// `aff4:size` equal to the row index, all at distinct timestamps.
pub fn seed_rows(store: &CellStore, count: usize) {
    for i in 0..count {
        let subject = format!("row:{i:02}");
        let at = SetOptions::new().timestamp(Timestamp::from_micros(100 + i as u64));
        store
            .set_with(&subject, "aff4:type", b"test".to_vec(), at.clone())
            .expect("seed write failed");
        store
            .set_with(
                &subject,
                "metadata:name",
                format!("{subject}foo").into_bytes(),
                at.clone(),
            )
            .expect("seed write failed");
        store
            .set_with(&subject, "aff4:size", i.to_string().into_bytes(), at)
            .expect("seed write failed");
    }
}
