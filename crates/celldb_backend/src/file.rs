//! File-based storage backend for persistent storage.

use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};
use crate::types::{SubjectData, WriteBatch};
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A file-backed storage backend.
///
/// The full cell space is held in memory and persisted to `path` as a
/// CBOR snapshot. The snapshot is written on [`Backend::flush`], so
/// `flush` is the durability barrier: writes that were never flushed
/// do not survive a restart.
///
/// Snapshots are written to a sibling temp file and renamed into
/// place, so a crash mid-flush leaves the previous snapshot intact.
///
/// # Locking
///
/// Opening takes an exclusive advisory lock on a sibling `.lock` file
/// and holds it for the backend's lifetime; a second process opening
/// the same path gets [`BackendError::Locked`].
///
/// # Example
///
/// ```no_run
/// use celldb_backend::{Backend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("cells.db")).unwrap();
/// backend.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    // Held for its advisory lock; never read or written.
    _lock_file: File,
    subjects: RwLock<BTreeMap<String, SubjectData>>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// If a snapshot exists it is loaded; otherwise the store starts
    /// empty and the file is created on the first flush.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Locked`] if another process holds the
    /// lock, [`BackendError::Corrupted`] if the snapshot cannot be
    /// decoded, or an I/O error.
    pub fn open(path: &Path) -> BackendResult<Self> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(Self::lock_path(path))?;
        lock_file.try_lock_exclusive().map_err(|err| {
            if err.kind() == fs2::lock_contended_error().kind() {
                BackendError::Locked
            } else {
                BackendError::Io(err)
            }
        })?;

        let subjects = match File::open(path) {
            Ok(file) => {
                if file.metadata()?.len() == 0 {
                    BTreeMap::new()
                } else {
                    ciborium::de::from_reader(BufReader::new(file))
                        .map_err(|err| BackendError::Corrupted(err.to_string()))?
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(BackendError::Io(err)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
            subjects: RwLock::new(subjects),
        })
    }

    /// Opens or creates a file backend, creating parent directories
    /// if needed.
    ///
    /// # Errors
    ///
    /// As for [`FileBackend::open`].
    pub fn open_with_create_dirs(path: &Path) -> BackendResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl Backend for FileBackend {
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
        // Hold the read guard across the snapshot so flush captures a
        // consistent image.
        let subjects = self.subjects.read();
        let tmp_path = self.tmp_path();

        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        ciborium::ser::into_writer(&*subjects, &mut writer)
            .map_err(|err| BackendError::Corrupted(format!("snapshot encode: {err}")))?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|err| BackendError::Io(err.into_error()))?
            .sync_all()?;

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellWrite, Timestamp};
    use tempfile::tempdir;

    fn set(backend: &FileBackend, subject: &str, predicate: &str, value: &[u8], ts: u64) {
        let mut batch = WriteBatch::new();
        batch.write(CellWrite {
            predicate: predicate.to_string(),
            value: value.to_vec(),
            timestamp: Timestamp::from_micros(ts),
            replace: false,
        });
        backend.apply(subject, &batch).unwrap();
    }

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.read_subject("row:0").unwrap().is_none());
    }

    #[test]
    fn file_apply_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");

        let backend = FileBackend::open(&path).unwrap();
        set(&backend, "row:0", "metadata:a", b"hello", 100);

        let data = backend.read_subject("row:0").unwrap().unwrap();
        assert_eq!(data.newest("metadata:a").unwrap().0, b"hello");
    }

    #[test]
    fn file_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");

        {
            let backend = FileBackend::open(&path).unwrap();
            set(&backend, "row:0", "metadata:a", b"persistent", 100);
            set(&backend, "row:0", "metadata:a", b"newer", 200);
            backend.flush().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        let data = backend.read_subject("row:0").unwrap().unwrap();
        let (value, ts) = data.newest("metadata:a").unwrap();
        assert_eq!(value, b"newer");
        assert_eq!(ts, Timestamp::from_micros(200));
        assert_eq!(data.predicates["metadata:a"].len(), 2);
    }

    #[test]
    fn file_unflushed_writes_do_not_survive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");

        {
            let backend = FileBackend::open(&path).unwrap();
            set(&backend, "row:0", "metadata:a", b"kept", 100);
            backend.flush().unwrap();
            set(&backend, "row:1", "metadata:a", b"lost", 100);
            // No flush before drop.
        }

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.read_subject("row:0").unwrap().is_some());
        assert!(backend.read_subject("row:1").unwrap().is_none());
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");

        let _first = FileBackend::open(&path).unwrap();
        let second = FileBackend::open(&path);
        assert!(matches!(second, Err(BackendError::Locked)));
    }

    #[test]
    fn file_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");

        {
            let _backend = FileBackend::open(&path).unwrap();
        }
        assert!(FileBackend::open(&path).is_ok());
    }

    #[test]
    fn file_prefix_scan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");

        let backend = FileBackend::open(&path).unwrap();
        for i in 0..11 {
            set(&backend, &format!("row:{i}"), "metadata:a", b"1", 100);
        }

        let matches = backend.subjects_with_prefix("row:1").unwrap();
        assert_eq!(matches, vec!["row:1".to_string(), "row:10".to_string()]);
    }

    #[test]
    fn file_corrupted_snapshot_reports_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cells.db");
        std::fs::write(&path, b"not a cbor snapshot").unwrap();

        let result = FileBackend::open(&path);
        assert!(matches!(result, Err(BackendError::Corrupted(_))));
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("cells.db");

        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        backend.flush().unwrap();
        assert!(path.exists());
    }
}
