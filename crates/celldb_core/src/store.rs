//! The cell store facade.

use crate::codec;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::transaction::LockTable;
use crate::types::{Cell, TimestampSelector};
use celldb_backend::{Backend, CellWrite, MemoryBackend, SubjectData, Timestamp, WriteBatch};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Options for a single-cell write.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Explicit version timestamp; `None` means the wall clock at
    /// write time.
    pub timestamp: Option<Timestamp>,
    /// Keep prior versions instead of replacing them.
    pub keep_versions: bool,
}

impl SetOptions {
    /// Creates default options: current time, replace prior versions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the cell at an explicit timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Preserves prior versions of the predicate alongside this one.
    #[must_use]
    pub const fn keep_versions(mut self) -> Self {
        self.keep_versions = true;
        self
    }
}

/// One attribute write within a [`CellStore::multi_set`] batch.
#[derive(Debug, Clone)]
pub struct AttrWrite {
    /// The attribute name.
    pub predicate: String,
    /// The opaque value bytes.
    pub value: Vec<u8>,
    /// Explicit version timestamp; `None` independently defaults to
    /// the wall clock at write time.
    pub timestamp: Option<Timestamp>,
}

impl AttrWrite {
    /// A write stamped with the wall clock at apply time.
    #[must_use]
    pub fn new(predicate: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            predicate: predicate.into(),
            value: value.into(),
            timestamp: None,
        }
    }

    /// A write with an explicit version timestamp.
    #[must_use]
    pub fn at(
        predicate: impl Into<String>,
        value: impl Into<Vec<u8>>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            predicate: predicate.into(),
            value: value.into(),
            timestamp: Some(timestamp),
        }
    }
}

pub(crate) struct StoreInner {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) locks: LockTable,
    pub(crate) config: Config,
    open: AtomicBool,
}

/// The versioned attribute store.
///
/// `CellStore` is the primary entry point: a schemaless, multi-version
/// key space addressed by (subject, predicate, timestamp), behind a
/// pluggable [`Backend`]. Handles are cheap to clone and share one
/// underlying store.
///
/// # Lifecycle
///
/// A store is explicitly constructed over an injected backend and
/// closed when done; there is no ambient global handle.
///
/// ```rust
/// use celldb_core::CellStore;
///
/// let store = CellStore::open_in_memory();
/// store.set("host/fs/os/etc/passwd", "metadata:size", b"144".to_vec()).unwrap();
/// let (value, _ts) = store.resolve("host/fs/os/etc/passwd", "metadata:size").unwrap().unwrap();
/// assert_eq!(value, b"144");
/// store.close().unwrap();
/// ```
#[derive(Clone)]
pub struct CellStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl CellStore {
    /// Opens a store over the given backend with default
    /// configuration.
    ///
    /// A backend must be owned by exactly one store. Transaction locks
    /// are tracked in the store, shared by every clone of its handle,
    /// so two independently opened stores over the same backend would
    /// not see each other's locks. Clone the `CellStore` instead of
    /// opening the backend twice.
    #[must_use]
    pub fn open(backend: Arc<dyn Backend>) -> Self {
        Self::open_with_config(backend, Config::default())
    }

    /// Opens a store over the given backend.
    ///
    /// The single-store-per-backend requirement of [`CellStore::open`]
    /// applies here too.
    #[must_use]
    pub fn open_with_config(backend: Arc<dyn Backend>, config: Config) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                locks: LockTable::new(),
                config,
                open: AtomicBool::new(true),
            }),
        }
    }

    /// Opens a store over a fresh in-memory backend.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self::open(Arc::new(MemoryBackend::new()))
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Flushes and closes the store. Further operations on any clone
    /// of this handle fail with [`CoreError::StoreClosed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails; the store still
    /// closes.
    pub fn close(&self) -> CoreResult<()> {
        let result = if self.inner.config.flush_on_close {
            self.inner.backend.flush().map_err(CoreError::from)
        } else {
            Ok(())
        };
        self.inner.open.store(false, Ordering::SeqCst);
        debug!("store closed");
        result
    }

    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if self.inner.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::StoreClosed)
        }
    }

    /// Stores one cell, stamped with the current wall clock,
    /// replacing any prior versions of the predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn set(
        &self,
        subject: &str,
        predicate: &str,
        value: impl Into<Vec<u8>>,
    ) -> CoreResult<()> {
        self.set_with(subject, predicate, value, SetOptions::new())
    }

    /// Stores one cell with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn set_with(
        &self,
        subject: &str,
        predicate: &str,
        value: impl Into<Vec<u8>>,
        options: SetOptions,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        let timestamp = options.timestamp.unwrap_or_else(Timestamp::now);
        let mut batch = WriteBatch::new();
        batch.write(CellWrite {
            predicate: predicate.to_string(),
            value: value.into(),
            timestamp,
            replace: !options.keep_versions,
        });
        trace!(subject, predicate, %timestamp, "set");
        self.inner.backend.apply(subject, &batch)?;
        Ok(())
    }

    /// Stores one cell holding a codec-encoded value.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the backend write fails.
    pub fn set_value<T: Serialize>(
        &self,
        subject: &str,
        predicate: &str,
        value: &T,
    ) -> CoreResult<()> {
        self.set(subject, predicate, codec::encode(value)?)
    }

    /// Applies one logical batch to a subject: every version of each
    /// predicate in `to_delete` is removed first, then each write is
    /// applied. Writes without an explicit timestamp each
    /// independently default to the current wall clock.
    ///
    /// The whole batch becomes visible to readers as one atomic step.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn multi_set(
        &self,
        subject: &str,
        writes: Vec<AttrWrite>,
        to_delete: Vec<String>,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        let mut batch = WriteBatch::new();
        for predicate in to_delete {
            batch.delete_versions(predicate);
        }
        for write in writes {
            batch.write(CellWrite {
                predicate: write.predicate,
                value: write.value,
                timestamp: write.timestamp.unwrap_or_else(Timestamp::now),
                replace: false,
            });
        }
        if batch.is_empty() {
            return Ok(());
        }
        debug!(subject, ops = batch.len(), "multi_set");
        self.inner.backend.apply(subject, &batch)?;
        Ok(())
    }

    /// Returns the newest version of a predicate, or `None` if no
    /// value is stored.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure, never for absence.
    pub fn resolve(
        &self,
        subject: &str,
        predicate: &str,
    ) -> CoreResult<Option<(Vec<u8>, Timestamp)>> {
        self.ensure_open()?;
        let Some(data) = self.inner.backend.read_subject(subject)? else {
            return Ok(None);
        };
        Ok(data
            .newest(predicate)
            .map(|(value, ts)| (value.to_vec(), ts)))
    }

    /// Returns the newest version of a predicate, decoded through the
    /// codec.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure or if the stored bytes do
    /// not decode as `T`.
    pub fn resolve_as<T: DeserializeOwned>(
        &self,
        subject: &str,
        predicate: &str,
    ) -> CoreResult<Option<(T, Timestamp)>> {
        match self.resolve(subject, predicate)? {
            Some((bytes, ts)) => Ok(Some((codec::decode(&bytes)?, ts))),
            None => Ok(None),
        }
    }

    /// Returns cells whose predicate matches a regular expression,
    /// scoped by the timestamp selector.
    ///
    /// Under [`TimestampSelector::All`] every stored version of every
    /// matching predicate is returned; under
    /// [`TimestampSelector::Newest`] exactly one cell per matching
    /// predicate; under a range, versions inside the inclusive range.
    /// Predicates are matched against the whole name, in bytewise
    /// predicate order, versions oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] for a malformed pattern,
    /// or a backend error.
    pub fn resolve_regex(
        &self,
        subject: &str,
        pattern: &str,
        selector: TimestampSelector,
    ) -> CoreResult<Vec<Cell>> {
        self.ensure_open()?;
        let regex = compile_predicate_pattern(pattern)?;
        let Some(data) = self.inner.backend.read_subject(subject)? else {
            return Ok(Vec::new());
        };
        Ok(select_matching(&data, |predicate| regex.is_match(predicate), selector))
    }

    /// Applies [`CellStore::resolve_regex`] logic per subject across
    /// the union of the given patterns. Subjects with zero matching
    /// cells under the selector are omitted from the result map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] for a malformed pattern,
    /// or a backend error.
    pub fn multi_resolve_regex<S: AsRef<str>, P: AsRef<str>>(
        &self,
        subjects: &[S],
        patterns: &[P],
        selector: TimestampSelector,
    ) -> CoreResult<BTreeMap<String, Vec<Cell>>> {
        self.ensure_open()?;
        let regexes = patterns
            .iter()
            .map(|pattern| compile_predicate_pattern(pattern.as_ref()))
            .collect::<CoreResult<Vec<_>>>()?;

        let mut results = BTreeMap::new();
        for subject in subjects {
            let subject = subject.as_ref();
            let Some(data) = self.inner.backend.read_subject(subject)? else {
                continue;
            };
            let cells = select_matching(
                &data,
                |predicate| regexes.iter().any(|regex| regex.is_match(predicate)),
                selector,
            );
            if !cells.is_empty() {
                results.insert(subject.to_string(), cells);
            }
        }
        Ok(results)
    }

    /// Looks up exactly the named predicates, in input order, yielding
    /// the newest version of each and silently omitting predicates
    /// with no stored value.
    ///
    /// # Errors
    ///
    /// Returns an error only on backend failure.
    pub fn resolve_multi<P: AsRef<str>>(
        &self,
        subject: &str,
        predicates: &[P],
    ) -> CoreResult<Vec<Cell>> {
        self.ensure_open()?;
        let Some(data) = self.inner.backend.read_subject(subject)? else {
            return Ok(Vec::new());
        };
        Ok(predicates
            .iter()
            .filter_map(|predicate| {
                let predicate = predicate.as_ref();
                data.newest(predicate)
                    .map(|(value, ts)| Cell::new(predicate, value, ts))
            })
            .collect())
    }

    /// Removes all versions of exactly the named predicates, leaving
    /// others untouched. Removing an absent predicate is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn delete_attributes<P: AsRef<str>>(
        &self,
        subject: &str,
        predicates: &[P],
    ) -> CoreResult<()> {
        self.ensure_open()?;
        let mut batch = WriteBatch::new();
        for predicate in predicates {
            batch.delete_versions(predicate.as_ref());
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.inner.backend.apply(subject, &batch)?;
        Ok(())
    }

    /// Removes a subject with every predicate and version under it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn delete_subject(&self, subject: &str) -> CoreResult<()> {
        self.ensure_open()?;
        debug!(subject, "delete_subject");
        self.inner.backend.delete_subject(subject)?;
        Ok(())
    }

    /// Synchronization barrier: all prior writes on the calling path
    /// become durable and visible to subsequent reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot establish the barrier.
    pub fn flush(&self) -> CoreResult<()> {
        self.ensure_open()?;
        self.inner.backend.flush()?;
        Ok(())
    }

    /// Enumerates subjects whose key starts with `prefix`, ascending
    /// bytewise.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    pub fn subjects_with_prefix(&self, prefix: &str) -> CoreResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.inner.backend.subjects_with_prefix(prefix)?)
    }

    pub(crate) fn snapshot(&self, subject: &str) -> CoreResult<Option<SubjectData>> {
        Ok(self.inner.backend.read_subject(subject)?)
    }
}

impl std::fmt::Debug for CellStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellStore")
            .field("open", &self.inner.open.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Compiles a predicate pattern anchored to the whole name, so
/// `metadata:size` matches only itself while `metadata:.*` matches the
/// whole family.
pub(crate) fn compile_predicate_pattern(pattern: &str) -> CoreResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|err| CoreError::invalid_argument(format!("bad predicate pattern: {err}")))
}

fn select_matching(
    data: &SubjectData,
    mut matches: impl FnMut(&str) -> bool,
    selector: TimestampSelector,
) -> Vec<Cell> {
    let mut cells = Vec::new();
    for (predicate, versions) in &data.predicates {
        if !matches(predicate) {
            continue;
        }
        for (value, ts) in selector.select(versions) {
            cells.push(Cell::new(predicate.clone(), value, ts));
        }
    }
    cells
}
