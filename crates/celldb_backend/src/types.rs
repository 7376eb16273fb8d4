//! Cell-level types shared by backends and the layers above them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in time, in microseconds since the Unix epoch.
///
/// Timestamps identify versions: multiple cells may exist for one
/// (subject, predicate) pair as long as their timestamps differ.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The zero timestamp (the Unix epoch).
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from raw microseconds.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Returns the raw microsecond value.
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Returns the current wall-clock time at microsecond resolution.
    ///
    /// A system clock set before the Unix epoch yields
    /// [`Timestamp::ZERO`] (and trips a debug assertion).
    #[must_use]
    pub fn now() -> Self {
        let micros = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_micros() as u64,
            Err(_) => {
                debug_assert!(false, "system clock is before the Unix epoch");
                0
            }
        };
        Self(micros)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// All stored versions of one predicate, keyed by timestamp.
///
/// The map ordering gives versions oldest-first; the last entry is the
/// newest version. Keying by timestamp also enforces that no two cells
/// share an identical (subject, predicate, timestamp) triple.
pub type VersionMap = BTreeMap<Timestamp, Vec<u8>>;

/// A single cell write within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWrite {
    /// The attribute name being written.
    pub predicate: String,
    /// The opaque value bytes.
    pub value: Vec<u8>,
    /// The version timestamp.
    pub timestamp: Timestamp,
    /// Whether to purge all prior versions of the predicate first.
    pub replace: bool,
}

/// One operation within a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOp {
    /// Remove every stored version of a predicate. Removing an absent
    /// predicate is a no-op.
    DeleteVersions(String),
    /// Write one cell.
    Write(CellWrite),
}

/// An ordered batch of mutations against a single subject.
///
/// Backends apply a batch atomically: readers observe either none or
/// all of its operations. Operations apply in push order, which is how
/// delete-then-write semantics are expressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues deletion of every version of `predicate`.
    pub fn delete_versions(&mut self, predicate: impl Into<String>) {
        self.ops.push(BatchOp::DeleteVersions(predicate.into()));
    }

    /// Queues one cell write.
    pub fn write(&mut self, write: CellWrite) {
        self.ops.push(BatchOp::Write(write));
    }

    /// Returns the queued operations in application order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Returns true if the batch holds no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Every stored attribute of one subject: predicate name to versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectData {
    /// Predicate name to version map, ordered bytewise by name.
    pub predicates: BTreeMap<String, VersionMap>,
}

impl SubjectData {
    /// Creates an empty subject.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the newest stored version of `predicate`, if any.
    #[must_use]
    pub fn newest(&self, predicate: &str) -> Option<(&[u8], Timestamp)> {
        self.predicates
            .get(predicate)?
            .iter()
            .next_back()
            .map(|(ts, value)| (value.as_slice(), *ts))
    }

    /// Returns true if the subject holds no predicates at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Applies a batch of operations in order.
    pub fn apply(&mut self, batch: &WriteBatch) {
        for op in batch.ops() {
            match op {
                BatchOp::DeleteVersions(predicate) => {
                    self.predicates.remove(predicate);
                }
                BatchOp::Write(write) => {
                    let versions = self.predicates.entry(write.predicate.clone()).or_default();
                    if write.replace {
                        versions.clear();
                    }
                    versions.insert(write.timestamp, write.value.clone());
                }
            }
        }
        // Drop predicates whose version maps were emptied.
        self.predicates.retain(|_, versions| !versions.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn write(predicate: &str, value: &[u8], ts: u64, replace: bool) -> CellWrite {
        CellWrite {
            predicate: predicate.to_string(),
            value: value.to_vec(),
            timestamp: Timestamp::from_micros(ts),
            replace,
        }
    }

    #[test]
    fn timestamp_ordering() {
        assert!(Timestamp::from_micros(1) < Timestamp::from_micros(2));
        assert_eq!(Timestamp::ZERO.as_micros(), 0);
    }

    #[test]
    fn timestamp_now_is_recent() {
        let before = Timestamp::now();
        let after = Timestamp::now();
        assert!(before <= after);
        assert!(before.as_micros() > 0);
    }

    #[test]
    fn timestamp_display() {
        assert_eq!(format!("{}", Timestamp::from_micros(42)), "42us");
    }

    #[test]
    fn replace_purges_prior_versions() {
        let mut subject = SubjectData::new();
        let mut batch = WriteBatch::new();
        batch.write(write("metadata:size", b"1", 100, false));
        batch.write(write("metadata:size", b"2", 200, false));
        subject.apply(&batch);
        assert_eq!(subject.predicates["metadata:size"].len(), 2);

        let mut batch = WriteBatch::new();
        batch.write(write("metadata:size", b"3", 300, true));
        subject.apply(&batch);

        let versions = &subject.predicates["metadata:size"];
        assert_eq!(versions.len(), 1);
        assert_eq!(subject.newest("metadata:size").unwrap().0, b"3");
    }

    #[test]
    fn same_triple_overwrites() {
        let mut subject = SubjectData::new();
        let mut batch = WriteBatch::new();
        batch.write(write("metadata:a", b"old", 100, false));
        batch.write(write("metadata:a", b"new", 100, false));
        subject.apply(&batch);

        let versions = &subject.predicates["metadata:a"];
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[&Timestamp::from_micros(100)], b"new");
    }

    #[test]
    fn delete_then_write_in_one_batch() {
        let mut subject = SubjectData::new();
        let mut batch = WriteBatch::new();
        batch.write(write("metadata:a", b"1", 100, false));
        batch.write(write("metadata:a", b"2", 200, false));
        subject.apply(&batch);

        let mut batch = WriteBatch::new();
        batch.delete_versions("metadata:a");
        batch.write(write("metadata:a", b"3", 300, false));
        subject.apply(&batch);

        assert_eq!(subject.predicates["metadata:a"].len(), 1);
    }

    #[test]
    fn delete_absent_predicate_is_noop() {
        let mut subject = SubjectData::new();
        let mut batch = WriteBatch::new();
        batch.delete_versions("metadata:missing");
        subject.apply(&batch);
        assert!(subject.is_empty());
    }

    #[test]
    fn newest_picks_latest_timestamp() {
        let mut subject = SubjectData::new();
        let mut batch = WriteBatch::new();
        batch.write(write("metadata:a", b"early", 100, false));
        batch.write(write("metadata:a", b"late", 900, false));
        batch.write(write("metadata:a", b"middle", 500, false));
        subject.apply(&batch);

        let (value, ts) = subject.newest("metadata:a").unwrap();
        assert_eq!(value, b"late");
        assert_eq!(ts, Timestamp::from_micros(900));
    }

    proptest! {
        #[test]
        fn replace_always_leaves_single_version(
            timestamps in proptest::collection::vec(0u64..1_000_000, 1..20),
            last_ts in 0u64..1_000_000,
        ) {
            let mut subject = SubjectData::new();
            let mut batch = WriteBatch::new();
            for ts in &timestamps {
                batch.write(write("p", b"v", *ts, false));
            }
            batch.write(write("p", b"final", last_ts, true));
            subject.apply(&batch);
            prop_assert_eq!(subject.predicates["p"].len(), 1);
            prop_assert_eq!(subject.newest("p").unwrap().0, b"final".as_slice());
        }

        #[test]
        fn newest_is_max_timestamp(
            timestamps in proptest::collection::btree_set(0u64..1_000_000, 1..20),
        ) {
            let mut subject = SubjectData::new();
            let mut batch = WriteBatch::new();
            for ts in &timestamps {
                batch.write(write("p", ts.to_string().as_bytes(), *ts, false));
            }
            subject.apply(&batch);
            let max = *timestamps.iter().max().unwrap();
            let (_, ts) = subject.newest("p").unwrap();
            prop_assert_eq!(ts, Timestamp::from_micros(max));
        }
    }
}
