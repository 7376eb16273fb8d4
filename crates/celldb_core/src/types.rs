//! Core type definitions for the store.

use celldb_backend::{Timestamp, VersionMap};

/// One resolved cell: a predicate, one of its values, and the value's
/// version timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// The attribute name.
    pub predicate: String,
    /// The opaque value bytes.
    pub value: Vec<u8>,
    /// The version timestamp.
    pub timestamp: Timestamp,
}

impl Cell {
    /// Creates a cell.
    #[must_use]
    pub fn new(predicate: impl Into<String>, value: impl Into<Vec<u8>>, timestamp: Timestamp) -> Self {
        Self {
            predicate: predicate.into(),
            value: value.into(),
            timestamp,
        }
    }
}

/// Selects which stored versions a read operation returns.
///
/// The "newest" and "all" modes are dedicated variants rather than
/// reserved timestamp values, so no literal timestamp can ever be
/// mistaken for a selector mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSelector {
    /// Only the most recent version per predicate.
    #[default]
    Newest,
    /// Every stored version.
    All,
    /// Only the version stored at exactly this timestamp.
    Exact(Timestamp),
    /// Versions within an inclusive `[start, end]` range.
    Range(Timestamp, Timestamp),
}

impl TimestampSelector {
    /// Convenience constructor for an inclusive range of raw
    /// microsecond values.
    #[must_use]
    pub const fn range_micros(start: u64, end: u64) -> Self {
        Self::Range(Timestamp::from_micros(start), Timestamp::from_micros(end))
    }

    /// Returns the versions a map holds under this selector, oldest
    /// first.
    #[must_use]
    pub fn select<'a>(&self, versions: &'a VersionMap) -> Vec<(&'a [u8], Timestamp)> {
        match self {
            Self::Newest => versions
                .iter()
                .next_back()
                .map(|(ts, value)| (value.as_slice(), *ts))
                .into_iter()
                .collect(),
            Self::All => versions
                .iter()
                .map(|(ts, value)| (value.as_slice(), *ts))
                .collect(),
            Self::Exact(at) => versions
                .get(at)
                .map(|value| (value.as_slice(), *at))
                .into_iter()
                .collect(),
            Self::Range(start, end) => versions
                .range(*start..=*end)
                .map(|(ts, value)| (value.as_slice(), *ts))
                .collect(),
        }
    }
}
