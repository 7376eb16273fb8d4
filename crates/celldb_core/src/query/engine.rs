//! Subject-space scans: candidate enumeration, filtering, projection
//! and pagination.

use crate::error::{CoreError, CoreResult};
use crate::query::filter::Filter;
use crate::store::CellStore;
use crate::types::TimestampSelector;
use celldb_backend::Timestamp;
use std::collections::BTreeMap;

/// Where a query draws its candidate subjects from.
#[derive(Debug, Clone)]
enum QuerySource {
    Prefix(String),
    Subjects(Vec<String>),
}

/// A declarative scan over the subject space.
///
/// A query names one candidate source (a subject prefix or an explicit
/// subject set), a [`Filter`] candidates must pass, the attributes to
/// project and the version window to project them through. Build one
/// with the chainable methods, then run it with [`CellStore::query`].
#[derive(Debug, Clone)]
pub struct Query {
    attributes: Vec<String>,
    filter: Filter,
    source: Option<QuerySource>,
    selector: TimestampSelector,
    offset: usize,
    count: Option<usize>,
}

impl Query {
    /// Creates a query with the given filter, projecting every stored
    /// attribute at the newest version.
    #[must_use]
    pub fn new(filter: Filter) -> Self {
        Self {
            attributes: Vec::new(),
            filter,
            source: None,
            selector: TimestampSelector::Newest,
            offset: 0,
            count: None,
        }
    }

    /// Restricts projection to the named attributes. An empty list
    /// (the default) projects every attribute stored on the subject.
    #[must_use]
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Draws candidates from every subject whose key starts with the
    /// prefix. Replaces any previously set source.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.source = Some(QuerySource::Prefix(prefix.into()));
        self
    }

    /// Draws candidates from an explicit subject set. Replaces any
    /// previously set source. Candidates are visited in ascending
    /// bytewise order regardless of the order given here.
    #[must_use]
    pub fn subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = Some(QuerySource::Subjects(
            subjects.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Selects which versions of the projected attributes appear in
    /// each row. Defaults to [`TimestampSelector::Newest`].
    #[must_use]
    pub fn timestamp(mut self, selector: TimestampSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Skips the first `offset` matching rows and returns at most
    /// `count`. Pagination applies after filtering, so a page is a
    /// window into the matching rows, not into the candidates.
    #[must_use]
    pub fn limit(mut self, offset: usize, count: usize) -> Self {
        self.offset = offset;
        self.count = Some(count);
        self
    }
}

/// One matching subject with its projected attribute versions.
#[derive(Debug, Clone)]
pub struct Row {
    subject: String,
    timestamp: Timestamp,
    values: BTreeMap<String, Vec<(Vec<u8>, Timestamp)>>,
}

impl Row {
    /// The subject key.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The newest timestamp among the projected versions, or
    /// [`Timestamp::ZERO`] when nothing was projected.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// The projected versions of one attribute, oldest first.
    #[must_use]
    pub fn get(&self, predicate: &str) -> Option<&[(Vec<u8>, Timestamp)]> {
        self.values.get(predicate).map(Vec::as_slice)
    }

    /// The newest projected value of one attribute.
    #[must_use]
    pub fn newest(&self, predicate: &str) -> Option<&[u8]> {
        self.values
            .get(predicate)
            .and_then(|versions| versions.last())
            .map(|(value, _)| value.as_slice())
    }

    /// All projected attributes, keyed by predicate.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Vec<(Vec<u8>, Timestamp)>> {
        &self.values
    }
}

/// Lazy iterator over the rows matching a [`Query`].
///
/// Subjects are read from the backend one at a time as the iterator
/// advances, in ascending bytewise subject order. Backend failures
/// surface as `Err` items.
pub struct Rows {
    store: CellStore,
    candidates: std::vec::IntoIter<String>,
    attributes: Vec<String>,
    filter: Filter,
    selector: TimestampSelector,
    to_skip: usize,
    remaining: Option<usize>,
}

impl Iterator for Rows {
    type Item = CoreResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let subject = self.candidates.next()?;
            let data = match self.store.snapshot(&subject) {
                Ok(Some(data)) => data,
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            };
            if !self.filter.matches(&subject, &data) {
                continue;
            }
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }

            let mut values: BTreeMap<String, Vec<(Vec<u8>, Timestamp)>> = BTreeMap::new();
            let mut newest = Timestamp::ZERO;
            let project = |versions: &celldb_backend::VersionMap| {
                self.selector
                    .select(versions)
                    .into_iter()
                    .map(|(value, ts)| (value.to_vec(), ts))
                    .collect::<Vec<_>>()
            };
            if self.attributes.is_empty() {
                for (predicate, versions) in &data.predicates {
                    let selected = project(versions);
                    if !selected.is_empty() {
                        values.insert(predicate.clone(), selected);
                    }
                }
            } else {
                for predicate in &self.attributes {
                    if let Some(versions) = data.predicates.get(predicate) {
                        let selected = project(versions);
                        if !selected.is_empty() {
                            values.insert(predicate.clone(), selected);
                        }
                    }
                }
            }
            for versions in values.values() {
                for (_, ts) in versions {
                    newest = newest.max(*ts);
                }
            }

            if let Some(remaining) = &mut self.remaining {
                *remaining -= 1;
            }
            return Some(Ok(Row {
                subject,
                timestamp: newest,
                values,
            }));
        }
    }
}

impl CellStore {
    /// Runs a query, returning a lazy iterator over the matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the query names no
    /// candidate source, or [`CoreError::StoreClosed`].
    pub fn query(&self, query: Query) -> CoreResult<Rows> {
        self.ensure_open()?;
        let candidates = match query.source {
            Some(QuerySource::Prefix(prefix)) => self.subjects_with_prefix(&prefix)?,
            Some(QuerySource::Subjects(mut subjects)) => {
                subjects.sort();
                subjects.dedup();
                subjects
            }
            None => {
                return Err(CoreError::invalid_argument(
                    "query needs a subject prefix or an explicit subject set",
                ))
            }
        };
        Ok(Rows {
            store: self.clone(),
            candidates: candidates.into_iter(),
            attributes: query.attributes,
            filter: query.filter,
            selector: query.selector,
            to_skip: query.offset,
            remaining: query.count,
        })
    }
}
