//! Composable subject filters.

use crate::codec;
use crate::error::{CoreError, CoreResult};
use celldb_backend::SubjectData;
use regex::Regex;

pub use regex::escape;

/// A composable, stateless predicate over a subject's current
/// attribute snapshot.
///
/// Filters are tagged variants holding typed parameters, evaluated by
/// a small interpreter; nothing is generated or interpolated at
/// runtime. Regex-bearing variants are built through fallible
/// constructors so malformed patterns surface as
/// [`CoreError::InvalidArgument`] at construction, never mid-scan.
/// Embed literal strings into patterns with [`escape`].
#[derive(Debug, Clone)]
pub enum Filter {
    /// True if at least one version of the predicate exists.
    HasPredicate(String),
    /// True if the subject key matches the regex (search, not
    /// anchored).
    SubjectMatches(Regex),
    /// True if the predicate's current value, as UTF-8 text, matches
    /// the regex.
    PredicateValueMatches {
        /// The predicate whose newest value is tested.
        predicate: String,
        /// The pattern the value must match.
        pattern: Regex,
    },
    /// True if the predicate's current value decodes as an integer
    /// strictly less than the bound.
    PredicateLessThan {
        /// The predicate whose newest value is tested.
        predicate: String,
        /// The exclusive upper bound.
        bound: i64,
    },
    /// True if the predicate's current value decodes as an integer
    /// strictly greater than the bound.
    PredicateGreaterThan {
        /// The predicate whose newest value is tested.
        predicate: String,
        /// The exclusive lower bound.
        bound: i64,
    },
    /// Conjunction; short-circuits on the first failing filter.
    And(Vec<Filter>),
}

impl Filter {
    /// A filter requiring the predicate to be present.
    #[must_use]
    pub fn has_predicate(predicate: impl Into<String>) -> Self {
        Self::HasPredicate(predicate.into())
    }

    /// A filter matching the subject key against a regex.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] for a malformed pattern.
    pub fn subject_matches(pattern: &str) -> CoreResult<Self> {
        Ok(Self::SubjectMatches(compile(pattern)?))
    }

    /// A filter matching a predicate's newest value, as text, against
    /// a regex.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] for a malformed pattern.
    pub fn predicate_value_matches(
        predicate: impl Into<String>,
        pattern: &str,
    ) -> CoreResult<Self> {
        Ok(Self::PredicateValueMatches {
            predicate: predicate.into(),
            pattern: compile(pattern)?,
        })
    }

    /// A numeric less-than filter on a predicate's newest value.
    #[must_use]
    pub fn less_than(predicate: impl Into<String>, bound: i64) -> Self {
        Self::PredicateLessThan {
            predicate: predicate.into(),
            bound,
        }
    }

    /// A numeric greater-than filter on a predicate's newest value.
    #[must_use]
    pub fn greater_than(predicate: impl Into<String>, bound: i64) -> Self {
        Self::PredicateGreaterThan {
            predicate: predicate.into(),
            bound,
        }
    }

    /// The conjunction of the given filters.
    #[must_use]
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    /// Evaluates the filter against a subject and its stored
    /// attributes. Filters test the newest version of each predicate.
    #[must_use]
    pub fn matches(&self, subject: &str, snapshot: &SubjectData) -> bool {
        match self {
            Self::HasPredicate(predicate) => snapshot.predicates.contains_key(predicate),
            Self::SubjectMatches(pattern) => pattern.is_match(subject),
            Self::PredicateValueMatches { predicate, pattern } => snapshot
                .newest(predicate)
                .is_some_and(|(value, _)| pattern.is_match(&String::from_utf8_lossy(value))),
            Self::PredicateLessThan { predicate, bound } => snapshot
                .newest(predicate)
                .and_then(|(value, _)| codec::decode_i64(value))
                .is_some_and(|n| n < *bound),
            Self::PredicateGreaterThan { predicate, bound } => snapshot
                .newest(predicate)
                .and_then(|(value, _)| codec::decode_i64(value))
                .is_some_and(|n| n > *bound),
            Self::And(filters) => filters
                .iter()
                .all(|filter| filter.matches(subject, snapshot)),
        }
    }
}

fn compile(pattern: &str) -> CoreResult<Regex> {
    Regex::new(pattern).map_err(|err| CoreError::invalid_argument(format!("bad pattern: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use celldb_backend::{CellWrite, Timestamp, WriteBatch};

    fn snapshot(entries: &[(&str, &[u8])]) -> SubjectData {
        let mut data = SubjectData::new();
        let mut batch = WriteBatch::new();
        for (predicate, value) in entries {
            batch.write(CellWrite {
                predicate: predicate.to_string(),
                value: value.to_vec(),
                timestamp: Timestamp::from_micros(1000),
                replace: true,
            });
        }
        data.apply(&batch);
        data
    }

    #[test]
    fn has_predicate() {
        let data = snapshot(&[("metadata:5", b"5")]);
        assert!(Filter::has_predicate("metadata:5").matches("row:5", &data));
        assert!(!Filter::has_predicate("metadata:6").matches("row:5", &data));
    }

    #[test]
    fn subject_matches_is_a_search() {
        let data = snapshot(&[("metadata:5", b"5")]);
        let filter = Filter::subject_matches("test [1-5]").unwrap();
        assert!(filter.matches("row:test 3", &data));
        assert!(!filter.matches("row:test 7", &data));
    }

    #[test]
    fn escaped_literal_matches_itself_only() {
        let data = snapshot(&[("metadata:x", b"1")]);
        let literal = "test-[]()+*?[]()";
        let filter = Filter::subject_matches(&escape(literal)).unwrap();
        assert!(filter.matches(&format!("host/{literal}"), &data));
        assert!(!filter.matches("host/test-x", &data));
    }

    #[test]
    fn predicate_value_matches_text() {
        let data = snapshot(&[("metadata:foo", b"row:05foo")]);
        let filter = Filter::predicate_value_matches("metadata:foo", "row:0[0-9]foo").unwrap();
        assert!(filter.matches("row:05", &data));

        let miss = Filter::predicate_value_matches("metadata:foo", "row:1[0-9]foo").unwrap();
        assert!(!miss.matches("row:05", &data));
    }

    #[test]
    fn numeric_comparisons_are_strict() {
        let data = snapshot(&[("aff4:size", b"5")]);
        assert!(!Filter::less_than("aff4:size", 5).matches("s", &data));
        assert!(Filter::less_than("aff4:size", 6).matches("s", &data));
        assert!(!Filter::greater_than("aff4:size", 5).matches("s", &data));
        assert!(Filter::greater_than("aff4:size", 4).matches("s", &data));
    }

    #[test]
    fn numeric_comparison_reads_codec_values() {
        let encoded = codec::encode(&4i64).unwrap();
        let data = snapshot(&[("aff4:size", encoded.as_slice())]);
        assert!(Filter::less_than("aff4:size", 5).matches("s", &data));
    }

    #[test]
    fn numeric_comparison_fails_on_non_numeric() {
        let data = snapshot(&[("aff4:size", b"not a number")]);
        assert!(!Filter::less_than("aff4:size", 5).matches("s", &data));
        assert!(!Filter::greater_than("aff4:size", 5).matches("s", &data));
    }

    #[test]
    fn and_short_circuits() {
        let data = snapshot(&[("metadata:foo", b"x")]);
        let filter = Filter::and(vec![
            Filter::has_predicate("metadata:foo"),
            Filter::subject_matches("row:[0-1]0").unwrap(),
        ]);
        assert!(filter.matches("row:00", &data));
        assert!(!filter.matches("row:05", &data));
    }

    #[test]
    fn empty_and_matches_everything() {
        let data = snapshot(&[]);
        assert!(Filter::and(Vec::new()).matches("row:anything", &data));
    }

    #[test]
    fn bad_pattern_is_invalid_argument() {
        let result = Filter::subject_matches("row:[");
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }
}
