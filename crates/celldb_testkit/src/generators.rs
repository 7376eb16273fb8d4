//! Property-based test generators using proptest.

use celldb_backend::{BatchOp, CellWrite, Timestamp, WriteBatch};
use proptest::prelude::*;

/// Strategy for subject keys, including path-shaped and unicode forms.
pub fn subject_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("row:[0-9]{1,4}").expect("invalid regex"),
        prop::string::string_regex("aff4:/C\\.[0-9a-f]{16}/fs/os(/[a-z]{1,8}){0,3}")
            .expect("invalid regex"),
        Just("row:Îñţérñåţîöñåļîžåţîờñ".to_string()),
    ]
}

/// Strategy for predicate names in the conventional `family:name` form.
pub fn predicate_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("(metadata|aff4|task):[a-z0-9_]{1,12}").expect("invalid regex")
}

/// Strategy for opaque cell values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for version timestamps within a small window, so
/// collisions and orderings both occur.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (0u64..10_000).prop_map(Timestamp::from_micros)
}

/// Strategy for a single batch operation.
pub fn batch_op_strategy() -> impl Strategy<Value = BatchOp> {
    prop_oneof![
        predicate_strategy().prop_map(BatchOp::DeleteVersions),
        (
            predicate_strategy(),
            value_strategy(),
            timestamp_strategy(),
            any::<bool>(),
        )
            .prop_map(|(predicate, value, timestamp, replace)| {
                BatchOp::Write(CellWrite {
                    predicate,
                    value,
                    timestamp,
                    replace,
                })
            }),
    ]
}

/// Strategy for whole write batches.
pub fn write_batch_strategy() -> impl Strategy<Value = WriteBatch> {
    prop::collection::vec(batch_op_strategy(), 0..16).prop_map(|ops| {
        let mut batch = WriteBatch::new();
        for op in ops {
            match op {
                BatchOp::DeleteVersions(predicate) => batch.delete_versions(predicate),
                BatchOp::Write(write) => batch.write(write),
            }
        }
        batch
    })
}
