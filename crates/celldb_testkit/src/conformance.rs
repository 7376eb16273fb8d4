//! Backend contract conformance checks.
//!
//! Every [`Backend`] implementation must exhibit the same observable
//! behavior for the cell-level operations; the store layers above
//! assume it. Run [`check_backend_contract`] against a fresh, empty
//! backend to verify an implementation.

use celldb_backend::{Backend, CellWrite, Timestamp, WriteBatch};

fn write(predicate: &str, value: &[u8], micros: u64, replace: bool) -> CellWrite {
    CellWrite {
        predicate: predicate.to_string(),
        value: value.to_vec(),
        timestamp: Timestamp::from_micros(micros),
        replace,
    }
}

/// Runs the full conformance suite against a fresh, empty backend.
///
/// # Panics
///
/// Panics with a descriptive message on the first violated property.
pub fn check_backend_contract(backend: &dyn Backend) {
    starts_empty(backend);
    write_then_read_round_trips(backend);
    versions_accumulate_without_replace(backend);
    replace_purges_prior_versions(backend);
    batch_is_atomic_in_order(backend);
    empty_batch_creates_nothing(backend);
    deleting_last_predicate_removes_subject(backend);
    delete_subject_is_idempotent(backend);
    prefix_enumeration_is_bytewise(backend);
    flush_is_reentrant(backend);
}

fn starts_empty(backend: &dyn Backend) {
    assert!(
        backend
            .subjects_with_prefix("")
            .expect("prefix scan failed")
            .is_empty(),
        "a fresh backend must hold no subjects"
    );
}

fn write_then_read_round_trips(backend: &dyn Backend) {
    let mut batch = WriteBatch::new();
    batch.write(write("metadata:a", b"value", 100, false));
    backend.apply("conf:rt", &batch).expect("apply failed");

    let data = backend
        .read_subject("conf:rt")
        .expect("read failed")
        .expect("subject must exist after a write");
    let (value, ts) = data.newest("metadata:a").expect("predicate must exist");
    assert_eq!(value, b"value");
    assert_eq!(ts, Timestamp::from_micros(100));

    backend.delete_subject("conf:rt").expect("cleanup failed");
}

fn versions_accumulate_without_replace(backend: &dyn Backend) {
    let mut batch = WriteBatch::new();
    batch.write(write("metadata:a", b"1", 100, false));
    batch.write(write("metadata:a", b"2", 200, false));
    backend.apply("conf:acc", &batch).expect("apply failed");

    let data = backend
        .read_subject("conf:acc")
        .expect("read failed")
        .expect("subject must exist");
    assert_eq!(
        data.predicates["metadata:a"].len(),
        2,
        "non-replacing writes at distinct timestamps must both survive"
    );

    backend.delete_subject("conf:acc").expect("cleanup failed");
}

fn replace_purges_prior_versions(backend: &dyn Backend) {
    let mut batch = WriteBatch::new();
    batch.write(write("metadata:a", b"1", 100, false));
    batch.write(write("metadata:a", b"2", 200, false));
    backend.apply("conf:rep", &batch).expect("apply failed");

    let mut batch = WriteBatch::new();
    batch.write(write("metadata:a", b"3", 300, true));
    backend.apply("conf:rep", &batch).expect("apply failed");

    let data = backend
        .read_subject("conf:rep")
        .expect("read failed")
        .expect("subject must exist");
    assert_eq!(
        data.predicates["metadata:a"].len(),
        1,
        "a replacing write must purge every prior version"
    );
    assert_eq!(data.newest("metadata:a").unwrap().0, b"3");

    backend.delete_subject("conf:rep").expect("cleanup failed");
}

fn batch_is_atomic_in_order(backend: &dyn Backend) {
    let mut batch = WriteBatch::new();
    batch.write(write("metadata:old", b"1", 100, false));
    backend.apply("conf:atomic", &batch).expect("apply failed");

    // Delete-then-write of the same predicate within one batch.
    let mut batch = WriteBatch::new();
    batch.delete_versions("metadata:old");
    batch.write(write("metadata:old", b"2", 200, false));
    batch.write(write("metadata:new", b"3", 200, false));
    backend.apply("conf:atomic", &batch).expect("apply failed");

    let data = backend
        .read_subject("conf:atomic")
        .expect("read failed")
        .expect("subject must exist");
    assert_eq!(
        data.predicates["metadata:old"].len(),
        1,
        "operations must apply in batch order"
    );
    assert_eq!(data.newest("metadata:new").unwrap().0, b"3");

    backend.delete_subject("conf:atomic").expect("cleanup failed");
}

fn empty_batch_creates_nothing(backend: &dyn Backend) {
    backend
        .apply("conf:empty", &WriteBatch::new())
        .expect("apply failed");
    assert!(
        backend
            .read_subject("conf:empty")
            .expect("read failed")
            .is_none(),
        "an empty batch must not materialize a subject"
    );
}

fn deleting_last_predicate_removes_subject(backend: &dyn Backend) {
    let mut batch = WriteBatch::new();
    batch.write(write("metadata:only", b"1", 100, false));
    backend.apply("conf:vanish", &batch).expect("apply failed");

    let mut batch = WriteBatch::new();
    batch.delete_versions("metadata:only");
    backend.apply("conf:vanish", &batch).expect("apply failed");

    assert!(
        backend
            .read_subject("conf:vanish")
            .expect("read failed")
            .is_none(),
        "a subject with no remaining cells must vanish"
    );
}

fn delete_subject_is_idempotent(backend: &dyn Backend) {
    let mut batch = WriteBatch::new();
    batch.write(write("metadata:a", b"1", 100, false));
    backend.apply("conf:del", &batch).expect("apply failed");

    backend.delete_subject("conf:del").expect("delete failed");
    backend
        .delete_subject("conf:del")
        .expect("deleting an absent subject must be a no-op");
    assert!(backend
        .read_subject("conf:del")
        .expect("read failed")
        .is_none());
}

fn prefix_enumeration_is_bytewise(backend: &dyn Backend) {
    for subject in ["conf:p/1", "conf:p/10", "conf:p/2"] {
        let mut batch = WriteBatch::new();
        batch.write(write("metadata:a", b"1", 100, false));
        backend.apply(subject, &batch).expect("apply failed");
    }

    let subjects = backend
        .subjects_with_prefix("conf:p/")
        .expect("prefix scan failed");
    assert_eq!(
        subjects,
        ["conf:p/1", "conf:p/10", "conf:p/2"],
        "prefix enumeration must be ascending bytewise"
    );
    assert_eq!(
        backend
            .subjects_with_prefix("conf:p/1")
            .expect("prefix scan failed"),
        ["conf:p/1", "conf:p/10"]
    );

    for subject in ["conf:p/1", "conf:p/10", "conf:p/2"] {
        backend.delete_subject(subject).expect("cleanup failed");
    }
}

fn flush_is_reentrant(backend: &dyn Backend) {
    backend.flush().expect("flush failed");
    backend.flush().expect("second flush failed");
}
