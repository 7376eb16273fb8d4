//! Runs the backend conformance suite against every shipped backend,
//! plus end-to-end checks that the store behaves identically over each.

use celldb_backend::{Backend, FileBackend, MemoryBackend};
use celldb_core::{CellStore, Filter, Query, TimestampSelector};
use celldb_testkit::{check_backend_contract, fast_config, seed_rows};
use std::sync::Arc;

#[test]
fn memory_backend_conforms() {
    let backend = MemoryBackend::new();
    check_backend_contract(&backend);
}

#[test]
fn file_backend_conforms() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(&dir.path().join("cells.db")).unwrap();
    check_backend_contract(&backend);
}

#[test]
fn file_backend_conforms_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cells.db");
    {
        let backend = FileBackend::open(&path).unwrap();
        check_backend_contract(&backend);
        backend.flush().unwrap();
    }
    // The suite cleans up after itself, so a reopened backend starts
    // empty and must pass again.
    let backend = FileBackend::open(&path).unwrap();
    check_backend_contract(&backend);
}

fn stores() -> Vec<(&'static str, CellStore, Option<tempfile::TempDir>)> {
    let dir = tempfile::tempdir().unwrap();
    let file_backend = FileBackend::open(&dir.path().join("cells.db")).unwrap();
    vec![
        ("memory", CellStore::open_in_memory(), None),
        (
            "file",
            CellStore::open_with_config(Arc::new(file_backend), fast_config()),
            Some(dir),
        ),
    ]
}

#[test]
fn query_behaves_identically_over_both_backends() {
    for (name, store, _guard) in stores() {
        seed_rows(&store, 10);

        let rows: Vec<_> = store
            .query(
                Query::new(Filter::has_predicate("aff4:type"))
                    .prefix("row:")
                    .limit(2, 3),
            )
            .unwrap()
            .map(|row| row.unwrap())
            .collect();
        let subjects: Vec<_> = rows.iter().map(|row| row.subject().to_string()).collect();
        assert_eq!(subjects, ["row:02", "row:03", "row:04"], "backend: {name}");
    }
}

#[test]
fn transactions_behave_identically_over_both_backends() {
    for (name, store, _guard) in stores() {
        let mut txn = store.transaction("row:t").unwrap();
        txn.set("metadata:a", b"staged".to_vec());
        assert!(
            store.resolve("row:t", "metadata:a").unwrap().is_none(),
            "backend: {name}"
        );
        txn.commit().unwrap();
        assert_eq!(
            store.resolve("row:t", "metadata:a").unwrap().unwrap().0,
            b"staged",
            "backend: {name}"
        );
    }
}

#[test]
fn version_history_survives_file_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cells.db");
    {
        let backend = FileBackend::open(&path).unwrap();
        let store = CellStore::open(Arc::new(backend));
        for micros in [1000u64, 2000, 3000] {
            store
                .set_with(
                    "row:x",
                    "metadata:a",
                    micros.to_string().into_bytes(),
                    celldb_core::SetOptions::new()
                        .timestamp(celldb_core::Timestamp::from_micros(micros))
                        .keep_versions(),
                )
                .unwrap();
        }
        store.close().unwrap();
    }

    let backend = FileBackend::open(&path).unwrap();
    let store = CellStore::open(Arc::new(backend));
    let cells = store
        .resolve_regex("row:x", "metadata:a", TimestampSelector::All)
        .unwrap();
    assert_eq!(cells.len(), 3);
    let (value, ts) = store.resolve("row:x", "metadata:a").unwrap().unwrap();
    assert_eq!(value, b"3000");
    assert_eq!(ts.as_micros(), 3000);
}
