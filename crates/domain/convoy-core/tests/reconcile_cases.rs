use convoy_core::reconcile::classify;
use convoy_core::{FileRecord, LedgerState, Manifest};

// --- Helpers to build records easily ---

fn record(path: &str, checksum: &str, modified: &str) -> FileRecord {
    FileRecord {
        path: path.to_string(),
        editor: "alice".to_string(),
        modified: modified.to_string(),
        checksum: checksum.to_string(),
    }
}

fn manifest(records: Vec<FileRecord>) -> Manifest {
    Manifest::from_records(records)
}

// --- Tests ---

#[test]
fn new_local_file_is_a_push_candidate() {
    let current = manifest(vec![record("report.txt", "X", "2024-01-01 09:00:00")]);
    let ledger = LedgerState::default();

    let c = classify(&current, &ledger);

    assert_eq!(c.pushes.len(), 1);
    assert_eq!(c.pushes[0].record.path, "report.txt");
    assert!(!c.pushes[0].archived_remotely);
    assert!(c.pulls.is_empty());
    assert!(c.local_deletes.is_empty());
    assert!(c.remote_deletes.is_empty());
}

#[test]
fn push_candidate_warns_when_remote_archived_it_before() {
    let current = manifest(vec![record("undead.txt", "X", "2024-01-01 09:00:00")]);
    let ledger = LedgerState {
        remote_tombstones: manifest(vec![record("undead.txt", "X", "2023-06-01 00:00:00")]),
        ..Default::default()
    };

    let c = classify(&current, &ledger);

    assert_eq!(c.pushes.len(), 1);
    assert!(c.pushes[0].archived_remotely);
    // The same path is also offered for local deletion; phase order
    // lets the user pick either outcome.
    assert_eq!(c.local_deletes.len(), 1);
}

#[test]
fn new_remote_file_is_a_pull_candidate_with_tombstone_warning() {
    let ledger = LedgerState {
        remote_manifest: manifest(vec![record("shared.txt", "Y", "2024-01-03 00:00:00")]),
        local_tombstones: manifest(vec![record("shared.txt", "Y", "2024-01-03 00:00:00")]),
        ..Default::default()
    };

    let c = classify(&Manifest::new(), &ledger);

    assert_eq!(c.pulls.len(), 1);
    assert!(c.pulls[0].deleted_locally);
}

#[test]
fn locally_deleted_file_still_on_remote_becomes_remote_delete() {
    // old.txt existed in the previous snapshot, is gone locally, and
    // the remote still lists it.
    let ledger = LedgerState {
        remote_manifest: manifest(vec![record("old.txt", "Z", "2024-01-01 00:00:00")]),
        local_snapshot: manifest(vec![record("old.txt", "Z", "2024-01-01 00:00:00")]),
        ..Default::default()
    };

    let c = classify(&Manifest::new(), &ledger);

    assert_eq!(c.remote_deletes.len(), 1);
    assert_eq!(c.remote_deletes[0].path, "old.txt");
    // The record carries the remote side's metadata.
    assert_eq!(c.remote_deletes[0].editor, "alice");
}

#[test]
fn tombstone_recomputation_matches_set_formula() {
    // (L0 ∪ T0) − M, intersected with R: "gone-a" qualifies through the
    // snapshot, "gone-b" through the previous tombstones, "kept" is
    // still present locally, and "forgotten" is no longer on the remote.
    let current = manifest(vec![record("kept", "k", "2024-01-01 00:00:00")]);
    let ledger = LedgerState {
        remote_manifest: manifest(vec![
            record("gone-a", "a", "2024-01-01 00:00:00"),
            record("gone-b", "b", "2024-01-01 00:00:00"),
            record("kept", "k", "2024-01-01 00:00:00"),
        ]),
        local_snapshot: manifest(vec![
            record("gone-a", "a", "2024-01-01 00:00:00"),
            record("kept", "k", "2024-01-01 00:00:00"),
            record("forgotten", "f", "2024-01-01 00:00:00"),
        ]),
        local_tombstones: manifest(vec![record("gone-b", "b", "2024-01-01 00:00:00")]),
        ..Default::default()
    };

    let c = classify(&current, &ledger);

    let paths: Vec<_> = c.remote_deletes.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["gone-a", "gone-b"]);
}

#[test]
fn modified_local_newer_classifies_for_push() {
    let current = manifest(vec![record("notes.txt", "AAA", "2024-01-02 00:00:00")]);
    let ledger = LedgerState {
        remote_manifest: manifest(vec![record("notes.txt", "BBB", "2024-01-01 00:00:00")]),
        ..Default::default()
    };

    let c = classify(&current, &ledger);

    assert_eq!(c.local_newer.len(), 1);
    assert!(c.remote_newer.is_empty());
    assert_eq!(c.local_newer[0].remote.checksum, "BBB");
}

#[test]
fn identical_manifests_classify_empty() {
    let shared = vec![
        record("a.txt", "1", "2024-01-01 00:00:00"),
        record("b/c.txt", "2", "2024-01-02 00:00:00"),
    ];
    let current = manifest(shared.clone());
    let ledger = LedgerState {
        remote_manifest: manifest(shared.clone()),
        local_snapshot: manifest(shared),
        ..Default::default()
    };

    assert!(classify(&current, &ledger).is_empty());
}

#[test]
fn archived_remote_file_present_locally_is_a_local_delete() {
    let current = manifest(vec![record("stale.txt", "s", "2024-01-01 00:00:00")]);
    let ledger = LedgerState {
        remote_tombstones: manifest(vec![record("stale.txt", "s", "2024-01-05 00:00:00")]),
        ..Default::default()
    };

    let c = classify(&current, &ledger);

    assert_eq!(c.local_deletes.len(), 1);
    assert_eq!(c.local_deletes[0].path, "stale.txt");
}
