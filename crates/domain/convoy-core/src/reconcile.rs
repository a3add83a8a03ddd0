use chrono::NaiveDateTime;

use crate::{FileRecord, LedgerState, Manifest, TIMESTAMP_FORMAT};

/// A local file absent from the remote manifest.
#[derive(Debug, Clone)]
pub struct PushCandidate {
    pub record: FileRecord,
    /// The remote side archived this path at some point; uploading
    /// would resurrect it. Informational only.
    pub archived_remotely: bool,
}

/// A remote file absent from the local tree.
#[derive(Debug, Clone)]
pub struct PullCandidate {
    pub record: FileRecord,
    /// This client deleted the path locally; downloading would bring
    /// it back. Informational only.
    pub deleted_locally: bool,
}

/// A path present on both sides with differing content.
#[derive(Debug, Clone)]
pub struct ModifiedCandidate {
    pub local: FileRecord,
    pub remote: FileRecord,
}

/// The candidate sets of one classification pass, each in path order
/// so prompt indices are stable.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Present locally, archived remotely: delete the local file.
    pub local_deletes: Vec<FileRecord>,
    /// Gone locally, still listed remotely: archive the remote file.
    /// Records carry the remote side's metadata.
    pub remote_deletes: Vec<FileRecord>,
    /// New local files to upload.
    pub pushes: Vec<PushCandidate>,
    /// New remote files to download.
    pub pulls: Vec<PullCandidate>,
    /// Modified, local timestamp strictly newer.
    pub local_newer: Vec<ModifiedCandidate>,
    /// Modified, remote timestamp newer or equal.
    pub remote_newer: Vec<ModifiedCandidate>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.local_deletes.is_empty()
            && self.remote_deletes.is_empty()
            && self.pushes.is_empty()
            && self.pulls.is_empty()
            && self.local_newer.is_empty()
            && self.remote_newer.is_empty()
    }
}

/// Three-way classification of the current local manifest against the
/// ledger. Pure and total: empty inputs yield empty sets.
pub fn classify(current: &Manifest, ledger: &LedgerState) -> Classification {
    let remote = &ledger.remote_manifest;
    let mut out = Classification::default();

    for record in current.iter() {
        match remote.get(&record.path) {
            Some(remote_record) => {
                if remote_record.checksum != record.checksum {
                    let candidate = ModifiedCandidate {
                        local: record.clone(),
                        remote: remote_record.clone(),
                    };
                    // Strictly-greater test on the local side only:
                    // a timestamp tie counts as remote-newer.
                    if newer_than(&record.modified, &remote_record.modified) {
                        out.local_newer.push(candidate);
                    } else {
                        out.remote_newer.push(candidate);
                    }
                }
            }
            None => out.pushes.push(PushCandidate {
                archived_remotely: ledger.remote_tombstones.contains(&record.path),
                record: record.clone(),
            }),
        }

        // A path both tombstoned and still listed remotely was restored
        // after archiving; deleting it locally would be wrong.
        if ledger.remote_tombstones.contains(&record.path) && !remote.contains(&record.path) {
            out.local_deletes.push(record.clone());
        }
    }

    for record in remote.iter() {
        if !current.contains(&record.path) {
            out.pulls.push(PullCandidate {
                deleted_locally: ledger.local_tombstones.contains(&record.path),
                record: record.clone(),
            });
        }
    }

    // ((L0 ∪ T0) − M) ∩ R, with records taken from the remote manifest.
    let previously_known: Manifest = ledger
        .local_snapshot
        .iter()
        .chain(ledger.local_tombstones.iter())
        .cloned()
        .collect();
    for record in previously_known.iter() {
        if !current.contains(&record.path) {
            if let Some(remote_record) = remote.get(&record.path) {
                out.remote_deletes.push(remote_record.clone());
            }
        }
    }

    out
}

/// Compare two ledger timestamps, preferring parsed order and falling
/// back to the string order the format guarantees.
fn newer_than(left: &str, right: &str) -> bool {
    let parse = |s: &str| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok();
    match (parse(left), parse(right)) {
        (Some(l), Some(r)) => l > r,
        _ => left > right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, checksum: &str, modified: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            editor: "tester".to_string(),
            modified: modified.to_string(),
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn empty_inputs_classify_empty() {
        let classification = classify(&Manifest::new(), &LedgerState::default());
        assert!(classification.is_empty());
    }

    #[test]
    fn tie_on_timestamp_counts_as_remote_newer() {
        let current = Manifest::from_records([record("n.txt", "aaa", "2024-01-01 12:00:00")]);
        let ledger = LedgerState {
            remote_manifest: Manifest::from_records([record("n.txt", "bbb", "2024-01-01 12:00:00")]),
            ..Default::default()
        };

        let classification = classify(&current, &ledger);
        assert!(classification.local_newer.is_empty());
        assert_eq!(classification.remote_newer.len(), 1);
    }

    #[test]
    fn modified_partition_is_disjoint_and_complete() {
        let current = Manifest::from_records([
            record("a.txt", "a1", "2024-01-02 00:00:00"),
            record("b.txt", "b1", "2024-01-01 00:00:00"),
            record("same.txt", "s", "2024-01-05 00:00:00"),
        ]);
        let ledger = LedgerState {
            remote_manifest: Manifest::from_records([
                record("a.txt", "a2", "2024-01-01 00:00:00"),
                record("b.txt", "b2", "2024-01-02 00:00:00"),
                record("same.txt", "s", "2024-01-01 00:00:00"),
            ]),
            ..Default::default()
        };

        let classification = classify(&current, &ledger);
        let local: Vec<_> = classification
            .local_newer
            .iter()
            .map(|c| c.local.path.as_str())
            .collect();
        let remote: Vec<_> = classification
            .remote_newer
            .iter()
            .map(|c| c.local.path.as_str())
            .collect();

        assert_eq!(local, vec!["a.txt"]);
        assert_eq!(remote, vec!["b.txt"]);
        // Matching checksums never classify as modified.
        assert_eq!(classification.local_newer.len() + classification.remote_newer.len(), 2);
    }

    #[test]
    fn restored_remote_file_is_not_a_local_delete() {
        let current = Manifest::from_records([record("back.txt", "x", "2024-01-01 00:00:00")]);
        let ledger = LedgerState {
            remote_manifest: Manifest::from_records([record("back.txt", "x", "2024-01-01 00:00:00")]),
            remote_tombstones: Manifest::from_records([record(
                "back.txt",
                "x",
                "2023-12-01 00:00:00",
            )]),
            ..Default::default()
        };

        let classification = classify(&current, &ledger);
        assert!(classification.local_deletes.is_empty());
    }
}
