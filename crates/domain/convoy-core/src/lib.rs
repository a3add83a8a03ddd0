use std::collections::{btree_map, BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub mod reconcile;

/// Timestamp format used in every ledger table. Lexicographically
/// sortable, so string comparison agrees with chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of a ledger table: the last-known state of a path on one side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub editor: String,
    pub modified: String,
    pub checksum: String,
}

/// Snapshot of files keyed by relative path. Insertion is an upsert
/// (keep-last), so path uniqueness holds by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    records: BTreeMap<String, FileRecord>,
}

/// A tombstone table is a manifest whose rows mark deleted paths.
pub type Tombstones = Manifest;

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut manifest = Self::new();
        for record in records {
            manifest.insert(record);
        }
        manifest
    }

    /// Upsert: an existing record for the same path is replaced.
    pub fn insert(&mut self, record: FileRecord) {
        self.records.insert(record.path.clone(), record);
    }

    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        self.records.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in path order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records.into_values().collect()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&FileRecord) -> bool) {
        self.records.retain(|_, record| keep(record));
    }
}

impl IntoIterator for Manifest {
    type Item = FileRecord;
    type IntoIter = btree_map::IntoValues<String, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}

impl FromIterator<FileRecord> for Manifest {
    fn from_iter<T: IntoIterator<Item = FileRecord>>(iter: T) -> Self {
        Self::from_records(iter)
    }
}

/// The four ledger tables a session carries in memory. Mutated between
/// phases so each reclassification sees the latest state.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    /// Last manifest this client fetched or wrote for the remote location.
    pub remote_manifest: Manifest,
    /// This client's own manifest as of the end of its previous session.
    pub local_snapshot: Manifest,
    /// Files the remote side has archived (soft-deleted).
    pub remote_tombstones: Tombstones,
    /// Files this client removed that the remote side still lists.
    pub local_tombstones: Tombstones,
}

/// Relative paths excluded from every reconciliation phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IgnoreFilter {
    paths: BTreeSet<String>,
}

impl IgnoreFilter {
    pub fn new(paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// One relative path per line; blank lines and `#` comments skipped.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        )
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Strip ignored paths from a manifest before classification.
    pub fn apply(&self, manifest: &mut Manifest) {
        if !self.paths.is_empty() {
            manifest.retain(|record| !self.paths.contains(&record.path));
        }
    }
}

/// Format a system time with second precision in the ledger format.
pub fn format_timestamp(time: std::time::SystemTime) -> String {
    chrono::DateTime::<chrono::Local>::from(time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Current wall-clock time in the ledger format.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, checksum: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            editor: "tester".to_string(),
            modified: "2024-01-01 00:00:00".to_string(),
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn manifest_insert_is_keep_last_upsert() {
        let mut manifest = Manifest::new();
        manifest.insert(record("a.txt", "old"));
        manifest.insert(record("a.txt", "new"));

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("a.txt").unwrap().checksum, "new");
    }

    #[test]
    fn manifest_iterates_in_path_order() {
        let manifest = Manifest::from_records([
            record("b/two.txt", "2"),
            record("a/one.txt", "1"),
        ]);
        let paths: Vec<_> = manifest.paths().collect();
        assert_eq!(paths, vec!["a/one.txt", "b/two.txt"]);
    }

    #[test]
    fn ignore_filter_skips_comments_and_blanks() {
        let filter = IgnoreFilter::parse("# generated\n\nscratch.txt\n  notes/tmp.md  \n");
        assert!(filter.is_ignored("scratch.txt"));
        assert!(filter.is_ignored("notes/tmp.md"));
        assert!(!filter.is_ignored("# generated"));

        let mut manifest = Manifest::from_records([record("scratch.txt", "x"), record("keep.txt", "y")]);
        filter.apply(&mut manifest);
        assert_eq!(manifest.len(), 1);
        assert!(manifest.contains("keep.txt"));
    }
}
