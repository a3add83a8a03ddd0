use camino::Utf8Path;
use convoy_core::{FileRecord, IgnoreFilter, LedgerState, Manifest, Tombstones};
use rand::Rng;
use tracing::warn;

use crate::{LedgerError, MetaPaths};

/// Persisted tabular state: the four CSV ledger tables plus the small
/// side files (ignore list, editor name, session logs).
///
/// Loading is lenient: a missing or malformed table is an empty table,
/// never a failed session. Saving is atomic per table (write to a
/// temp file, then rename) so a crash mid-write cannot truncate a
/// ledger.
pub struct VersionLedger {
    paths: MetaPaths,
}

impl VersionLedger {
    pub fn new(paths: MetaPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &MetaPaths {
        &self.paths
    }

    /// Load all four tables, substituting empty tables for anything
    /// missing or corrupt (first run, or a half-initialized folder).
    pub fn load(&self) -> LedgerState {
        LedgerState {
            remote_manifest: read_table(&self.paths.remote_manifest()),
            local_snapshot: read_table(&self.paths.local_snapshot()),
            remote_tombstones: read_table(&self.paths.remote_tombstones()),
            local_tombstones: read_table(&self.paths.local_tombstones()),
        }
    }

    /// Overwrite every table with the post-session truth.
    pub fn save(&self, state: &LedgerState) -> Result<(), LedgerError> {
        write_table(&self.paths.remote_manifest(), &state.remote_manifest)?;
        write_table(&self.paths.local_snapshot(), &state.local_snapshot)?;
        write_table(&self.paths.remote_tombstones(), &state.remote_tombstones)?;
        write_table(&self.paths.local_tombstones(), &state.local_tombstones)?;
        Ok(())
    }

    /// Phase 2 persists its recomputed tombstone set no matter what the
    /// user selected.
    pub fn save_local_tombstones(&self, tombstones: &Tombstones) -> Result<(), LedgerError> {
        write_table(&self.paths.local_tombstones(), tombstones)
    }

    pub fn save_remote_manifest(&self, manifest: &Manifest) -> Result<(), LedgerError> {
        write_table(&self.paths.remote_manifest(), manifest)
    }

    pub fn save_remote_tombstones(&self, tombstones: &Tombstones) -> Result<(), LedgerError> {
        write_table(&self.paths.remote_tombstones(), tombstones)
    }

    /// Missing ignore file means nothing is ignored.
    pub fn load_ignore(&self) -> IgnoreFilter {
        match std::fs::read_to_string(self.paths.ignore_file()) {
            Ok(text) => IgnoreFilter::parse(&text),
            Err(_) => IgnoreFilter::default(),
        }
    }

    pub fn load_editor(&self) -> Option<String> {
        let name = std::fs::read_to_string(self.paths.editor_file()).ok()?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    pub fn save_editor(&self, name: &str) -> Result<(), LedgerError> {
        std::fs::write(self.paths.editor_file(), name)?;
        Ok(())
    }

    /// Write the session's error log under `logs/`, named by the session
    /// start time plus a random suffix. Callers only invoke this when
    /// the log is non-empty.
    pub fn write_session_log(&self, text: &str) -> Result<camino::Utf8PathBuf, LedgerError> {
        let suffix: u32 = rand::thread_rng().gen();
        let stamp = chrono::Local::now().format("%Y_%m_%d_%H_%M_%S");
        let path = self.paths.logs_dir().join(format!("{stamp}_{suffix:08x}.txt"));
        std::fs::create_dir_all(self.paths.logs_dir())?;
        std::fs::write(&path, text)?;
        Ok(path)
    }
}

/// Read one CSV table. Missing file or malformed contents yield an
/// empty manifest; corruption is logged, never fatal.
pub fn read_table(path: &Utf8Path) -> Manifest {
    if !path.exists() {
        return Manifest::new();
    }
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Ledger table {} unreadable, treating as empty: {}", path, e);
            return Manifest::new();
        }
    };

    let mut manifest = Manifest::new();
    for row in reader.deserialize::<FileRecord>() {
        match row {
            Ok(record) => manifest.insert(record),
            Err(e) => {
                warn!("Ledger table {} corrupt, treating as empty: {}", path, e);
                return Manifest::new();
            }
        }
    }
    manifest
}

/// Write one CSV table atomically: temp file in the same directory,
/// then rename over the destination.
pub fn write_table(path: &Utf8Path, manifest: &Manifest) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for record in manifest.iter() {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}
