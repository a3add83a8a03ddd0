use camino::{Utf8Path, Utf8PathBuf};
use convoy_config::META_DIR;

/// Layout of the metadata subtree inside the local data folder.
#[derive(Debug, Clone)]
pub struct MetaPaths {
    data_root: Utf8PathBuf,
    meta: Utf8PathBuf,
}

impl MetaPaths {
    pub fn new(data_root: impl Into<Utf8PathBuf>) -> Self {
        let data_root = data_root.into();
        let meta = data_root.join(META_DIR);
        Self { data_root, meta }
    }

    /// Create the metadata directories if missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.meta)?;
        std::fs::create_dir_all(self.tmp_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    pub fn data_root(&self) -> &Utf8Path {
        &self.data_root
    }

    pub fn meta_dir(&self) -> &Utf8Path {
        &self.meta
    }

    /// RemoteManifest: last-known remote state.
    pub fn remote_manifest(&self) -> Utf8PathBuf {
        self.meta.join("versions.csv")
    }

    /// LocalSnapshot: this client's manifest from the previous session.
    pub fn local_snapshot(&self) -> Utf8PathBuf {
        self.meta.join("snapshot.csv")
    }

    pub fn remote_tombstones(&self) -> Utf8PathBuf {
        self.meta.join("deleted-remote.csv")
    }

    pub fn local_tombstones(&self) -> Utf8PathBuf {
        self.meta.join("deleted-local.csv")
    }

    pub fn ignore_file(&self) -> Utf8PathBuf {
        self.meta.join("ignore.txt")
    }

    pub fn editor_file(&self) -> Utf8PathBuf {
        self.meta.join("editor.txt")
    }

    /// Staging area for soft-delete copies.
    pub fn tmp_dir(&self) -> Utf8PathBuf {
        self.meta.join("tmp")
    }

    pub fn logs_dir(&self) -> Utf8PathBuf {
        self.meta.join("logs")
    }
}

/// Keys of the shared ledger objects under the remote prefix.
pub mod remote_keys {
    use convoy_config::META_DIR;

    /// Canonical remote manifest table.
    pub fn manifest() -> String {
        format!("{META_DIR}/versions.csv")
    }

    /// Remote-side tombstone table.
    pub fn tombstones() -> String {
        format!("{META_DIR}/deleted-remote.csv")
    }

    /// Soft-delete destination for an archived file, keyed by its full
    /// relative path so same-named files cannot collide.
    pub fn archive(rel_path: &str) -> String {
        format!("{META_DIR}/archive/{rel_path}")
    }

    /// Prefix holding every metadata object, used by reset.
    pub fn meta_prefix() -> String {
        format!("{META_DIR}/")
    }
}
