//! First-contact initialization and reset of a shared remote location.

use convoy_core::{timestamp_now, FileRecord, Manifest};
use convoy_persistence::{remote_keys, VersionLedger};
use convoy_store::ObjectStore;
use tracing::{info, warn};

use crate::SessionError;

/// True if the remote location already carries a manifest.
pub async fn remote_initialized(store: &dyn ObjectStore) -> Result<bool, SessionError> {
    let keys = store.list_prefix(&remote_keys::meta_prefix()).await?;
    Ok(keys.contains(&remote_keys::manifest()))
}

/// Initialize an uninitialized remote location: write an empty
/// tombstone table and a manifest describing whatever non-metadata
/// objects already exist there. Each pre-existing object is downloaded
/// into the staging area to compute its checksum; one that cannot be
/// read is skipped with a warning and left out of the manifest.
///
/// Returns `None` when the location was already initialized, otherwise
/// the number of pre-existing files recorded.
pub async fn ensure_remote_initialized(
    store: &dyn ObjectStore,
    ledger: &VersionLedger,
    editor: &str,
) -> Result<Option<usize>, SessionError> {
    if remote_initialized(store).await? {
        return Ok(None);
    }
    ledger.paths().ensure()?;

    let staging = ledger.paths().tmp_dir();
    let mut manifest = Manifest::new();
    for key in store.list_prefix("").await? {
        if key.starts_with(&remote_keys::meta_prefix()) {
            continue;
        }
        let staged = staging.join(&key);
        if let Err(e) = store.download(&key, &staged).await {
            warn!("Skipping pre-existing object {key}: {e}");
            continue;
        }
        let checksum = match convoy_scanner::file_checksum(&staged) {
            Ok(checksum) => checksum,
            Err(e) => {
                warn!("Skipping pre-existing object {key}: {e}");
                continue;
            }
        };
        let _ = std::fs::remove_file(&staged);
        manifest.insert(FileRecord {
            path: key,
            editor: editor.to_string(),
            modified: timestamp_now(),
            checksum,
        });
    }

    let recorded = manifest.len();
    ledger.save_remote_manifest(&manifest)?;
    ledger.save_remote_tombstones(&Manifest::new())?;
    store
        .upload(&ledger.paths().remote_manifest(), &remote_keys::manifest())
        .await?;
    store
        .upload(
            &ledger.paths().remote_tombstones(),
            &remote_keys::tombstones(),
        )
        .await?;

    info!("Initialized remote location with {recorded} pre-existing files");
    Ok(Some(recorded))
}

/// Delete every metadata object at the remote location, archive copies
/// included. Returns the number of objects removed. Data objects are
/// untouched.
pub async fn reset_remote(store: &dyn ObjectStore) -> Result<usize, SessionError> {
    let keys = store.list_prefix(&remote_keys::meta_prefix()).await?;
    let mut removed = 0;
    for key in &keys {
        store.delete(key).await?;
        removed += 1;
    }
    info!("Removed {removed} remote metadata objects");
    Ok(removed)
}

/// Remove the local metadata subtree so the next session starts from a
/// blank ledger. Missing metadata is not an error.
pub fn reset_local(ledger: &VersionLedger) -> Result<(), SessionError> {
    let meta = ledger.paths().meta_dir();
    match std::fs::remove_dir_all(meta.as_std_path()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
