use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use convoy_core::reconcile::{classify, Classification, ModifiedCandidate};
use convoy_core::{FileRecord, IgnoreFilter, LedgerState, Manifest};
use convoy_persistence::{remote_keys, VersionLedger};
use convoy_store::{ObjectStore, StoreError};
use futures::StreamExt;
use tracing::{debug, info};

use crate::log::{ErrorLog, LogEntry};
use crate::prompt::{Candidate, Phase, SelectionPrompt};
use crate::{SessionError, SessionOptions};

/// What one session did, for the caller's closing summary.
#[derive(Debug, Default)]
pub struct SessionReport {
    pub local_deleted: usize,
    pub remote_archived: usize,
    pub pushed: usize,
    pub pulled: usize,
    pub reverted_remote: usize,
    pub reverted_local: usize,
    pub failures: usize,
    /// Written only when at least one file operation failed.
    pub log_path: Option<Utf8PathBuf>,
}

impl SessionReport {
    pub fn transferred(&self) -> usize {
        self.local_deleted
            + self.remote_archived
            + self.pushed
            + self.pulled
            + self.reverted_remote
            + self.reverted_local
    }
}

/// One interactive reconciliation session against a shared remote
/// location.
///
/// The six phases run in a fixed order, each preceded by a fresh scan
/// of the data folder so that edits made while a prompt was open are
/// seen by the next phase. Per-file failures are logged and skipped;
/// only ledger exchange at the session boundaries can fail the session.
pub struct Session {
    store: Arc<dyn ObjectStore>,
    prompt: Arc<dyn SelectionPrompt>,
    ledger: VersionLedger,
    editor: String,
    options: SessionOptions,
}

impl Session {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        prompt: Arc<dyn SelectionPrompt>,
        ledger: VersionLedger,
        editor: String,
        options: SessionOptions,
    ) -> Self {
        Self {
            store,
            prompt,
            ledger,
            editor,
            // `buffer_unordered(0)` would never yield an item.
            options: SessionOptions {
                max_transfers: convoy_config::clamp_transfers(options.max_transfers),
            },
        }
    }

    fn root(&self) -> &Utf8Path {
        self.ledger.paths().data_root()
    }

    pub async fn run(&self) -> Result<SessionReport, SessionError> {
        self.ledger.paths().ensure()?;
        self.fetch_remote_tables().await?;

        let ignore = self.ledger.load_ignore();
        let mut state = self.ledger.load();
        let mut log = ErrorLog::new();
        let mut report = SessionReport::default();

        self.phase_pull_deleted_local(&ignore, &mut state, &mut log, &mut report)
            .await?;
        self.phase_push_deleted_remote(&ignore, &mut state, &mut log, &mut report)
            .await?;
        self.phase_push_new_remote(&ignore, &mut state, &mut log, &mut report)
            .await?;
        self.phase_pull_new_local(&ignore, &state, &mut log, &mut report)
            .await?;
        self.phase_push_modified_remote(&ignore, &mut state, &mut log, &mut report)
            .await?;
        self.phase_pull_modified_local(&ignore, &state, &mut log, &mut report)
            .await?;

        self.finish(state, &log, &mut report).await?;
        Ok(report)
    }

    /// Pull the shared ledger tables down before anything else. A
    /// missing table means an uninitialized remote location and loads
    /// as empty; any other store failure aborts the session.
    async fn fetch_remote_tables(&self) -> Result<(), SessionError> {
        let tables = [
            (remote_keys::manifest(), self.ledger.paths().remote_manifest()),
            (
                remote_keys::tombstones(),
                self.ledger.paths().remote_tombstones(),
            ),
        ];
        for (key, local) in tables {
            match self.store.download(&key, &local).await {
                Ok(()) => debug!("Fetched {key}"),
                Err(StoreError::NotFound(_)) => {
                    // Drop any stale copy from a previous remote.
                    if local.exists() {
                        std::fs::remove_file(&local)?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Push the updated ledger tables, snapshot the final local state,
    /// and persist everything. The remote manifest upload is the commit
    /// point other clients observe.
    async fn finish(
        &self,
        mut state: LedgerState,
        log: &ErrorLog,
        report: &mut SessionReport,
    ) -> Result<(), SessionError> {
        self.ledger.save_remote_manifest(&state.remote_manifest)?;
        self.ledger.save_remote_tombstones(&state.remote_tombstones)?;
        self.store
            .upload(&self.ledger.paths().remote_manifest(), &remote_keys::manifest())
            .await?;
        self.store
            .upload(
                &self.ledger.paths().remote_tombstones(),
                &remote_keys::tombstones(),
            )
            .await?;

        state.local_snapshot = self.scan_current().await?;
        self.ledger.save(&state)?;

        report.failures = log.len();
        if !log.is_empty() {
            report.log_path = Some(self.ledger.write_session_log(&log.render())?);
        }
        Ok(())
    }

    /// Scan the data folder on a blocking thread. Metadata lives inside
    /// the folder and is always excluded.
    async fn scan_current(&self) -> Result<Manifest, SessionError> {
        let root = self.root().to_owned();
        let editor = self.editor.clone();
        let manifest = tokio::task::spawn_blocking(move || {
            convoy_scanner::scan(&root, convoy_config::META_DIR, &editor)
        })
        .await
        .map_err(|e| SessionError::Join(e.to_string()))??;
        Ok(manifest)
    }

    /// Rescan and classify against the ledger, with ignored paths
    /// removed from both the scan and the ledger view. The persisted
    /// tables keep their ignored rows; only classification is filtered.
    async fn classify_now(
        &self,
        ignore: &IgnoreFilter,
        state: &LedgerState,
    ) -> Result<Classification, SessionError> {
        let mut current = self.scan_current().await?;
        if ignore.is_empty() {
            return Ok(classify(&current, state));
        }
        ignore.apply(&mut current);
        let mut view = state.clone();
        ignore.apply(&mut view.remote_manifest);
        ignore.apply(&mut view.local_snapshot);
        ignore.apply(&mut view.remote_tombstones);
        ignore.apply(&mut view.local_tombstones);
        Ok(classify(&current, &view))
    }

    /// Prompt over one candidate set. An empty set asks nothing, and a
    /// cancelled prompt selects nothing; neither is an error.
    fn pick<T: Clone>(
        &self,
        phase: Phase,
        items: &[T],
        describe: impl Fn(&T) -> Candidate,
    ) -> Vec<T> {
        if items.is_empty() {
            return Vec::new();
        }
        let candidates: Vec<Candidate> = items.iter().map(describe).collect();
        let selection = self.prompt.select(phase, &candidates);
        selection
            .resolve(items.len())
            .into_iter()
            .map(|i| items[i].clone())
            .collect()
    }

    /// Phase 1: delete local files the remote side archived.
    async fn phase_pull_deleted_local(
        &self,
        ignore: &IgnoreFilter,
        state: &LedgerState,
        log: &mut ErrorLog,
        report: &mut SessionReport,
    ) -> Result<(), SessionError> {
        let classification = self.classify_now(ignore, state).await?;
        let picked = self.pick(Phase::PullDeletedLocal, &classification.local_deletes, |r| {
            Candidate {
                path: r.path.clone(),
                detail: format!("deleted {} by {}", r.modified, r.editor),
            }
        });

        for record in picked {
            let local = self.root().join(&record.path);
            match std::fs::remove_file(local.as_std_path()) {
                Ok(()) => {
                    info!("Deleted local file {}", record.path);
                    report.local_deleted += 1;
                }
                Err(e) => log.record(LogEntry {
                    operation: "delete_local",
                    source: local.to_string(),
                    destination: "-".to_string(),
                    completed_steps: Vec::new(),
                    message: e.to_string(),
                }),
            }
        }
        Ok(())
    }

    /// Phase 2: archive remote files this client deleted. The
    /// recomputed tombstone set is persisted before prompting, so a
    /// declined prompt still updates this client's deletion memory.
    async fn phase_push_deleted_remote(
        &self,
        ignore: &IgnoreFilter,
        state: &mut LedgerState,
        log: &mut ErrorLog,
        report: &mut SessionReport,
    ) -> Result<(), SessionError> {
        let classification = self.classify_now(ignore, state).await?;

        state.local_tombstones = Manifest::from_records(classification.remote_deletes.iter().cloned());
        self.ledger.save_local_tombstones(&state.local_tombstones)?;

        let picked = self.pick(
            Phase::PushDeletedRemote,
            &classification.remote_deletes,
            |r| Candidate {
                path: r.path.clone(),
                detail: format!("last modified {} by {}", r.modified, r.editor),
            },
        );

        let staging = self.ledger.paths().tmp_dir();
        let results = futures::stream::iter(picked)
            .map(|record| {
                let store = Arc::clone(&self.store);
                let staged = staging.join(&record.path);
                async move {
                    let outcome = soft_delete(store.as_ref(), &staged, &record.path).await;
                    (record, outcome)
                }
            })
            .buffer_unordered(self.options.max_transfers)
            .collect::<Vec<_>>()
            .await;

        for (record, outcome) in results {
            match outcome {
                Ok(()) => {
                    info!("Archived remote file {}", record.path);
                    state.remote_manifest.remove(&record.path);
                    state.remote_tombstones.insert(record);
                    report.remote_archived += 1;
                }
                Err((completed_steps, message)) => log.record(LogEntry {
                    operation: "soft_delete",
                    source: record.path.clone(),
                    destination: remote_keys::archive(&record.path),
                    completed_steps,
                    message,
                }),
            }
        }
        Ok(())
    }

    /// Phase 3: upload local files the remote manifest does not list.
    async fn phase_push_new_remote(
        &self,
        ignore: &IgnoreFilter,
        state: &mut LedgerState,
        log: &mut ErrorLog,
        report: &mut SessionReport,
    ) -> Result<(), SessionError> {
        let classification = self.classify_now(ignore, state).await?;
        let picked = self.pick(Phase::PushNewRemote, &classification.pushes, |c| {
            let mut detail = format!("modified {}", c.record.modified);
            if c.archived_remotely {
                detail.push_str("  *PREVIOUSLY DELETED ON REMOTE");
            }
            Candidate {
                path: c.record.path.clone(),
                detail,
            }
        });

        let records: Vec<FileRecord> = picked.into_iter().map(|c| c.record).collect();
        for record in self.upload_batch(records, log).await {
            state.remote_manifest.insert(record);
            report.pushed += 1;
        }
        Ok(())
    }

    /// Phase 4: download remote files missing from the local tree.
    async fn phase_pull_new_local(
        &self,
        ignore: &IgnoreFilter,
        state: &LedgerState,
        log: &mut ErrorLog,
        report: &mut SessionReport,
    ) -> Result<(), SessionError> {
        let classification = self.classify_now(ignore, state).await?;
        let picked = self.pick(Phase::PullNewLocal, &classification.pulls, |c| {
            let mut detail = format!("modified {} by {}", c.record.modified, c.record.editor);
            if c.deleted_locally {
                detail.push_str("  *PREVIOUSLY DELETED LOCALLY");
            }
            Candidate {
                path: c.record.path.clone(),
                detail,
            }
        });

        let records: Vec<FileRecord> = picked.into_iter().map(|c| c.record).collect();
        report.pulled += self.download_batch(records, log).await.len();
        Ok(())
    }

    /// Phase 5: two prompts over one classification. First propagate
    /// strictly-newer local edits, then offer to overwrite newer remote
    /// versions with the older local ones.
    async fn phase_push_modified_remote(
        &self,
        ignore: &IgnoreFilter,
        state: &mut LedgerState,
        log: &mut ErrorLog,
        report: &mut SessionReport,
    ) -> Result<(), SessionError> {
        let classification = self.classify_now(ignore, state).await?;

        let picked = self.pick(
            Phase::PushModifiedRemote,
            &classification.local_newer,
            modified_candidate_line,
        );
        let records: Vec<FileRecord> = picked.into_iter().map(|c| c.local).collect();
        for record in self.upload_batch(records, log).await {
            state.remote_manifest.insert(record);
            report.pushed += 1;
        }

        let picked = self.pick(
            Phase::RevertModifiedRemote,
            &classification.remote_newer,
            modified_candidate_line,
        );
        let records: Vec<FileRecord> = picked.into_iter().map(|c| c.local).collect();
        for record in self.upload_batch(records, log).await {
            state.remote_manifest.insert(record);
            report.reverted_remote += 1;
        }
        Ok(())
    }

    /// Phase 6: the mirror of phase 5, downloading instead. Remote
    /// records are written over the local files; the closing snapshot
    /// re-reads their actual state.
    async fn phase_pull_modified_local(
        &self,
        ignore: &IgnoreFilter,
        state: &LedgerState,
        log: &mut ErrorLog,
        report: &mut SessionReport,
    ) -> Result<(), SessionError> {
        let classification = self.classify_now(ignore, state).await?;

        let picked = self.pick(
            Phase::PullModifiedLocal,
            &classification.remote_newer,
            modified_candidate_line,
        );
        let records: Vec<FileRecord> = picked.into_iter().map(|c| c.remote).collect();
        report.pulled += self.download_batch(records, log).await.len();

        let picked = self.pick(
            Phase::RevertModifiedLocal,
            &classification.local_newer,
            modified_candidate_line,
        );
        let records: Vec<FileRecord> = picked.into_iter().map(|c| c.remote).collect();
        report.reverted_local += self.download_batch(records, log).await.len();
        Ok(())
    }

    /// Upload a batch concurrently; returns the records that made it,
    /// in path order. Failures go to the log.
    async fn upload_batch(&self, records: Vec<FileRecord>, log: &mut ErrorLog) -> Vec<FileRecord> {
        let results = futures::stream::iter(records)
            .map(|record| {
                let store = Arc::clone(&self.store);
                let local = self.root().join(&record.path);
                async move {
                    let outcome = store.upload(&local, &record.path).await;
                    (record, local, outcome)
                }
            })
            .buffer_unordered(self.options.max_transfers)
            .collect::<Vec<_>>()
            .await;

        let mut done = Vec::new();
        for (record, local, outcome) in results {
            match outcome {
                Ok(()) => {
                    info!("Uploaded {}", record.path);
                    done.push(record);
                }
                Err(e) => log.record(LogEntry {
                    operation: "upload",
                    source: local.to_string(),
                    destination: record.path.clone(),
                    completed_steps: Vec::new(),
                    message: e.to_string(),
                }),
            }
        }
        done.sort_by(|a, b| a.path.cmp(&b.path));
        done
    }

    /// Download a batch concurrently; returns the records that made it,
    /// in path order. Failures go to the log.
    async fn download_batch(&self, records: Vec<FileRecord>, log: &mut ErrorLog) -> Vec<FileRecord> {
        let results = futures::stream::iter(records)
            .map(|record| {
                let store = Arc::clone(&self.store);
                let local = self.root().join(&record.path);
                async move {
                    let outcome = store.download(&record.path, &local).await;
                    (record, local, outcome)
                }
            })
            .buffer_unordered(self.options.max_transfers)
            .collect::<Vec<_>>()
            .await;

        let mut done = Vec::new();
        for (record, local, outcome) in results {
            match outcome {
                Ok(()) => {
                    info!("Downloaded {}", record.path);
                    done.push(record);
                }
                Err(e) => log.record(LogEntry {
                    operation: "download",
                    source: record.path.clone(),
                    destination: local.to_string(),
                    completed_steps: Vec::new(),
                    message: e.to_string(),
                }),
            }
        }
        done.sort_by(|a, b| a.path.cmp(&b.path));
        done
    }
}

fn modified_candidate_line(c: &ModifiedCandidate) -> Candidate {
    Candidate {
        path: c.local.path.clone(),
        detail: format!(
            "local {} / remote {} by {}",
            c.local.modified, c.remote.modified, c.remote.editor
        ),
    }
}

/// Archive one remote file: download a copy into the staging area,
/// delete the original, re-upload the copy under the archive prefix.
/// On failure the completed sub-steps are reported so the log shows
/// how far the file got.
async fn soft_delete(
    store: &dyn ObjectStore,
    staged: &Utf8Path,
    rel_path: &str,
) -> Result<(), (Vec<&'static str>, String)> {
    let mut completed: Vec<&'static str> = Vec::new();

    if let Err(e) = store.download(rel_path, staged).await {
        return Err((completed, e.to_string()));
    }
    completed.push("download");

    if let Err(e) = store.delete(rel_path).await {
        return Err((completed, e.to_string()));
    }
    completed.push("delete");

    if let Err(e) = store.upload(staged, &remote_keys::archive(rel_path)).await {
        return Err((completed, e.to_string()));
    }

    let _ = tokio::fs::remove_file(staged.as_std_path()).await;
    Ok(())
}
