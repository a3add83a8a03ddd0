pub mod bootstrap;
pub mod log;
pub mod prompt;
pub mod session;

pub use log::{ErrorLog, LogEntry};
pub use prompt::{AllPrompt, Candidate, Phase, ScriptedPrompt, Selection, SelectionPrompt};
pub use session::{Session, SessionReport};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Concurrent file transfers within one phase. Clamped into the
    /// allowed range when the session is built.
    pub max_transfers: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_transfers: convoy_config::DEFAULT_TRANSFERS,
        }
    }
}

/// Session-level failures. Per-file transfer problems never surface
/// here; they land in the error log and the session continues.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("ledger error: {0}")]
    Ledger(#[from] convoy_persistence::LedgerError),
    #[error("scan error: {0}")]
    Scan(#[from] convoy_scanner::ScanError),
    #[error("store error: {0}")]
    Store(#[from] convoy_store::StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("background task failed: {0}")]
    Join(String),
}
