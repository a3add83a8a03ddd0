pub mod ledger;
pub mod paths;

pub use ledger::{read_table, write_table, VersionLedger};
pub use paths::{remote_keys, MetaPaths};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
