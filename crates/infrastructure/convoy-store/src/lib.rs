use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};

mod local_dir;
mod s3;

pub use local_dir::LocalDirStore;
pub use s3::{S3Params, S3Store, StaticCredentials};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote store error: {0}")]
    Remote(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// The only seam touching remote-store transport. Keys are relative to
/// the configured remote location. Retries and timeouts live behind
/// this trait; callers treat each call as one attempt.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, local: &Utf8Path, key: &str) -> Result<(), StoreError>;
    /// Creates missing parent directories of `local`.
    async fn download(&self, key: &str, local: &Utf8Path) -> Result<(), StoreError>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// Keys under `prefix`, relative to the remote location.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Closed set of supported remote-store backends, selected at
/// configuration time. An unknown backend name is a configuration
/// error, never a silent no-op.
#[derive(Debug, Clone)]
pub enum Backend {
    S3(S3Params),
    LocalDir { root: Utf8PathBuf },
}

/// Construct the store for a configured backend.
pub async fn build_store(backend: Backend) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match backend {
        Backend::S3(params) => Ok(Arc::new(S3Store::connect(params).await?)),
        Backend::LocalDir { root } => Ok(Arc::new(LocalDirStore::new(root))),
    }
}
