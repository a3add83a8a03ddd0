use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::{ObjectStore, StoreError};

/// A plain directory standing in for the remote store. Exercises the
/// same contract as the S3 backend; used by tests and offline mirrors.
pub struct LocalDirStore {
    root: Utf8PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn upload(&self, local: &Utf8Path, key: &str) -> Result<(), StoreError> {
        let target = self.object_path(key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent.as_std_path()).await?;
        }
        tokio::fs::copy(local.as_std_path(), target.as_std_path()).await?;
        Ok(())
    }

    async fn download(&self, key: &str, local: &Utf8Path) -> Result<(), StoreError> {
        let source = self.object_path(key);
        if !source.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent.as_std_path()).await?;
        }
        tokio::fs::copy(source.as_std_path(), local.as_std_path()).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let target = self.object_path(key);
        match tokio::fs::remove_file(target.as_std_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(abs) = Utf8Path::from_path(entry.path()) else {
                continue;
            };
            let Ok(rel) = abs.strip_prefix(&self.root) else {
                continue;
            };
            let key = rel.as_str().replace('\\', "/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, LocalDirStore, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store = LocalDirStore::new(root.join("remote"));
        (dir, store, root)
    }

    #[tokio::test]
    async fn upload_download_round_trip() {
        let (_guard, store, root) = temp_store();
        let src = root.join("src.txt");
        std::fs::write(&src, "payload").unwrap();

        store.upload(&src, "docs/src.txt").await.unwrap();

        let dst = root.join("nested/dst.txt");
        store.download("docs/src.txt", &dst).await.unwrap();
        assert_eq!(std::fs::read_to_string(dst).unwrap(), "payload");
    }

    #[tokio::test]
    async fn download_missing_key_is_not_found() {
        let (_guard, store, root) = temp_store();
        let err = store
            .download("absent.txt", &root.join("out.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_guard, store, root) = temp_store();
        let src = root.join("f.txt");
        std::fs::write(&src, "x").unwrap();
        store.upload(&src, "f.txt").await.unwrap();

        store.delete("f.txt").await.unwrap();
        store.delete("f.txt").await.unwrap();
        assert!(store.list_prefix("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_prefix_filters_and_sorts() {
        let (_guard, store, root) = temp_store();
        let src = root.join("f.txt");
        std::fs::write(&src, "x").unwrap();
        store.upload(&src, "b/two.txt").await.unwrap();
        store.upload(&src, "a/one.txt").await.unwrap();
        store.upload(&src, "other.txt").await.unwrap();

        let all = store.list_prefix("").await.unwrap();
        assert_eq!(all, vec!["a/one.txt", "b/two.txt", "other.txt"]);

        let scoped = store.list_prefix("a/").await.unwrap();
        assert_eq!(scoped, vec!["a/one.txt"]);
    }
}
