use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use camino::Utf8Path;
use tracing::debug;

use crate::{ObjectStore, StoreError};

/// Explicit static credentials; absent means the default provider
/// chain (environment, shared config, instance metadata) resolves them.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct S3Params {
    pub bucket: String,
    /// Key prefix of the shared location inside the bucket.
    pub prefix: String,
    pub region: Option<String>,
    /// S3-compatible endpoints (MinIO and friends).
    pub endpoint_url: Option<String>,
    pub credentials: Option<StaticCredentials>,
}

/// AWS S3 (or compatible) backend. The SDK's default retry and timeout
/// policy applies to every call.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    pub async fn connect(params: S3Params) -> Result<Self, StoreError> {
        if params.bucket.is_empty() {
            return Err(StoreError::Config("S3 backend requires a bucket".into()));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = params.region {
            loader = loader.region(aws_sdk_s3::config::Region::new(region));
        }
        if let Some(endpoint) = params.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(creds) = params.credentials {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                creds.access_key_id,
                creds.secret_access_key,
                creds.session_token,
                None,
                "convoy-config",
            ));
        }
        let cfg = loader.load().await;

        Ok(Self {
            client: aws_sdk_s3::Client::new(&cfg),
            bucket: params.bucket,
            prefix: params.prefix.trim_matches('/').to_string(),
        })
    }

    fn key_for(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    fn is_not_found(message: &str) -> bool {
        message.contains("NoSuchKey") || message.contains("NotFound") || message.contains("404")
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(&self, local: &Utf8Path, key: &str) -> Result<(), StoreError> {
        let full_key = self.key_for(key);
        debug!("PUT s3://{}/{}", self.bucket, full_key);
        let body = ByteStream::from_path(local.as_std_path())
            .await
            .map_err(|e| StoreError::Remote(format!("reading {local}: {e}")))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("put {full_key}: {e}")))?;
        Ok(())
    }

    async fn download(&self, key: &str, local: &Utf8Path) -> Result<(), StoreError> {
        let full_key = self.key_for(key);
        debug!("GET s3://{}/{}", self.bucket, full_key);
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if Self::is_not_found(&msg) {
                    StoreError::NotFound(key.to_string())
                } else {
                    StoreError::Remote(format!("get {full_key}: {msg}"))
                }
            })?;
        let bytes = out
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Remote(format!("collect {full_key}: {e}")))?;
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent.as_std_path()).await?;
        }
        tokio::fs::write(local.as_std_path(), bytes.into_bytes()).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let full_key = self.key_for(key);
        debug!("DELETE s3://{}/{}", self.bucket, full_key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("delete {full_key}: {e}")))?;
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let full_prefix = self.key_for(prefix);
        let strip = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        };

        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&full_prefix)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StoreError::Remote(format!("list {full_prefix}: {e}")))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    let logical = key.strip_prefix(&strip).unwrap_or(key);
                    keys.push(logical.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
