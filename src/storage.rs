//! Object storage collaborator.
//!
//! Uploaded documents are addressed by a fixed path prefix plus filename.
//! Two backends ship: a local filesystem root and a plain HTTP store
//! (GET/PUT against a base URL) for deployments that front a bucket with
//! pre-authenticated object URLs.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::PipelineError;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn read_object(&self, path: &str) -> Result<Vec<u8>, PipelineError>;
    async fn write_object(&self, path: &str, bytes: &[u8]) -> Result<(), PipelineError>;
}

/// Objects stored as plain files under a root directory.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn read_object(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        let full = self.root.join(path);
        tokio::fs::read(&full)
            .await
            .map_err(|e| PipelineError::upstream("storage", format!("read {}: {}", path, e)))
    }

    async fn write_object(&self, path: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::upstream("storage", e))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| PipelineError::upstream("storage", format!("write {}: {}", path, e)))
    }
}

/// Objects fetched and stored over HTTP at `{base_url}/{path}`.
pub struct HttpStorage {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ObjectStorage for HttpStorage {
    async fn read_object(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        let url = self.url_for(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::upstream("storage", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                "storage",
                format!("GET {} returned {}", url, status),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::upstream("storage", e))?;
        Ok(bytes.to_vec())
    }

    async fn write_object(&self, path: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        let url = self.url_for(path);
        let response = self
            .client
            .put(&url)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| PipelineError::upstream("storage", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                "storage",
                format!("PUT {} returned {}", url, status),
            ));
        }
        Ok(())
    }
}

/// Instantiate the storage backend named in the configuration.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>> {
    match config.backend.as_str() {
        "filesystem" => Ok(Arc::new(FsStorage::new(config.root.clone()))),
        "http" => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("storage.base_url required for http backend"))?;
            Ok(Arc::new(HttpStorage::new(base_url)))
        }
        other => anyhow::bail!("Unknown storage backend: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_storage_roundtrip() {
        let tmp = std::env::temp_dir().join(format!("chatdocs-store-{}", uuid::Uuid::new_v4()));
        let storage = FsStorage::new(&tmp);
        storage
            .write_object("documents/a.txt", b"hello")
            .await
            .unwrap();
        let bytes = storage.read_object("documents/a.txt").await.unwrap();
        assert_eq!(bytes, b"hello");
        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[tokio::test]
    async fn fs_storage_missing_object_is_upstream_error() {
        let storage = FsStorage::new("/nonexistent-root");
        let err = storage.read_object("documents/a.txt").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Upstream {
                service: "storage",
                ..
            }
        ));
    }
}
