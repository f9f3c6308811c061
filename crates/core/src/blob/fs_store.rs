//! File system blob store implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::config::BlobStoreConfig;

use super::types::{ArtifactCredentials, BlobError, BlobStore};

/// Blob store backed by a local directory.
///
/// Each bucket is a subdirectory of the root and each key a relative path
/// inside it. Writes go to a temporary sibling first and are renamed into
/// place, so readers never observe a partially written object.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at the given directory.
    pub fn new(config: &BlobStoreConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a bucket/key pair to a path under the root.
    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, BlobError> {
        let invalid = |reason: &str| BlobError::InvalidLocation {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let mut bucket_components = Path::new(bucket).components();
        match (bucket_components.next(), bucket_components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(invalid("bucket must be a single path segment")),
        }

        if key.is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if !Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid("key must be a relative path without '..'"));
        }

        Ok(self.root.join(bucket).join(key))
    }

    fn io_error(bucket: &str, key: &str, source: std::io::Error) -> BlobError {
        if source.kind() == std::io::ErrorKind::NotFound {
            BlobError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        } else {
            BlobError::Io {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn get(
        &self,
        bucket: &str,
        key: &str,
        credentials: Option<&ArtifactCredentials>,
    ) -> Result<Vec<u8>, BlobError> {
        if let Some(creds) = credentials {
            let now = Utc::now();
            if creds.is_expired_at(now) {
                return Err(BlobError::CredentialsExpired {
                    expired_at: creds.expires_at().unwrap_or(now),
                });
            }
            debug!(
                access_key_id = %creds.access_key_id,
                "Reading {}/{} with caller credentials", bucket, key
            );
        }

        let path = self.resolve(bucket, key)?;
        fs::read(&path)
            .await
            .map_err(|e| Self::io_error(bucket, key, e))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BlobError> {
        let path = self.resolve(bucket, key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(bucket, key, e))?;
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".tmp-{}", uuid::Uuid::new_v4()));
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, &body)
            .await
            .map_err(|e| Self::io_error(bucket, key, e))?;

        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(Self::io_error(bucket, key, e));
        }

        debug!("Wrote {} bytes to {}/{}", body.len(), bucket, key);
        Ok(())
    }
}
