//! Mock blob store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::blob::{ArtifactCredentials, BlobError, BlobStore};

/// A recorded read for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRead {
    pub bucket: String,
    pub key: String,
    /// Access key of the credentials the read was made with, if any.
    pub access_key_id: Option<String>,
}

/// A recorded write for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

/// In-memory implementation of the BlobStore trait.
///
/// # Example
///
/// ```rust,ignore
/// let store = MockBlobStore::new();
/// store.insert("artifacts", "input.json", br#"{"ModelPackageArn":"pkg"}"#).await;
///
/// let body = store.get("artifacts", "input.json", None).await?;
/// assert_eq!(store.recorded_reads().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockBlobStore {
    objects: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
    reads: Arc<RwLock<Vec<RecordedRead>>>,
    writes: Arc<RwLock<Vec<RecordedWrite>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<BlobError>>>,
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            reads: Arc::new(RwLock::new(Vec::new())),
            writes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Stores an object without recording a write.
    pub async fn insert(&self, bucket: &str, key: &str, body: impl AsRef<[u8]>) {
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            body.as_ref().to_vec(),
        );
    }

    /// Current content of an object.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn recorded_reads(&self) -> Vec<RecordedRead> {
        self.reads.read().await.clone()
    }

    pub async fn recorded_writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().await.clone()
    }

    /// Make the next operation fail with the given error.
    pub async fn set_next_error(&self, error: BlobError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<BlobError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get(
        &self,
        bucket: &str,
        key: &str,
        credentials: Option<&ArtifactCredentials>,
    ) -> Result<Vec<u8>, BlobError> {
        self.reads.write().await.push(RecordedRead {
            bucket: bucket.to_string(),
            key: key.to_string(),
            access_key_id: credentials.map(|c| c.access_key_id.clone()),
        });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.object(bucket, key)
            .await
            .ok_or_else(|| BlobError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BlobError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.writes.write().await.push(RecordedWrite {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body.clone(),
        });
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}
