//! Types for blob storage operations.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during blob store operations.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object location {bucket}/{key}: {reason}")]
    InvalidLocation {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("Artifact credentials expired at {expired_at}")]
    CredentialsExpired { expired_at: DateTime<Utc> },

    #[error("I/O error on {bucket}/{key}")]
    Io {
        bucket: String,
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Temporary credentials scoped to one pipeline job's artifact location.
///
/// The field names match the pipeline job event.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
}

impl ArtifactCredentials {
    /// When these credentials stop being valid, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Whether the credentials have expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

// Secrets never end up in logs.
impl std::fmt::Debug for ArtifactCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

/// Location of one object in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A bucket/key object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Reads an object.
    ///
    /// When `credentials` are given the read is performed on behalf of their
    /// holder instead of with the store's own identity.
    async fn get(
        &self,
        bucket: &str,
        key: &str,
        credentials: Option<&ArtifactCredentials>,
    ) -> Result<Vec<u8>, BlobError>;

    /// Writes an object, replacing any previous content.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BlobError>;
}
