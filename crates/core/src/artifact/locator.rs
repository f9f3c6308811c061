//! Artifact locator.
//!
//! Reads the pointer object a pipeline job names as its input artifact,
//! using the job's temporary credentials, and yields the model reference
//! it carries.

use std::sync::Arc;

use tracing::{debug, info};

use crate::blob::{ArtifactCredentials, BlobError, BlobStore, ObjectLocation};

use super::types::{ArtifactError, ArtifactPointer};

/// Resolves the approved model reference from the pipeline's input artifact.
pub struct ArtifactLocator {
    store: Arc<dyn BlobStore>,
}

impl ArtifactLocator {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Reads and parses the pointer object at `location`.
    ///
    /// The object lives in a pipeline-managed location, so it is read with
    /// the job's own temporary credentials rather than the store's identity.
    pub async fn locate(
        &self,
        location: &ObjectLocation,
        credentials: &ArtifactCredentials,
    ) -> Result<ArtifactPointer, ArtifactError> {
        info!("Loading input from {} with artifact credentials", location);

        let body = self
            .store
            .get(&location.bucket, &location.key, Some(credentials))
            .await
            .map_err(|e| match e {
                BlobError::NotFound { .. } => ArtifactError::NotFound(location.clone()),
                other => ArtifactError::Storage(other),
            })?;
        debug!("Read {} bytes from {}", body.len(), location);

        let pointer =
            ArtifactPointer::parse(&body).map_err(|reason| ArtifactError::Malformed {
                location: location.clone(),
                reason,
            })?;

        info!(model_reference = %pointer.model_reference, "Loaded approved artifact pointer");
        Ok(pointer)
    }
}
