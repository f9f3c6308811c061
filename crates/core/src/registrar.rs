//! Model registration.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::control_plane::{ControlPlane, ControlPlaneError, ModelHandle, ModelSpec};

/// The control plane refused to register a model.
#[derive(Debug, Error)]
#[error("Failed to register model {name}: {source}")]
pub struct RegistrationError {
    pub name: String,
    #[source]
    pub source: ControlPlaneError,
}

/// Registers approved model packages as deployable models.
pub struct ModelRegistrar {
    control_plane: Arc<dyn ControlPlane>,
}

impl ModelRegistrar {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    /// Registers `artifact_reference` under `name`.
    ///
    /// Names are never reused: a second call with the same name is rejected
    /// by the control plane and surfaces as a `RegistrationError`.
    pub async fn register(
        &self,
        execution_role: &str,
        artifact_reference: &str,
        name: &str,
    ) -> Result<ModelHandle, RegistrationError> {
        info!(model = name, artifact = artifact_reference, "Registering model");

        let spec = ModelSpec {
            name: name.to_string(),
            artifact_reference: artifact_reference.to_string(),
            execution_role: execution_role.to_string(),
        };

        let handle = self
            .control_plane
            .create_model(&spec)
            .await
            .map_err(|source| RegistrationError {
                name: name.to_string(),
                source,
            })?;

        info!(model = %handle.name, id = %handle.id, "Model registered");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ControlPlaneCall, MockControlPlane, MockOperation};

    const PACKAGE: &str = "arn:model-package/news-headlines/7";

    #[tokio::test]
    async fn test_register_sends_spec() {
        let cp = Arc::new(MockControlPlane::new());
        let registrar = ModelRegistrar::new(cp.clone());

        let handle = registrar
            .register("arn:role/exec", PACKAGE, "news-headlines-2024-03-01T12-30-05")
            .await
            .unwrap();

        assert_eq!(handle.name, "news-headlines-2024-03-01T12-30-05");
        assert_eq!(
            cp.calls().await,
            vec![ControlPlaneCall::CreateModel(ModelSpec {
                name: "news-headlines-2024-03-01T12-30-05".to_string(),
                artifact_reference: PACKAGE.to_string(),
                execution_role: "arn:role/exec".to_string(),
            })]
        );
    }

    #[tokio::test]
    async fn test_reused_name_is_rejected() {
        let cp = Arc::new(MockControlPlane::new());
        let registrar = ModelRegistrar::new(cp.clone());

        registrar.register("role", PACKAGE, "m-1").await.unwrap();
        let err = registrar.register("role", PACKAGE, "m-1").await.unwrap_err();

        assert_eq!(err.name, "m-1");
        assert_eq!(err.source.code(), Some("ValidationException"));
        assert_eq!(cp.model_count().await, 1);
    }

    #[tokio::test]
    async fn test_remote_failure_is_wrapped() {
        let cp = Arc::new(MockControlPlane::new());
        cp.set_next_error(MockOperation::CreateModel, ControlPlaneError::Timeout)
            .await;
        let registrar = ModelRegistrar::new(cp);

        let err = registrar.register("role", PACKAGE, "m-1").await.unwrap_err();

        assert!(matches!(err.source, ControlPlaneError::Timeout));
        assert_eq!(err.to_string(), "Failed to register model m-1: Request timeout");
    }
}
