//! Types for model/endpoint control plane operations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code the control plane uses for both "does not exist" and "is busy".
pub const VALIDATION_EXCEPTION: &str = "ValidationException";

/// Errors returned by control plane operations.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// The remote side rejected the request. `code` is coarse; the message
    /// carries the detail that tells rejections of the same code apart.
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("Connection failed: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    Decode(String),

    /// The convergence wait ran out of time.
    #[error("Endpoint {endpoint} did not reach InService within {secs}s (last status: {last_status})", secs = .waited.as_secs())]
    WaitTimeout {
        endpoint: String,
        waited: Duration,
        last_status: EndpointStatus,
    },

    /// The endpoint reached a terminal non-healthy status while waiting.
    #[error("Endpoint {endpoint} entered status {status}: {reason}")]
    WaitFailed {
        endpoint: String,
        status: EndpointStatus,
        reason: String,
    },
}

impl ControlPlaneError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Code of a service rejection, if this is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Message of a service rejection, if this is one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Service { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Lifecycle status of an endpoint as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointStatus {
    OutOfService,
    Creating,
    Updating,
    SystemUpdating,
    RollingBack,
    InService,
    Deleting,
    Failed,
    #[serde(other)]
    Unknown,
}

impl EndpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointStatus::OutOfService => "OutOfService",
            EndpointStatus::Creating => "Creating",
            EndpointStatus::Updating => "Updating",
            EndpointStatus::SystemUpdating => "SystemUpdating",
            EndpointStatus::RollingBack => "RollingBack",
            EndpointStatus::InService => "InService",
            EndpointStatus::Deleting => "Deleting",
            EndpointStatus::Failed => "Failed",
            EndpointStatus::Unknown => "Unknown",
        }
    }

    /// Whether the endpoint is serving and not transitioning.
    pub fn is_healthy(&self) -> bool {
        matches!(self, EndpointStatus::InService)
    }

    /// Whether the endpoint is in the middle of a change.
    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            EndpointStatus::Creating
                | EndpointStatus::Updating
                | EndpointStatus::SystemUpdating
                | EndpointStatus::RollingBack
                | EndpointStatus::Deleting
        )
    }
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to register a deployable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Unique model name.
    pub name: String,
    /// Approved model package the model is built from.
    pub artifact_reference: String,
    /// Identity the model executes as.
    pub execution_role: String,
}

/// A registered model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub name: String,
    /// Opaque remote identifier.
    pub id: String,
}

/// One production variant of an endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionVariant {
    pub variant_name: String,
    pub model_name: String,
    pub initial_instance_count: u32,
    pub instance_type: String,
    pub initial_variant_weight: f32,
}

/// Request to create an immutable endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfigSpec {
    pub name: String,
    pub variants: Vec<ProductionVariant>,
}

/// A created endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfigHandle {
    pub name: String,
    pub id: String,
}

/// Current state of an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescription {
    pub name: String,
    pub config_name: String,
    pub status: EndpointStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Remote control plane hosting models and endpoints.
///
/// Every call is one round-trip with no retry beyond what the transport does.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Registers a deployable model. Not idempotent for a reused name.
    async fn create_model(&self, spec: &ModelSpec) -> Result<ModelHandle, ControlPlaneError>;

    /// Creates an endpoint configuration.
    async fn create_endpoint_config(
        &self,
        spec: &EndpointConfigSpec,
    ) -> Result<EndpointConfigHandle, ControlPlaneError>;

    /// Describes an endpoint. A missing endpoint is a `ValidationException`.
    async fn describe_endpoint(&self, name: &str)
        -> Result<EndpointDescription, ControlPlaneError>;

    /// Creates an endpoint serving the given configuration.
    async fn create_endpoint(&self, name: &str, config_name: &str)
        -> Result<(), ControlPlaneError>;

    /// Repoints an existing endpoint at a new configuration.
    ///
    /// Rejected with a `ValidationException` when the endpoint is mid-transition.
    async fn update_endpoint(&self, name: &str, config_name: &str)
        -> Result<(), ControlPlaneError>;

    /// Blocks until the endpoint is `InService`, it fails, or `timeout` elapses.
    async fn wait_until_healthy(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<EndpointDescription, ControlPlaneError>;
}
