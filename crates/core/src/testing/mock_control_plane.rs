//! Mock control plane for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::control_plane::{
    wait_until_in_service, ControlPlane, ControlPlaneError, EndpointConfigHandle,
    EndpointConfigSpec, EndpointDescription, EndpointStatus, ModelHandle, ModelSpec,
    VALIDATION_EXCEPTION,
};

/// Control plane operations, for scripting errors and counting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    CreateModel,
    CreateEndpointConfig,
    DescribeEndpoint,
    CreateEndpoint,
    UpdateEndpoint,
    WaitUntilHealthy,
}

/// A recorded control plane call.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPlaneCall {
    CreateModel(ModelSpec),
    CreateEndpointConfig(EndpointConfigSpec),
    DescribeEndpoint { name: String },
    CreateEndpoint { name: String, config_name: String },
    UpdateEndpoint { name: String, config_name: String },
    WaitUntilHealthy { name: String, timeout: Duration },
}

impl ControlPlaneCall {
    pub fn operation(&self) -> MockOperation {
        match self {
            ControlPlaneCall::CreateModel(_) => MockOperation::CreateModel,
            ControlPlaneCall::CreateEndpointConfig(_) => MockOperation::CreateEndpointConfig,
            ControlPlaneCall::DescribeEndpoint { .. } => MockOperation::DescribeEndpoint,
            ControlPlaneCall::CreateEndpoint { .. } => MockOperation::CreateEndpoint,
            ControlPlaneCall::UpdateEndpoint { .. } => MockOperation::UpdateEndpoint,
            ControlPlaneCall::WaitUntilHealthy { .. } => MockOperation::WaitUntilHealthy,
        }
    }
}

/// How `wait_until_healthy` behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockWaitBehavior {
    /// The endpoint is `InService` on its current configuration at once.
    Converge,
    /// Poll `describe_endpoint` at the given interval, honoring queued statuses.
    Poll(Duration),
    /// The wait runs out of time without the endpoint changing.
    TimeOut,
    /// The endpoint fails with the given reason.
    Fail(String),
    /// The update fails with the given reason and the endpoint returns to
    /// service on the configuration it had before the update.
    RollBack(String),
}

/// Mock implementation of the ControlPlane trait.
///
/// Keeps models, configurations and endpoints in memory and answers the
/// way the real control plane does: reused names are rejected, a missing
/// endpoint is a `ValidationException`, and updating an endpoint that is
/// mid-transition is rejected as in progress.
///
/// # Example
///
/// ```rust,ignore
/// let cp = MockControlPlane::new();
/// cp.add_endpoint("ep", "ep-config-old", EndpointStatus::Updating).await;
///
/// let err = cp.update_endpoint("ep", "ep-config-new").await.unwrap_err();
/// assert!(err.message().unwrap().contains("Cannot update in-progress endpoint"));
/// ```
#[derive(Debug)]
pub struct MockControlPlane {
    calls: Arc<RwLock<Vec<ControlPlaneCall>>>,
    models: Arc<RwLock<HashMap<String, ModelSpec>>>,
    configs: Arc<RwLock<HashMap<String, EndpointConfigSpec>>>,
    endpoints: Arc<RwLock<HashMap<String, EndpointDescription>>>,
    /// Configuration each endpoint served before its last update.
    replaced_configs: Arc<RwLock<HashMap<String, String>>>,
    /// Statuses returned by successive describes before falling back to
    /// the endpoint's current status.
    status_queues: Arc<RwLock<HashMap<String, VecDeque<EndpointStatus>>>>,
    /// One-shot errors by operation.
    next_errors: Arc<RwLock<HashMap<MockOperation, ControlPlaneError>>>,
    panic_on: Arc<RwLock<Option<MockOperation>>>,
    wait_behavior: Arc<RwLock<MockWaitBehavior>>,
    id_counter: Arc<RwLock<u32>>,
}

impl Default for MockControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

fn validation(message: String) -> ControlPlaneError {
    ControlPlaneError::service(VALIDATION_EXCEPTION, message)
}

fn endpoint_not_found(name: &str) -> ControlPlaneError {
    validation(format!("Could not find endpoint \"{}\".", name))
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            models: Arc::new(RwLock::new(HashMap::new())),
            configs: Arc::new(RwLock::new(HashMap::new())),
            endpoints: Arc::new(RwLock::new(HashMap::new())),
            replaced_configs: Arc::new(RwLock::new(HashMap::new())),
            status_queues: Arc::new(RwLock::new(HashMap::new())),
            next_errors: Arc::new(RwLock::new(HashMap::new())),
            panic_on: Arc::new(RwLock::new(None)),
            wait_behavior: Arc::new(RwLock::new(MockWaitBehavior::Converge)),
            id_counter: Arc::new(RwLock::new(0)),
        }
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Adds an existing endpoint.
    pub async fn add_endpoint(&self, name: &str, config_name: &str, status: EndpointStatus) {
        self.endpoints.write().await.insert(
            name.to_string(),
            EndpointDescription {
                name: name.to_string(),
                config_name: config_name.to_string(),
                status,
                failure_reason: None,
            },
        );
    }

    /// Queues statuses for successive describes of `name`. Each describe
    /// pops one and makes it the endpoint's current status.
    pub async fn queue_statuses(&self, name: &str, statuses: Vec<EndpointStatus>) {
        self.status_queues
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .extend(statuses);
    }

    pub async fn set_failure_reason(&self, name: &str, reason: &str) {
        if let Some(endpoint) = self.endpoints.write().await.get_mut(name) {
            endpoint.failure_reason = Some(reason.to_string());
        }
    }

    /// Make the next call of `operation` fail with the given error.
    pub async fn set_next_error(&self, operation: MockOperation, error: ControlPlaneError) {
        self.next_errors.write().await.insert(operation, error);
    }

    /// Make every call of `operation` panic.
    pub async fn set_panic_on(&self, operation: MockOperation) {
        *self.panic_on.write().await = Some(operation);
    }

    pub async fn set_wait_behavior(&self, behavior: MockWaitBehavior) {
        *self.wait_behavior.write().await = behavior;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub async fn calls(&self) -> Vec<ControlPlaneCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self, operation: MockOperation) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    pub async fn describe_count(&self) -> usize {
        self.call_count(MockOperation::DescribeEndpoint).await
    }

    pub async fn endpoint(&self, name: &str) -> Option<EndpointDescription> {
        self.endpoints.read().await.get(name).cloned()
    }

    pub async fn model(&self, name: &str) -> Option<ModelSpec> {
        self.models.read().await.get(name).cloned()
    }

    pub async fn model_count(&self) -> usize {
        self.models.read().await.len()
    }

    pub async fn config(&self, name: &str) -> Option<EndpointConfigSpec> {
        self.configs.read().await.get(name).cloned()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Records the call, then applies any scripted panic or error.
    async fn enter(&self, call: ControlPlaneCall) -> Result<(), ControlPlaneError> {
        let operation = call.operation();
        self.calls.write().await.push(call);

        let panic_on = *self.panic_on.read().await;
        if panic_on == Some(operation) {
            panic!("mock control plane panicked on {:?}", operation);
        }

        match self.next_errors.write().await.remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn next_id(&self, prefix: &str) -> String {
        let mut counter = self.id_counter.write().await;
        *counter += 1;
        format!("{}-{}", prefix, *counter)
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_model(&self, spec: &ModelSpec) -> Result<ModelHandle, ControlPlaneError> {
        self.enter(ControlPlaneCall::CreateModel(spec.clone()))
            .await?;

        let mut models = self.models.write().await;
        if models.contains_key(&spec.name) {
            return Err(validation(format!(
                "Cannot create already existing model \"{}\".",
                spec.name
            )));
        }
        models.insert(spec.name.clone(), spec.clone());
        drop(models);

        Ok(ModelHandle {
            name: spec.name.clone(),
            id: self.next_id("model").await,
        })
    }

    async fn create_endpoint_config(
        &self,
        spec: &EndpointConfigSpec,
    ) -> Result<EndpointConfigHandle, ControlPlaneError> {
        self.enter(ControlPlaneCall::CreateEndpointConfig(spec.clone()))
            .await?;

        let mut configs = self.configs.write().await;
        if configs.contains_key(&spec.name) {
            return Err(validation(format!(
                "Cannot create already existing endpoint configuration \"{}\".",
                spec.name
            )));
        }
        configs.insert(spec.name.clone(), spec.clone());
        drop(configs);

        Ok(EndpointConfigHandle {
            name: spec.name.clone(),
            id: self.next_id("endpoint-config").await,
        })
    }

    async fn describe_endpoint(
        &self,
        name: &str,
    ) -> Result<EndpointDescription, ControlPlaneError> {
        self.enter(ControlPlaneCall::DescribeEndpoint {
            name: name.to_string(),
        })
        .await?;

        let queued = self
            .status_queues
            .write()
            .await
            .get_mut(name)
            .and_then(|q| q.pop_front());

        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .get_mut(name)
            .ok_or_else(|| endpoint_not_found(name))?;
        if let Some(status) = queued {
            endpoint.status = status;
        }
        Ok(endpoint.clone())
    }

    async fn create_endpoint(&self, name: &str, config_name: &str) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneCall::CreateEndpoint {
            name: name.to_string(),
            config_name: config_name.to_string(),
        })
        .await?;

        if !self.configs.read().await.contains_key(config_name) {
            return Err(validation(format!(
                "Could not find endpoint configuration \"{}\".",
                config_name
            )));
        }

        let mut endpoints = self.endpoints.write().await;
        if endpoints.contains_key(name) {
            return Err(validation(format!(
                "Cannot create already existing endpoint \"{}\".",
                name
            )));
        }
        endpoints.insert(
            name.to_string(),
            EndpointDescription {
                name: name.to_string(),
                config_name: config_name.to_string(),
                status: EndpointStatus::Creating,
                failure_reason: None,
            },
        );
        Ok(())
    }

    async fn update_endpoint(&self, name: &str, config_name: &str) -> Result<(), ControlPlaneError> {
        self.enter(ControlPlaneCall::UpdateEndpoint {
            name: name.to_string(),
            config_name: config_name.to_string(),
        })
        .await?;

        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .get_mut(name)
            .ok_or_else(|| endpoint_not_found(name))?;
        if endpoint.status.is_transitioning() {
            return Err(validation(format!(
                "Cannot update in-progress endpoint \"{}\".",
                name
            )));
        }
        let replaced = std::mem::replace(&mut endpoint.config_name, config_name.to_string());
        self.replaced_configs
            .write()
            .await
            .insert(name.to_string(), replaced);
        endpoint.status = EndpointStatus::Updating;
        endpoint.failure_reason = None;
        Ok(())
    }

    async fn wait_until_healthy(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<EndpointDescription, ControlPlaneError> {
        self.enter(ControlPlaneCall::WaitUntilHealthy {
            name: name.to_string(),
            timeout,
        })
        .await?;

        let behavior = self.wait_behavior.read().await.clone();
        if let MockWaitBehavior::Poll(interval) = behavior {
            return wait_until_in_service(self, name, timeout, interval).await;
        }

        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .get_mut(name)
            .ok_or_else(|| endpoint_not_found(name))?;

        match behavior {
            MockWaitBehavior::TimeOut => Err(ControlPlaneError::WaitTimeout {
                endpoint: name.to_string(),
                waited: timeout,
                last_status: endpoint.status,
            }),
            MockWaitBehavior::Fail(reason) => {
                endpoint.status = EndpointStatus::Failed;
                endpoint.failure_reason = Some(reason.clone());
                Err(ControlPlaneError::WaitFailed {
                    endpoint: name.to_string(),
                    status: EndpointStatus::Failed,
                    reason,
                })
            }
            MockWaitBehavior::RollBack(reason) => {
                if let Some(previous) = self.replaced_configs.read().await.get(name) {
                    endpoint.config_name = previous.clone();
                }
                endpoint.status = EndpointStatus::InService;
                endpoint.failure_reason = Some(reason);
                Ok(endpoint.clone())
            }
            MockWaitBehavior::Converge | MockWaitBehavior::Poll(_) => {
                endpoint.status = EndpointStatus::InService;
                Ok(endpoint.clone())
            }
        }
    }
}
