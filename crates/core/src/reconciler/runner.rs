//! Endpoint reconciler implementation.
//!
//! Drives one attempt through the state machine in [`super::state`]:
//! create a fresh endpoint configuration, probe the endpoint, create or
//! update it, then wait for convergence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::DeploymentConfig;
use crate::control_plane::{
    ControlPlane, ControlPlaneError, EndpointConfigSpec, EndpointDescription, ModelHandle,
    ProductionVariant,
};
use crate::deploy::DeployContext;
use crate::metrics;

use super::classify::{classify, EndpointFault, EndpointOperation};
use super::state::{
    AbortReason, Branch, ConvergenceFailure, ReconcileState, Step, StepOutcome,
};
use super::types::{ReconcileError, ReconcileReport};

/// Endpoint shape applied on every attempt.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub endpoint_name: String,
    pub variant_name: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub variant_weight: f32,
    pub convergence_timeout: Duration,
}

impl From<&DeploymentConfig> for ReconcileSettings {
    fn from(config: &DeploymentConfig) -> Self {
        Self {
            endpoint_name: config.endpoint_name.clone(),
            variant_name: config.variant_name.clone(),
            instance_type: config.instance_type.clone(),
            instance_count: config.instance_count,
            variant_weight: config.variant_weight,
            convergence_timeout: Duration::from_secs(config.convergence_timeout_secs),
        }
    }
}

/// Points the stable endpoint at a newly registered model.
pub struct EndpointReconciler {
    control_plane: Arc<dyn ControlPlane>,
    settings: ReconcileSettings,
}

impl EndpointReconciler {
    pub fn new(control_plane: Arc<dyn ControlPlane>, settings: ReconcileSettings) -> Self {
        Self {
            control_plane,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Builds the single-variant configuration serving `model`.
    pub fn config_spec(&self, ctx: &DeployContext, model: &ModelHandle) -> EndpointConfigSpec {
        EndpointConfigSpec {
            name: ctx.config_name(&self.settings.endpoint_name),
            variants: vec![ProductionVariant {
                variant_name: self.settings.variant_name.clone(),
                model_name: model.name.clone(),
                initial_instance_count: self.settings.instance_count,
                instance_type: self.settings.instance_type.clone(),
                initial_variant_weight: self.settings.variant_weight,
            }],
        }
    }

    /// Runs one reconciliation attempt to a terminal state.
    ///
    /// Succeeds only once the endpoint is `InService` on the new
    /// configuration. An endpoint found mid-transition is left alone and
    /// reported as a conflict.
    pub async fn reconcile(
        &self,
        ctx: &DeployContext,
        model: &ModelHandle,
    ) -> Result<ReconcileReport, ReconcileError> {
        let endpoint = self.settings.endpoint_name.as_str();
        let spec = self.config_spec(ctx, model);

        let mut state = ReconcileState::Start;
        let mut trail = vec![state];
        let mut last_error: Option<ControlPlaneError> = None;
        let mut description: Option<EndpointDescription> = None;

        loop {
            let outcome = match state.next_step() {
                Step::Finished => break,
                Step::CreateConfig => {
                    info!(config = %spec.name, model = %model.name, "Creating endpoint configuration");
                    match self.control_plane.create_endpoint_config(&spec).await {
                        Ok(_) => StepOutcome::Accepted,
                        Err(e) => {
                            last_error = Some(e);
                            StepOutcome::Rejected(EndpointFault::Unknown)
                        }
                    }
                }
                Step::ProbeEndpoint => {
                    debug!(endpoint, "Checking whether endpoint exists");
                    match self.control_plane.describe_endpoint(endpoint).await {
                        Ok(found) => StepOutcome::EndpointFound(found.status),
                        Err(e) => self.rejected(EndpointOperation::Describe, e, &mut last_error),
                    }
                }
                Step::CreateEndpoint => {
                    info!(endpoint, config = %spec.name, "Endpoint does not exist, creating it");
                    match self.control_plane.create_endpoint(endpoint, &spec.name).await {
                        Ok(()) => StepOutcome::Accepted,
                        Err(e) => self.rejected(EndpointOperation::Create, e, &mut last_error),
                    }
                }
                Step::UpdateEndpoint => {
                    info!(endpoint, config = %spec.name, "Endpoint exists, updating configuration");
                    match self.control_plane.update_endpoint(endpoint, &spec.name).await {
                        Ok(()) => StepOutcome::Accepted,
                        Err(e) => self.rejected(EndpointOperation::Update, e, &mut last_error),
                    }
                }
                Step::AwaitConvergence => {
                    info!(endpoint, "Waiting for endpoint to be InService");
                    let started = Instant::now();
                    let result = self
                        .control_plane
                        .wait_until_healthy(endpoint, self.settings.convergence_timeout)
                        .await;
                    let outcome = match result {
                        Ok(found) if found.config_name != spec.name => {
                            warn!(
                                endpoint,
                                serving = %found.config_name,
                                expected = %spec.name,
                                "Endpoint is InService on another configuration"
                            );
                            last_error = Some(rolled_back(found, &spec.name));
                            StepOutcome::Unhealthy
                        }
                        Ok(found) => {
                            description = Some(found);
                            StepOutcome::Healthy
                        }
                        Err(e) => {
                            let outcome = match &e {
                                ControlPlaneError::WaitTimeout { .. } => StepOutcome::TimedOut,
                                ControlPlaneError::WaitFailed { .. } => StepOutcome::Unhealthy,
                                other => StepOutcome::Rejected(classify(
                                    EndpointOperation::Describe,
                                    other,
                                )),
                            };
                            last_error = Some(e);
                            outcome
                        }
                    };
                    let label = match outcome {
                        StepOutcome::Healthy => "converged",
                        StepOutcome::TimedOut => "timeout",
                        _ => "failed",
                    };
                    metrics::CONVERGENCE_DURATION
                        .with_label_values(&[label])
                        .observe(started.elapsed().as_secs_f64());
                    outcome
                }
            };

            let previous = state;
            state = state.transition(outcome)?;
            trail.push(state);
            debug!(from = %previous, to = %state, "Reconcile state changed");

            if let ReconcileState::Converging(branch) = state {
                metrics::RECONCILE_BRANCHES
                    .with_label_values(&[branch.as_str()])
                    .inc();
            }
        }

        self.finish(state, trail, spec.name, last_error, description)
    }

    fn rejected(
        &self,
        operation: EndpointOperation,
        error: ControlPlaneError,
        last_error: &mut Option<ControlPlaneError>,
    ) -> StepOutcome {
        let fault = classify(operation, &error);
        debug!(?operation, fault = fault.as_str(), error = %error, "Endpoint request rejected");
        *last_error = Some(error);
        StepOutcome::Rejected(fault)
    }

    fn finish(
        &self,
        state: ReconcileState,
        trail: Vec<ReconcileState>,
        config_name: String,
        last_error: Option<ControlPlaneError>,
        description: Option<EndpointDescription>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let endpoint = self.settings.endpoint_name.clone();

        if let (ReconcileState::Converged(branch), Some(description)) = (state, description) {
            info!(
                endpoint = %endpoint,
                config = %config_name,
                branch = branch.as_str(),
                "Endpoint converged"
            );
            return Ok(ReconcileReport {
                endpoint_name: endpoint,
                config_name,
                branch,
                description,
                trail,
            });
        }

        let source = last_error.unwrap_or_else(|| {
            ControlPlaneError::Decode(format!("attempt ended in {state} without an error"))
        });

        let err = match state {
            ReconcileState::EndpointPresentBusy => {
                warn!(endpoint = %endpoint, "Endpoint is already updating, aborting this deployment");
                ReconcileError::Conflict {
                    endpoint,
                    source,
                    trail,
                }
            }
            ReconcileState::Aborted(AbortReason::ConfigurationRejected) => {
                ReconcileError::ConfigurationRejected {
                    config_name,
                    source,
                    trail,
                }
            }
            ReconcileState::ConvergenceFailed(ConvergenceFailure::TimedOut) => {
                ReconcileError::ConvergenceTimeout {
                    endpoint,
                    source,
                    trail,
                }
            }
            ReconcileState::ConvergenceFailed(ConvergenceFailure::Unhealthy) => {
                ReconcileError::ConvergenceFailed {
                    endpoint,
                    source,
                    trail,
                }
            }
            _ => ReconcileError::EndpointFault {
                endpoint,
                source,
                trail,
            },
        };
        Err(err)
    }
}


/// The endpoint settled but kept serving `found.config_name`, typically
/// because the control plane rolled a failed update back.
fn rolled_back(found: EndpointDescription, expected: &str) -> ControlPlaneError {
    let mut reason = format!(
        "serving configuration {} instead of {}",
        found.config_name, expected
    );
    if let Some(failure) = &found.failure_reason {
        reason.push_str(": ");
        reason.push_str(failure);
    }
    ControlPlaneError::WaitFailed {
        endpoint: found.name,
        status: found.status,
        reason,
    }
}
