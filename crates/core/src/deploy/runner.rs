//! Deployer implementation.
//!
//! One pipeline job in, exactly one job report out. Each job runs in its
//! own task so that a caller going away mid-deployment does not lose the
//! report. The locate, register and reconcile steps run in a further task
//! so that a panic anywhere in them still ends in a failure report.

use std::any::Any;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, info_span, Instrument, Span};

use crate::artifact::ArtifactLocator;
use crate::blob::BlobStore;
use crate::config::DeploymentConfig;
use crate::control_plane::ControlPlane;
use crate::coordinator::{JobReporter, PipelineCoordinator};
use crate::metrics;
use crate::reconciler::{EndpointReconciler, ReconcileSettings};
use crate::registrar::ModelRegistrar;

use super::context::{DeployContext, StampClock};
use super::event::{extract_job_id, parse_job_input, JobInput};
use super::types::{DeployError, DeployOutcome};

/// Settings for the resources a deployment registers.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub model_name_prefix: String,
    pub execution_role: String,
}

impl From<&DeploymentConfig> for DeploySettings {
    fn from(config: &DeploymentConfig) -> Self {
        Self {
            model_name_prefix: config.model_name_prefix.clone(),
            execution_role: config.execution_role.clone(),
        }
    }
}

/// Runs deployment jobs dispatched by the pipeline coordinator.
pub struct Deployer {
    worker: Arc<JobWorker>,
    clock: StampClock,
}

/// Everything one job needs, owned so the job can run detached from the
/// caller.
struct JobWorker {
    locator: Arc<ArtifactLocator>,
    registrar: Arc<ModelRegistrar>,
    reconciler: Arc<EndpointReconciler>,
    coordinator: Arc<dyn PipelineCoordinator>,
    settings: DeploySettings,
}

impl Deployer {
    pub fn new(
        config: &DeploymentConfig,
        store: Arc<dyn BlobStore>,
        control_plane: Arc<dyn ControlPlane>,
        coordinator: Arc<dyn PipelineCoordinator>,
    ) -> Self {
        let worker = JobWorker {
            locator: Arc::new(ArtifactLocator::new(store)),
            registrar: Arc::new(ModelRegistrar::new(control_plane.clone())),
            reconciler: Arc::new(EndpointReconciler::new(
                control_plane,
                ReconcileSettings::from(config),
            )),
            coordinator,
            settings: DeploySettings::from(config),
        };
        Self {
            worker: Arc::new(worker),
            clock: StampClock::new(),
        }
    }

    /// Handles one pipeline job event.
    ///
    /// Unless the event has no job id, the outcome is reported to the
    /// coordinator exactly once. The job runs in its own task: dropping the
    /// returned future stops waiting for the outcome but neither cancels the
    /// deployment nor its report. The returned error is the deployment
    /// failure, or `Report` when only delivering the success report failed.
    pub async fn run(&self, event: &Value) -> Result<DeployOutcome, DeployError> {
        let Some(job_id) = extract_job_id(event) else {
            error!("Pipeline job event has no job id; nothing can be reported");
            let err = DeployError::InvalidJobEvent("missing CodePipeline.job.id".to_string());
            metrics::DEPLOYMENTS_TOTAL
                .with_label_values(&[err.kind()])
                .inc();
            return Err(err);
        };

        let started_at = self.clock.next(Utc::now());
        let ctx = DeployContext::new(job_id, &self.worker.settings.execution_role, started_at);
        let span = info_span!("deploy", job_id = %ctx.job_id, attempt_id = %ctx.attempt_id);

        let worker = self.worker.clone();
        let event = event.clone();
        let job = tokio::spawn(async move { worker.run_job(ctx, &event).await }.instrument(span));

        match job.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(DeployError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(DeployError::Panicked(e.to_string())),
        }
    }
}

impl JobWorker {
    async fn run_job(&self, ctx: DeployContext, event: &Value) -> Result<DeployOutcome, DeployError> {
        info!("Starting deployment");
        let reporter = JobReporter::new(self.coordinator.clone(), ctx.job_id.clone());

        let result = match self.attempt(&ctx, event).await {
            Ok(outcome) => {
                info!(
                    model = %outcome.model_name,
                    config = %outcome.config_name,
                    branch = outcome.branch.as_str(),
                    "Deployment converged"
                );
                reporter
                    .succeed()
                    .await
                    .map(|()| outcome)
                    .map_err(DeployError::Report)
            }
            Err(err) => {
                error!(kind = err.kind(), error = %err, "Deployment failed");
                if let Err(report_err) = reporter
                    .fail(&err.to_string(), &err.diagnostic_trace())
                    .await
                {
                    error!(error = %report_err, "Could not deliver failure report");
                }
                Err(err)
            }
        };

        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::DEPLOYMENTS_TOTAL.with_label_values(&[label]).inc();

        result
    }

    async fn attempt(&self, ctx: &DeployContext, event: &Value) -> Result<DeployOutcome, DeployError> {
        let input = parse_job_input(event).map_err(DeployError::Configuration)?;

        let locator = self.locator.clone();
        let registrar = self.registrar.clone();
        let reconciler = self.reconciler.clone();
        let prefix = self.settings.model_name_prefix.clone();
        let ctx = ctx.clone();

        let task = tokio::spawn(
            async move { deploy(&locator, &registrar, &reconciler, &ctx, &prefix, input).await }
                .instrument(Span::current()),
        );

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(DeployError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(DeployError::Panicked(e.to_string())),
        }
    }
}

async fn deploy(
    locator: &ArtifactLocator,
    registrar: &ModelRegistrar,
    reconciler: &EndpointReconciler,
    ctx: &DeployContext,
    model_name_prefix: &str,
    input: JobInput,
) -> Result<DeployOutcome, DeployError> {
    let pointer = locator.locate(&input.location, &input.credentials).await?;

    let model_name = ctx.model_name(model_name_prefix);
    let model = registrar
        .register(&ctx.execution_role, &pointer.model_reference, &model_name)
        .await?;

    let report = reconciler.reconcile(ctx, &model).await?;

    Ok(DeployOutcome {
        job_id: ctx.job_id.clone(),
        attempt_id: ctx.attempt_id,
        model_reference: pointer.model_reference,
        model_name: model.name,
        endpoint_name: report.endpoint_name,
        config_name: report.config_name,
        branch: report.branch,
        status: report.description.status,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
