pub mod artifact;
pub mod blob;
pub mod config;
pub mod control_plane;
pub mod coordinator;
pub mod deploy;
pub mod metrics;
pub mod reconciler;
pub mod registrar;
pub mod testing;
pub mod trigger;

pub use artifact::{ArtifactError, ArtifactLocator, ArtifactPointer};
pub use blob::{ArtifactCredentials, BlobError, BlobStore, FsBlobStore, ObjectLocation};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    SanitizedConfig,
};
pub use control_plane::{
    ControlPlane, ControlPlaneError, EndpointDescription, EndpointStatus, HttpControlPlane,
};
pub use coordinator::{
    CoordinatorError, FailureDetails, HttpPipelineCoordinator, JobReporter, PipelineCoordinator,
};
pub use deploy::{DeployContext, DeployError, DeployOutcome, Deployer};
pub use reconciler::{Branch, EndpointReconciler, ReconcileError, ReconcileState};
pub use registrar::{ModelRegistrar, RegistrationError};
pub use trigger::{PromotionTrigger, TriggerError, TriggerOutcome};
