//! Deployment of the approved model onto the stable endpoint.
//!
//! Entry point for pipeline jobs: parses the job event, resolves the
//! approved artifact, registers a model, reconciles the endpoint and
//! reports the outcome.

mod context;
mod event;
mod runner;
mod types;

pub use context::{resource_stamp, DeployContext, StampClock, RESOURCE_STAMP_FORMAT};
pub use event::{extract_job_id, parse_job_input, JobInput, JOB_KEY};
pub use runner::{DeploySettings, Deployer};
pub use types::{DeployError, DeployOutcome};
