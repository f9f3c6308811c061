//! Testing utilities and mock implementations.
//!
//! Mocks of every external service trait, so deployments and approvals can
//! be exercised end to end without a control plane, coordinator or store.
//!
//! # Example
//!
//! ```rust,ignore
//! use promoter_core::testing::{MockBlobStore, MockControlPlane, MockPipelineCoordinator};
//!
//! let store = MockBlobStore::new();
//! let control_plane = MockControlPlane::new();
//! let coordinator = MockPipelineCoordinator::new();
//!
//! control_plane.add_endpoint("ep", "ep-config-old", EndpointStatus::InService).await;
//! // Build a Deployer from them...
//! ```

mod fixtures;
mod mock_blob_store;
mod mock_control_plane;
mod mock_coordinator;

pub use fixtures::{approval_event, deployment_config, job_event, test_config};
pub use mock_blob_store::{MockBlobStore, RecordedRead, RecordedWrite};
pub use mock_control_plane::{ControlPlaneCall, MockControlPlane, MockOperation, MockWaitBehavior};
pub use mock_coordinator::{MockPipelineCoordinator, RecordedReport};
