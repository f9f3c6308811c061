//! Pipeline coordinator abstraction and job outcome reporting.
//!
//! The coordinator dispatched the deployment job and waits for exactly one
//! outcome per job id. [`JobReporter`] enforces that on this side.

mod http;
mod reporter;
mod types;

pub use http::HttpPipelineCoordinator;
pub use reporter::{JobReporter, MAX_FAILURE_MESSAGE_CHARS};
pub use types::*;
