//! Model and endpoint control plane abstraction.
//!
//! The control plane owns the endpoint and its convergence; this crate only
//! issues requests and observes status.

mod http;
mod types;
mod waiter;

pub use http::HttpControlPlane;
pub use types::*;
pub use waiter::{wait_until_in_service, MAX_CONVERGENCE_TIMEOUT};
