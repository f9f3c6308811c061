//! Promotion trigger.
//!
//! Turns a model approval notification into an overwrite of the artifact
//! pointer that the deployment pipeline consumes.

mod handler;
mod types;

pub use handler::PromotionTrigger;
pub use types::*;
