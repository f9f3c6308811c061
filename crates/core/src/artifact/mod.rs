//! Approved-artifact pointer and the locator that reads it.

mod locator;
mod types;

pub use locator::ArtifactLocator;
pub use types::*;
