//! Blob storage abstraction.
//!
//! Holds the approved-artifact pointer and the pipeline's input artifacts.

mod fs_store;
mod types;

pub use fs_store::FsBlobStore;
pub use types::*;
