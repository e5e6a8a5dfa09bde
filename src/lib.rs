//! mlbox - machine-learning artifact client core
//!
//! Two subsystems share the manifest and content-addressing layers:
//! - [`sync`] moves versioned bundles and their metadata rows between a local
//!   and a remote store
//! - [`job`] stages and runs an evaluation job on the host or in a container,
//!   and records its outcome in a job manifest

pub mod config;
pub mod content;
pub mod error;
pub mod job;
pub mod manifest;
pub mod progress;
pub mod sync;
pub mod tabular;

pub use error::{MlboxError, Result};
