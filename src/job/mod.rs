//! Evaluation job execution
//!
//! A job runs through four ordered stages (prepare workdir, extract model,
//! extract runtime, run eval job) and always ends by writing a job manifest.
//! The final stage runs either on the host through an [`EvalHandler`] or in a
//! container through a [`CommandRunner`].

pub mod collaborators;
pub mod container;
pub mod executor;

pub use collaborators::{
    BundleExtractor, CommandRunner, DirectoryExtractor, DirectoryRuntime, EvalHandler,
    EvalRequest, ProcessEvalHandler, ProcessRunner, RuntimeStore,
};
pub use container::{ContainerCommand, ContainerCommandBuilder};
pub use executor::{HostPlatform, JobBackends, JobExecutor, JobOptions, Stage};

/// Folder holding the status marker inside a task directory
pub const STATUS_DIR: &str = "status";

/// Status marker file name
pub const STATUS_FILE: &str = "current";

/// Marker content of a successful task
pub const SUCCESS_TOKEN: &str = "success";

/// Model descriptor file inside an extracted model directory
pub const MODEL_DESCRIPTOR: &str = "model.yaml";

/// Model skeleton subdirectory of a job working directory
pub const MODEL_SUBDIR: &str = "model";

/// Runtime dependency directory inside an extracted runtime
pub const RUNTIME_DEP_DIR: &str = "dep";

/// Working directory of a job inside its container
pub const CNTR_WORKDIR: &str = "/opt/mlbox";
