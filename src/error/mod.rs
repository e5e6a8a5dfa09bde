//! Error types and handling for mlbox
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`config`]: Configuration errors (invalid flag combinations, platforms)
//! - [`manifest`]: Manifest loading and writing errors
//! - [`sync`]: Row replication and transfer errors
//! - [`job`]: Job stage and collaborator errors
//! - [`fs`]: File system errors

pub mod config;
pub mod fs;
pub mod job;
pub mod manifest;
pub mod sync;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for mlbox operations
#[derive(Error, Diagnostic, Debug)]
pub enum MlboxError {
    // Configuration errors
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(mlbox::config::invalid))]
    ConfigInvalid { message: String },

    #[error("Unsupported platform: {message}")]
    #[diagnostic(
        code(mlbox::config::unsupported_platform),
        help("Run the job without --use-docker on this machine")
    )]
    UnsupportedPlatform { message: String },

    #[error("Unsupported task kind: {kind}")]
    #[diagnostic(
        code(mlbox::config::unsupported_task_kind),
        help("Supported task kinds: all, single")
    )]
    UnsupportedTaskKind { kind: String },

    // Manifest errors
    #[error("Manifest not found: {path}")]
    #[diagnostic(
        code(mlbox::manifest::missing),
        help("Check that the bundle has been built or fetched into this directory")
    )]
    ManifestMissing { path: String },

    #[error("Failed to parse manifest {path}: {reason}")]
    #[diagnostic(code(mlbox::manifest::parse_failed))]
    ManifestParseFailed { path: String, reason: String },

    #[error("Failed to write manifest {path}: {reason}")]
    #[diagnostic(code(mlbox::manifest::write_failed))]
    ManifestWriteFailed { path: String, reason: String },

    #[error("Invalid signature entry '{entry}': {reason}")]
    #[diagnostic(
        code(mlbox::manifest::invalid_signature),
        help("Signature entries have the form size:algorithm:hash")
    )]
    InvalidSignature { entry: String, reason: String },

    #[error("Manifest {path} is already finalized with status '{status}'")]
    #[diagnostic(
        code(mlbox::manifest::immutable),
        help("Start a new run with a fresh version instead")
    )]
    ManifestImmutable { path: String, status: String },

    #[error("Unsupported hash algorithm '{algorithm}' (store uses '{expected}')")]
    #[diagnostic(code(mlbox::manifest::unsupported_algorithm))]
    UnsupportedAlgorithm { algorithm: String, expected: String },

    // Sync errors
    #[error("Row sync failed for {bundle}: {reason}")]
    #[diagnostic(code(mlbox::sync::rows_failed))]
    RowSyncFailed { bundle: String, reason: String },

    #[error("Transfer of '{name}' failed: {reason}")]
    #[diagnostic(code(mlbox::sync::transfer_failed))]
    TransferFailed { name: String, reason: String },

    #[error("Hash mismatch for '{name}': expected {expected}, got {actual}")]
    #[diagnostic(code(mlbox::sync::hash_mismatch))]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to link {link} -> {target}: {reason}")]
    #[diagnostic(code(mlbox::sync::link_failed))]
    LinkFailed {
        link: String,
        target: String,
        reason: String,
    },

    // Job errors
    #[error("Stage '{stage}' failed: {source}")]
    #[diagnostic(code(mlbox::job::stage_failed))]
    StageFailed {
        stage: String,
        #[source]
        source: Box<MlboxError>,
    },

    #[error("Failed to extract '{reference}': {reason}")]
    #[diagnostic(code(mlbox::job::extract_failed))]
    ExtractFailed { reference: String, reason: String },

    #[error("Command '{command}' failed: {reason}")]
    #[diagnostic(code(mlbox::job::process_failed))]
    ProcessFailed { command: String, reason: String },

    #[error("Evaluation handler failed: {reason}")]
    #[diagnostic(code(mlbox::job::handler_failed))]
    HandlerFailed { reason: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(mlbox::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(mlbox::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(mlbox::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(mlbox::fs::io_error))]
    IoError { message: String },
}

impl MlboxError {
    /// True for errors raised while validating flags and references,
    /// before any work has started.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MlboxError::ConfigInvalid { .. }
                | MlboxError::UnsupportedPlatform { .. }
                | MlboxError::UnsupportedTaskKind { .. }
        )
    }
}

impl From<std::io::Error> for MlboxError {
    fn from(err: std::io::Error) -> Self {
        MlboxError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for MlboxError {
    fn from(err: serde_yaml::Error) -> Self {
        MlboxError::ManifestParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MlboxError {
    fn from(err: serde_json::Error) -> Self {
        MlboxError::RowSyncFailed {
            bundle: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, MlboxError>;
