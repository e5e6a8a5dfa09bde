//! Manifest documents (`_manifest.yaml`)
//!
//! Two documents share the same file name and status vocabulary:
//! - [`BundleManifest`]: signature list of a dataset/model bundle
//! - [`JobManifest`]: outcome record of one evaluation job run
//!
//! Manifests are written atomically (temp file + rename). A job manifest that
//! reached a terminal status is never overwritten.

mod bundle;
mod job;

pub use bundle::BundleManifest;
pub use job::{JobManifest, TaskKind};

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{MlboxError, Result, config, fs, manifest};

/// Manifest file name inside a bundle or job working directory
pub const MANIFEST_FILE: &str = "_manifest.yaml";

/// Number of leading version characters used to bucket working directories
pub const VERSION_PREFIX_LEN: usize = 2;

/// Length of a generated version identifier
const VERSION_LEN: usize = 40;

/// Lifecycle status shared by bundle and job manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Start,
    Running,
    Success,
    Failed,
}

impl Status {
    /// Terminal manifests are immutable
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Start => "start",
            Status::Running => "running",
            Status::Success => "success",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path of the manifest inside `dir`
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

/// Bucketed working directory for a version: `<base>/<version[0..2]>/<version>`
pub fn version_dir(base: &Path, version: &str) -> PathBuf {
    let prefix = crate::content::short_name(version, VERSION_PREFIX_LEN);
    base.join(prefix).join(version)
}

/// Check that `value` names exactly one directory level
///
/// Versions, bundle names and projects are joined onto the store root, so
/// separators and `.`/`..` are rejected.
pub fn check_path_component(what: &str, value: &str) -> Result<()> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
        || value.chars().any(std::path::is_separator);
    if bad {
        return Err(config::invalid(format!(
            "{} '{}' must be a single path component",
            what, value
        )));
    }
    Ok(())
}

/// Load the bundle manifest stored in `workdir`
pub fn load_bundle_manifest(workdir: &Path) -> Result<BundleManifest> {
    load_yaml(&manifest_path(workdir))
}

/// Write the bundle manifest into `workdir`
pub fn write_bundle_manifest(workdir: &Path, doc: &BundleManifest) -> Result<()> {
    write_yaml(&manifest_path(workdir), doc)
}

/// Load the job manifest stored in `workdir`
pub fn load_job_manifest(workdir: &Path) -> Result<JobManifest> {
    load_yaml(&manifest_path(workdir))
}

/// Status of an existing job manifest, or `None` when there is none yet
pub fn existing_job_status(workdir: &Path) -> Result<Option<Status>> {
    let path = manifest_path(workdir);
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(load_job_manifest(workdir)?.status))
}

/// Write the job manifest into `workdir`, refusing to replace a terminal one
pub fn write_job_manifest(workdir: &Path, doc: &JobManifest) -> Result<()> {
    match existing_job_status(workdir)? {
        Some(status) if status.is_terminal() => {
            return Err(MlboxError::ManifestImmutable {
                path: manifest_path(workdir).display().to_string(),
                status: status.to_string(),
            });
        }
        _ => {}
    }
    write_yaml(&manifest_path(workdir), doc)
}

/// Generate a fresh version identifier for `name`.
///
/// The identifier is the hex BLAKE3 digest of the name, the wall clock, the
/// process id and a process-wide counter, truncated to 40 characters.
pub fn generate_version(name: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_le_bytes()
            .as_slice(),
    );
    hasher.update(&std::process::id().to_le_bytes());
    hasher.update(&COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());

    let hex = hasher.finalize().to_hex();
    hex.as_str()[..VERSION_LEN].to_string()
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(manifest::missing(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| fs::read_failed(path, e))?;

    serde_yaml::from_str(&content)
        .map_err(|e| manifest::parse_failed(path.display().to_string(), e.to_string()))
}

fn write_yaml<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let content = serde_yaml::to_string(doc)
        .map_err(|e| manifest::write_failed(path.display().to_string(), e.to_string()))?;

    let dir = path
        .parent()
        .ok_or_else(|| manifest::write_failed(path.display().to_string(), "no parent directory"))?;
    std::fs::create_dir_all(dir).map_err(|e| fs::write_failed(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| manifest::write_failed(path.display().to_string(), e.to_string()))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| manifest::write_failed(path.display().to_string(), e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| manifest::write_failed(path.display().to_string(), e.to_string()))?;

    Ok(())
}
