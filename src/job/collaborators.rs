//! Collaborators driven by the job executor
//!
//! The executor only sequences work. Materializing bundles, describing the
//! runtime, running the evaluation and spawning processes are delegated to the
//! traits below. The concrete types work on plain directories and child
//! processes, which is all the command line needs.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{Result, config, job, manifest};
use crate::manifest::{MANIFEST_FILE, TaskKind};

/// Materializes a bundle reference into a directory
pub trait BundleExtractor {
    fn extract(&self, reference: &str) -> Result<PathBuf>;
}

/// Runtime a container job runs in
pub trait RuntimeStore {
    /// Image the container is started from
    fn base_image(&self) -> Result<String>;

    /// Directory holding the runtime manifest and its dependencies
    fn extract(&self) -> Result<PathBuf>;
}

/// Arguments of one host-mode evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRequest {
    pub project: String,
    pub version: String,
    pub task_kind: TaskKind,
    pub model_dir: PathBuf,
    pub workdir: PathBuf,
    pub dataset_refs: Vec<String>,
    /// Empty for `all` runs
    pub step: String,
    /// Zero for `all` runs
    pub task_index: u32,
}

/// Runs an evaluation on the host
pub trait EvalHandler {
    fn invoke(&mut self, request: &EvalRequest) -> Result<()>;
}

/// Runs an argument vector to completion
pub trait CommandRunner {
    fn run(&mut self, argv: &[String]) -> Result<()>;
}

/// Resolves references to already extracted directories
///
/// A reference naming an existing directory is used as is; anything else is
/// looked up relative to `root`.
#[derive(Debug, Clone)]
pub struct DirectoryExtractor {
    root: PathBuf,
}

impl DirectoryExtractor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BundleExtractor for DirectoryExtractor {
    fn extract(&self, reference: &str) -> Result<PathBuf> {
        let direct = Path::new(reference);
        let candidate = if direct.is_dir() {
            direct.to_path_buf()
        } else {
            self.root.join(reference)
        };

        if !candidate.is_dir() {
            return Err(job::extract_failed(
                reference,
                format!("no extracted directory at {}", candidate.display()),
            ));
        }
        dunce::canonicalize(&candidate).map_err(|e| job::extract_failed(reference, e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RuntimeManifest {
    base_image: String,
}

/// Runtime backed by an extracted runtime directory
#[derive(Debug, Clone)]
pub struct DirectoryRuntime {
    dir: PathBuf,
}

impl DirectoryRuntime {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn manifest(&self) -> Result<RuntimeManifest> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(manifest::missing(path.display().to_string()));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| manifest::parse_failed(path.display().to_string(), e.to_string()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| manifest::parse_failed(path.display().to_string(), e.to_string()))
    }
}

impl RuntimeStore for DirectoryRuntime {
    fn base_image(&self) -> Result<String> {
        let image = self.manifest()?.base_image;
        if image.trim().is_empty() {
            return Err(config::invalid(format!(
                "runtime at {} declares no base image",
                self.dir.display()
            )));
        }
        Ok(image)
    }

    fn extract(&self) -> Result<PathBuf> {
        self.manifest()?;
        dunce::canonicalize(&self.dir)
            .map_err(|e| job::extract_failed(self.dir.display().to_string(), e.to_string()))
    }
}

/// Evaluation handler living in an external program
#[derive(Debug, Clone)]
pub struct ProcessEvalHandler {
    program: PathBuf,
}

impl ProcessEvalHandler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command line flags passed to the handler program
    pub fn args(request: &EvalRequest) -> Vec<String> {
        let mut args = vec![
            "--project".to_string(),
            request.project.clone(),
            "--version".to_string(),
            request.version.clone(),
            "--type".to_string(),
            request.task_kind.to_string(),
            "--model-dir".to_string(),
            request.model_dir.display().to_string(),
            "--workdir".to_string(),
            request.workdir.display().to_string(),
        ];
        for dataset in &request.dataset_refs {
            args.push("--dataset".to_string());
            args.push(dataset.clone());
        }
        if request.task_kind == TaskKind::Single {
            args.push("--step".to_string());
            args.push(request.step.clone());
            args.push("--task-index".to_string());
            args.push(request.task_index.to_string());
        }
        args
    }
}

impl EvalHandler for ProcessEvalHandler {
    fn invoke(&mut self, request: &EvalRequest) -> Result<()> {
        tracing::debug!("invoking handler {}", self.program.display());
        let status = Command::new(&self.program)
            .args(Self::args(request))
            .current_dir(&request.workdir)
            .status()
            .map_err(|e| {
                job::handler_failed(format!("{}: {}", self.program.display(), e))
            })?;

        if !status.success() {
            return Err(job::handler_failed(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }
        Ok(())
    }
}

/// Spawns commands as child processes and waits for them
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, argv: &[String]) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| config::invalid("empty command line"))?;
        let line = argv.join(" ");
        tracing::info!("running: {}", line);

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| job::process_failed(&line, e.to_string()))?;
        if !status.success() {
            return Err(job::process_failed(&line, format!("exited with {}", status)));
        }
        Ok(())
    }
}
