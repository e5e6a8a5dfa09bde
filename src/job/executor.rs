//! Evaluation job executor
//!
//! `run` validates the request, drives the stages in order and finalizes the
//! job manifest on every exit path:
//!
//! ```text
//! validate ─► prepare workdir ─► extract model ─► extract runtime ─► run eval job
//!    │              │                  │                 │                 │
//!    │              └──────────────────┴───── error ─────┴─────────────────┤
//!    ▼                                                                     ▼
//!  Err (nothing written)                                  finalize: write manifest
//! ```
//!
//! Stage errors are recorded in the manifest and then returned to the caller.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::collaborators::{BundleExtractor, CommandRunner, EvalHandler, EvalRequest, RuntimeStore};
use super::container::{ContainerCommand, ContainerCommandBuilder};
use super::{MODEL_DESCRIPTOR, MODEL_SUBDIR, STATUS_DIR, STATUS_FILE, SUCCESS_TOKEN};
use crate::config::ClientConfig;
use crate::error::{MlboxError, Result, config, fs, job};
use crate::manifest::{self, JobManifest, Status, TaskKind};
use crate::progress::StageProgress;

/// The fixed stages of a job run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrepareWorkdir,
    ExtractModel,
    ExtractRuntime,
    RunEvalJob,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::PrepareWorkdir,
        Stage::ExtractModel,
        Stage::ExtractRuntime,
        Stage::RunEvalJob,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::PrepareWorkdir => "prepare workdir",
            Stage::ExtractModel => "extract model",
            Stage::ExtractRuntime => "extract runtime",
            Stage::RunEvalJob => "run eval job",
        }
    }

    /// Share of the progress bar
    pub fn weight(self) -> u64 {
        match self {
            Stage::PrepareWorkdir => 5,
            Stage::ExtractModel => 15,
            Stage::ExtractRuntime => 15,
            Stage::RunEvalJob => 70,
        }
    }
}

/// Operating system and architecture of the machine running the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl HostPlatform {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    /// macOS on Apple silicon cannot host evaluation containers
    pub fn supports_containers(self) -> bool {
        !(self.os == "macos" && self.arch == "aarch64")
    }
}

/// What to evaluate and how
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub project: String,
    pub project_dir: PathBuf,
    pub model_ref: String,
    pub dataset_refs: Vec<String>,
    pub runtime_ref: Option<String>,
    /// Reuse this version instead of generating one
    pub version: Option<String>,
    pub name: String,
    pub description: String,
    /// Print the container command without running it
    pub gencmd: bool,
    pub use_container: bool,
    pub show_progress: bool,
}

/// Collaborators a job run delegates to
pub struct JobBackends {
    pub extractor: Box<dyn BundleExtractor>,
    pub runtime: Option<Box<dyn RuntimeStore>>,
    pub handler: Box<dyn EvalHandler>,
    pub runner: Box<dyn CommandRunner>,
}

/// Runs one evaluation job version and records its outcome
pub struct JobExecutor {
    config: ClientConfig,
    options: JobOptions,
    backends: JobBackends,
    version: String,
    workdir: PathBuf,
    model_dir: Option<PathBuf>,
    runtime_dir: Option<PathBuf>,
    last_command: Option<ContainerCommand>,
    manifest: JobManifest,
}

impl JobExecutor {
    pub fn new(config: ClientConfig, options: JobOptions, backends: JobBackends) -> Result<Self> {
        Self::with_platform(config, options, backends, HostPlatform::current())
    }

    /// Like [`JobExecutor::new`], on an explicit host platform
    pub fn with_platform(
        config: ClientConfig,
        options: JobOptions,
        backends: JobBackends,
        platform: HostPlatform,
    ) -> Result<Self> {
        if options.use_container && !platform.supports_containers() {
            return Err(config::unsupported_platform(format!(
                "container backend on {} ({})",
                platform.os, platform.arch
            )));
        }

        let version = match options.version.as_deref().filter(|v| !v.is_empty()) {
            Some(version) => {
                manifest::check_path_component("job version", version)?;
                version.to_string()
            }
            None => {
                let version = manifest::generate_version(&options.name);
                tracing::info!("[step:init] eval job version is {}", version);
                version
            }
        };
        let workdir = config.job_workdir(&options.project_dir, &version);
        let manifest = JobManifest::new(&version);

        Ok(Self {
            config,
            options,
            backends,
            version,
            workdir,
            model_dir: None,
            runtime_dir: None,
            last_command: None,
            manifest,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn manifest(&self) -> &JobManifest {
        &self.manifest
    }

    /// Container command of the last container run, if any
    pub fn last_command(&self) -> Option<&ContainerCommand> {
        self.last_command.as_ref()
    }

    /// Run the job and return its version
    ///
    /// Configuration errors are returned before anything touches the disk.
    /// Once stages start, the manifest is always written; a stage error is
    /// returned after it has been recorded.
    pub fn run(&mut self, kind: TaskKind, step: &str, task_index: u32) -> Result<String> {
        self.validate(kind, step)?;

        self.manifest.task_kind = Some(kind);
        self.manifest.status = Status::Running;
        let (step, task_index) = match kind {
            TaskKind::All => (String::new(), 0),
            TaskKind::Single => {
                self.manifest.step = Some(step.to_string());
                self.manifest.task_index = Some(task_index);
                (step.to_string(), task_index)
            }
        };

        let outcome = self.run_stages(kind, &step, task_index);
        if let Err(e) = &outcome {
            let message = match e {
                MlboxError::StageFailed { source, .. } => source.to_string(),
                other => other.to_string(),
            };
            self.manifest.status = Status::Failed;
            self.manifest.error_message = Some(message);
        }

        let finalized = self.finalize(outcome.is_ok());
        match (outcome, finalized) {
            (Ok(()), Ok(())) => Ok(self.version.clone()),
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(fin)) => Err(fin),
            (Err(e), Err(fin)) => {
                tracing::error!("job {} failed: {}", self.version, e);
                Err(fin)
            }
        }
    }

    fn validate(&self, kind: TaskKind, step: &str) -> Result<()> {
        if kind != TaskKind::All && step.trim().is_empty() {
            return Err(config::invalid(format!("task kind '{}' requires a step", kind)));
        }
        if self.options.use_container {
            if self.options.runtime_ref.is_none() || self.backends.runtime.is_none() {
                return Err(config::invalid("container backend requires a runtime"));
            }
            if self.options.dataset_refs.is_empty() {
                return Err(config::invalid("container backend requires a dataset"));
            }
        }

        match manifest::existing_job_status(&self.workdir)? {
            Some(status) if status.is_terminal() => Err(config::invalid(format!(
                "job version {} already finished with status '{}'",
                self.version, status
            ))),
            _ => Ok(()),
        }
    }

    fn run_stages(&mut self, kind: TaskKind, step: &str, task_index: u32) -> Result<()> {
        let total = Stage::ALL.iter().map(|s| s.weight()).sum();
        let progress = StageProgress::new("eval run", total, self.options.show_progress);

        for stage in Stage::ALL {
            progress.begin(stage.label());
            tracing::info!("[step:{}] {}", stage.label(), self.version);

            let result = match stage {
                Stage::PrepareWorkdir => self.prepare_workdir(),
                Stage::ExtractModel => self.extract_model(),
                Stage::ExtractRuntime => self.extract_runtime(),
                Stage::RunEvalJob => self.run_eval_job(kind, step, task_index),
            };
            if let Err(e) = result {
                progress.abandon();
                return Err(job::stage_failed(stage.label(), e));
            }
            progress.complete(stage.weight());
        }

        progress.finish();
        Ok(())
    }

    fn prepare_workdir(&mut self) -> Result<()> {
        let model = self.workdir.join(MODEL_SUBDIR);
        std::fs::create_dir_all(&model).map_err(|e| fs::write_failed(&model, e))?;
        tracing::debug!("eval workdir: {}", self.workdir.display());
        Ok(())
    }

    fn extract_model(&mut self) -> Result<()> {
        let candidate = Path::new(&self.options.model_ref);
        let dir = if !self.options.use_container
            && candidate.is_dir()
            && candidate.join(MODEL_DESCRIPTOR).is_file()
        {
            candidate.to_path_buf()
        } else {
            self.backends.extractor.extract(&self.options.model_ref)?
        };

        self.manifest.model_dir = dir.display().to_string();
        self.model_dir = Some(dir);
        Ok(())
    }

    fn extract_runtime(&mut self) -> Result<()> {
        self.runtime_dir = match (&self.backends.runtime, self.options.use_container) {
            (Some(runtime), true) => Some(runtime.extract()?),
            _ => None,
        };
        Ok(())
    }

    fn run_eval_job(&mut self, kind: TaskKind, step: &str, task_index: u32) -> Result<()> {
        let model_dir = self
            .model_dir
            .clone()
            .ok_or_else(|| config::invalid("model was not extracted"))?;

        if !self.options.use_container {
            let request = EvalRequest {
                project: self.options.project.clone(),
                version: self.version.clone(),
                task_kind: kind,
                model_dir,
                workdir: self.workdir.clone(),
                dataset_refs: self.options.dataset_refs.clone(),
                step: step.to_string(),
                task_index,
            };
            return self.backends.handler.invoke(&request);
        }

        let runtime = self
            .backends
            .runtime
            .as_ref()
            .ok_or_else(|| config::invalid("container backend requires a runtime"))?;
        let builder = ContainerCommandBuilder {
            version: self.version.clone(),
            project: self.options.project.clone(),
            project_dir: self.options.project_dir.clone(),
            workdir: self.workdir.clone(),
            datastore_dir: self.config.datastore_dir.clone(),
            model_dir,
            runtime_dir: self.runtime_dir.clone().unwrap_or_default(),
            instance_uri: self.config.instance_uri.clone(),
            dataset_uri: self.options.dataset_refs.first().cloned().unwrap_or_default(),
            base_image: runtime.base_image()?,
            host_pip_cache_dir: self.config.host_pip_cache_dir.clone(),
            package_index: self.config.package_index.clone(),
            gencmd: self.options.gencmd,
        };
        let command = builder.build(kind, step, task_index);
        tracing::info!("{} container command: {}", kind, command.shell_line());
        tracing::info!("eval run:{} dir @ {}", kind, self.workdir.display());

        let result = if self.options.gencmd {
            Ok(())
        } else {
            self.execute(&command)
        };
        self.last_command = Some(command);
        result
    }

    fn execute(&mut self, command: &ContainerCommand) -> Result<()> {
        if let Some(pull) = &command.pull {
            self.backends.runner.run(pull)?;
        }
        self.backends.runner.run(&command.run)
    }

    /// Settle the terminal status and write the manifest
    fn finalize(&mut self, stages_ok: bool) -> Result<()> {
        let status = if stages_ok && task_succeeded(&self.workdir) {
            Status::Success
        } else {
            Status::Failed
        };

        self.manifest.name = self.options.name.clone();
        self.manifest.description = self.options.description.clone();
        self.manifest.model_ref = self.options.model_ref.clone();
        self.manifest.dataset_refs = self.options.dataset_refs.clone();
        self.manifest.runtime_ref = self.options.runtime_ref.clone();
        self.manifest.status = status;
        self.manifest.finished_at = Some(Utc::now());

        manifest::write_job_manifest(&self.workdir, &self.manifest)?;
        tracing::info!("job {} finished: {}", self.version, status);
        Ok(())
    }
}

/// A task succeeded when its status marker holds the success token
fn task_succeeded(task_dir: &Path) -> bool {
    let marker = task_dir.join(STATUS_DIR).join(STATUS_FILE);
    match std::fs::read_to_string(&marker) {
        Ok(content) => content.trim() == SUCCESS_TOKEN,
        Err(_) => {
            tracing::warn!("status marker missing: {}", marker.display());
            false
        }
    }
}
