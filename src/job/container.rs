//! Container command construction for evaluation jobs

use std::path::PathBuf;

use super::{CNTR_WORKDIR, MODEL_DESCRIPTOR, MODEL_SUBDIR, RUNTIME_DEP_DIR};
use crate::config::{DATASET_DIR, PackageIndexEnv};
use crate::manifest::{MANIFEST_FILE, TaskKind};

const CONTAINER_ENGINE: &str = "docker";

/// Client root as seen from inside the container
const CNTR_CLIENT_ROOT: &str = "/root/.mlbox";

const ENV_INSTANCE_URI: &str = "SW_INSTANCE_URI";
const ENV_PROJECT: &str = "SW_PROJECT";
const ENV_EVAL_VERSION: &str = "SW_EVALUATION_VERSION";
const ENV_DATASET_URI: &str = "SW_DATASET_URI";
const ENV_TASK_STEP: &str = "SW_TASK_STEP";
const ENV_TASK_INDEX: &str = "SW_TASK_INDEX";

/// Argument vectors for one container run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCommand {
    /// Image pull, absent in generate-only mode
    pub pull: Option<Vec<String>>,
    pub run: Vec<String>,
}

impl ContainerCommand {
    /// The run invocation as a single shell line
    pub fn shell_line(&self) -> String {
        self.run
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || "'\"$`\\;&|<>".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Everything a container run binds or forwards
#[derive(Debug, Clone)]
pub struct ContainerCommandBuilder {
    pub version: String,
    pub project: String,
    pub project_dir: PathBuf,
    pub workdir: PathBuf,
    pub datastore_dir: PathBuf,
    pub model_dir: PathBuf,
    pub runtime_dir: PathBuf,
    pub instance_uri: String,
    /// Only the first dataset reaches the container
    pub dataset_uri: String,
    pub base_image: String,
    pub host_pip_cache_dir: PathBuf,
    pub package_index: PackageIndexEnv,
    /// Generate only: no image pull
    pub gencmd: bool,
}

impl ContainerCommandBuilder {
    /// Compose the pull and run invocations for one task
    pub fn build(&self, kind: TaskKind, step: &str, task_index: u32) -> ContainerCommand {
        let cntr_model = format!("{}/{}", CNTR_WORKDIR, MODEL_SUBDIR);

        let mut run: Vec<String> = vec![
            CONTAINER_ENGINE.into(),
            "run".into(),
            "--net=host".into(),
            "--rm".into(),
            "--name".into(),
            format!("{}-{}-{}", self.version, step, task_index),
            "-e".into(),
            "DEBUG=1".into(),
        ];

        let volumes = [
            (
                self.workdir.display().to_string(),
                CNTR_WORKDIR.to_string(),
            ),
            (
                self.project_dir.join(DATASET_DIR).display().to_string(),
                format!("{}/{}/{}", CNTR_CLIENT_ROOT, self.project, DATASET_DIR),
            ),
            (
                self.datastore_dir.display().to_string(),
                format!("{}/.datastore", CNTR_CLIENT_ROOT),
            ),
            (
                self.model_dir.display().to_string(),
                format!("{}/src", cntr_model),
            ),
            (
                self.model_dir.join(MODEL_DESCRIPTOR).display().to_string(),
                format!("{}/{}", cntr_model, MODEL_DESCRIPTOR),
            ),
            (
                self.runtime_dir.join(RUNTIME_DEP_DIR).display().to_string(),
                format!("{}/{}", cntr_model, RUNTIME_DEP_DIR),
            ),
            (
                self.runtime_dir.join(MANIFEST_FILE).display().to_string(),
                format!("{}/{}", cntr_model, MANIFEST_FILE),
            ),
        ];
        for (host, cntr) in volumes {
            push_volume(&mut run, &host, &cntr);
        }

        let entrypoint = match kind {
            TaskKind::All => "run_all",
            TaskKind::Single => {
                push_env(&mut run, ENV_TASK_STEP, step);
                push_env(&mut run, ENV_TASK_INDEX, &task_index.to_string());
                "run_single"
            }
        };

        push_env(&mut run, ENV_INSTANCE_URI, &self.instance_uri);
        push_env(&mut run, ENV_PROJECT, &self.project);
        push_env(&mut run, ENV_EVAL_VERSION, &self.version);
        push_env(&mut run, ENV_DATASET_URI, &self.dataset_uri);

        push_volume(
            &mut run,
            &self.host_pip_cache_dir.display().to_string(),
            self.package_index.container_pip_cache_dir(),
        );
        for (name, value) in self.package_index.env_pairs() {
            push_env(&mut run, name, value);
        }

        run.push(self.base_image.clone());
        run.push(entrypoint.to_string());

        let pull = (!self.gencmd).then(|| {
            vec![
                CONTAINER_ENGINE.to_string(),
                "pull".to_string(),
                self.base_image.clone(),
            ]
        });

        ContainerCommand { pull, run }
    }
}

fn push_volume(cmd: &mut Vec<String>, host: &str, cntr: &str) {
    cmd.push("-v".to_string());
    cmd.push(format!("{}:{}", host, cntr));
}

fn push_env(cmd: &mut Vec<String>, name: &str, value: &str) {
    cmd.push("-e".to_string());
    cmd.push(format!("{}={}", name, value));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ContainerCommandBuilder {
        ContainerCommandBuilder {
            version: "mzrgcnrtg".to_string(),
            project: "self".to_string(),
            project_dir: PathBuf::from("/r/self"),
            workdir: PathBuf::from("/r/self/evaluation/mz/mzrgcnrtg"),
            datastore_dir: PathBuf::from("/r/.datastore"),
            model_dir: PathBuf::from("/models/mnist"),
            runtime_dir: PathBuf::from("/runtimes/pytorch"),
            instance_uri: "local".to_string(),
            dataset_uri: "self/dataset/mnist/v1".to_string(),
            base_image: "ghcr.io/mlbox/runtime:0.3".to_string(),
            host_pip_cache_dir: PathBuf::from("/home/u/.cache/mlbox-pip"),
            package_index: PackageIndexEnv::default(),
            gencmd: false,
        }
    }

    fn has_env(cmd: &[String], entry: &str) -> bool {
        cmd.windows(2).any(|w| w[0] == "-e" && w[1] == entry)
    }

    fn has_volume(cmd: &[String], entry: &str) -> bool {
        cmd.windows(2).any(|w| w[0] == "-v" && w[1] == entry)
    }

    #[test]
    fn test_single_task_sets_task_env_and_entrypoint() {
        let cmd = builder().build(TaskKind::Single, "infer", 2);
        assert!(has_env(&cmd.run, "SW_TASK_STEP=infer"));
        assert!(has_env(&cmd.run, "SW_TASK_INDEX=2"));
        assert_eq!(cmd.run.last().unwrap(), "run_single");
        assert!(cmd.run.contains(&"mzrgcnrtg-infer-2".to_string()));
    }

    #[test]
    fn test_all_tasks_omit_task_env() {
        let cmd = builder().build(TaskKind::All, "", 0);
        assert_eq!(cmd.run.last().unwrap(), "run_all");
        assert!(!cmd.run.iter().any(|a| a.starts_with("SW_TASK_STEP=")));
        assert!(!cmd.run.iter().any(|a| a.starts_with("SW_TASK_INDEX=")));
        assert!(cmd.run.contains(&"mzrgcnrtg--0".to_string()));
    }

    #[test]
    fn test_run_layout() {
        let cmd = builder().build(TaskKind::All, "", 0);
        assert_eq!(&cmd.run[..4], ["docker", "run", "--net=host", "--rm"]);
        assert!(has_env(&cmd.run, "DEBUG=1"));
        assert!(has_volume(&cmd.run, "/r/self/evaluation/mz/mzrgcnrtg:/opt/mlbox"));
        assert!(has_volume(&cmd.run, "/r/self/dataset:/root/.mlbox/self/dataset"));
        assert!(has_volume(&cmd.run, "/r/.datastore:/root/.mlbox/.datastore"));
        assert!(has_volume(&cmd.run, "/models/mnist:/opt/mlbox/model/src"));
        assert!(has_volume(
            &cmd.run,
            "/models/mnist/model.yaml:/opt/mlbox/model/model.yaml"
        ));
        assert!(has_volume(&cmd.run, "/runtimes/pytorch/dep:/opt/mlbox/model/dep"));
        assert!(has_volume(
            &cmd.run,
            "/runtimes/pytorch/_manifest.yaml:/opt/mlbox/model/_manifest.yaml"
        ));
        assert!(has_volume(
            &cmd.run,
            "/home/u/.cache/mlbox-pip:/root/.cache/pip"
        ));
        assert!(has_env(&cmd.run, "SW_INSTANCE_URI=local"));
        assert!(has_env(&cmd.run, "SW_PROJECT=self"));
        assert!(has_env(&cmd.run, "SW_EVALUATION_VERSION=mzrgcnrtg"));
        assert!(has_env(&cmd.run, "SW_DATASET_URI=self/dataset/mnist/v1"));
        assert_eq!(cmd.run[cmd.run.len() - 2], "ghcr.io/mlbox/runtime:0.3");
        assert_eq!(
            cmd.pull,
            Some(vec![
                "docker".to_string(),
                "pull".to_string(),
                "ghcr.io/mlbox/runtime:0.3".to_string()
            ])
        );
    }

    #[test]
    fn test_package_index_forwarded_when_present() {
        let mut b = builder();
        b.package_index = PackageIndexEnv {
            pypi_index_url: Some("https://pypi.internal/simple".to_string()),
            pip_cache_dir: Some("/cache/pip".to_string()),
            ..PackageIndexEnv::default()
        };
        let cmd = b.build(TaskKind::All, "", 0);
        assert!(has_env(&cmd.run, "SW_PYPI_INDEX_URL=https://pypi.internal/simple"));
        assert!(!cmd.run.iter().any(|a| a.starts_with("SW_PYPI_TRUSTED_HOST=")));
        assert!(has_volume(&cmd.run, "/home/u/.cache/mlbox-pip:/cache/pip"));
    }

    #[test]
    fn test_gencmd_skips_pull() {
        let mut b = builder();
        b.gencmd = true;
        let cmd = b.build(TaskKind::All, "", 0);
        assert!(cmd.pull.is_none());
        assert!(cmd.shell_line().starts_with("docker run --net=host --rm --name mzrgcnrtg--0"));
    }

    #[test]
    fn test_shell_line_quotes_spaces() {
        let mut b = builder();
        b.model_dir = PathBuf::from("/my models/mnist");
        let line = b.build(TaskKind::All, "", 0).shell_line();
        assert!(line.contains("'/my models/mnist:/opt/mlbox/model/src'"));
    }
}
