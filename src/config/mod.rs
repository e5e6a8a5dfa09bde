//! Client configuration
//!
//! Everything the core reads from the environment is collected here once and
//! passed down explicitly:
//! - `MLBOX_ROOT` - client root directory (defaults to `~/.mlbox`)
//! - `MLBOX_INSTANCE_URI` - instance the client talks to (defaults to `local`)
//! - package index overrides forwarded into containers, see [`PackageIndexEnv`]

pub mod package_index;

pub use package_index::PackageIndexEnv;

use std::path::{Path, PathBuf};

use crate::content::{OBJECT_STORE_DIR, StoreLayout};
use crate::error::{Result, config};
use crate::manifest;

/// Default root directory name under the user's home directory
const ROOT_DIR: &str = ".mlbox";

/// Datastore subdirectory within the root
const DATASTORE_DIR: &str = ".datastore";

/// Host pip cache directory name under the user's cache directory
const HOST_PIP_CACHE_DIR: &str = "mlbox-pip";

/// Instance used when none is configured
pub const LOCAL_INSTANCE: &str = "local";

/// Bundle kind directory for datasets
pub const DATASET_DIR: &str = "dataset";

/// Bundle kind directory for evaluation jobs
pub const EVALUATION_DIR: &str = "evaluation";

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Client root holding projects, object store and datastore
    pub root: PathBuf,
    /// Directory of the tabular datastore
    pub datastore_dir: PathBuf,
    /// Shared content-addressed object store
    pub object_store_dir: PathBuf,
    /// URI of the current instance
    pub instance_uri: String,
    /// Host directory mounted as the pip cache inside containers
    pub host_pip_cache_dir: PathBuf,
    /// Package index overrides forwarded to containers
    pub package_index: PackageIndexEnv,
}

impl ClientConfig {
    /// Configuration rooted at an explicit directory, with no overrides
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            datastore_dir: root.join(DATASTORE_DIR),
            object_store_dir: root.join(OBJECT_STORE_DIR),
            host_pip_cache_dir: root.join(HOST_PIP_CACHE_DIR),
            instance_uri: LOCAL_INSTANCE.to_string(),
            package_index: PackageIndexEnv::default(),
            root,
        }
    }

    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let root = match lookup("MLBOX_ROOT").filter(|v| !v.is_empty()) {
            Some(root) => PathBuf::from(root),
            None => dirs::home_dir()
                .ok_or_else(|| config::invalid("Could not determine home directory"))?
                .join(ROOT_DIR),
        };

        let mut cfg = Self::with_root(root);
        if let Some(cache) = dirs::cache_dir() {
            cfg.host_pip_cache_dir = cache.join(HOST_PIP_CACHE_DIR);
        }
        if let Some(uri) = lookup("MLBOX_INSTANCE_URI").filter(|v| !v.is_empty()) {
            cfg.instance_uri = uri;
        }
        cfg.package_index = PackageIndexEnv::from_vars(&lookup);

        Ok(cfg)
    }

    /// Content-addressed store layout under this root
    pub fn store_layout(&self) -> StoreLayout {
        let mut layout = StoreLayout::new(&self.root);
        layout.object_root = self.object_store_dir.clone();
        layout
    }

    /// Directory of one project
    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    /// Working directory of a dataset bundle version
    pub fn dataset_workdir(&self, project: &str, name: &str, version: &str) -> PathBuf {
        manifest::version_dir(
            &self.project_dir(project).join(DATASET_DIR).join(name),
            version,
        )
    }

    /// Working directory of an evaluation job version
    pub fn job_workdir(&self, project_dir: &Path, version: &str) -> PathBuf {
        manifest::version_dir(&project_dir.join(EVALUATION_DIR), version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_root_override() {
        let cfg = ClientConfig::from_vars(lookup(&[("MLBOX_ROOT", "/srv/mlbox")])).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/srv/mlbox"));
        assert_eq!(cfg.datastore_dir, PathBuf::from("/srv/mlbox/.datastore"));
        assert_eq!(cfg.object_store_dir, PathBuf::from("/srv/mlbox/.objectstore"));
        assert_eq!(cfg.instance_uri, LOCAL_INSTANCE);
    }

    #[test]
    fn test_instance_override() {
        let cfg = ClientConfig::from_vars(lookup(&[
            ("MLBOX_ROOT", "/srv/mlbox"),
            ("MLBOX_INSTANCE_URI", "http://cloud.example:8082"),
        ]))
        .unwrap();
        assert_eq!(cfg.instance_uri, "http://cloud.example:8082");
    }

    #[test]
    fn test_empty_root_falls_back_to_home() {
        let cfg = ClientConfig::from_vars(lookup(&[("MLBOX_ROOT", "")]));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(cfg.unwrap().root, home.join(ROOT_DIR));
        }
    }

    #[test]
    fn test_store_layout_follows_object_store_dir() {
        let mut cfg = ClientConfig::with_root("/r");
        cfg.object_store_dir = PathBuf::from("/mnt/objects");
        assert_eq!(
            cfg.store_layout().object_path("abcdef"),
            PathBuf::from("/mnt/objects/ab/abcdef")
        );
    }

    #[test]
    fn test_workdir_layout() {
        let cfg = ClientConfig::with_root("/r");
        assert_eq!(
            cfg.dataset_workdir("self", "mnist", "gq4wmmrrgezd"),
            PathBuf::from("/r/self/dataset/mnist/gq/gq4wmmrrgezd")
        );
        assert_eq!(
            cfg.job_workdir(Path::new("/r/self"), "mzrgcnrtg"),
            PathBuf::from("/r/self/evaluation/mz/mzrgcnrtg")
        );
    }
}
