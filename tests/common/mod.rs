//! Common test utilities for mlbox integration tests

use std::path::{Path, PathBuf};

use mlbox::config::ClientConfig;
use mlbox::content::{SignatureEntry, hash_bytes};
use mlbox::manifest::{BundleManifest, write_bundle_manifest};
use mlbox::sync::ARCHIVED_META_FNAME;
use tempfile::TempDir;

/// A client root plus a remote store directory, both temporary
#[allow(dead_code)]
pub struct TestWorkspace {
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Client root (MLBOX_ROOT)
    pub root: PathBuf,
    /// Remote store directory
    pub remote: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().join("root");
        let remote = temp.path().join("remote");
        std::fs::create_dir_all(&root).expect("Failed to create root directory");
        Self { temp, root, remote }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_root(&self.root)
    }

    /// Lay out a dataset bundle version in the local store and return its workdir
    pub fn create_dataset(&self, project: &str, name: &str, version: &str, blobs: &[&[u8]]) -> PathBuf {
        let cfg = self.config();
        let layout = cfg.store_layout();
        let workdir = cfg.dataset_workdir(project, name, version);
        let data_dir = workdir.join("data");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");

        let mut doc = BundleManifest::new(version);
        for blob in blobs {
            let hash = hash_bytes(blob);
            let path = layout.bundle_data_path(&workdir, &hash);
            std::fs::write(&path, blob).expect("Failed to write blob");
            doc.signature
                .push(SignatureEntry::for_file(&path).expect("Failed to sign blob"));
        }
        write_bundle_manifest(&workdir, &doc).expect("Failed to write manifest");
        std::fs::write(workdir.join(ARCHIVED_META_FNAME), format!("meta of {}", name))
            .expect("Failed to write meta archive");

        workdir
    }

    /// Write a file under the temp directory
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.temp.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    pub fn read_file(&self, path: &Path) -> String {
        std::fs::read_to_string(path).expect("Failed to read file")
    }

    /// Short file names under a bundle's data directory, sorted
    pub fn data_names(workdir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(workdir.join("data"))
            .expect("Failed to list data directory")
            .map(|entry| {
                entry
                    .expect("Failed to read entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_creation() {
        let workspace = TestWorkspace::new();
        assert!(workspace.root.exists());
        assert!(!workspace.remote.exists());
    }

    #[test]
    fn test_create_dataset_layout() {
        let workspace = TestWorkspace::new();
        let workdir = workspace.create_dataset("self", "mnist", "gq4wmmrrgezd", &[b"abc"]);
        assert!(workdir.ends_with("self/dataset/mnist/gq/gq4wmmrrgezd"));
        assert_eq!(TestWorkspace::data_names(&workdir).len(), 1);
        assert!(workdir.join("_manifest.yaml").is_file());
    }
}
