//! Byte transfer between the local store and a remote store
//!
//! The sync engine only plans; a [`Transport`] moves bytes. [`FsTransport`]
//! mirrors bundles into a plain directory laid out as:
//!
//! ```text
//! <remote>/
//! ├── objects/<hash[0..2]>/<hash>
//! └── bundles/<project>/<name>/<version>/
//!     ├── _manifest.yaml
//!     └── archive.meta_tar
//! ```

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::descriptor::{FileDescriptor, FileType};
use crate::content::{hash_file, short_name};
use crate::error::{MlboxError, Result, fs, manifest, sync};
use crate::manifest::MANIFEST_FILE;
use crate::progress::TransferProgress;
use crate::tabular::BundleId;

const OBJECTS_DIR: &str = "objects";
const BUNDLES_DIR: &str = "bundles";

/// Direction of a transfer, seen from the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

/// What a transfer did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Files copied
    pub files: usize,
    /// Bytes copied
    pub bytes: u64,
    /// Blobs already present at the destination
    pub skipped: usize,
}

/// Moves planned files and the bundle manifest
pub trait Transport {
    /// Move every descriptor in `files` in the given direction
    fn transfer(
        &mut self,
        bundle: &BundleId,
        files: &[FileDescriptor],
        direction: Direction,
    ) -> Result<TransferSummary>;

    /// Fetch the remote manifest of `bundle` into `workdir`
    fn pull_manifest(&mut self, bundle: &BundleId, workdir: &Path) -> Result<()>;

    /// Publish the manifest in `workdir` as the remote manifest of `bundle`
    fn push_manifest(&mut self, bundle: &BundleId, workdir: &Path) -> Result<()>;
}

/// Transport into a mirror directory on a mounted filesystem
#[derive(Debug, Clone)]
pub struct FsTransport {
    remote_root: PathBuf,
    show_progress: bool,
}

impl FsTransport {
    pub fn new(remote_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: remote_root.into(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Remote location of a blob
    pub fn object_path(&self, hash: &str) -> PathBuf {
        self.remote_root
            .join(OBJECTS_DIR)
            .join(short_name(hash, 2))
            .join(hash)
    }

    /// Remote directory of a bundle version
    pub fn bundle_dir(&self, bundle: &BundleId) -> PathBuf {
        self.remote_root
            .join(BUNDLES_DIR)
            .join(&bundle.project)
            .join(&bundle.name)
            .join(&bundle.version)
    }

    fn upload_one(&self, bundle: &BundleId, file: &FileDescriptor) -> Result<bool> {
        match file.file_type {
            FileType::Data => {
                let dest = self.object_path(&file.signature);
                if has_size(&dest, file.size) {
                    return Ok(false);
                }
                copy_atomic(&file.path, &dest, &file.name)?;
            }
            FileType::SrcTar => {
                let dest = self.bundle_dir(bundle).join(&file.name);
                copy_atomic(&file.path, &dest, &file.name)?;
            }
        }
        Ok(true)
    }

    fn download_one(&self, bundle: &BundleId, file: &FileDescriptor) -> Result<bool> {
        match file.file_type {
            FileType::Data => {
                if has_size(&file.path, file.size) {
                    return Ok(false);
                }
                let src = self.object_path(&file.signature);
                copy_verified(&src, &file.path, file)?;
            }
            FileType::SrcTar => {
                let src = self.bundle_dir(bundle).join(&file.name);
                copy_atomic(&src, &file.path, &file.name)?;
            }
        }
        Ok(true)
    }
}

impl Transport for FsTransport {
    fn transfer(
        &mut self,
        bundle: &BundleId,
        files: &[FileDescriptor],
        direction: Direction,
    ) -> Result<TransferSummary> {
        let total: u64 = files.iter().map(|f| f.size).sum();
        let progress = TransferProgress::new(total, self.show_progress);
        let mut summary = TransferSummary::default();

        for file in files {
            progress.start_file(&file.name);
            let copied = match direction {
                Direction::Upload => self.upload_one(bundle, file),
                Direction::Download => self.download_one(bundle, file),
            };
            let copied = match copied {
                Ok(copied) => copied,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };

            if copied {
                summary.files += 1;
                summary.bytes += file.size;
            } else {
                tracing::debug!("{} already present, skipping", file.name);
                summary.skipped += 1;
            }
            progress.finish_file(file.size);
        }

        progress.finish();
        tracing::info!(
            "{} {}: {} files, {} bytes, {} skipped",
            direction,
            bundle,
            summary.files,
            summary.bytes,
            summary.skipped
        );
        Ok(summary)
    }

    fn pull_manifest(&mut self, bundle: &BundleId, workdir: &Path) -> Result<()> {
        let src = self.bundle_dir(bundle).join(MANIFEST_FILE);
        if !src.is_file() {
            return Err(manifest::missing(src.display().to_string()));
        }
        copy_atomic(&src, &workdir.join(MANIFEST_FILE), MANIFEST_FILE)
    }

    fn push_manifest(&mut self, bundle: &BundleId, workdir: &Path) -> Result<()> {
        let src = workdir.join(MANIFEST_FILE);
        if !src.is_file() {
            return Err(manifest::missing(src.display().to_string()));
        }
        copy_atomic(&src, &self.bundle_dir(bundle).join(MANIFEST_FILE), MANIFEST_FILE)
    }
}

fn has_size(path: &Path, size: u64) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() == size)
}

fn temp_beside(dest: &Path, name: &str) -> Result<NamedTempFile> {
    let dir = dest
        .parent()
        .ok_or_else(|| sync::transfer_failed(name, "destination has no parent directory"))?;
    std::fs::create_dir_all(dir).map_err(|e| fs::write_failed(dir, e))?;
    NamedTempFile::new_in(dir).map_err(|e| sync::transfer_failed(name, e.to_string()))
}

/// Copy through a temp file so readers never see a partial destination
fn copy_atomic(src: &Path, dest: &Path, name: &str) -> Result<()> {
    let mut reader = File::open(src).map_err(|e| sync::transfer_failed(name, e.to_string()))?;
    let mut tmp = temp_beside(dest, name)?;
    std::io::copy(&mut reader, tmp.as_file_mut())
        .map_err(|e| sync::transfer_failed(name, e.to_string()))?;
    tmp.persist(dest)
        .map_err(|e| sync::transfer_failed(name, e.to_string()))?;
    Ok(())
}

/// Copy a blob and check its digest before it becomes visible
fn copy_verified(src: &Path, dest: &Path, file: &FileDescriptor) -> Result<()> {
    let mut reader =
        File::open(src).map_err(|e| sync::transfer_failed(&file.name, e.to_string()))?;
    let mut tmp = temp_beside(dest, &file.name)?;
    std::io::copy(&mut reader, tmp.as_file_mut())
        .map_err(|e| sync::transfer_failed(&file.name, e.to_string()))?;

    let actual = hash_file(tmp.path())?;
    if actual != file.signature {
        return Err(MlboxError::HashMismatch {
            name: file.name.clone(),
            expected: file.signature.clone(),
            actual,
        });
    }

    tmp.persist(dest)
        .map_err(|e| sync::transfer_failed(&file.name, e.to_string()))?;
    Ok(())
}
