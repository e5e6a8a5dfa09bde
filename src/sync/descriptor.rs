//! Transfer planning: which files make up a bundle
//!
//! Enumeration reads the bundle manifest once, up front, so a missing or
//! malformed manifest fails before anything is planned. The returned
//! iterators are lazy; clone one before iterating to enumerate again.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::content::{BUNDLE_DATA_DIR, SignatureEntry, StoreLayout, hash_file};
use crate::error::{MlboxError, Result, fs, manifest};
use crate::manifest::load_bundle_manifest;

/// Archived metadata shipped next to every bundle's blobs
pub const ARCHIVED_META_FNAME: &str = "archive.meta_tar";

/// Metadata archive names, in transfer order
pub const META_FILES: &[&str] = &[ARCHIVED_META_FNAME];

/// Kind of file being transferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Content-addressed blob
    Data,
    /// Metadata archive, not content-addressed
    SrcTar,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Data => f.write_str("data"),
            FileType::SrcTar => f.write_str("src_tar"),
        }
    }
}

/// One unit of transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Local file location (source on upload, destination on download)
    pub path: PathBuf,
    /// Short display name; the short hash for data files
    pub name: String,
    pub size: u64,
    pub file_type: FileType,
    /// Full content hash, empty for metadata archives
    pub signature: String,
}

impl FileDescriptor {
    fn data(layout: &StoreLayout, path: PathBuf, entry: &SignatureEntry) -> Self {
        Self {
            path,
            name: layout.short_name(&entry.hash).to_string(),
            size: entry.size,
            file_type: FileType::Data,
            signature: entry.hash.clone(),
        }
    }

    fn meta(path: PathBuf, name: &str, size: u64) -> Self {
        Self {
            path,
            name: name.to_string(),
            size,
            file_type: FileType::SrcTar,
            signature: String::new(),
        }
    }
}

/// Files to push for a local bundle: its blobs, then its metadata archives
#[derive(Debug, Clone)]
pub struct UploadFiles {
    workdir: PathBuf,
    layout: StoreLayout,
    entries: std::vec::IntoIter<SignatureEntry>,
    meta: std::slice::Iter<'static, &'static str>,
}

/// Plan the upload of the bundle in `workdir`
pub fn enumerate_upload_files(layout: &StoreLayout, workdir: &Path) -> Result<UploadFiles> {
    let doc = load_bundle_manifest(workdir)?;
    Ok(UploadFiles {
        workdir: workdir.to_path_buf(),
        layout: layout.clone(),
        entries: doc.signature.into_iter(),
        meta: META_FILES.iter(),
    })
}

impl Iterator for UploadFiles {
    type Item = Result<FileDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.entries.next() {
            let path = self.layout.bundle_data_path(&self.workdir, &entry.hash);
            return Some(Ok(FileDescriptor::data(&self.layout, path, &entry)));
        }

        let name = self.meta.next()?;
        let path = self.workdir.join(name);
        Some(match std::fs::metadata(&path) {
            Ok(meta) => Ok(FileDescriptor::meta(path, name, meta.len())),
            Err(_) => Err(fs::not_found(&path)),
        })
    }
}

/// Files to fetch for a remote bundle whose manifest is already in `workdir`
///
/// Each data descriptor points at the blob's place in the shared object store;
/// yielding it also links `<workdir>/data/<short>` to that place.
#[derive(Debug, Clone)]
pub struct DownloadFiles {
    workdir: PathBuf,
    layout: StoreLayout,
    entries: std::vec::IntoIter<SignatureEntry>,
    meta: std::slice::Iter<'static, &'static str>,
    failed: bool,
}

/// Plan the download of the bundle whose manifest sits in `workdir`
pub fn enumerate_download_files(layout: &StoreLayout, workdir: &Path) -> Result<DownloadFiles> {
    let data_dir = workdir.join(BUNDLE_DATA_DIR);
    std::fs::create_dir_all(&data_dir).map_err(|e| fs::write_failed(&data_dir, e))?;

    let doc = load_bundle_manifest(workdir)?;
    if let Some(entry) = doc
        .signature
        .iter()
        .find(|entry| entry.algorithm != layout.hash_algorithm)
    {
        return Err(manifest::unsupported_algorithm(
            &entry.algorithm,
            &layout.hash_algorithm,
        ));
    }

    Ok(DownloadFiles {
        workdir: workdir.to_path_buf(),
        layout: layout.clone(),
        entries: doc.signature.into_iter(),
        meta: META_FILES.iter(),
        failed: false,
    })
}

impl DownloadFiles {
    fn plan_blob(&self, entry: &SignatureEntry) -> Result<FileDescriptor> {
        let dest = self.layout.object_path(&entry.hash);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| fs::write_failed(parent, e))?;
        }

        let link = self.layout.bundle_data_path(&self.workdir, &entry.hash);
        link_blob(&link, &dest, entry)?;

        Ok(FileDescriptor::data(&self.layout, dest, entry))
    }
}

impl Iterator for DownloadFiles {
    type Item = Result<FileDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if let Some(entry) = self.entries.next() {
            let planned = self.plan_blob(&entry);
            self.failed = planned.is_err();
            return Some(planned);
        }

        let name = self.meta.next()?;
        Some(Ok(FileDescriptor::meta(self.workdir.join(name), name, 0)))
    }
}

/// Point `link` at `target`, replacing a link that points elsewhere
///
/// A regular file already at `link` is never deleted: if its content matches
/// `entry` it moves into the object store, otherwise linking fails.
fn link_blob(link: &Path, target: &Path, entry: &SignatureEntry) -> Result<()> {
    if let Ok(meta) = std::fs::symlink_metadata(link) {
        if meta.file_type().is_symlink() {
            if std::fs::read_link(link).is_ok_and(|current| current == target) {
                return Ok(());
            }
            std::fs::remove_file(link).map_err(|e| link_failed(link, target, e))?;
        } else {
            adopt_blob(link, target, entry)?;
        }
    }

    symlink(target, link).map_err(|e| link_failed(link, target, e))
}

/// Move a bundle's own copy of a blob into the object store
fn adopt_blob(local: &Path, target: &Path, entry: &SignatureEntry) -> Result<()> {
    let actual = hash_file(local)?;
    if actual != entry.hash {
        return Err(link_failed(
            local,
            target,
            format!("existing file has hash {}, expected {}", actual, entry.hash),
        ));
    }

    if target.is_file() {
        let stored = hash_file(target)?;
        if stored != entry.hash {
            return Err(link_failed(
                local,
                target,
                format!("stored object has hash {}, expected {}", stored, entry.hash),
            ));
        }
        std::fs::remove_file(local).map_err(|e| link_failed(local, target, e))?;
    } else {
        std::fs::rename(local, target).map_err(|e| link_failed(local, target, e))?;
    }

    tracing::debug!("adopted {} into the object store", local.display());
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

fn link_failed(link: &Path, target: &Path, reason: impl fmt::Display) -> MlboxError {
    MlboxError::LinkFailed {
        link: link.display().to_string(),
        target: target.display().to_string(),
        reason: reason.to_string(),
    }
}
