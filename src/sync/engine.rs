//! Bundle synchronization between the local store and a remote store
//!
//! Every sync runs in the same order:
//! 1. replicate metadata rows (local → remote on upload, remote → local on download)
//! 2. plan the file list from the manifest
//! 3. hand the whole plan to the transport
//!
//! Planning completes before the transport sees a single descriptor, so a
//! bundle is either fully planned or not transferred at all.

use std::path::Path;

use super::descriptor::{
    DownloadFiles, FileDescriptor, UploadFiles, enumerate_download_files, enumerate_upload_files,
};
use super::transport::{Direction, TransferSummary, Transport};
use crate::content::StoreLayout;
use crate::error::{MlboxError, Result, sync};
use crate::tabular::{BundleId, ChannelGuard, RowChannelProvider, StoreLocation, replicate};

/// Which bundle to move and between which projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub name: String,
    pub version: String,
    pub local_project: String,
    pub remote_project: String,
    pub remote_instance: String,
}

impl SyncRequest {
    pub fn local_bundle(&self) -> BundleId {
        BundleId::new(&self.local_project, &self.name, &self.version)
    }

    pub fn remote_bundle(&self) -> BundleId {
        BundleId::new(&self.remote_project, &self.name, &self.version)
    }

    pub fn remote_location(&self) -> StoreLocation {
        StoreLocation::Remote {
            instance: self.remote_instance.clone(),
        }
    }
}

/// Outcome of an upload or download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Metadata rows replicated
    pub rows: usize,
    /// Files planned, including metadata archives
    pub planned: usize,
    pub transfer: TransferSummary,
}

/// Plans and drives bundle syncs over an injected row provider and transport
pub struct BundleSyncEngine<P, T> {
    layout: StoreLayout,
    rows: P,
    transport: T,
}

impl<P, T> BundleSyncEngine<P, T>
where
    P: RowChannelProvider,
    T: Transport,
{
    pub fn new(layout: StoreLayout, rows: P, transport: T) -> Self {
        Self {
            layout,
            rows,
            transport,
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn rows(&self) -> &P {
        &self.rows
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Plan the upload of the local bundle in `workdir`
    pub fn enumerate_upload_files(&self, workdir: &Path) -> Result<UploadFiles> {
        enumerate_upload_files(&self.layout, workdir)
    }

    /// Plan the download of the bundle whose manifest is in `workdir`
    pub fn enumerate_download_files(&self, workdir: &Path) -> Result<DownloadFiles> {
        enumerate_download_files(&self.layout, workdir)
    }

    /// Replicate the local table of the bundle into the remote store
    pub fn sync_rows_before_upload(&self, request: &SyncRequest) -> Result<usize> {
        tracing::info!(
            "dump bundle rows from local to {}",
            request.remote_location()
        );
        self.sync_rows(
            (&request.local_bundle(), &StoreLocation::Local),
            (&request.remote_bundle(), &request.remote_location()),
        )
    }

    /// Replicate the remote table of the bundle into the local store
    pub fn sync_rows_before_download(&self, request: &SyncRequest) -> Result<usize> {
        tracing::info!(
            "load bundle rows from {} to local",
            request.remote_location()
        );
        self.sync_rows(
            (&request.remote_bundle(), &request.remote_location()),
            (&request.local_bundle(), &StoreLocation::Local),
        )
    }

    fn sync_rows(
        &self,
        (src_bundle, src_location): (&BundleId, &StoreLocation),
        (dst_bundle, dst_location): (&BundleId, &StoreLocation),
    ) -> Result<usize> {
        let mut source = ChannelGuard::open(&self.rows, src_bundle, src_location)?;
        let mut dest = ChannelGuard::open(&self.rows, dst_bundle, dst_location)?;

        let copied = replicate(source.channel(), dest.channel())
            .map_err(|e| match e {
                MlboxError::RowSyncFailed { .. } => e,
                other => sync::rows_failed(src_bundle.to_string(), other.to_string()),
            })?;

        source.finish()?;
        dest.finish()?;

        tracing::debug!("replicated {} rows {} -> {}", copied, src_location, dst_location);
        Ok(copied)
    }

    /// Push the local bundle in `workdir` to the remote store
    pub fn upload(&mut self, request: &SyncRequest, workdir: &Path) -> Result<SyncReport> {
        let rows = self.sync_rows_before_upload(request)?;

        let files: Vec<FileDescriptor> =
            self.enumerate_upload_files(workdir)?.collect::<Result<_>>()?;

        let remote = request.remote_bundle();
        let transfer = self
            .transport
            .transfer(&remote, &files, Direction::Upload)?;
        self.transport.push_manifest(&remote, workdir)?;

        Ok(SyncReport {
            rows,
            planned: files.len(),
            transfer,
        })
    }

    /// Fetch the remote bundle into `workdir`
    pub fn download(&mut self, request: &SyncRequest, workdir: &Path) -> Result<SyncReport> {
        let rows = self.sync_rows_before_download(request)?;

        let remote = request.remote_bundle();
        self.transport.pull_manifest(&remote, workdir)?;

        let files: Vec<FileDescriptor> = self
            .enumerate_download_files(workdir)?
            .collect::<Result<_>>()?;

        let transfer = self
            .transport
            .transfer(&remote, &files, Direction::Download)?;

        Ok(SyncReport {
            rows,
            planned: files.len(),
            transfer,
        })
    }
}
