//! Bundle upload and download
//!
//! - [`descriptor`]: planning the files that make up a bundle
//! - [`transport`]: moving planned files and manifests
//! - [`engine`]: row replication plus planning plus transfer

pub mod descriptor;
pub mod engine;
pub mod transport;

pub use descriptor::{
    ARCHIVED_META_FNAME, DownloadFiles, FileDescriptor, FileType, META_FILES, UploadFiles,
    enumerate_download_files, enumerate_upload_files,
};
pub use engine::{BundleSyncEngine, SyncReport, SyncRequest};
pub use transport::{Direction, FsTransport, TransferSummary, Transport};
