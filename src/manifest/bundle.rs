//! Bundle manifest data structure

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;
use crate::content::SignatureEntry;

/// Manifest of a dataset or model bundle
///
/// Fields this client does not interpret are kept in `extra` so a manifest
/// fetched from a remote store is written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Version identifier, fixed at creation
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// One entry per content blob, in bundle order
    #[serde(default)]
    pub signature: Vec<SignatureEntry>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl BundleManifest {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            status: Some(Status::Start),
            created_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Total number of bytes referenced by the signature
    pub fn total_size(&self) -> u64 {
        self.signature.iter().map(|entry| entry.size).sum()
    }
}
