//! Job manifest data structure

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;
use crate::error::{MlboxError, Result, config};

/// Whether a run executes every step or one identified step/task pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    All,
    Single,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::All => "all",
            TaskKind::Single => "single",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = MlboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskKind::All),
            "single" => Ok(TaskKind::Single),
            _ => Err(config::unsupported_task_kind(s)),
        }
    }
}

/// Outcome record of one evaluation job run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobManifest {
    pub version: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "desc")]
    pub description: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_kind: Option<TaskKind>,

    pub status: Status,

    #[serde(default, rename = "model")]
    pub model_ref: String,

    #[serde(default)]
    pub model_dir: String,

    #[serde(default, rename = "datasets")]
    pub dataset_refs: Vec<String>,

    #[serde(default, rename = "runtime", skip_serializing_if = "Option::is_none")]
    pub runtime_ref: Option<String>,

    /// Only set for single-task runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_index: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobManifest {
    /// A fresh manifest in the `start` state
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            name: String::new(),
            description: String::new(),
            task_kind: None,
            status: Status::Start,
            model_ref: String::new(),
            model_dir: String::new(),
            dataset_refs: Vec::new(),
            runtime_ref: None,
            step: None,
            task_index: None,
            finished_at: None,
            error_message: None,
        }
    }
}
