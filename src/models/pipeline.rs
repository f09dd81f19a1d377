//! Pipeline trigger and run-log models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend job that can be started from the admin page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineJob {
    #[default]
    Scripts,
    Analytics,
}

impl PipelineJob {
    pub fn path(&self) -> &'static str {
        match self {
            PipelineJob::Scripts => "/pipeline/run-scripts",
            PipelineJob::Analytics => "/pipeline/run-analytics",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineJob::Scripts => "pipeline scripts",
            PipelineJob::Analytics => "analytics",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Error => "error",
        }
    }
}

/// One entry in the admin run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptLog {
    pub run_id: Uuid,
    pub job: PipelineJob,
    pub timestamp: DateTime<Utc>,
    pub status: RunStatus,
    pub message: String,
}
