//! Types for the job runner.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::abort::AbortError;
use crate::launch::LaunchError;
use crate::processor::FailedGroup;
use crate::progress::ProgressTick;

/// Status message of a job that finished normally.
pub const MSG_COMPLETED: &str = "Task completed!";
/// Status message of a job stopped by an abort request.
pub const MSG_ABORTED: &str = "Task aborted!";
/// Status message of a job whose configuration lists no items.
pub const MSG_NO_ITEMS: &str = "No items in task";

/// Errors returned by the job runner.
#[derive(Debug, Error)]
pub enum JobError {
    /// A job for this key is pending or running.
    #[error("job already running: {0}")]
    AlreadyRunning(String),

    /// No job is known for this key.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The job already reached a terminal status.
    #[error("job {key} is not running (status: {status})")]
    NotRunning { key: String, status: JobStatus },

    #[error("launch configuration error: {0}")]
    Launch(#[from] LaunchError),

    #[error("abort signal error: {0}")]
    Abort(#[from] AbortError),
}

/// Lifecycle of a job. Terminal states are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Aborted,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the optional annotation stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnnotationStatus {
    #[default]
    Skipped,
    Written { path: PathBuf, rows: usize },
    Failed { reason: String },
}

/// Aggregated result of a run, attached to the terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub groups_total: usize,
    pub groups_dispatched: usize,
    pub groups_completed: usize,
    pub failed_groups: Vec<FailedGroup>,
    pub annotation: AnnotationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<PathBuf>,
    /// Merged result file, when the merge ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_output: Option<PathBuf>,
    pub artifacts_merged: usize,
    pub message: String,
}

/// Snapshot of one job, as served to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub key: String,
    /// Distinguishes successive runs of the same key.
    pub run_id: Uuid,
    pub status: JobStatus,
    /// Latest progress tick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressTick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            run_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: None,
            summary: None,
            error: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Short human-readable result: the summary message, else the error.
    pub fn result_message(&self) -> String {
        self.summary
            .as_ref()
            .map(|s| s.message.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

/// Event pushed to live subscribers of a job.
///
/// Serializes to either `{stage, current, total, message?}` or
/// `{closed: true, status, result}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobEvent {
    Closed(ClosedEvent),
    Tick(ProgressTick),
}

/// Final event of a job stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedEvent {
    pub closed: bool,
    pub status: JobStatus,
    pub result: String,
}

impl JobEvent {
    pub fn closed(state: &JobState) -> Self {
        JobEvent::Closed(ClosedEvent {
            closed: true,
            status: state.status,
            result: state.result_message(),
        })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, JobEvent::Closed(_))
    }
}
