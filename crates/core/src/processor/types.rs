//! Types for the processor module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::grouping::ProcessingGroup;

/// Per-run context handed to every processor call.
#[derive(Debug, Clone)]
pub struct GroupContext {
    /// Job the group belongs to.
    pub job_key: String,
    /// Directory for per-group artifacts.
    pub work_dir: PathBuf,
    /// Reprocess groups whose artifact already exists.
    pub overwrite: bool,
}

impl GroupContext {
    /// Conventional artifact path for `group`: `{work_dir}/{index:05}_{id}.csv`.
    pub fn artifact_path(&self, group: &ProcessingGroup) -> PathBuf {
        let safe_id: String = group
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.work_dir.join(format!("{:05}_{}.csv", group.index, safe_id))
    }
}

/// Output of one successfully processed group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupArtifact {
    pub group_index: usize,
    pub group_id: String,
    pub path: PathBuf,
}

/// A group whose processing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedGroup {
    pub group_index: usize,
    pub group_id: String,
    pub error: String,
}

/// Result of the processing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Groups dispatched to the processor.
    pub dispatched: usize,
    /// Groups that produced an artifact.
    pub completed: usize,
    pub failed: Vec<FailedGroup>,
    /// Dispatch stopped early because the abort marker was raised.
    pub aborted: bool,
    /// Artifacts sorted by group index.
    pub artifacts: Vec<GroupArtifact>,
}

impl StageOutcome {
    /// Groups that finished, successfully or not.
    pub fn finished(&self) -> usize {
        self.completed + self.failed.len()
    }
}
