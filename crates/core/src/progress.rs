//! Stage-tagged progress ticks shared by every stage of a job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The ordered phases of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GroupBuild,
    Annotation,
    Processing,
    Merge,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::GroupBuild => "group_build",
            Stage::Annotation => "annotation",
            Stage::Processing => "processing",
            Stage::Merge => "merge",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress update emitted by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTick {
    pub stage: Stage,
    pub current: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressTick {
    pub fn new(stage: Stage, current: usize, total: usize) -> Self {
        Self {
            stage,
            current,
            total,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// True once `current` has reached `total`.
    pub fn is_final(&self) -> bool {
        self.current >= self.total
    }
}

/// Receiver of progress ticks.
///
/// Stages only ever see this trait; the job reporter behind it decides where
/// ticks go.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, tick: ProgressTick);
}

/// Discards every tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _tick: ProgressTick) {}
}
