//! Trait definitions for the processor module.

use async_trait::async_trait;

use crate::grouping::ProcessingGroup;

use super::error::GroupProcessingError;
use super::types::{GroupArtifact, GroupContext};

/// The external per-group pipeline.
///
/// Implementations turn one group into one mergeable artifact. The job runner
/// never looks inside the artifact beyond handing it to the merger.
#[async_trait]
pub trait GroupProcessor: Send + Sync {
    /// Returns the name of this processor implementation.
    fn name(&self) -> &str;

    /// Process `group`, writing its artifact under `ctx.work_dir`.
    async fn process(
        &self,
        group: &ProcessingGroup,
        ctx: &GroupContext,
    ) -> Result<GroupArtifact, GroupProcessingError>;
}
