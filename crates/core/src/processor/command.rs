//! External-command group processor.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::config::PipelineConfig;
use crate::grouping::ProcessingGroup;

use super::error::GroupProcessingError;
use super::traits::GroupProcessor;
use super::types::{GroupArtifact, GroupContext};

/// Longest stderr excerpt kept on a failed group.
const MAX_STDERR_DETAILS: usize = 2048;

/// Runs the configured pipeline command once per group.
///
/// The command receives the configured arguments followed by the group's item
/// identifiers. It may write its CSV result to `PHENORUN_OUTPUT`; if it does
/// not, whatever it printed on stdout becomes the artifact.
pub struct CommandGroupProcessor {
    config: PipelineConfig,
}

impl CommandGroupProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, group: &ProcessingGroup) -> Vec<String> {
        let mut args = self.config.args.clone();
        args.extend(group.item_ids().map(str::to_string));
        args
    }
}

#[async_trait]
impl GroupProcessor for CommandGroupProcessor {
    fn name(&self) -> &str {
        "command"
    }

    async fn process(
        &self,
        group: &ProcessingGroup,
        ctx: &GroupContext,
    ) -> Result<GroupArtifact, GroupProcessingError> {
        let output_path = ctx.artifact_path(group);
        let artifact = GroupArtifact {
            group_index: group.index,
            group_id: group.id.clone(),
            path: output_path.clone(),
        };

        if !ctx.overwrite && tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            tracing::debug!(
                group_id = %group.id,
                path = %output_path.display(),
                "Reusing existing group artifact"
            );
            return Ok(artifact);
        }

        tokio::fs::create_dir_all(&ctx.work_dir).await?;
        // A stale artifact from an earlier run must not be mistaken for this one.
        if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            tokio::fs::remove_file(&output_path).await?;
        }

        let start = Instant::now();
        let child = Command::new(&self.config.command)
            .args(self.build_args(group))
            .env("PHENORUN_JOB_KEY", &ctx.job_key)
            .env("PHENORUN_GROUP_ID", &group.id)
            .env("PHENORUN_GROUP_INDEX", group.index.to_string())
            .env("PHENORUN_WORK_DIR", &ctx.work_dir)
            .env("PHENORUN_OUTPUT", &output_path)
            .env("PHENORUN_OVERWRITE", if ctx.overwrite { "1" } else { "0" })
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GroupProcessingError::CommandNotFound {
                        command: self.config.command.clone(),
                    }
                } else {
                    GroupProcessingError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GroupProcessingError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let details = stderr.trim();
            let details = (!details.is_empty()).then(|| {
                details
                    .chars()
                    .take(MAX_STDERR_DETAILS)
                    .collect::<String>()
            });
            return Err(GroupProcessingError::failed(
                format!("exit code {:?}", output.status.code()),
                details,
            ));
        }

        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            tokio::fs::write(&output_path, &output.stdout).await?;
        }

        tracing::debug!(
            group_id = %group.id,
            items = group.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Group processed"
        );

        Ok(artifact)
    }
}
