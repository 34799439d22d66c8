//! The sequence of stages run for one job.

use std::path::PathBuf;
use std::sync::Arc;

use crate::abort::AbortSignal;
use crate::annotation::write_annotation_csv;
use crate::grouping::{GroupBuild, GroupingOptions, ProcessingGroup};
use crate::launch::{LaunchConfiguration, LaunchError};
use crate::merger::merge_artifacts;
use crate::metrics;
use crate::processor::{GroupContext, GroupProcessor, ProcessingStage, StageOutcome};
use crate::progress::{ProgressSink, ProgressTick, Stage};

use super::reporter::JobReporter;
use super::types::{
    AnnotationStatus, JobStatus, JobSummary, MSG_ABORTED, MSG_COMPLETED, MSG_NO_ITEMS,
};

/// Subdirectory of the output folder holding per-group artifacts.
const PARTIALS_DIR: &str = "partials";

/// Everything one job run needs, owned by its task.
pub(crate) struct JobTask {
    pub key: String,
    pub abort: Arc<dyn AbortSignal>,
    pub processor: Arc<dyn GroupProcessor>,
    pub data_dir: PathBuf,
    pub reporter: Arc<JobReporter>,
}

/// Why a running job stopped before completing.
enum Halt {
    Aborted,
    Failed(String),
}

impl JobTask {
    /// Run the job on the configuration snapshot taken at submission.
    pub async fn run(self, launch: Result<LaunchConfiguration, LaunchError>) {
        let config = match launch {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(job_key = %self.key, error = %e, "Cannot load launch configuration");
                self.reporter
                    .finish(JobStatus::Failed, None, Some(e.to_string()));
                return;
            }
        };

        self.reporter.mark_running();
        tracing::info!(
            job_key = %self.key,
            items = config.items.len(),
            thread_count = config.thread_count,
            series = config.generate_series_id,
            "Job started"
        );

        let mut summary = JobSummary::default();
        match self.execute(&config, &mut summary).await {
            Ok(message) => {
                summary.message = message.to_string();
                self.reporter
                    .finish(JobStatus::Completed, Some(summary), None);
            }
            Err(Halt::Aborted) => {
                summary.message = MSG_ABORTED.to_string();
                self.reporter
                    .finish(JobStatus::Aborted, Some(summary), None);
            }
            Err(Halt::Failed(error)) => {
                tracing::error!(job_key = %self.key, error = %error, "Job failed");
                summary.message = error.clone();
                self.reporter
                    .finish(JobStatus::Failed, Some(summary), Some(error));
            }
        }
    }

    async fn execute(
        &self,
        config: &LaunchConfiguration,
        summary: &mut JobSummary,
    ) -> Result<&'static str, Halt> {
        let output_folder = config.output_folder(&self.data_dir);
        std::fs::create_dir_all(&output_folder).map_err(|e| {
            Halt::Failed(format!(
                "cannot create output folder {}: {}",
                output_folder.display(),
                e
            ))
        })?;
        summary.output_folder = Some(output_folder.clone());

        let groups = self.build_groups(config);
        summary.groups_total = groups.len();
        if groups.is_empty() {
            return Ok(MSG_NO_ITEMS);
        }
        self.checkpoint("group build")?;

        if config.build_annotation_csv {
            summary.annotation =
                self.annotate(&groups, config.annotation_path(&output_folder));
            self.checkpoint("annotation")?;
        }

        let outcome = if config.processing_enabled() {
            let ctx = GroupContext {
                job_key: self.key.clone(),
                work_dir: output_folder.join(PARTIALS_DIR),
                overwrite: config.overwrite,
            };
            ProcessingStage::new(
                Arc::clone(&self.processor),
                Arc::clone(&self.abort),
                config.thread_count,
            )
            .run(&groups, &ctx, self.reporter.as_ref())
            .await
        } else {
            tracing::info!(job_key = %self.key, "Processing disabled, thread count is 0");
            StageOutcome::default()
        };

        summary.groups_dispatched = outcome.dispatched;
        summary.groups_completed = outcome.completed;
        summary.failed_groups = outcome.failed.clone();
        if outcome.aborted {
            return Err(Halt::Aborted);
        }
        self.checkpoint("processing")?;

        if outcome.artifacts.is_empty() {
            metrics::MERGES_TOTAL.with_label_values(&["skipped"]).inc();
            tracing::info!(job_key = %self.key, "No group artifacts, merge skipped");
            return Ok(MSG_COMPLETED);
        }

        let output_path = config.merged_output_path(&output_folder);
        let artifacts = outcome.artifacts;
        let total = artifacts.len();
        let merge_path = output_path.clone();
        let merged = tokio::task::spawn_blocking(move || merge_artifacts(&artifacts, &merge_path))
            .await
            .map_err(|e| Halt::Failed(format!("merge task failed: {}", e)))?
            .map_err(|e| {
                metrics::MERGES_TOTAL.with_label_values(&["failure"]).inc();
                Halt::Failed(format!("merge failed: {}", e))
            })?;

        metrics::MERGES_TOTAL.with_label_values(&["success"]).inc();
        self.reporter
            .emit(ProgressTick::new(Stage::Merge, merged, total).with_message("Results merged"));
        summary.merged_output = Some(output_path);
        summary.artifacts_merged = merged;

        Ok(MSG_COMPLETED)
    }

    fn build_groups(&self, config: &LaunchConfiguration) -> Vec<ProcessingGroup> {
        let mut build = GroupBuild::new(config.items.clone(), GroupingOptions::from(config));
        for tick in build.by_ref() {
            self.reporter.emit(tick);
        }
        let groups = build.into_groups();
        metrics::GROUPS_PER_JOB
            .with_label_values(&[])
            .observe(groups.len() as f64);
        tracing::debug!(job_key = %self.key, groups = groups.len(), "Groups built");
        groups
    }

    /// Annotation failures are recorded, never fatal.
    fn annotate(&self, groups: &[ProcessingGroup], path: PathBuf) -> AnnotationStatus {
        self.reporter.emit(
            ProgressTick::new(Stage::Annotation, 0, 1).with_message("Building annotation file..."),
        );
        let status = match write_annotation_csv(groups, &path) {
            Ok(rows) => {
                metrics::ANNOTATIONS_TOTAL.with_label_values(&["written"]).inc();
                AnnotationStatus::Written { path, rows }
            }
            Err(e) => {
                metrics::ANNOTATIONS_TOTAL.with_label_values(&["failed"]).inc();
                tracing::warn!(
                    job_key = %self.key,
                    path = %path.display(),
                    error = %e,
                    "Annotation file generation failed"
                );
                AnnotationStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        let message = match status {
            AnnotationStatus::Failed { .. } => "Annotation file failed",
            _ => "Annotation file ready",
        };
        self.reporter
            .emit(ProgressTick::new(Stage::Annotation, 1, 1).with_message(message));
        status
    }

    fn checkpoint(&self, after: &str) -> Result<(), Halt> {
        if self.abort.is_raised(&self.key) {
            tracing::info!(job_key = %self.key, checkpoint = after, "Abort observed");
            return Err(Halt::Aborted);
        }
        Ok(())
    }
}
