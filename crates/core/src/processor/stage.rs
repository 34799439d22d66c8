//! Bounded parallel dispatch of groups to a [`GroupProcessor`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;

use crate::abort::AbortSignal;
use crate::grouping::ProcessingGroup;
use crate::metrics;
use crate::progress::{ProgressSink, ProgressTick, Stage};

use super::error::GroupProcessingError;
use super::traits::GroupProcessor;
use super::types::{FailedGroup, GroupArtifact, GroupContext, StageOutcome};

type GroupResult = (usize, String, Result<GroupArtifact, GroupProcessingError>);

/// The parallel processing stage of a job.
pub struct ProcessingStage {
    processor: Arc<dyn GroupProcessor>,
    abort: Arc<dyn AbortSignal>,
    workers: usize,
}

impl ProcessingStage {
    /// `workers` is clamped to at least one; callers skip the stage entirely
    /// when processing is disabled.
    pub fn new(
        processor: Arc<dyn GroupProcessor>,
        abort: Arc<dyn AbortSignal>,
        workers: usize,
    ) -> Self {
        Self {
            processor,
            abort,
            workers: workers.max(1),
        }
    }

    /// Process `groups`, keeping at most `workers` calls in flight.
    ///
    /// The abort signal is checked before every dispatch. Once it is raised
    /// nothing new is dispatched, but groups already running are awaited and
    /// still produce ticks. Ticks are emitted from this task in completion
    /// order.
    pub async fn run(
        &self,
        groups: &[ProcessingGroup],
        ctx: &GroupContext,
        sink: &dyn ProgressSink,
    ) -> StageOutcome {
        let total = groups.len();
        let mut outcome = StageOutcome::default();
        let mut tasks: JoinSet<GroupResult> = JoinSet::new();

        tracing::info!(
            job_key = %ctx.job_key,
            groups = total,
            workers = self.workers,
            processor = self.processor.name(),
            "Processing groups"
        );

        for group in groups {
            if tasks.len() >= self.workers {
                if let Some(joined) = tasks.join_next().await {
                    self.collect(joined, &mut outcome, total, ctx, sink);
                }
            }

            if self.abort.is_raised(&ctx.job_key) {
                tracing::info!(
                    job_key = %ctx.job_key,
                    dispatched = outcome.dispatched,
                    "Abort requested, no further groups dispatched"
                );
                outcome.aborted = true;
                break;
            }

            let processor = Arc::clone(&self.processor);
            let group = group.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let result = AssertUnwindSafe(processor.process(&group, &ctx))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(GroupProcessingError::Panicked(panic_message(payload)))
                    });
                (group.index, group.id, result)
            });
            outcome.dispatched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            self.collect(joined, &mut outcome, total, ctx, sink);
        }

        outcome.artifacts.sort_by_key(|a| a.group_index);
        outcome.failed.sort_by_key(|f| f.group_index);
        outcome
    }

    fn collect(
        &self,
        joined: Result<GroupResult, tokio::task::JoinError>,
        outcome: &mut StageOutcome,
        total: usize,
        ctx: &GroupContext,
        sink: &dyn ProgressSink,
    ) {
        let (index, group_id, result) = match joined {
            Ok(r) => r,
            Err(e) => {
                // Panics are caught inside the task; this only happens when
                // the runtime is shutting down.
                tracing::error!(job_key = %ctx.job_key, error = %e, "Group task did not finish");
                return;
            }
        };

        match result {
            Ok(artifact) => {
                metrics::GROUPS_PROCESSED.with_label_values(&["success"]).inc();
                outcome.completed += 1;
                outcome.artifacts.push(artifact);
            }
            Err(e) => {
                metrics::GROUPS_PROCESSED.with_label_values(&["failure"]).inc();
                tracing::warn!(
                    job_key = %ctx.job_key,
                    group_id = %group_id,
                    error = %e,
                    "Group processing failed"
                );
                outcome.failed.push(FailedGroup {
                    group_index: index,
                    group_id,
                    error: e.to_string(),
                });
            }
        }

        sink.emit(ProgressTick::new(Stage::Processing, outcome.finished(), total));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
