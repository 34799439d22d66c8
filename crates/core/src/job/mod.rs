//! Job orchestration.
//!
//! A job turns a stored [`LaunchConfiguration`](crate::launch::LaunchConfiguration)
//! into a run of ordered stages:
//!
//! 1. **Group build**: items are partitioned into processing groups
//! 2. **Annotation** (optional): a CSV summary of the groups, failure is not fatal
//! 3. **Processing**: groups go to the [`GroupProcessor`](crate::processor::GroupProcessor)
//!    in parallel, bounded by the configured thread count
//! 4. **Merge**: per-group artifacts are concatenated into the final result
//!
//! The abort marker is checked after the group build, after the annotation,
//! before every group dispatch and before the merge. Progress ticks go to a
//! per-job [`JobReporter`], which serves polling snapshots and a broadcast
//! stream of [`JobEvent`]s.

mod reporter;
mod runner;
mod task;
mod types;

pub use reporter::JobReporter;
pub use runner::JobRunner;
pub use types::{
    AnnotationStatus, ClosedEvent, JobError, JobEvent, JobState, JobStatus, JobSummary,
    MSG_ABORTED, MSG_COMPLETED, MSG_NO_ITEMS,
};
