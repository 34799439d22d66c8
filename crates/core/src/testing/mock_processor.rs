//! Mock group processor for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::abort::AbortSignal;
use crate::grouping::ProcessingGroup;
use crate::processor::{GroupArtifact, GroupContext, GroupProcessingError, GroupProcessor};

/// Mock implementation of the GroupProcessor trait.
///
/// Provides controllable behavior for testing:
/// - Simulated processing time
/// - Failures, panics or mismatched artifact headers for chosen group ids
/// - Raising the abort marker after a number of completed calls
/// - Tracking of calls and peak concurrency
///
/// Successful calls write a small CSV artifact (`group_id,items`) to the
/// conventional artifact path.
#[derive(Default)]
pub struct MockGroupProcessor {
    delay: Option<Duration>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    odd_header: HashSet<String>,
    abort_after: Option<(Arc<dyn AbortSignal>, String, usize)>,
    calls: AtomicUsize,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    processed: Mutex<Vec<String>>,
}

/// Decrements the in-flight counter even when the call panics.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockGroupProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long in every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the group with this id.
    pub fn fail_group(mut self, group_id: impl Into<String>) -> Self {
        self.failing.insert(group_id.into());
        self
    }

    /// Panic while processing the group with this id.
    pub fn panic_on_group(mut self, group_id: impl Into<String>) -> Self {
        self.panicking.insert(group_id.into());
        self
    }

    /// Write the artifact of this group with a header the others do not share.
    pub fn mismatched_header_on_group(mut self, group_id: impl Into<String>) -> Self {
        self.odd_header.insert(group_id.into());
        self
    }

    /// Raise the abort marker for `key` when the `n`th call finishes.
    pub fn raise_abort_after(
        mut self,
        abort: Arc<dyn AbortSignal>,
        key: impl Into<String>,
        n: usize,
    ) -> Self {
        self.abort_after = Some((abort, key.into(), n));
        self
    }

    /// Number of calls started.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls seen in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Ids of successfully processed groups, in completion order.
    pub fn processed_groups(&self) -> Vec<String> {
        self.processed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl GroupProcessor for MockGroupProcessor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn process(
        &self,
        group: &ProcessingGroup,
        ctx: &GroupContext,
    ) -> Result<GroupArtifact, GroupProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.panicking.contains(&group.id) {
            panic!("mock panic for group {}", group.id);
        } else if self.failing.contains(&group.id) {
            Err(GroupProcessingError::failed(
                format!("mock failure for group {}", group.id),
                None,
            ))
        } else {
            let path = ctx.artifact_path(group);
            tokio::fs::create_dir_all(&ctx.work_dir).await?;
            let header = if self.odd_header.contains(&group.id) {
                "group_id,count"
            } else {
                "group_id,items"
            };
            tokio::fs::write(&path, format!("{}\n{},{}\n", header, group.id, group.len()))
                .await?;
            self.processed
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(group.id.clone());
            Ok(GroupArtifact {
                group_index: group.index,
                group_id: group.id.clone(),
                path,
            })
        };

        let finished = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((abort, key, n)) = &self.abort_after {
            if finished == *n {
                let _ = abort.raise(key);
            }
        }

        result
    }
}
