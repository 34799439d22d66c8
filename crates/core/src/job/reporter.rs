//! Per-job publish point.
//!
//! The reporter owns the job's [`JobState`] and its broadcast channel. Stages
//! emit ticks into it through [`ProgressSink`]; polling reads snapshots and
//! push subscribers receive [`JobEvent`]s. State changes and event sends
//! happen under the same lock, so a subscriber either sees a terminal snapshot
//! or receives the closing event.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::metrics;
use crate::progress::{ProgressSink, ProgressTick, Stage};

use super::types::{JobEvent, JobState, JobStatus, JobSummary};

struct Inner {
    state: JobState,
    /// Highest `current` seen per stage.
    high_water: HashMap<Stage, usize>,
}

pub struct JobReporter {
    inner: RwLock<Inner>,
    events: broadcast::Sender<JobEvent>,
}

impl JobReporter {
    pub fn new(key: &str, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            inner: RwLock::new(Inner {
                state: JobState::new(key),
                high_water: HashMap::new(),
            }),
            events,
        }
    }

    pub fn snapshot(&self) -> JobState {
        self.read().state.clone()
    }

    pub fn status(&self) -> JobStatus {
        self.read().state.status
    }

    /// Current snapshot plus a receiver for everything published after it.
    pub fn subscribe(&self) -> (JobState, broadcast::Receiver<JobEvent>) {
        let inner = self.read();
        (inner.state.clone(), self.events.subscribe())
    }

    /// Pending -> Running. Ignored in any other status.
    pub fn mark_running(&self) {
        let mut inner = self.write();
        if inner.state.status != JobStatus::Pending {
            return;
        }
        inner.state.status = JobStatus::Running;
        inner.state.updated_at = Utc::now();
        metrics::JOBS_RUNNING.inc();
    }

    /// Move to a terminal status and publish the closing event.
    ///
    /// Only the first call has any effect.
    pub fn finish(&self, status: JobStatus, summary: Option<JobSummary>, error: Option<String>) {
        debug_assert!(status.is_terminal());
        let mut inner = self.write();
        let state = &mut inner.state;
        if state.status.is_terminal() {
            return;
        }
        if state.status == JobStatus::Running {
            metrics::JOBS_RUNNING.dec();
        }

        let now = Utc::now();
        state.status = status;
        state.summary = summary;
        state.error = error;
        state.updated_at = now;
        state.finished_at = Some(now);

        let elapsed = (now - state.created_at).num_milliseconds().max(0) as f64 / 1000.0;
        metrics::JOBS_FINISHED.with_label_values(&[status.as_str()]).inc();
        metrics::JOB_DURATION
            .with_label_values(&[status.as_str()])
            .observe(elapsed);

        tracing::info!(
            job_key = %state.key,
            status = %status,
            result = %state.result_message(),
            "Job finished"
        );

        // No subscribers is fine.
        let _ = self.events.send(JobEvent::closed(state));
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressSink for JobReporter {
    fn emit(&self, tick: ProgressTick) {
        let mut guard = self.write();
        let inner = &mut *guard;
        if inner.state.status.is_terminal() {
            return;
        }
        let high = inner.high_water.entry(tick.stage).or_insert(0);
        if tick.current < *high {
            tracing::debug!(
                job_key = %inner.state.key,
                stage = %tick.stage,
                current = tick.current,
                "Dropping out-of-order tick"
            );
            return;
        }
        *high = tick.current;

        inner.state.progress = Some(tick.clone());
        inner.state.updated_at = Utc::now();
        let _ = self.events.send(JobEvent::Tick(tick));
    }
}
