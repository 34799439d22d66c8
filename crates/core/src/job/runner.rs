//! Job registry and submission.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::config::JobsConfig;
use crate::launch::{check_job_key, LaunchConfiguration, LaunchStore};
use crate::metrics;
use crate::processor::GroupProcessor;

use super::reporter::JobReporter;
use super::task::JobTask;
use super::types::{JobError, JobEvent, JobState, JobStatus};

/// Runs jobs and keeps their states queryable.
///
/// One job per key may be active at a time. Terminal states stay in the
/// registry for `retention_secs`, then [`JobRunner::sweep_expired`] drops them.
pub struct JobRunner {
    store: Arc<dyn LaunchStore>,
    abort: Arc<dyn AbortSignal>,
    processor: Arc<dyn GroupProcessor>,
    data_dir: PathBuf,
    config: JobsConfig,
    jobs: RwLock<HashMap<String, Arc<JobReporter>>>,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn LaunchStore>,
        abort: Arc<dyn AbortSignal>,
        processor: Arc<dyn GroupProcessor>,
        data_dir: impl Into<PathBuf>,
        config: JobsConfig,
    ) -> Self {
        Self {
            store,
            abort,
            processor,
            data_dir: data_dir.into(),
            config,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// The launch configuration store jobs are loaded from.
    pub fn store(&self) -> &Arc<dyn LaunchStore> {
        &self.store
    }

    /// Start a job for `key` from its stored launch configuration.
    ///
    /// Returns the initial (pending) state. A terminal job under the same key
    /// is replaced. Must be called from within a tokio runtime.
    pub fn submit(&self, key: &str) -> Result<JobState, JobError> {
        self.start(key, None)
    }

    /// Save `config` for `key`, then submit it.
    ///
    /// Refuses before touching the store when a job for `key` is active.
    pub fn submit_with(
        &self,
        key: &str,
        config: &LaunchConfiguration,
    ) -> Result<JobState, JobError> {
        self.start(key, Some(config))
    }

    /// Store `config` for `key` without starting a job.
    ///
    /// Refused while a job for `key` is active.
    pub fn save_launch(&self, key: &str, config: &LaunchConfiguration) -> Result<(), JobError> {
        let jobs = self.write_jobs();
        ensure_idle(&jobs, key)?;
        self.store.save(key, config)?;
        Ok(())
    }

    fn start(
        &self,
        key: &str,
        config: Option<&LaunchConfiguration>,
    ) -> Result<JobState, JobError> {
        check_job_key(key)?;

        // Saves and submissions for a key serialize on the registry lock.
        let (reporter, launch) = {
            let mut jobs = self.write_jobs();
            ensure_idle(&jobs, key)?;
            if let Some(config) = config {
                self.store.save(key, config)?;
            }
            // A stale abort must not pre-empt the new run.
            self.abort.clear(key)?;

            let launch = self.store.load(key);
            let reporter = Arc::new(JobReporter::new(key, self.config.event_buffer));
            jobs.insert(key.to_string(), Arc::clone(&reporter));
            (reporter, launch)
        };

        metrics::JOBS_SUBMITTED.inc();
        let state = reporter.snapshot();
        info!(job_key = %key, run_id = %state.run_id, "Job submitted");

        let task = JobTask {
            key: key.to_string(),
            abort: Arc::clone(&self.abort),
            processor: Arc::clone(&self.processor),
            data_dir: self.data_dir.clone(),
            reporter: Arc::clone(&reporter),
        };
        tokio::spawn(async move {
            if AssertUnwindSafe(task.run(launch)).catch_unwind().await.is_err() {
                reporter.finish(
                    JobStatus::Failed,
                    None,
                    Some("job task panicked".to_string()),
                );
            }
        });

        Ok(state)
    }

    /// Snapshot of the job for `key`.
    pub fn status(&self, key: &str) -> Result<JobState, JobError> {
        self.reporter(key).map(|r| r.snapshot())
    }

    /// All known jobs, oldest first.
    pub fn list(&self) -> Vec<JobState> {
        let mut states: Vec<JobState> = self
            .read_jobs()
            .values()
            .map(|r| r.snapshot())
            .collect();
        states.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.key.cmp(&b.key)));
        states
    }

    /// Raise the abort marker for an active job.
    ///
    /// The job notices at its next checkpoint; groups already in flight
    /// finish normally.
    pub fn request_abort(&self, key: &str) -> Result<JobState, JobError> {
        let reporter = self.reporter(key)?;
        let status = reporter.status();
        if status.is_terminal() {
            return Err(JobError::NotRunning {
                key: key.to_string(),
                status,
            });
        }
        self.abort.raise(key)?;
        info!(job_key = %key, "Abort requested");
        Ok(reporter.snapshot())
    }

    /// Current snapshot and a receiver for later events of the job.
    pub fn subscribe(
        &self,
        key: &str,
    ) -> Result<(JobState, broadcast::Receiver<JobEvent>), JobError> {
        self.reporter(key).map(|r| r.subscribe())
    }

    /// Drop terminal jobs older than the retention period. Returns how many.
    pub fn sweep_expired(&self) -> usize {
        let retention = chrono::Duration::seconds(
            i64::try_from(self.config.retention_secs).unwrap_or(i64::MAX),
        );
        let now = Utc::now();
        let mut jobs = self.write_jobs();
        let before = jobs.len();
        jobs.retain(|_, reporter| {
            let state = reporter.snapshot();
            match state.finished_at {
                Some(finished) if state.status.is_terminal() => now - finished < retention,
                _ => true,
            }
        });
        let removed = before - jobs.len();
        if removed > 0 {
            debug!(removed, "Swept expired jobs");
        }
        removed
    }

    /// Periodically sweep expired jobs until the runner is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let runner = Arc::downgrade(self);
        let period = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                match runner.upgrade() {
                    Some(runner) => {
                        runner.sweep_expired();
                    }
                    None => break,
                }
            }
        })
    }

    /// Raise abort for every active job. Returns the keys signalled.
    pub fn abort_all(&self) -> Vec<String> {
        let active: Vec<String> = self
            .read_jobs()
            .iter()
            .filter(|(_, r)| !r.status().is_terminal())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &active {
            if let Err(e) = self.abort.raise(key) {
                warn!(job_key = %key, error = %e, "Failed to raise abort");
            }
        }
        active
    }

    /// Wait until no job is active, up to `timeout`. Returns true if idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.active_count() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Number of pending or running jobs.
    pub fn active_count(&self) -> usize {
        self.read_jobs()
            .values()
            .filter(|r| !r.status().is_terminal())
            .count()
    }

    fn reporter(&self, key: &str) -> Result<Arc<JobReporter>, JobError> {
        self.read_jobs()
            .get(key)
            .cloned()
            .ok_or_else(|| JobError::NotFound(key.to_string()))
    }

    fn read_jobs(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<JobReporter>>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_jobs(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<JobReporter>>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Refuse when a pending or running job holds `key`.
fn ensure_idle(jobs: &HashMap<String, Arc<JobReporter>>, key: &str) -> Result<(), JobError> {
    match jobs.get(key) {
        Some(existing) if !existing.status().is_terminal() => {
            Err(JobError::AlreadyRunning(key.to_string()))
        }
        _ => Ok(()),
    }
}
