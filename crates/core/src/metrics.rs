//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job runner (submissions, terminal outcomes, durations)
//! - Processing stage (groups by result)
//! - Annotation and merge stages

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs submitted since startup.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("phenorun_jobs_submitted_total", "Total jobs submitted").unwrap()
});

/// Jobs currently running.
pub static JOBS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("phenorun_jobs_running", "Number of jobs currently running").unwrap()
});

/// Jobs finished by terminal status.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("phenorun_jobs_finished_total", "Jobs reaching a terminal status"),
        &["status"], // "completed", "aborted", "failed"
    )
    .unwrap()
});

/// Job duration in seconds, from start to terminal status.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("phenorun_job_duration_seconds", "Duration of a job run")
            .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0]),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Stage Metrics
// =============================================================================

/// Groups processed by result.
pub static GROUPS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("phenorun_groups_processed_total", "Groups handed to the pipeline"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Groups built per job.
pub static GROUPS_PER_JOB: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("phenorun_groups_per_job", "Number of groups built per job")
            .buckets(vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]),
        &[],
    )
    .unwrap()
});

/// Annotation file generation by result.
pub static ANNOTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("phenorun_annotations_total", "Annotation file generations"),
        &["result"], // "written", "failed"
    )
    .unwrap()
});

/// Merge operations by result.
pub static MERGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("phenorun_merges_total", "Result merge operations"),
        &["result"], // "success", "failure", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_RUNNING.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOB_DURATION.clone()),
        // Stages
        Box::new(GROUPS_PROCESSED.clone()),
        Box::new(GROUPS_PER_JOB.clone()),
        Box::new(ANNOTATIONS_TOTAL.clone()),
        Box::new(MERGES_TOTAL.clone()),
    ]
}
