//! Job API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use phenorun_core::{JobError, JobState, LaunchConfiguration, LaunchError};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobState>,
    pub total: usize,
}

/// HTTP status and body for a runner error.
pub fn job_error_response(err: &JobError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        JobError::AlreadyRunning(_) | JobError::NotRunning { .. } => StatusCode::CONFLICT,
        JobError::NotFound(_) => StatusCode::NOT_FOUND,
        JobError::Launch(e) => launch_error_status(e),
        JobError::Abort(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

pub fn launch_error_status(err: &LaunchError) -> StatusCode {
    match err {
        LaunchError::ConfigurationMissing(_) => StatusCode::NOT_FOUND,
        LaunchError::ConfigurationCorrupt { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LaunchError::Invalid { .. } => StatusCode::BAD_REQUEST,
        LaunchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Start a job for `key`.
///
/// With a body, the launch configuration is saved first; without one the
/// stored configuration is used.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    body: Option<Json<LaunchConfiguration>>,
) -> Result<(StatusCode, Json<JobState>), impl IntoResponse> {
    let result = match body {
        Some(Json(config)) => state.runner().submit_with(&key, &config),
        None => state.runner().submit(&key),
    };
    match result {
        Ok(job) => Ok((StatusCode::ACCEPTED, Json(job))),
        Err(e) => {
            tracing::debug!(job_key = %key, error = %e, "Job submission rejected");
            Err(job_error_response(&e))
        }
    }
}

/// Poll the state of a job.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<JobState>, impl IntoResponse> {
    state
        .runner()
        .status(&key)
        .map(Json)
        .map_err(|e| job_error_response(&e))
}

/// Request cooperative cancellation of a running job.
pub async fn abort_job(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<(StatusCode, Json<JobState>), impl IntoResponse> {
    match state.runner().request_abort(&key) {
        Ok(job) => Ok((StatusCode::ACCEPTED, Json(job))),
        Err(e) => Err(job_error_response(&e)),
    }
}

/// List all known jobs.
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<ListJobsResponse> {
    let jobs = state.runner().list();
    Json(ListJobsResponse {
        total: jobs.len(),
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenorun_core::JobStatus;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (JobError::AlreadyRunning("a".into()), StatusCode::CONFLICT),
            (JobError::NotFound("a".into()), StatusCode::NOT_FOUND),
            (
                JobError::NotRunning {
                    key: "a".into(),
                    status: JobStatus::Completed,
                },
                StatusCode::CONFLICT,
            ),
            (
                JobError::Launch(LaunchError::ConfigurationMissing("a".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                JobError::Launch(LaunchError::Invalid {
                    key: "a".into(),
                    reason: "output_name must be a single path component".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                JobError::Launch(LaunchError::Storage("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let (status, body) = job_error_response(&err);
            assert_eq!(status, expected, "{err}");
            assert_eq!(body.error, err.to_string());
        }
    }
}
