//! Launch configuration handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use phenorun_core::{LaunchConfiguration, LaunchDigest, LaunchStore};

use super::handlers::error_response;
use super::jobs::{job_error_response, launch_error_status};
use crate::state::AppState;

/// Store the launch configuration for `key`, replacing any previous one.
///
/// Refused with 409 while a job for `key` is pending or running.
pub async fn save_launch(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(config): Json<LaunchConfiguration>,
) -> Result<Json<LaunchConfiguration>, impl IntoResponse> {
    match state.runner().save_launch(&key, &config) {
        Ok(()) => {
            tracing::info!(job_key = %key, items = config.items.len(), "Launch configuration saved");
            Ok(Json(config))
        }
        Err(e) => Err(job_error_response(&e)),
    }
}

/// Read back the stored launch configuration for `key`.
pub async fn get_launch(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<LaunchConfiguration>, impl IntoResponse> {
    state
        .launch_store()
        .load(&key)
        .map(Json)
        .map_err(|e| error_response(launch_error_status(&e), e.to_string()))
}

/// Digest of the stored configuration for `key`: observation and unique
/// value counts, plus the options the job would run with.
pub async fn get_launch_info(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<LaunchDigest>, impl IntoResponse> {
    state
        .launch_store()
        .load(&key)
        .map(|config| Json(config.digest()))
        .map_err(|e| error_response(launch_error_status(&e), e.to_string()))
}
