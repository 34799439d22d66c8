use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, launch, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Launch configurations
        .route("/launch/{key}", put(launch::save_launch))
        .route("/launch/{key}", get(launch::get_launch))
        .route("/launch/{key}/info", get(launch::get_launch_info))
        // Jobs
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{key}", post(jobs::submit_job))
        .route("/jobs/{key}", get(jobs::get_job))
        .route("/jobs/{key}/abort", post(jobs::abort_job))
        .route("/jobs/{key}/ws", get(ws::job_ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
