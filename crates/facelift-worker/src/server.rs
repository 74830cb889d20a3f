//! HTTP job-serving surface.
//!
//! The job server posts jobs to `POST /run` and receives the handler's
//! response body verbatim. `GET /health` is a liveness probe.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use facelift_models::{Job, JobResponse};

use crate::handler::JobHandler;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub handler: JobHandler,
}

/// Create the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/run", post(run_job))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run one job synchronously and return its response.
async fn run_job(State(state): State<AppState>, Json(job): Json<Job>) -> Json<JobResponse> {
    Json(state.handler.handle(&job).await)
}

/// Health response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: String,
}

/// Health check endpoint (liveness probe).
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
