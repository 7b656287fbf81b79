use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Number of annotations in the current session.
    pub annotations: usize,
    /// Map file the session was opened from, if any.
    pub source: Option<String>,
    /// Backing JSON file of the annotation store, if any.
    pub backing_file: Option<String>,
}

/// GET /health -- returns service status and session size.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = state.session.lock().await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        annotations: session.store().len(),
        source: session.source_path().map(|p| p.display().to_string()),
        backing_file: session
            .store()
            .backing_path()
            .map(|p| p.display().to_string()),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
