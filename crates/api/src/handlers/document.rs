//! Handlers for the map document itself.

use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Saved file names: `map_edited_<UTC timestamp with milliseconds>.html`,
/// with a numeric suffix if that name is already taken.
const SAVED_PREFIX: &str = "map_edited_";
const SAVED_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Result of a save.
#[derive(Debug, Serialize)]
pub struct SavedDocument {
    pub path: String,
    pub annotations: usize,
}

/// GET /document
///
/// The map document with the current annotations embedded.
pub async fn render_document(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let session = state.session.lock().await;
    let rendered = session.render()?;
    Ok(Html(rendered))
}

/// POST /document/save
///
/// Write the rendered document to a new timestamped file in the output
/// directory.
pub async fn save_document(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    // Saves are serialized by the session lock.
    let session = state.session.lock().await;

    let stamp = chrono::Utc::now().format(SAVED_TIMESTAMP_FORMAT).to_string();
    let path = unused_path(&state.config.output_dir, &stamp);
    session.save_as(&path)?;

    let saved = SavedDocument {
        path: path.display().to_string(),
        annotations: session.store().len(),
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data: saved })))
}

fn unused_path(dir: &Path, stamp: &str) -> PathBuf {
    let mut path = dir.join(format!("{SAVED_PREFIX}{stamp}.html"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{SAVED_PREFIX}{stamp}_{n}.html"));
        n += 1;
    }
    path
}
