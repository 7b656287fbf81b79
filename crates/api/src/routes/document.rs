use axum::routing::{get, post};
use axum::Router;

use crate::handlers::document;
use crate::state::AppState;

/// Document routes, nested under `/document`.
///
/// ```text
/// GET    /         render_document
/// POST   /save     save_document
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(document::render_document))
        .route("/save", post(document::save_document))
}
