pub mod annotations;
pub mod document;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /annotations                         list (GET)
/// /annotations/routes                  create route (POST)
/// /annotations/labels                  create label (POST)
/// /annotations/circles                 create circle (POST)
/// /annotations/towers                  create tower (POST)
/// /annotations/undo                    remove most recent (POST)
/// /annotations/clear                   remove all (POST)
/// /annotations/{id}                    get, update (PATCH), delete
/// /annotations/{id}/sectors            tower geometry (?radius_m)
///
/// /document                            rendered map document (GET, text/html)
/// /document/save                       write timestamped copy (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/annotations", annotations::router())
        .nest("/document", document::router())
}
