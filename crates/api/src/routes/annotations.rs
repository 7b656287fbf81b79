//! Route definitions for map annotations.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::annotations;
use crate::state::AppState;

/// Annotation routes, nested under `/annotations`.
///
/// ```text
/// GET    /                  list_annotations
/// POST   /routes            create_route
/// POST   /labels            create_label
/// POST   /circles           create_circle
/// POST   /towers            create_tower
/// POST   /undo              undo_annotation
/// POST   /clear             clear_annotations
/// GET    /{id}              get_annotation
/// PATCH  /{id}              update_annotation
/// DELETE /{id}              delete_annotation
/// GET    /{id}/sectors      tower_sectors
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(annotations::list_annotations))
        .route("/routes", post(annotations::create_route))
        .route("/labels", post(annotations::create_label))
        .route("/circles", post(annotations::create_circle))
        .route("/towers", post(annotations::create_tower))
        .route("/undo", post(annotations::undo_annotation))
        .route("/clear", post(annotations::clear_annotations))
        .route(
            "/{id}",
            get(annotations::get_annotation)
                .patch(annotations::update_annotation)
                .delete(annotations::delete_annotation),
        )
        .route("/{id}/sectors", get(annotations::tower_sectors))
}
