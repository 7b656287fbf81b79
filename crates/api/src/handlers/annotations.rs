//! Handlers for map annotations.
//!
//! Each handler takes the session lock, performs one store operation and
//! returns. Validation and id allocation live in `towermap_core`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use towermap_core::annotation::{
    validate_radius, AnnotationPatch, NewAnnotation, NewCircle, NewLabel, NewRoute, NewTower,
    Shape,
};
use towermap_core::error::CoreError;
use towermap_core::sectors;
use towermap_core::types::AnnotationId;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
   Query parameters
   -------------------------------------------------------------------------- */

/// Optional radius override for previewing tower geometry.
#[derive(Debug, Deserialize)]
pub struct SectorParams {
    pub radius_m: Option<f64>,
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// GET /annotations
///
/// All annotations in insertion order.
pub async fn list_annotations(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let session = state.session.lock().await;
    let annotations = session.store().list().to_vec();
    Ok(Json(DataResponse { data: annotations }))
}

/// POST /annotations/routes
pub async fn create_route(
    State(state): State<AppState>,
    Json(input): Json<NewRoute>,
) -> AppResult<impl IntoResponse> {
    create(&state, NewAnnotation::Route(input)).await
}

/// POST /annotations/labels
pub async fn create_label(
    State(state): State<AppState>,
    Json(input): Json<NewLabel>,
) -> AppResult<impl IntoResponse> {
    create(&state, NewAnnotation::Label(input)).await
}

/// POST /annotations/circles
pub async fn create_circle(
    State(state): State<AppState>,
    Json(input): Json<NewCircle>,
) -> AppResult<impl IntoResponse> {
    create(&state, NewAnnotation::Circle(input)).await
}

/// POST /annotations/towers
pub async fn create_tower(
    State(state): State<AppState>,
    Json(input): Json<NewTower>,
) -> AppResult<impl IntoResponse> {
    create(&state, NewAnnotation::Tower(input)).await
}

async fn create(state: &AppState, draft: NewAnnotation) -> AppResult<impl IntoResponse> {
    let mut session = state.session.lock().await;
    let annotation = session.store_mut().add(draft)?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: annotation })))
}

/// GET /annotations/{id}
pub async fn get_annotation(
    State(state): State<AppState>,
    Path(id): Path<AnnotationId>,
) -> AppResult<impl IntoResponse> {
    let session = state.session.lock().await;
    let annotation = session
        .store()
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::Core(CoreError::annotation_not_found(id)))?;
    Ok(Json(DataResponse { data: annotation }))
}

/// PATCH /annotations/{id}
///
/// Partial update. Fields the annotation's kind does not declare are
/// ignored rather than rejected.
pub async fn update_annotation(
    State(state): State<AppState>,
    Path(id): Path<AnnotationId>,
    Json(patch): Json<AnnotationPatch>,
) -> AppResult<impl IntoResponse> {
    let mut session = state.session.lock().await;
    let annotation = session.store_mut().update(id, &patch)?;
    Ok(Json(DataResponse { data: annotation }))
}

/// DELETE /annotations/{id}
///
/// Returns the removed annotation.
pub async fn delete_annotation(
    State(state): State<AppState>,
    Path(id): Path<AnnotationId>,
) -> AppResult<impl IntoResponse> {
    let mut session = state.session.lock().await;
    let removed = session.store_mut().remove(id)?;
    Ok(Json(DataResponse { data: removed }))
}

/// POST /annotations/undo
///
/// Removes and returns the most recently added annotation.
pub async fn undo_annotation(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut session = state.session.lock().await;
    let undone = session
        .store_mut()
        .undo()?
        .ok_or(AppError::NothingToUndo)?;
    Ok(Json(DataResponse { data: undone }))
}

/// POST /annotations/clear
pub async fn clear_annotations(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut session = state.session.lock().await;
    session.store_mut().clear()?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /annotations/{id}/sectors
///
/// Coverage circle, sector rays and cardinal markers for a tower. A
/// `radius_m` query parameter previews a different radius without touching
/// the stored record.
pub async fn tower_sectors(
    State(state): State<AppState>,
    Path(id): Path<AnnotationId>,
    Query(params): Query<SectorParams>,
) -> AppResult<impl IntoResponse> {
    let session = state.session.lock().await;
    let annotation = session
        .store()
        .get(id)
        .ok_or_else(|| AppError::Core(CoreError::annotation_not_found(id)))?;

    let Shape::Tower(tower) = &annotation.shape else {
        return Err(AppError::BadRequest(format!(
            "Annotation {id} is a {}, not a tower",
            annotation.kind()
        )));
    };

    let geometry = match params.radius_m {
        Some(radius_m) => {
            validate_radius(radius_m)?;
            sectors::generate_with_radius(tower, radius_m)
        }
        None => sectors::generate(tower),
    };
    Ok(Json(DataResponse { data: geometry }))
}
