//! Element routes — list, create, delete, and batch update.
//!
//! HTTP callers have no room connection, so every resulting broadcast goes
//! to all clients of the board.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use wire::{BatchReport, BatchUpdate, BoardId, Element, ElementId};

use crate::routes::auth::Caller;
use crate::routes::error::ApiError;
use crate::services::batch;
use crate::services::element::{self, DeleteReport, ElementDraft};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateElementsBody {
    pub elements: Vec<ElementDraft>,
}

#[derive(Deserialize)]
pub struct DeleteElementsBody {
    pub ids: Vec<ElementId>,
}

#[derive(Deserialize)]
pub struct BatchBody {
    pub updates: Vec<BatchUpdate>,
}

/// `GET /api/boards/:id/elements` — all elements in paint order.
pub async fn list_elements(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Vec<Element>>, ApiError> {
    Ok(Json(element::list_elements(&state, user_id, board_id).await?))
}

/// `POST /api/boards/:id/elements` — create elements from drafts.
pub async fn create_elements(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
    Json(body): Json<CreateElementsBody>,
) -> Result<(StatusCode, Json<Vec<Element>>), ApiError> {
    let created = element::create_elements(&state, user_id, board_id, None, body.elements).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `DELETE /api/boards/:id/elements` — delete by id with a per-id report.
pub async fn delete_elements(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
    Json(body): Json<DeleteElementsBody>,
) -> Result<Json<DeleteReport>, ApiError> {
    Ok(Json(element::delete_elements(&state, user_id, board_id, None, body.ids).await?))
}

/// `PATCH /api/boards/:id/elements/batch` — sparse updates with partial success.
pub async fn apply_batch(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
    Json(body): Json<BatchBody>,
) -> Result<Json<BatchReport>, ApiError> {
    Ok(Json(batch::apply_batch(&state, user_id, board_id, None, body.updates).await?))
}

#[cfg(test)]
#[path = "elements_test.rs"]
mod tests;
