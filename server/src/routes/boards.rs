//! Board, sharing, and membership routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;
use wire::{BoardId, UserId};

use crate::routes::auth::Caller;
use crate::routes::error::ApiError;
use crate::services::access::{self, Membership, Permission, ProjectId};
use crate::services::board::{self, Board, BoardSettings, BoardUser};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateBoardBody {
    pub project_id: ProjectId,
    pub title: String,
}

#[derive(Deserialize)]
pub struct SharedQuery {
    pub token: String,
}

/// `POST /api/boards` — create a board in a project.
pub async fn create_board(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(body): Json<CreateBoardBody>,
) -> Result<(StatusCode, Json<Board>), ApiError> {
    let board = board::create_board(&state, body.project_id, &body.title, user_id).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// `GET /api/boards/:id` — board settings.
pub async fn get_board(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Board>, ApiError> {
    Ok(Json(board::get_board(&state, board_id, user_id).await?))
}

/// `PATCH /api/boards/:id` — update title, background, or grid.
pub async fn update_board(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
    Json(settings): Json<BoardSettings>,
) -> Result<Json<Board>, ApiError> {
    Ok(Json(board::update_board(&state, board_id, user_id, settings).await?))
}

/// `PUT /api/boards/:id/share` — issue a fresh public share token.
pub async fn enable_share(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Board>, ApiError> {
    Ok(Json(board::set_public_share(&state, board_id, user_id, true).await?))
}

/// `DELETE /api/boards/:id/share` — revoke the public share token.
pub async fn disable_share(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Board>, ApiError> {
    Ok(Json(board::set_public_share(&state, board_id, user_id, false).await?))
}

/// `GET /api/boards/:id/shared?token=` — read-only view through a share link.
pub async fn shared_board(
    State(state): State<AppState>,
    Path(board_id): Path<BoardId>,
    Query(query): Query<SharedQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = board::get_shared_board(&state, board_id, &query.token).await?;
    let elements = state.store.list(board_id).await.map_err(board::BoardError::from)?;
    Ok(Json(serde_json::json!({ "board": board, "elements": elements })))
}

/// `GET /api/boards/:id/users` — connections currently in the board room.
pub async fn list_users(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Vec<BoardUser>>, ApiError> {
    access::ensure_permission(state.directory.as_ref(), user_id, board_id, Permission::View).await?;
    Ok(Json(board::list_board_users(&state, board_id).await))
}

/// `PUT /api/projects/:id/members/:user_id` — add, change, or accept a membership.
pub async fn set_member(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((project_id, member)): Path<(Uuid, UserId)>,
    Json(membership): Json<Membership>,
) -> Result<Json<Membership>, ApiError> {
    let saved = access::set_member(state.directory.as_ref(), project_id, caller, member, membership).await?;
    Ok(Json(saved))
}

#[cfg(test)]
#[path = "boards_test.rs"]
mod tests;
