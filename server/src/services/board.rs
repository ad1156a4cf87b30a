//! Board service — board settings, sharing, rooms, and broadcast.
//!
//! DESIGN
//! ======
//! Board records live in the `BoardDirectory`; boards are created inside a
//! project and never hard-deleted here. Live collaboration happens in rooms:
//! one room per board with at least one connected client, each client owning
//! a bounded outbound queue.
//!
//! ERROR HANDLING
//! ==============
//! Broadcast is best-effort. A full client queue drops the frame for that
//! client only and logs a warning; a closed queue is left for `part_board`
//! to clean up. Ordering per (origin, element) holds because each queue is
//! FIFO and every frame for a board goes through the same fan-out.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wire::frame::now_ms;
use wire::{BoardEvent, BoardId, Element, ErrorCode, Frame, UserId};

use crate::services::access::{self, AccessError, Permission, ProjectId, Role};
use crate::services::store::StoreError;
use crate::state::{AppState, BoardRoom, ConnectedClient};

const MAX_TITLE_CHARS: usize = 200;
const SHARE_TOKEN_LEN: usize = 32;
const DEFAULT_BACKGROUND: &str = "#ffffff";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("invalid title: {0}")]
    InvalidTitle(&'static str),
    #[error("invalid background color: {0}")]
    InvalidColor(String),
    #[error("share link is not valid for board {0}")]
    ShareDenied(BoardId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Access(e) => e.error_code(),
            Self::InvalidTitle(_) => "E_INVALID_TITLE",
            Self::InvalidColor(_) => "E_INVALID_COLOR",
            Self::ShareDenied(_) => "E_SHARE_DENIED",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub project_id: ProjectId,
    pub title: String,
    pub background_color: String,
    pub grid_enabled: bool,
    /// Present while the board is publicly shared.
    pub public_share_token: Option<String>,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Board {
    #[must_use]
    pub fn new(project_id: ProjectId, title: &str, created_by: UserId) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: title.trim().to_owned(),
            background_color: DEFAULT_BACKGROUND.to_owned(),
            grid_enabled: true,
            public_share_token: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sparse update of board settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardSettings {
    pub title: Option<String>,
    pub background_color: Option<String>,
    pub grid_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardUser {
    pub client_id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub color: String,
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Create a board inside a project. An unknown project is registered with
/// the creator as its owner.
///
/// # Errors
///
/// Returns `InvalidTitle` for blank or overlong titles and `Forbidden` when
/// the creator cannot edit the project.
pub async fn create_board(
    state: &AppState,
    project_id: ProjectId,
    title: &str,
    creator: UserId,
) -> Result<Board, BoardError> {
    validate_title(title)?;
    let dir = state.directory.as_ref();
    if dir.project_owner(project_id).await.is_none() {
        dir.register_project(project_id, creator).await;
        info!(%project_id, owner = %creator, "registered project");
    }
    if !access::project_role(dir, project_id, creator)
        .await
        .is_some_and(Role::can_edit)
    {
        return Err(AccessError::Forbidden { user_id: creator, permission: Permission::Edit }.into());
    }

    let board = Board::new(project_id, title, creator);
    dir.save_board(board.clone()).await;
    info!(board_id = %board.id, %project_id, "board created");
    Ok(board)
}

/// Fetch a board the viewer can see.
///
/// # Errors
///
/// Returns `BoardNotFound` or `Forbidden`.
pub async fn get_board(state: &AppState, board_id: BoardId, viewer: UserId) -> Result<Board, BoardError> {
    Ok(access::ensure_permission(state.directory.as_ref(), viewer, board_id, Permission::View).await?)
}

/// Fetch a board through its public share link. Read-only by construction.
///
/// # Errors
///
/// Returns `BoardNotFound`, or `ShareDenied` when sharing is off or the
/// token does not match.
pub async fn get_shared_board(state: &AppState, board_id: BoardId, token: &str) -> Result<Board, BoardError> {
    let board = state
        .directory
        .board(board_id)
        .await
        .ok_or(AccessError::BoardNotFound(board_id))?;
    if board.public_share_token.as_deref() != Some(token) {
        return Err(BoardError::ShareDenied(board_id));
    }
    Ok(board)
}

/// Apply present settings fields.
///
/// # Errors
///
/// Returns access errors, `InvalidTitle`, or `InvalidColor`.
pub async fn update_board(
    state: &AppState,
    board_id: BoardId,
    editor: UserId,
    settings: BoardSettings,
) -> Result<Board, BoardError> {
    let mut board = access::ensure_permission(state.directory.as_ref(), editor, board_id, Permission::Edit).await?;

    if let Some(title) = &settings.title {
        validate_title(title)?;
        board.title = title.trim().to_owned();
    }
    if let Some(color) = settings.background_color {
        if !is_hex_color(&color) {
            return Err(BoardError::InvalidColor(color));
        }
        board.background_color = color;
    }
    if let Some(grid) = settings.grid_enabled {
        board.grid_enabled = grid;
    }
    board.updated_at = now_ms();

    state.directory.save_board(board.clone()).await;
    info!(%board_id, %editor, "board settings updated");
    Ok(board)
}

/// Enable or disable the public share link. Enabling always issues a fresh
/// token, invalidating any previous one.
///
/// # Errors
///
/// Returns access errors.
pub async fn set_public_share(
    state: &AppState,
    board_id: BoardId,
    editor: UserId,
    enabled: bool,
) -> Result<Board, BoardError> {
    let mut board = access::ensure_permission(state.directory.as_ref(), editor, board_id, Permission::Edit).await?;
    board.public_share_token = enabled.then(generate_share_token);
    board.updated_at = now_ms();
    state.directory.save_board(board.clone()).await;
    info!(%board_id, enabled, "board sharing changed");
    Ok(board)
}

fn validate_title(title: &str) -> Result<(), BoardError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BoardError::InvalidTitle("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(BoardError::InvalidTitle("title must be at most 200 characters"));
    }
    Ok(())
}

/// `#rgb` or `#rrggbb`.
pub(crate) fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn generate_share_token() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SHARE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Join a board room and return the current elements in paint order.
///
/// # Errors
///
/// Returns access errors when the user cannot view the board, or a store
/// error if the snapshot read fails.
pub async fn join_board(
    state: &AppState,
    board_id: BoardId,
    client_id: Uuid,
    client: ConnectedClient,
    tx: mpsc::Sender<Frame>,
) -> Result<Vec<Element>, BoardError> {
    access::ensure_permission(state.directory.as_ref(), client.user_id, board_id, Permission::View).await?;
    let elements = state.store.list(board_id).await?;

    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(board_id).or_insert_with(BoardRoom::new);
    room.clients.insert(client_id, tx);
    room.users.insert(client_id, client);

    info!(%board_id, %client_id, clients = room.clients.len(), "client joined board");
    Ok(elements)
}

/// Leave a board room. The room is dropped with its last client.
pub async fn part_board(state: &AppState, board_id: BoardId, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&board_id) else {
        return;
    };

    room.clients.remove(&client_id);
    room.users.remove(&client_id);
    info!(%board_id, %client_id, remaining = room.clients.len(), "client left board");

    if room.clients.is_empty() {
        rooms.remove(&board_id);
        debug!(%board_id, "closed empty board room");
    }
}

/// Currently connected users of a board, one entry per connection.
pub async fn list_board_users(state: &AppState, board_id: BoardId) -> Vec<BoardUser> {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&board_id) else {
        return Vec::new();
    };
    let mut users: Vec<BoardUser> = room
        .users
        .iter()
        .map(|(client_id, user)| BoardUser {
            client_id: *client_id,
            user_id: user.user_id,
            name: user.name.clone(),
            color: user.color.clone(),
        })
        .collect();
    users.sort_by(|a, b| a.name.cmp(&b.name).then(a.client_id.cmp(&b.client_id)));
    users
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a board, optionally excluding one.
pub async fn broadcast(state: &AppState, board_id: BoardId, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&board_id) else {
        return;
    };

    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        match tx.try_send(frame.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%board_id, %client_id, syscall = %frame.syscall, "client queue full; frame dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%board_id, %client_id, "client queue closed");
            }
        }
    }
}

/// Encode a typed event and broadcast it.
pub async fn publish(state: &AppState, board_id: BoardId, event: BoardEvent, exclude: Option<Uuid>) {
    match event.into_frame(board_id) {
        Ok(frame) => broadcast(state, board_id, &frame, exclude).await,
        Err(e) => warn!(%board_id, error = %e, "failed to encode board event"),
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
