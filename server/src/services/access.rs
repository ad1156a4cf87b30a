//! Access control — project roles, memberships, and board permissions.
//!
//! DESIGN
//! ======
//! Boards belong to projects. A user's role on a board is their role in its
//! project: the project owner always holds `Owner`, everyone else needs an
//! accepted membership. Pending invitations grant nothing.
//!
//! `BoardDirectory` is the registry seam (projects, memberships, board
//! records); `MemoryDirectory` backs the binary and tests. Authentication is
//! external: callers arrive here with a user id already established.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;
use wire::{BoardId, ErrorCode, UserId};

use crate::services::board::Board;

/// Unique identifier for a project.
pub type ProjectId = Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Commenter,
    Viewer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Commenter => "commenter",
            Self::Viewer => "viewer",
        }
    }

    #[must_use]
    pub fn can_edit(self) -> bool {
        matches!(self, Self::Owner | Self::Editor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub role: Role,
    pub status: MembershipStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Edit,
}

impl Permission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccessError {
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),
    #[error("user {user_id} lacks {permission} permission")]
    Forbidden { user_id: UserId, permission: Permission },
    #[error("only the project owner can change memberships")]
    NotOwner,
    #[error("the project owner's membership cannot be changed")]
    OwnerImmutable,
}

impl ErrorCode for AccessError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::ProjectNotFound(_) => "E_PROJECT_NOT_FOUND",
            Self::Forbidden { .. } => "E_FORBIDDEN",
            Self::NotOwner => "E_NOT_OWNER",
            Self::OwnerImmutable => "E_OWNER_IMMUTABLE",
        }
    }
}

// =============================================================================
// DIRECTORY
// =============================================================================

#[async_trait]
pub trait BoardDirectory: Send + Sync {
    async fn board(&self, board_id: BoardId) -> Option<Board>;

    /// Insert or replace a board record.
    async fn save_board(&self, board: Board);

    async fn project_owner(&self, project_id: ProjectId) -> Option<UserId>;

    /// Register a project. Existing projects keep their owner.
    async fn register_project(&self, project_id: ProjectId, owner: UserId);

    async fn membership(&self, project_id: ProjectId, user_id: UserId) -> Option<Membership>;

    async fn set_membership(&self, project_id: ProjectId, user_id: UserId, membership: Membership);
}

struct ProjectRecord {
    owner: UserId,
    members: HashMap<UserId, Membership>,
}

#[derive(Default)]
pub struct MemoryDirectory {
    projects: RwLock<HashMap<ProjectId, ProjectRecord>>,
    boards: RwLock<HashMap<BoardId, Board>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardDirectory for MemoryDirectory {
    async fn board(&self, board_id: BoardId) -> Option<Board> {
        self.boards.read().await.get(&board_id).cloned()
    }

    async fn save_board(&self, board: Board) {
        self.boards.write().await.insert(board.id, board);
    }

    async fn project_owner(&self, project_id: ProjectId) -> Option<UserId> {
        self.projects.read().await.get(&project_id).map(|p| p.owner)
    }

    async fn register_project(&self, project_id: ProjectId, owner: UserId) {
        self.projects
            .write()
            .await
            .entry(project_id)
            .or_insert_with(|| ProjectRecord { owner, members: HashMap::new() });
    }

    async fn membership(&self, project_id: ProjectId, user_id: UserId) -> Option<Membership> {
        self.projects
            .read()
            .await
            .get(&project_id)
            .and_then(|p| p.members.get(&user_id).copied())
    }

    async fn set_membership(&self, project_id: ProjectId, user_id: UserId, membership: Membership) {
        if let Some(project) = self.projects.write().await.get_mut(&project_id) {
            project.members.insert(user_id, membership);
        }
    }
}

// =============================================================================
// CHECKS
// =============================================================================

/// Effective role of `user_id` in a project. `None` for non-members and
/// pending invitations.
pub async fn project_role(dir: &dyn BoardDirectory, project_id: ProjectId, user_id: UserId) -> Option<Role> {
    if dir.project_owner(project_id).await? == user_id {
        return Some(Role::Owner);
    }
    dir.membership(project_id, user_id)
        .await
        .filter(|m| m.status == MembershipStatus::Accepted)
        .map(|m| m.role)
}

/// Whether `user_id` may mutate the board and its elements.
///
/// # Errors
///
/// Returns `BoardNotFound` if the board is not registered.
pub async fn can_edit(dir: &dyn BoardDirectory, user_id: UserId, board_id: BoardId) -> Result<bool, AccessError> {
    let board = dir.board(board_id).await.ok_or(AccessError::BoardNotFound(board_id))?;
    Ok(project_role(dir, board.project_id, user_id)
        .await
        .is_some_and(Role::can_edit))
}

/// Whether `user_id` may read the board and its elements.
///
/// # Errors
///
/// Returns `BoardNotFound` if the board is not registered.
pub async fn can_view(dir: &dyn BoardDirectory, user_id: UserId, board_id: BoardId) -> Result<bool, AccessError> {
    let board = dir.board(board_id).await.ok_or(AccessError::BoardNotFound(board_id))?;
    Ok(project_role(dir, board.project_id, user_id).await.is_some())
}

/// Resolve the board and require `permission` on it.
///
/// # Errors
///
/// Returns `BoardNotFound` for unknown boards and `Forbidden` when the
/// caller's role is insufficient.
pub async fn ensure_permission(
    dir: &dyn BoardDirectory,
    user_id: UserId,
    board_id: BoardId,
    permission: Permission,
) -> Result<Board, AccessError> {
    let allowed = match permission {
        Permission::View => can_view(dir, user_id, board_id).await?,
        Permission::Edit => can_edit(dir, user_id, board_id).await?,
    };
    if !allowed {
        return Err(AccessError::Forbidden { user_id, permission });
    }
    dir.board(board_id).await.ok_or(AccessError::BoardNotFound(board_id))
}

/// Add, change, or accept a membership. Only the project owner may call this.
///
/// # Errors
///
/// Returns `ProjectNotFound`, `NotOwner` for any other caller, and
/// `OwnerImmutable` when targeting the owner.
pub async fn set_member(
    dir: &dyn BoardDirectory,
    project_id: ProjectId,
    caller: UserId,
    user_id: UserId,
    membership: Membership,
) -> Result<Membership, AccessError> {
    let owner = dir
        .project_owner(project_id)
        .await
        .ok_or(AccessError::ProjectNotFound(project_id))?;
    if caller != owner {
        return Err(AccessError::NotOwner);
    }
    if user_id == owner {
        return Err(AccessError::OwnerImmutable);
    }
    dir.set_membership(project_id, user_id, membership).await;
    tracing::info!(%project_id, %user_id, role = membership.role.as_str(), "membership updated");
    Ok(membership)
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
