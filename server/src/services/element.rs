//! Element service — list, create, and delete.
//!
//! DESIGN
//! ======
//! Creation accepts drafts: every field an element has, with `id` and
//! `z_index` optional. Supplied ids are kept, which is how undo of a delete
//! and duplication restore elements under stable ids. Missing z values stack
//! above the board's current maximum in draft order. A create that fails
//! partway removes the elements it already wrote before returning the error.
//!
//! Deletion mirrors the batch coordinator: partial success with per-id
//! rejections (`not_found`, `locked`). Frames never keep dangling child
//! references; deleted ids are stripped from every frame on the board, and
//! that cleanup is not subject to the frame's lock.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use wire::{
    BoardEvent, BoardId, Content, Element, ElementId, ElementKind, ElementPatch, ErrorCode, RejectReason,
    Rejection, Style, UserId, ValidationError,
};

use crate::services::access::{self, AccessError, Permission};
use crate::services::board;
use crate::services::lock::{self, LockDecision};
use crate::services::store::StoreError;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("no elements given")]
    Empty,
    #[error("{len} elements given; the limit is {max}")]
    TooMany { len: usize, max: usize },
    #[error("invalid element {id}: {source}")]
    Invalid { id: ElementId, source: ValidationError },
    #[error("frame {frame} references element {child} which is not on this board")]
    UnknownChild { frame: ElementId, child: ElementId },
    #[error("element {0} already exists")]
    AlreadyExists(ElementId),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for ElementError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty | Self::TooMany { .. } | Self::Invalid { .. } | Self::UnknownChild { .. } => {
                "E_INVALID_ELEMENT"
            }
            Self::AlreadyExists(_) => "E_ELEMENT_CONFLICT",
            Self::Access(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

/// Client-supplied element. Unknown fields (server timestamps, board id)
/// are ignored, so a full `Element` is also a valid draft.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementDraft {
    #[serde(default)]
    pub id: Option<ElementId>,
    pub kind: ElementKind,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_index: Option<i64>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub style: Style,
}

impl From<Element> for ElementDraft {
    fn from(el: Element) -> Self {
        Self {
            id: Some(el.id),
            kind: el.kind,
            position_x: el.position_x,
            position_y: el.position_y,
            width: el.width,
            height: el.height,
            rotation: el.rotation,
            z_index: Some(el.z_index),
            locked: el.locked,
            content: Some(el.content),
            style: el.style,
        }
    }
}

/// Outcome of a delete call, in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted: Vec<ElementId>,
    pub rejected: Vec<Rejection>,
}

// =============================================================================
// LIST
// =============================================================================

/// All elements of a board in paint order.
///
/// # Errors
///
/// Returns access or store errors.
pub async fn list_elements(state: &AppState, viewer: UserId, board_id: BoardId) -> Result<Vec<Element>, ElementError> {
    access::ensure_permission(state.directory.as_ref(), viewer, board_id, Permission::View).await?;
    Ok(state.store.list(board_id).await?)
}

// =============================================================================
// CREATE
// =============================================================================

/// Create elements on a board and broadcast them to the other clients.
///
/// # Errors
///
/// Returns `Empty`/`TooMany` for bad sizes, `Invalid` or `UnknownChild` for
/// malformed drafts, `AlreadyExists` for reused ids, and access or store
/// errors. Validation happens before any write.
pub async fn create_elements(
    state: &AppState,
    caller: UserId,
    board_id: BoardId,
    origin: Option<Uuid>,
    drafts: Vec<ElementDraft>,
) -> Result<Vec<Element>, ElementError> {
    check_size(drafts.len(), state.config.max_batch_size)?;
    access::ensure_permission(state.directory.as_ref(), caller, board_id, Permission::Edit).await?;

    let mut next_z = state.store.max_z_index(board_id).await?.map_or(0, |z| z.saturating_add(1));
    let mut elements = Vec::with_capacity(drafts.len());
    let mut ids = HashSet::with_capacity(drafts.len());
    for draft in drafts {
        let el = materialize(draft, board_id, caller, &mut next_z);
        el.validate().map_err(|source| ElementError::Invalid { id: el.id, source })?;
        if !ids.insert(el.id) {
            return Err(ElementError::AlreadyExists(el.id));
        }
        elements.push(el);
    }

    let supplied: Vec<ElementId> = ids.iter().copied().collect();
    let existing = state.store.get_many(board_id, &supplied).await?;
    if let Some(el) = existing.found.first() {
        return Err(ElementError::AlreadyExists(el.id));
    }
    check_children(state, board_id, &elements, &ids).await?;

    let mut created = Vec::with_capacity(elements.len());
    for el in elements {
        match state.store.create(el).await {
            Ok(el) => created.push(el),
            Err(e) => {
                discard_partial_create(state, board_id, created).await;
                return Err(e.into());
            }
        }
    }

    info!(%board_id, %caller, count = created.len(), "elements created");
    board::publish(state, board_id, BoardEvent::ElementsCreated(created.clone()), origin).await;
    Ok(created)
}

/// Undo the writes of a create call that failed midway. If the cleanup fails
/// too, the surviving elements are announced to every client, origin
/// included, so the room still matches the store.
async fn discard_partial_create(state: &AppState, board_id: BoardId, created: Vec<Element>) {
    if created.is_empty() {
        return;
    }
    let ids: Vec<ElementId> = created.iter().map(|el| el.id).collect();
    match state.store.delete_many(board_id, &ids).await {
        Ok(removed) => warn!(%board_id, removed = removed.len(), "rolled back partial create"),
        Err(e) => {
            warn!(%board_id, count = ids.len(), error = %e, "partial create rollback failed; announcing survivors");
            board::publish(state, board_id, BoardEvent::ElementsCreated(created), None).await;
        }
    }
}

fn materialize(draft: ElementDraft, board_id: BoardId, caller: UserId, next_z: &mut i64) -> Element {
    let z_index = match draft.z_index {
        Some(z) => {
            *next_z = (*next_z).max(z.saturating_add(1));
            z
        }
        None => {
            let z = *next_z;
            *next_z = z.saturating_add(1);
            z
        }
    };
    Element {
        id: draft.id.unwrap_or_else(Uuid::new_v4),
        board_id,
        kind: draft.kind,
        position_x: draft.position_x,
        position_y: draft.position_y,
        width: draft.width,
        height: draft.height,
        rotation: draft.rotation,
        z_index,
        locked: draft.locked,
        content: draft.content.unwrap_or_else(|| Content::placeholder(draft.kind)),
        style: draft.style,
        created_by: Some(caller),
        created_at: 0,
        updated_at: 0,
    }
}

/// Frame children must be created in the same call or already be on the board.
async fn check_children(
    state: &AppState,
    board_id: BoardId,
    elements: &[Element],
    created_ids: &HashSet<ElementId>,
) -> Result<(), ElementError> {
    let external: Vec<(ElementId, ElementId)> = elements
        .iter()
        .flat_map(|el| el.content.children().iter().map(move |child| (el.id, *child)))
        .filter(|(_, child)| !created_ids.contains(child))
        .collect();
    if external.is_empty() {
        return Ok(());
    }
    let child_ids: Vec<ElementId> = external.iter().map(|(_, child)| *child).collect();
    let fetched = state.store.get_many(board_id, &child_ids).await?;
    match external.into_iter().find(|(_, child)| fetched.missing.contains(child)) {
        Some((frame, child)) => Err(ElementError::UnknownChild { frame, child }),
        None => Ok(()),
    }
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete elements, strip them from frames, and broadcast both changes.
///
/// # Errors
///
/// Returns `Empty`/`TooMany`, access errors, or store errors. Per-id
/// problems land in the report instead.
pub async fn delete_elements(
    state: &AppState,
    caller: UserId,
    board_id: BoardId,
    origin: Option<Uuid>,
    ids: Vec<ElementId>,
) -> Result<DeleteReport, ElementError> {
    check_size(ids.len(), state.config.max_batch_size)?;
    access::ensure_permission(state.directory.as_ref(), caller, board_id, Permission::Edit).await?;

    let mut seen = HashSet::with_capacity(ids.len());
    let ids: Vec<ElementId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
    let snapshot = state.store.get_many(board_id, &ids).await?;

    let mut rejected = Vec::new();
    let mut removable = Vec::with_capacity(ids.len());
    for id in &ids {
        match snapshot.get(*id) {
            None => rejected.push(Rejection::new(*id, RejectReason::NotFound)),
            Some(el) => match lock::can_remove(el) {
                LockDecision::Allow => removable.push(*id),
                LockDecision::Deny(denial) => {
                    rejected.push(Rejection::new(*id, RejectReason::Locked).with_message(denial.to_string()));
                }
            },
        }
    }

    let deleted = if removable.is_empty() { Vec::new() } else { state.store.delete_many(board_id, &removable).await? };
    for id in removable.iter().filter(|id| !deleted.contains(id)) {
        rejected.push(Rejection::new(*id, RejectReason::NotFound));
    }
    let order = |id: &ElementId| ids.iter().position(|x| x == id);
    rejected.sort_by_key(|r| order(&r.id));

    let report = DeleteReport { deleted, rejected };
    info!(
        %board_id,
        %caller,
        deleted = report.deleted.len(),
        rejected = report.rejected.len(),
        "elements deleted"
    );
    if report.deleted.is_empty() {
        return Ok(report);
    }

    board::publish(state, board_id, BoardEvent::ElementsDeleted(report.deleted.clone()), origin).await;
    let frames = strip_children(state, board_id, &report.deleted).await;
    if !frames.is_empty() {
        board::publish(state, board_id, BoardEvent::ElementsUpdated(frames), None).await;
    }
    Ok(report)
}

/// Remove deleted ids from every frame's children. Returns updated frames.
async fn strip_children(state: &AppState, board_id: BoardId, deleted: &[ElementId]) -> Vec<Element> {
    let elements = match state.store.list(board_id).await {
        Ok(elements) => elements,
        Err(e) => {
            warn!(%board_id, error = %e, "could not load frames for child cleanup");
            return Vec::new();
        }
    };

    let mut updated = Vec::new();
    for frame in elements.iter().filter(|el| el.content.children().iter().any(|c| deleted.contains(c))) {
        let children = frame
            .content
            .children()
            .iter()
            .copied()
            .filter(|c| !deleted.contains(c))
            .collect();
        let patch = ElementPatch::content(Content::Frame { children });
        match state.store.update(board_id, frame.id, &patch).await {
            Ok(el) => updated.push(el),
            Err(e) => warn!(%board_id, frame_id = %frame.id, error = %e, "frame child cleanup failed"),
        }
    }
    updated
}

// =============================================================================
// HELPERS
// =============================================================================

fn check_size(len: usize, max: usize) -> Result<(), ElementError> {
    if len == 0 {
        return Err(ElementError::Empty);
    }
    if len > max {
        return Err(ElementError::TooMany { len, max });
    }
    Ok(())
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
