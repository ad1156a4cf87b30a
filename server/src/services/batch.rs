//! Batch mutation coordinator.
//!
//! DESIGN
//! ======
//! One call updates many elements of one board with partial success:
//!
//! 1. shape check: size, duplicate ids, each patch valid (fatal)
//! 2. edit permission, checked once (fatal)
//! 3. one snapshot read; unknown ids are rejected `not_found`
//! 4. lock guard per element; denials are rejected `locked`
//! 5. content checks against the stored kind and frame children (fatal,
//!    before any write)
//! 6. concurrent per-element writes; failures are rejected `store_error`
//!
//! The report keeps request order. When nothing applied the call fails with
//! the report attached so the caller can still see why. Applied elements are
//! broadcast to the board's other clients as one `element:update` event.
//!
//! ERROR HANDLING
//! ==============
//! There is no retry and no rollback here. Elements written before a later
//! entry fails stay written; the caller reconciles its optimistic state from
//! the report.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};
use uuid::Uuid;
use wire::{
    BatchReport, BatchUpdate, BoardEvent, BoardId, Element, ElementId, ErrorCode, RejectReason, Rejection, UserId,
    ValidationError,
};

use crate::services::access::{self, AccessError, Permission};
use crate::services::board;
use crate::services::lock::{self, LockDecision};
use crate::services::store::StoreError;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// A batch that is malformed as a whole.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidBatch {
    #[error("batch is empty")]
    Empty,
    #[error("batch has {len} entries; the limit is {max}")]
    TooLarge { len: usize, max: usize },
    #[error("element {0} appears more than once")]
    DuplicateId(ElementId),
    #[error("entry {id}: {source}")]
    Entry { id: ElementId, source: ValidationError },
    #[error("frame {frame} references element {child} which is not on this board")]
    UnknownChild { frame: ElementId, child: ElementId },
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid batch: {0}")]
    Validation(#[from] InvalidBatch),
    #[error("user {user_id} may not edit board {board_id}")]
    Forbidden { user_id: UserId, board_id: BoardId },
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),
    #[error("no update was applied ({} rejected)", .report.rejected.len())]
    NothingApplied { report: BatchReport },
    #[error("element store failed: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for BatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_INVALID_BATCH",
            Self::Forbidden { .. } => "E_FORBIDDEN",
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::NothingApplied { .. } => "E_NOTHING_APPLIED",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

impl BatchError {
    fn from_access(err: AccessError, user_id: UserId, board_id: BoardId) -> Self {
        match err {
            AccessError::BoardNotFound(id) => Self::BoardNotFound(id),
            _ => Self::Forbidden { user_id, board_id },
        }
    }
}

// =============================================================================
// APPLY
// =============================================================================

/// Apply a batch of sparse updates to one board.
///
/// `origin` is the caller's connection, excluded from the resulting
/// broadcast; HTTP callers pass `None`.
///
/// # Errors
///
/// Returns `Validation`, `Forbidden`, or `BoardNotFound` before any write;
/// `Store` if the snapshot read fails; `NothingApplied` with the full report
/// when every entry was rejected.
pub async fn apply_batch(
    state: &AppState,
    caller: UserId,
    board_id: BoardId,
    origin: Option<Uuid>,
    requests: Vec<BatchUpdate>,
) -> Result<BatchReport, BatchError> {
    validate_shape(&requests, state.config.max_batch_size)?;

    access::ensure_permission(state.directory.as_ref(), caller, board_id, Permission::Edit)
        .await
        .map_err(|e| BatchError::from_access(e, caller, board_id))?;

    let ids: Vec<ElementId> = requests.iter().map(|r| r.id).collect();
    let snapshot = state.store.get_many(board_id, &ids).await?;

    let mut rejections: HashMap<ElementId, Rejection> = HashMap::new();
    let mut writes: Vec<BatchUpdate> = Vec::with_capacity(requests.len());
    for request in &requests {
        let Some(current) = snapshot.get(request.id) else {
            rejections.insert(request.id, Rejection::new(request.id, RejectReason::NotFound));
            continue;
        };
        if let LockDecision::Deny(denial) = lock::can_apply(current, &request.patch) {
            rejections.insert(
                request.id,
                Rejection::new(request.id, RejectReason::Locked).with_message(denial.to_string()),
            );
            continue;
        }
        check_content(current, request)?;
        writes.push(request.clone());
    }
    check_frame_children(state, board_id, &writes).await?;

    let mut applied: HashMap<ElementId, Element> = HashMap::with_capacity(writes.len());
    for (id, result) in state.store.update_many(board_id, &writes).await {
        match result {
            Ok(element) => {
                applied.insert(id, element);
            }
            Err(e) => {
                warn!(%board_id, element_id = %id, error = %e, "batch entry write failed");
                rejections.insert(id, Rejection::new(id, RejectReason::StoreError).with_message(e.to_string()));
            }
        }
    }

    let report = assemble_report(&requests, applied, rejections);
    info!(
        %board_id,
        %caller,
        total = report.total,
        applied = report.applied.len(),
        rejected = report.rejected.len(),
        complete = report.is_complete(),
        "batch applied"
    );

    if report.applied.is_empty() {
        return Err(BatchError::NothingApplied { report });
    }

    board::publish(state, board_id, BoardEvent::ElementsUpdated(report.applied.clone()), origin).await;
    Ok(report)
}

// =============================================================================
// CHECKS
// =============================================================================

fn validate_shape(requests: &[BatchUpdate], max: usize) -> Result<(), InvalidBatch> {
    if requests.is_empty() {
        return Err(InvalidBatch::Empty);
    }
    if requests.len() > max {
        return Err(InvalidBatch::TooLarge { len: requests.len(), max });
    }
    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        if !seen.insert(request.id) {
            return Err(InvalidBatch::DuplicateId(request.id));
        }
        request
            .patch
            .validate()
            .map_err(|source| InvalidBatch::Entry { id: request.id, source })?;
    }
    Ok(())
}

/// New content must fit the stored kind and a frame may not contain itself.
fn check_content(current: &Element, request: &BatchUpdate) -> Result<(), InvalidBatch> {
    let Some(content) = &request.patch.content else {
        return Ok(());
    };
    if !content.fits(current.kind) {
        return Err(InvalidBatch::Entry {
            id: request.id,
            source: ValidationError::ContentMismatch { kind: current.kind, content: content.label() },
        });
    }
    if content.children().contains(&request.id) {
        return Err(InvalidBatch::Entry { id: request.id, source: ValidationError::SelfReference(request.id) });
    }
    Ok(())
}

/// Every child referenced by new frame content must exist on the board.
async fn check_frame_children(state: &AppState, board_id: BoardId, writes: &[BatchUpdate]) -> Result<(), BatchError> {
    let referenced: Vec<(ElementId, ElementId)> = writes
        .iter()
        .filter_map(|w| w.patch.content.as_ref().map(|c| (w.id, c.children())))
        .flat_map(|(frame, children)| children.iter().map(move |child| (frame, *child)))
        .collect();
    if referenced.is_empty() {
        return Ok(());
    }

    let child_ids: Vec<ElementId> = referenced.iter().map(|(_, child)| *child).collect();
    let fetched = state.store.get_many(board_id, &child_ids).await?;
    if let Some((frame, child)) = referenced
        .into_iter()
        .find(|(_, child)| fetched.missing.contains(child))
    {
        return Err(InvalidBatch::UnknownChild { frame, child }.into());
    }
    Ok(())
}

fn assemble_report(
    requests: &[BatchUpdate],
    mut applied: HashMap<ElementId, Element>,
    mut rejections: HashMap<ElementId, Rejection>,
) -> BatchReport {
    let mut report = BatchReport { total: requests.len(), ..BatchReport::default() };
    for request in requests {
        if let Some(element) = applied.remove(&request.id) {
            report.applied.push(element);
        } else if let Some(rejection) = rejections.remove(&request.id) {
            report.rejected.push(rejection);
        }
    }
    report
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
