//! Element store gateway.
//!
//! DESIGN
//! ======
//! `ElementStore` is the seam to durable persistence. Every call is atomic
//! per element and there is no cross-element transaction: `update_many`
//! fans out one `update` per entry concurrently and reports each outcome
//! separately. `MemoryStore` is the in-process implementation used by the
//! binary and by tests.
//!
//! Ownership checks are part of every read: an id that exists under another
//! board is reported as missing, never returned.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::RwLock;
use wire::frame::now_ms;
use wire::{BatchUpdate, BoardId, Element, ElementId, ElementPatch, ErrorCode};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("element not found: {0}")]
    NotFound(ElementId),
    #[error("element already exists: {0}")]
    Conflict(ElementId),
    #[error("element store unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ELEMENT_NOT_FOUND",
            Self::Conflict(_) => "E_ELEMENT_CONFLICT",
            Self::Unavailable(_) => "E_STORE_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result of a multi-id read, split by existence on the board.
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    pub found: Vec<Element>,
    pub missing: Vec<ElementId>,
}

impl Fetched {
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.found.iter().find(|el| el.id == id)
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait ElementStore: Send + Sync {
    /// All elements of a board in paint order `(z_index, id)`.
    async fn list(&self, board_id: BoardId) -> Result<Vec<Element>, StoreError>;

    /// One read for many ids. Ids under another board count as missing.
    async fn get_many(&self, board_id: BoardId, ids: &[ElementId]) -> Result<Fetched, StoreError>;

    /// Insert a new element, stamping its timestamps.
    async fn create(&self, element: Element) -> Result<Element, StoreError>;

    /// Apply a patch to one element, stamping `updated_at`.
    async fn update(&self, board_id: BoardId, id: ElementId, patch: &ElementPatch) -> Result<Element, StoreError>;

    /// Apply every entry concurrently. Outcomes come back in input order;
    /// no ordering holds between the writes themselves.
    async fn update_many(
        &self,
        board_id: BoardId,
        updates: &[BatchUpdate],
    ) -> Vec<(ElementId, Result<Element, StoreError>)> {
        let writes = updates.iter().map(|update| async move {
            (update.id, self.update(board_id, update.id, &update.patch).await)
        });
        join_all(writes).await
    }

    /// Remove elements; returns the ids that existed and were deleted.
    async fn delete_many(&self, board_id: BoardId, ids: &[ElementId]) -> Result<Vec<ElementId>, StoreError>;

    async fn max_z_index(&self, board_id: BoardId) -> Result<Option<i64>, StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    elements: RwLock<HashMap<ElementId, Element>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ElementStore for MemoryStore {
    async fn list(&self, board_id: BoardId) -> Result<Vec<Element>, StoreError> {
        let elements = self.elements.read().await;
        let mut out: Vec<Element> = elements
            .values()
            .filter(|el| el.board_id == board_id)
            .cloned()
            .collect();
        out.sort_by_key(|el| (el.z_index, el.id));
        Ok(out)
    }

    async fn get_many(&self, board_id: BoardId, ids: &[ElementId]) -> Result<Fetched, StoreError> {
        let elements = self.elements.read().await;
        let mut fetched = Fetched::default();
        for id in ids {
            match elements.get(id) {
                Some(el) if el.board_id == board_id => fetched.found.push(el.clone()),
                _ => fetched.missing.push(*id),
            }
        }
        Ok(fetched)
    }

    async fn create(&self, mut element: Element) -> Result<Element, StoreError> {
        let mut elements = self.elements.write().await;
        if elements.contains_key(&element.id) {
            return Err(StoreError::Conflict(element.id));
        }
        let now = now_ms();
        element.created_at = now;
        element.updated_at = now;
        elements.insert(element.id, element.clone());
        Ok(element)
    }

    async fn update(&self, board_id: BoardId, id: ElementId, patch: &ElementPatch) -> Result<Element, StoreError> {
        let mut elements = self.elements.write().await;
        let el = elements
            .get_mut(&id)
            .filter(|el| el.board_id == board_id)
            .ok_or(StoreError::NotFound(id))?;
        el.apply(patch);
        el.updated_at = now_ms();
        Ok(el.clone())
    }

    async fn delete_many(&self, board_id: BoardId, ids: &[ElementId]) -> Result<Vec<ElementId>, StoreError> {
        let mut elements = self.elements.write().await;
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            if elements.get(id).is_some_and(|el| el.board_id == board_id) {
                elements.remove(id);
                deleted.push(*id);
            }
        }
        Ok(deleted)
    }

    async fn max_z_index(&self, board_id: BoardId) -> Result<Option<i64>, StoreError> {
        let elements = self.elements.read().await;
        Ok(elements
            .values()
            .filter(|el| el.board_id == board_id)
            .map(|el| el.z_index)
            .max())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
