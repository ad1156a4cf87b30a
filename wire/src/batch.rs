//! Batch update requests and their partial-success report.
//!
//! A batch mutates many elements in one call with no atomicity across
//! elements. The report lists the server copy of every applied element and
//! a reason for every rejected one, in request order, so the caller can
//! reconcile its optimistic local state.

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId, ElementPatch};

/// Default upper bound on entries in one batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// One entry of a batch: an element id plus the fields to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub id: ElementId,
    #[serde(flatten)]
    pub patch: ElementPatch,
}

impl BatchUpdate {
    #[must_use]
    pub fn new(id: ElementId, patch: ElementPatch) -> Self {
        Self { id, patch }
    }
}

/// Why a single entry of a batch was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The id does not exist on the target board.
    NotFound,
    /// The element is locked and the entry is not a pure unlock.
    Locked,
    /// The store failed for this element.
    StoreError,
}

impl RejectReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Locked => "locked",
            Self::StoreError => "store_error",
        }
    }
}

/// A rejected batch entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub id: ElementId,
    pub reason: RejectReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Rejection {
    #[must_use]
    pub fn new(id: ElementId, reason: RejectReason) -> Self {
        Self { id, reason, message: None }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Outcome of a batch call. `applied.len() + rejected.len() == total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub applied: Vec<Element>,
    pub rejected: Vec<Rejection>,
    pub total: usize,
}

impl BatchReport {
    #[must_use]
    pub fn rejected_ids(&self) -> Vec<ElementId> {
        self.rejected.iter().map(|r| r.id).collect()
    }

    /// True when every entry was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty() && self.applied.len() == self.total
    }
}
