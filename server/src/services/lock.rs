//! Lock guard.
//!
//! A locked element is claimed for exclusive editing. The only mutation it
//! accepts is its own release: a patch of exactly `{locked: false}`. An unlock
//! bundled with any other field is denied as a whole, so a release can never
//! smuggle an edit past the lock. Denials are per element and never fail a
//! whole batch.

use wire::{Element, ElementId, ElementPatch, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("element {element_id} is locked")]
pub struct LockDenial {
    pub element_id: ElementId,
}

impl ErrorCode for LockDenial {
    fn error_code(&self) -> &'static str {
        "E_ELEMENT_LOCKED"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDecision {
    Allow,
    Deny(LockDenial),
}

/// Decide whether `patch` may be applied to `element`.
#[must_use]
pub fn can_apply(element: &Element, patch: &ElementPatch) -> LockDecision {
    if !element.locked || patch.is_pure_unlock() {
        LockDecision::Allow
    } else {
        LockDecision::Deny(LockDenial { element_id: element.id })
    }
}

/// Decide whether `element` may be deleted.
#[must_use]
pub fn can_remove(element: &Element) -> LockDecision {
    if element.locked {
        LockDecision::Deny(LockDenial { element_id: element.id })
    } else {
        LockDecision::Allow
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
