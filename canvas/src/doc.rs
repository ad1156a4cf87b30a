//! Document model: the in-memory replica of one board's elements.
//!
//! Elements arrive from the server snapshot and from broadcasts, and are
//! mutated optimistically by local edits. The store is keyed by element id;
//! paint order is always derived from `(z_index, id)` rather than stored.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use wire::{Element, ElementId, ElementPatch};

use crate::camera::Bounds;

/// Runtime store that owns every live element of the open board.
#[derive(Debug, Clone, Default)]
pub struct DocStore {
    elements: HashMap<ElementId, Element>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an element.
    pub fn insert(&mut self, el: Element) {
        self.elements.insert(el.id, el);
    }

    /// Remove an element by id, returning it if it was present.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        self.elements.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Apply a sparse patch. Returns false if the element doesn't exist.
    pub fn apply_patch(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        let Some(el) = self.elements.get_mut(id) else {
            return false;
        };
        el.apply(patch);
        true
    }

    /// Replace all elements with a full snapshot.
    pub fn load_snapshot(&mut self, elements: Vec<Element>) {
        self.elements = elements.into_iter().map(|el| (el.id, el)).collect();
    }

    /// All elements in paint order: `(z_index, id)` ascending.
    #[must_use]
    pub fn sorted_elements(&self) -> Vec<&Element> {
        let mut els: Vec<&Element> = self.elements.values().collect();
        els.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        els
    }

    /// `(id, z_index)` of every element, for z-order arithmetic.
    #[must_use]
    pub fn z_pairs(&self) -> Vec<(ElementId, i64)> {
        self.elements.values().map(|el| (el.id, el.z_index)).collect()
    }

    #[must_use]
    pub fn max_z(&self) -> Option<i64> {
        self.elements.values().map(|el| el.z_index).max()
    }

    #[must_use]
    pub fn min_z(&self) -> Option<i64> {
        self.elements.values().map(|el| el.z_index).min()
    }

    /// Union of every element's rotated bounds, or `None` for an empty board.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.elements.values().map(Bounds::rotated).reduce(|acc, b| acc.union(&b))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
