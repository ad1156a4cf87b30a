#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use wire::{Element, ElementId};

use crate::camera::{Bounds, Point};
use crate::doc::DocStore;

/// Topmost element under `world_pt`, honouring rotation.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore) -> Option<ElementId> {
    doc.sorted_elements()
        .into_iter()
        .rev()
        .find(|el| contains(el, world_pt))
        .map(|el| el.id)
}

/// Whether `world_pt` lies inside the element's rotated box.
#[must_use]
pub fn contains(el: &Element, world_pt: Point) -> bool {
    let b = Bounds::of(el);
    let local = world_pt.rotated_about(b.center(), -el.rotation);
    b.contains(local)
}
