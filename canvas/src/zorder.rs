//! Z-order arithmetic on `(id, z_index)` pairs.
//!
//! Stacking order is `(z_index, id)` ascending, so equal z values are still
//! totally ordered. Every operation returns only the pairs whose z changed,
//! as `(id, new_z)`, in stacking order of the result.

#[cfg(test)]
#[path = "zorder_test.rs"]
mod zorder_test;

use std::collections::{HashMap, HashSet};

use wire::ElementId;

/// Move the selection above everything else, keeping its internal order.
/// A selection already strictly above every other z is left alone.
#[must_use]
pub fn bring_to_front(pairs: &[(ElementId, i64)], selection: &[ElementId]) -> Vec<(ElementId, i64)> {
    let selected: HashSet<ElementId> = selection.iter().copied().collect();
    let (picked, others) = partition(pairs, &selected);
    let (Some(lowest_picked), Some(top)) = (picked.first(), others.iter().map(|(_, z)| *z).max()) else {
        return Vec::new();
    };
    if lowest_picked.1 > top {
        return Vec::new();
    }
    let next = picked.iter().zip(ascending(next_above(Some(top)))).map(|((id, _), z)| (*id, z));
    changed(pairs, next.collect())
}

/// Move the selection below everything else, keeping its internal order.
/// A selection already strictly below every other z is left alone.
#[must_use]
pub fn send_to_back(pairs: &[(ElementId, i64)], selection: &[ElementId]) -> Vec<(ElementId, i64)> {
    let selected: HashSet<ElementId> = selection.iter().copied().collect();
    let (picked, others) = partition(pairs, &selected);
    let (Some(highest_picked), Some(bottom)) = (picked.last(), others.iter().map(|(_, z)| *z).min()) else {
        return Vec::new();
    };
    if highest_picked.1 < bottom {
        return Vec::new();
    }
    let count = i64::try_from(picked.len()).unwrap_or(i64::MAX);
    let next = picked.iter().zip(ascending(bottom.saturating_sub(count))).map(|((id, _), z)| (*id, z));
    changed(pairs, next.collect())
}

/// Step each selected element above its nearest non-selected neighbour.
#[must_use]
pub fn bring_forward(pairs: &[(ElementId, i64)], selection: &[ElementId]) -> Vec<(ElementId, i64)> {
    step(pairs, selection, Direction::Up)
}

/// Step each selected element below its nearest non-selected neighbour.
#[must_use]
pub fn send_backward(pairs: &[(ElementId, i64)], selection: &[ElementId]) -> Vec<(ElementId, i64)> {
    step(pairs, selection, Direction::Down)
}

/// Renumber everything to `0..n` in stacking order.
#[must_use]
pub fn compact(pairs: &[(ElementId, i64)]) -> Vec<(ElementId, i64)> {
    let next = stacking(pairs).into_iter().zip(0..).map(|((id, _), z)| (id, z)).collect();
    changed(pairs, next)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

fn step(pairs: &[(ElementId, i64)], selection: &[ElementId], dir: Direction) -> Vec<(ElementId, i64)> {
    let selected: HashSet<ElementId> = selection.iter().copied().collect();
    let mut z: HashMap<ElementId, i64> = pairs.iter().copied().collect();

    // Leading element first, so a group steps without leapfrogging itself.
    let mut movers: Vec<(ElementId, i64)> = stacking(pairs).into_iter().filter(|(id, _)| selected.contains(id)).collect();
    if dir == Direction::Up {
        movers.reverse();
    }

    for (id, _) in movers {
        let current: Vec<(ElementId, i64)> = stacking(&z.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>());
        let Some(pos) = current.iter().position(|(other, _)| *other == id) else {
            continue;
        };
        let neighbour = match dir {
            Direction::Up => current[pos + 1..].iter().find(|(other, _)| !selected.contains(other)),
            Direction::Down => current[..pos].iter().rev().find(|(other, _)| !selected.contains(other)),
        };
        let Some(&(other, other_z)) = neighbour else {
            continue;
        };
        let own_z = current[pos].1;
        if own_z == other_z {
            let stepped = match dir {
                Direction::Up => other_z.saturating_add(1),
                Direction::Down => other_z.saturating_sub(1),
            };
            z.insert(id, stepped);
        } else {
            z.insert(id, other_z);
            z.insert(other, own_z);
        }
    }
    changed(pairs, z.into_iter().collect())
}

/// The z that stacks directly above `top`, or `0` on an empty board.
#[must_use]
pub fn next_above(top: Option<i64>) -> i64 {
    top.map_or(0, |z| z.saturating_add(1))
}

/// Consecutive z values starting at `base`, saturating at `i64::MAX`.
pub fn ascending(base: i64) -> impl Iterator<Item = i64> {
    std::iter::successors(Some(base), |z| Some(z.saturating_add(1)))
}

/// Selected and non-selected pairs, each in stacking order.
fn partition(
    pairs: &[(ElementId, i64)],
    selected: &HashSet<ElementId>,
) -> (Vec<(ElementId, i64)>, Vec<(ElementId, i64)>) {
    stacking(pairs).into_iter().partition(|(id, _)| selected.contains(id))
}

fn stacking(pairs: &[(ElementId, i64)]) -> Vec<(ElementId, i64)> {
    let mut order = pairs.to_vec();
    order.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    order
}

fn changed(before: &[(ElementId, i64)], after: Vec<(ElementId, i64)>) -> Vec<(ElementId, i64)> {
    let original: HashMap<ElementId, i64> = before.iter().copied().collect();
    let diff: Vec<(ElementId, i64)> =
        after.into_iter().filter(|(id, z)| original.get(id).is_some_and(|old| old != z)).collect();
    stacking(&diff)
}
