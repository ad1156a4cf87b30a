//! Undo/redo history of local edits.
//!
//! DESIGN
//! ======
//! Every edit is a `Command` that carries both its prior and its new state,
//! so `invert()` is exact and needs no access to the document. A command is
//! never applied directly: `effects()` lowers it to document `Effect`s, which
//! `apply_effects` runs against the `DocStore` and reports back as a `Replay`.
//! The session engine turns the applied effects into outbound mutations and
//! keeps the `before` snapshots for rollback.
//!
//! Peers may delete an element while a command touching it is still on a
//! stack. Replaying such a command skips the vanished element instead of
//! failing, and the skipped id is reported in `Replay::skipped`.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use wire::{Element, ElementId, ElementPatch, Style};

use crate::camera::Bounds;
use crate::doc::DocStore;

/// One invertible edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move { id: ElementId, from: (f64, f64), to: (f64, f64) },
    Resize { id: ElementId, from: Bounds, to: Bounds },
    Rotate { id: ElementId, from: f64, to: f64 },
    /// Z-order change.
    Reorder { id: ElementId, from: i64, to: i64 },
    Restyle { id: ElementId, from: Style, to: Style },
    Create { element: Element },
    Delete { element: Element },
    /// Clones placed by one duplicate action.
    Duplicate { clones: Vec<Element> },
    Composite(Vec<Command>),
}

impl Command {
    /// Collapse several commands into one undo step. `None` when empty.
    #[must_use]
    pub fn group(mut commands: Vec<Command>) -> Option<Command> {
        match commands.len() {
            0 => None,
            1 => commands.pop(),
            _ => Some(Command::Composite(commands)),
        }
    }

    /// The command that exactly reverses this one.
    #[must_use]
    pub fn invert(&self) -> Command {
        match self {
            Self::Move { id, from, to } => Self::Move { id: *id, from: *to, to: *from },
            Self::Resize { id, from, to } => Self::Resize { id: *id, from: *to, to: *from },
            Self::Rotate { id, from, to } => Self::Rotate { id: *id, from: *to, to: *from },
            Self::Reorder { id, from, to } => Self::Reorder { id: *id, from: *to, to: *from },
            Self::Restyle { id, from, to } => Self::Restyle { id: *id, from: to.clone(), to: from.clone() },
            Self::Create { element } => Self::Delete { element: element.clone() },
            Self::Delete { element } => Self::Create { element: element.clone() },
            Self::Duplicate { clones } => {
                Self::Composite(clones.iter().rev().map(|el| Self::Delete { element: el.clone() }).collect())
            }
            Self::Composite(members) => Self::Composite(members.iter().rev().map(Command::invert).collect()),
        }
    }

    /// Forward document mutations of this command, in application order.
    #[must_use]
    pub fn effects(&self) -> Vec<Effect> {
        let mut out = Vec::new();
        self.push_effects(&mut out);
        out
    }

    fn push_effects(&self, out: &mut Vec<Effect>) {
        match self {
            Self::Move { id, to, .. } => out.push(Effect::patch(*id, ElementPatch::position(to.0, to.1))),
            Self::Resize { id, to, .. } => {
                out.push(Effect::patch(*id, ElementPatch::bounds(to.x, to.y, to.width, to.height)));
            }
            Self::Rotate { id, to, .. } => out.push(Effect::patch(*id, ElementPatch::rotation(*to))),
            Self::Reorder { id, to, .. } => out.push(Effect::patch(*id, ElementPatch::z_index(*to))),
            Self::Restyle { id, to, .. } => out.push(Effect::patch(*id, ElementPatch::style(to.clone()))),
            Self::Create { element } => out.push(Effect::Insert(element.clone())),
            Self::Delete { element } => out.push(Effect::Remove(element.id)),
            Self::Duplicate { clones } => out.extend(clones.iter().cloned().map(Effect::Insert)),
            Self::Composite(members) => {
                for member in members {
                    member.push_effects(out);
                }
            }
        }
    }
}

/// A single document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Insert(Element),
    Patch { id: ElementId, patch: ElementPatch },
    Remove(ElementId),
}

impl Effect {
    #[must_use]
    pub fn patch(id: ElementId, patch: ElementPatch) -> Self {
        Self::Patch { id, patch }
    }

    #[must_use]
    pub fn id(&self) -> ElementId {
        match self {
            Self::Insert(el) => el.id,
            Self::Patch { id, .. } | Self::Remove(id) => *id,
        }
    }
}

/// Result of running effects against the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replay {
    /// Effects that took place, in order.
    pub applied: Vec<Effect>,
    /// Elements that no longer exist, so their part was skipped.
    pub skipped: Vec<ElementId>,
    /// State of each touched element before its first effect; `None` when it
    /// did not exist.
    pub before: Vec<(ElementId, Option<Element>)>,
}

/// Run `effects` against `doc`, skipping patches and removals of missing elements.
pub fn apply_effects(effects: Vec<Effect>, doc: &mut DocStore) -> Replay {
    let mut replay = Replay::default();
    for effect in effects {
        let id = effect.id();
        let prior = doc.get(&id).cloned();
        let took_place = match &effect {
            Effect::Insert(el) => {
                doc.insert(el.clone());
                true
            }
            Effect::Patch { id, patch } => doc.apply_patch(id, patch),
            Effect::Remove(id) => doc.remove(id).is_some(),
        };
        if !took_place {
            if !replay.skipped.contains(&id) {
                replay.skipped.push(id);
            }
            continue;
        }
        if !replay.before.iter().any(|(seen, _)| *seen == id) {
            replay.before.push((id, prior));
        }
        replay.applied.push(effect);
    }
    replay
}

/// Undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    limit: usize,
}

impl History {
    /// History keeping at most `limit` undo entries; `0` means unbounded.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { undo: VecDeque::new(), redo: Vec::new(), limit }
    }

    /// Push an already-applied command. Clears the redo stack.
    pub fn record(&mut self, command: Command) {
        self.undo.push_back(command);
        if self.limit > 0 && self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Revert the latest command. `None` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut DocStore) -> Option<Replay> {
        let command = self.undo.pop_back()?;
        let replay = apply_effects(command.invert().effects(), doc);
        self.redo.push(command);
        Some(replay)
    }

    /// Re-apply the latest undone command. `None` when there is nothing to redo.
    pub fn redo(&mut self, doc: &mut DocStore) -> Option<Replay> {
        let command = self.redo.pop()?;
        let replay = apply_effects(command.effects(), doc);
        self.undo.push_back(command);
        Some(replay)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}
