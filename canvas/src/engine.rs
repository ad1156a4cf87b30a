#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use wire::{BatchReport, BatchUpdate, BoardEvent, BoardId, Content, Element, ElementId, ElementPatch, Style, UserId};

use crate::camera::{Bounds, Camera, Point};
use crate::config::SessionConfig;
use crate::consts::WHEEL_ZOOM_STEP;
use crate::doc::DocStore;
use crate::export::{self, BoardDocument, ExportError};
use crate::history::{self, Command, Effect, History, Replay};
use crate::hit::hit_test;
use crate::input::{Button, InputState, Key, Modifiers, Shortcut, Tool, UiState, WheelDelta};
use crate::presence::{CursorThrottle, CursorView, RemoteCursors};
use crate::zorder;

/// Outbound mutations for the host to send to the server, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `element:create` with full elements; ids and z values are client-chosen.
    Create(Vec<Element>),
    /// `element:update` batch.
    Update(Vec<BatchUpdate>),
    /// `element:delete`.
    Delete(Vec<ElementId>),
    /// `cursor:moved` in board space.
    PublishCursor { x: f64, y: f64 },
}

impl Action {
    /// Element ids this action touches; empty for cursor publishes.
    #[must_use]
    pub fn ids(&self) -> Vec<ElementId> {
        match self {
            Self::Create(els) => els.iter().map(|el| el.id).collect(),
            Self::Update(updates) => updates.iter().map(|u| u.id).collect(),
            Self::Delete(ids) => ids.clone(),
            Self::PublishCursor { .. } => Vec::new(),
        }
    }
}

/// One editing session on one board.
///
/// Every input returns the outbound queue it produced. Local edits apply to
/// `doc` immediately; the pre-edit state of each touched element is kept in
/// `pending` until the server confirms or rejects the change.
pub struct EngineCore {
    pub board_id: BoardId,
    pub user_id: UserId,
    pub config: SessionConfig,
    pub doc: DocStore,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub history: History,
    pub cursors: RemoteCursors,
    throttle: CursorThrottle,
    /// Pre-edit snapshot per unconfirmed element; `None` for local creations.
    pending: HashMap<ElementId, Option<Element>>,
}

impl EngineCore {
    #[must_use]
    pub fn new(board_id: BoardId, user_id: UserId, config: SessionConfig) -> Self {
        Self {
            board_id,
            user_id,
            doc: DocStore::new(),
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            history: History::new(config.history_limit),
            cursors: RemoteCursors::new(&config),
            throttle: CursorThrottle::new(config.cursor_publish_interval_ms),
            pending: HashMap::new(),
            config,
        }
    }

    // =========================================================================
    // SERVER INPUTS
    // =========================================================================

    /// Hydrate the document from a join snapshot.
    pub fn load_snapshot(&mut self, elements: Vec<Element>) {
        self.doc.load_snapshot(elements);
        self.pending.clear();
        self.input = InputState::Idle;
        self.prune_selection();
    }

    /// Merge a broadcast. Server copies win over local state.
    pub fn apply_event(&mut self, event: &BoardEvent, now_ms: u64) {
        match event {
            BoardEvent::ElementsCreated(els) | BoardEvent::ElementsUpdated(els) => {
                for el in els {
                    if let Some(snapshot) = self.pending.get_mut(&el.id) {
                        *snapshot = Some(el.clone());
                    }
                    self.doc.insert(el.clone());
                }
            }
            BoardEvent::ElementsDeleted(ids) => {
                for id in ids {
                    self.doc.remove(id);
                    self.pending.remove(id);
                }
                self.prune_selection();
            }
            BoardEvent::CursorMoved(sample) => self.cursors.observe(sample, now_ms),
            BoardEvent::PeerLeft { client_id } => {
                self.cursors.remove(client_id);
            }
        }
    }

    /// Settle an `element:update` reply: adopt applied copies, roll back rejections.
    pub fn reconcile(&mut self, report: &BatchReport) {
        for el in &report.applied {
            self.pending.remove(&el.id);
            self.doc.insert(el.clone());
        }
        self.rollback(&report.rejected_ids());
    }

    /// Undo optimistic state for `ids` after the server refused the change.
    pub fn rollback(&mut self, ids: &[ElementId]) {
        for id in ids {
            match self.pending.remove(id) {
                Some(Some(snapshot)) => self.doc.insert(snapshot),
                Some(None) => {
                    self.doc.remove(id);
                }
                None => {}
            }
        }
        self.prune_selection();
    }

    /// Settle an `element:create` reply with the stored copies.
    pub fn confirm_created(&mut self, elements: &[Element]) {
        for el in elements {
            self.pending.remove(&el.id);
            self.doc.insert(el.clone());
        }
    }

    /// Forget snapshots for changes the server accepted without returning
    /// copies (`element:delete`).
    pub fn settle(&mut self, ids: &[ElementId]) {
        for id in ids {
            self.pending.remove(id);
        }
    }

    /// Number of elements with unconfirmed local changes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // =========================================================================
    // POINTER / KEYBOARD
    // =========================================================================

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, mods: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen);
        match button {
            Button::Middle => {
                self.input = InputState::Panning { last_screen: screen };
                Vec::new()
            }
            Button::Secondary => Vec::new(),
            Button::Primary if self.ui.tool.creates() => self.place(self.ui.tool, world),
            Button::Primary => {
                match hit_test(world, &self.doc) {
                    Some(id) => {
                        if mods.shift {
                            self.ui.toggle(id);
                        } else if !self.ui.is_selected(&id) {
                            self.ui.selection = vec![id];
                        }
                        self.input = if self.ui.is_selected(&id) { self.begin_drag(world) } else { InputState::Idle };
                    }
                    None => {
                        if !mods.shift {
                            self.ui.selection.clear();
                        }
                        self.input = InputState::Panning { last_screen: screen };
                    }
                }
                Vec::new()
            }
        }
    }

    pub fn on_pointer_move(&mut self, screen: Point, now_ms: u64) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen);
        match &mut self.input {
            InputState::Idle => {}
            InputState::Panning { last_screen } => {
                let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                self.camera.pan_by(dx, dy);
            }
            InputState::Dragging { last_world, origins } => {
                let (dx, dy) = (world.x - last_world.x, world.y - last_world.y);
                *last_world = world;
                for (id, _, _) in origins.iter() {
                    if let Some(el) = self.doc.get(id) {
                        let patch = ElementPatch::position(el.position_x + dx, el.position_y + dy);
                        self.doc.apply_patch(id, &patch);
                    }
                }
            }
        }
        // Cursor samples are in board space, after the pan above.
        let world = self.camera.screen_to_world(screen);
        self.throttle
            .offer(world, now_ms)
            .map(|p| Action::PublishCursor { x: p.x, y: p.y })
            .into_iter()
            .collect()
    }

    /// Finish the gesture. A drag becomes one recorded move and one batch update.
    pub fn on_pointer_up(&mut self, _screen: Point) -> Vec<Action> {
        let InputState::Dragging { origins, .. } = std::mem::take(&mut self.input) else {
            return Vec::new();
        };
        let mut moves = Vec::new();
        for (id, x, y) in origins {
            let Some(el) = self.doc.get(&id) else {
                continue;
            };
            let to = (el.position_x, el.position_y);
            if to != (x, y) {
                // Put the preview back so the commit captures the true prior state.
                self.doc.apply_patch(&id, &ElementPatch::position(x, y));
                moves.push(Command::Move { id, from: (x, y), to });
            }
        }
        self.commit(moves)
    }

    /// Shortcuts end any gesture in progress; a drag snaps back unrecorded.
    /// Drop the current gesture. Dragged elements return to their start
    /// positions; nothing is recorded or sent.
    fn cancel_gesture(&mut self) {
        if let InputState::Dragging { origins, .. } = std::mem::take(&mut self.input) {
            for (id, x, y) in origins {
                self.doc.apply_patch(&id, &ElementPatch::position(x, y));
            }
        }
    }

    pub fn on_key_down(&mut self, key: &Key, mods: Modifiers) -> Vec<Action> {
        let Some(shortcut) = Shortcut::parse(key, mods) else {
            return Vec::new();
        };
        self.cancel_gesture();
        match shortcut {
            Shortcut::SelectTool(tool) => {
                self.set_tool(tool);
                Vec::new()
            }
            Shortcut::Cancel => {
                self.set_tool(Tool::Select);
                Vec::new()
            }
            Shortcut::DeleteSelection => self.delete_selection(),
            Shortcut::Duplicate => self.duplicate_selection(),
            Shortcut::Undo => self.undo(),
            Shortcut::Redo => self.redo(),
            Shortcut::BringForward => self.bring_forward(),
            Shortcut::SendBackward => self.send_backward(),
            Shortcut::BringToFront => self.bring_to_front(),
            Shortcut::SendToBack => self.send_to_back(),
            Shortcut::Nudge { dx, dy } => self.nudge(dx, dy),
        }
    }

    /// Scroll pans; with Ctrl/Cmd held it zooms around the pointer.
    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, mods: Modifiers) {
        if mods.command() {
            let zoom = self.camera.zoom * (1.0 - delta.dy * WHEEL_ZOOM_STEP);
            self.camera.zoom_at(screen, zoom);
        } else {
            self.camera.pan_by(-delta.dx, -delta.dy);
        }
    }

    /// Per-frame housekeeping: smooth remote cursors and flush a held cursor sample.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Action> {
        self.cursors.tick();
        self.throttle
            .flush(now_ms)
            .map(|p| Action::PublishCursor { x: p.x, y: p.y })
            .into_iter()
            .collect()
    }

    // =========================================================================
    // EDITING
    // =========================================================================

    /// Switch tool; any tool change clears the selection.
    pub fn set_tool(&mut self, tool: Tool) {
        self.ui.tool = tool;
        self.ui.selection.clear();
        self.cancel_gesture();
    }

    pub fn undo(&mut self) -> Vec<Action> {
        match self.history.undo(&mut self.doc) {
            Some(replay) => self.absorb(replay),
            None => Vec::new(),
        }
    }

    pub fn redo(&mut self) -> Vec<Action> {
        match self.history.redo(&mut self.doc) {
            Some(replay) => self.absorb(replay),
            None => Vec::new(),
        }
    }

    /// Delete the unlocked part of the selection as one undo step.
    pub fn delete_selection(&mut self) -> Vec<Action> {
        let deletes: Vec<Command> = self
            .selected_elements()
            .into_iter()
            .filter(|el| !el.locked)
            .map(|element| Command::Delete { element })
            .collect();
        self.commit(deletes)
    }

    /// Clone the selection with fresh ids, offset and stacked above the board.
    /// Frame children inside the selection are remapped to their clones;
    /// children outside it are dropped from the cloned frame.
    pub fn duplicate_selection(&mut self) -> Vec<Action> {
        let originals = self.selected_elements();
        if originals.is_empty() {
            return Vec::new();
        }
        let ids: HashMap<ElementId, ElementId> = originals.iter().map(|el| (el.id, Uuid::new_v4())).collect();
        let base = zorder::next_above(self.doc.max_z());
        let (dx, dy) = self.config.duplicate_offset;

        let mut clones = Vec::with_capacity(originals.len());
        for (el, z_index) in originals.into_iter().zip(zorder::ascending(base)) {
            let mut clone = el;
            clone.id = ids.get(&clone.id).copied().unwrap_or_else(Uuid::new_v4);
            clone.position_x += dx;
            clone.position_y += dy;
            clone.z_index = z_index;
            clone.locked = false;
            clone.created_by = Some(self.user_id);
            if let Content::Frame { children } = &mut clone.content {
                *children = children.iter().filter_map(|c| ids.get(c).copied()).collect();
            }
            clones.push(clone);
        }

        let selection = clones.iter().map(|el| el.id).collect();
        let actions = self.commit(vec![Command::Duplicate { clones }]);
        self.ui.selection = selection;
        actions
    }

    pub fn bring_to_front(&mut self) -> Vec<Action> {
        self.reorder(zorder::bring_to_front)
    }

    pub fn send_to_back(&mut self) -> Vec<Action> {
        self.reorder(zorder::send_to_back)
    }

    pub fn bring_forward(&mut self) -> Vec<Action> {
        self.reorder(zorder::bring_forward)
    }

    pub fn send_backward(&mut self) -> Vec<Action> {
        self.reorder(zorder::send_backward)
    }

    /// Move the unlocked part of the selection by a board-space delta.
    pub fn nudge(&mut self, dx: f64, dy: f64) -> Vec<Action> {
        let moves = self
            .selected_elements()
            .into_iter()
            .filter(|el| !el.locked)
            .map(|el| Command::Move {
                id: el.id,
                from: (el.position_x, el.position_y),
                to: (el.position_x + dx, el.position_y + dy),
            })
            .collect();
        self.commit(moves)
    }

    /// Set an element's box. Locked, missing, or degenerate targets are ignored.
    pub fn resize_element(&mut self, id: ElementId, to: Bounds) -> Vec<Action> {
        if !(to.width > 0.0 && to.height > 0.0 && to.x.is_finite() && to.y.is_finite()) {
            return Vec::new();
        }
        match self.editable(&id) {
            Some(el) => {
                let from = Bounds::of(el);
                self.commit(vec![Command::Resize { id, from, to }])
            }
            None => Vec::new(),
        }
    }

    pub fn rotate_element(&mut self, id: ElementId, degrees: f64) -> Vec<Action> {
        if !degrees.is_finite() {
            return Vec::new();
        }
        match self.editable(&id) {
            Some(el) => {
                let from = el.rotation;
                self.commit(vec![Command::Rotate { id, from, to: degrees }])
            }
            None => Vec::new(),
        }
    }

    /// Replace the style of every unlocked selected element.
    pub fn restyle_selection(&mut self, style: &Style) -> Vec<Action> {
        let edits = self
            .selected_elements()
            .into_iter()
            .filter(|el| !el.locked && el.style != *style)
            .map(|el| Command::Restyle { id: el.id, from: el.style, to: style.clone() })
            .collect();
        self.commit(edits)
    }

    /// Claim or release an element. Not part of the undo history.
    pub fn set_locked(&mut self, id: ElementId, locked: bool) -> Vec<Action> {
        match self.doc.get(&id) {
            Some(el) if el.locked != locked => {
                let effect = Effect::patch(id, ElementPatch::locked(locked));
                let replay = history::apply_effects(vec![effect], &mut self.doc);
                self.absorb(replay)
            }
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // QUERIES / EXPORT
    // =========================================================================

    #[must_use]
    pub fn selection(&self) -> &[ElementId] {
        &self.ui.selection
    }

    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.doc.get(id)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn cursor_views(&self, now_ms: u64) -> Vec<CursorView> {
        self.cursors.views(now_ms)
    }

    #[must_use]
    pub fn export_document(&self, exported_at: i64) -> BoardDocument {
        export::export_document(&self.doc, self.board_id, exported_at)
    }

    /// # Errors
    ///
    /// See [`export::to_json`].
    pub fn export_json(&self, exported_at: i64) -> Result<String, ExportError> {
        export::to_json(&self.export_document(exported_at))
    }

    /// # Errors
    ///
    /// See [`export::export_png`].
    pub fn export_png(&self) -> Result<Vec<u8>, ExportError> {
        export::export_png(&self.doc, self.config.export_pixel_ratio)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Place an element of `tool`'s kind centred on `world`, select it, and
    /// return to the select tool.
    fn place(&mut self, tool: Tool, world: Point) -> Vec<Action> {
        let Some((kind, content, (width, height))) = tool.template() else {
            return Vec::new();
        };
        let mut element = Element::new(self.board_id, kind);
        element.content = content;
        element.width = width;
        element.height = height;
        element.position_x = world.x - width / 2.0;
        element.position_y = world.y - height / 2.0;
        element.z_index = zorder::next_above(self.doc.max_z());
        element.created_by = Some(self.user_id);
        let id = element.id;

        let actions = self.commit(vec![Command::Create { element }]);
        self.ui.tool = Tool::Select;
        self.ui.selection = vec![id];
        actions
    }

    fn begin_drag(&self, world: Point) -> InputState {
        let origins: Vec<(ElementId, f64, f64)> = self
            .selected_elements()
            .into_iter()
            .filter(|el| !el.locked)
            .map(|el| (el.id, el.position_x, el.position_y))
            .collect();
        if origins.is_empty() {
            return InputState::Idle;
        }
        InputState::Dragging { last_world: world, origins }
    }

    fn reorder(&mut self, op: fn(&[(ElementId, i64)], &[ElementId]) -> Vec<(ElementId, i64)>) -> Vec<Action> {
        let selection = self.ui.selection.clone();
        let changes = op(&self.doc.z_pairs(), &selection);
        let commands = changes
            .into_iter()
            .filter_map(|(id, to)| self.doc.get(&id).map(|el| Command::Reorder { id, from: el.z_index, to }))
            .collect();
        self.commit(commands)
    }

    /// Selected elements that still exist, in stacking order.
    fn selected_elements(&self) -> Vec<Element> {
        let selected: HashSet<&ElementId> = self.ui.selection.iter().collect();
        self.doc
            .sorted_elements()
            .into_iter()
            .filter(|el| selected.contains(&el.id))
            .cloned()
            .collect()
    }

    fn editable(&self, id: &ElementId) -> Option<&Element> {
        self.doc.get(id).filter(|el| !el.locked)
    }

    /// Apply commands as one undo step and emit their mutations.
    fn commit(&mut self, commands: Vec<Command>) -> Vec<Action> {
        let Some(command) = Command::group(commands) else {
            return Vec::new();
        };
        let replay = history::apply_effects(command.effects(), &mut self.doc);
        self.history.record(command);
        self.absorb(replay)
    }

    /// Keep rollback snapshots and lower applied effects to actions.
    fn absorb(&mut self, replay: Replay) -> Vec<Action> {
        for (id, before) in replay.before {
            self.pending.entry(id).or_insert(before);
        }
        self.prune_selection();
        to_actions(replay.applied)
    }

    fn prune_selection(&mut self) {
        let doc = &self.doc;
        self.ui.selection.retain(|id| doc.contains(id));
    }
}

/// Coalesce consecutive effects of the same kind into one action each.
fn to_actions(effects: Vec<Effect>) -> Vec<Action> {
    let mut actions: Vec<Action> = Vec::new();
    for effect in effects {
        let unmerged = match (actions.last_mut(), effect) {
            (Some(Action::Create(els)), Effect::Insert(el)) => {
                els.push(el);
                None
            }
            (Some(Action::Update(updates)), Effect::Patch { id, patch }) => {
                // Later patches of an element already in this batch fold into its entry.
                match updates.iter_mut().find(|u| u.id == id) {
                    Some(existing) => existing.patch.merge(&patch),
                    None => updates.push(BatchUpdate::new(id, patch)),
                }
                None
            }
            (Some(Action::Delete(ids)), Effect::Remove(id)) => {
                ids.push(id);
                None
            }
            (_, effect) => Some(effect),
        };
        if let Some(effect) = unmerged {
            actions.push(match effect {
                Effect::Insert(el) => Action::Create(vec![el]),
                Effect::Patch { id, patch } => Action::Update(vec![BatchUpdate::new(id, patch)]),
                Effect::Remove(id) => Action::Delete(vec![id]),
            });
        }
    }
    actions
}
