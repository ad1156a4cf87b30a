//! Input model: tools, modifier keys, keyboard shortcuts, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `Shortcut` is the decoded meaning of a key press. `InputState` is
//! the active gesture tracked between pointer-down and pointer-up, carrying
//! the context needed to emit one recorded command on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use wire::{Content, ElementId, ElementKind, ShapeKind};

use crate::camera::Point;
use crate::consts::{
    DEFAULT_FRAME_SIZE, DEFAULT_SHAPE_SIZE, DEFAULT_STICKY_SIZE, DEFAULT_TEXT_SIZE, NUDGE_STEP, NUDGE_STEP_LARGE,
};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    Text,
    Rectangle,
    Circle,
    Sticky,
    Frame,
}

impl Tool {
    /// Tool bound to a single-letter shortcut.
    #[must_use]
    pub fn from_shortcut(key: &str) -> Option<Self> {
        match key {
            "v" => Some(Self::Select),
            "t" => Some(Self::Text),
            "r" => Some(Self::Rectangle),
            "o" => Some(Self::Circle),
            "s" => Some(Self::Sticky),
            "f" => Some(Self::Frame),
            _ => None,
        }
    }

    /// Whether pointer-down with this tool places a new element.
    #[must_use]
    pub fn creates(self) -> bool {
        self != Self::Select
    }

    /// Kind, initial content, and default size of the element this tool places.
    #[must_use]
    pub fn template(self) -> Option<(ElementKind, Content, (f64, f64))> {
        match self {
            Self::Select => None,
            Self::Text => Some((ElementKind::Text, Content::placeholder(ElementKind::Text), DEFAULT_TEXT_SIZE)),
            Self::Rectangle => {
                Some((ElementKind::Shape, Content::Shape { shape: ShapeKind::Rectangle }, DEFAULT_SHAPE_SIZE))
            }
            Self::Circle => Some((ElementKind::Shape, Content::Shape { shape: ShapeKind::Circle }, DEFAULT_SHAPE_SIZE)),
            Self::Sticky => Some((ElementKind::Sticky, Content::placeholder(ElementKind::Sticky), DEFAULT_STICKY_SIZE)),
            Self::Frame => Some((ElementKind::Frame, Content::placeholder(ElementKind::Frame), DEFAULT_FRAME_SIZE)),
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive = down.
    pub dy: f64,
}

/// Decoded meaning of a key press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortcut {
    SelectTool(Tool),
    Cancel,
    DeleteSelection,
    Duplicate,
    Undo,
    Redo,
    BringForward,
    SendBackward,
    BringToFront,
    SendToBack,
    Nudge { dx: f64, dy: f64 },
}

impl Shortcut {
    /// Decode a key press. Unbound keys yield `None`.
    #[must_use]
    pub fn parse(key: &Key, mods: Modifiers) -> Option<Self> {
        let name = key.0.as_str();
        let step = if mods.shift { NUDGE_STEP_LARGE } else { NUDGE_STEP };
        match name {
            "Escape" => return Some(Self::Cancel),
            "Delete" | "Backspace" => return Some(Self::DeleteSelection),
            "ArrowLeft" => return Some(Self::Nudge { dx: -step, dy: 0.0 }),
            "ArrowRight" => return Some(Self::Nudge { dx: step, dy: 0.0 }),
            "ArrowUp" => return Some(Self::Nudge { dx: 0.0, dy: -step }),
            "ArrowDown" => return Some(Self::Nudge { dx: 0.0, dy: step }),
            _ => {}
        }

        let lower = name.to_ascii_lowercase();
        if mods.command() {
            return match lower.as_str() {
                "z" if mods.shift => Some(Self::Redo),
                "z" => Some(Self::Undo),
                "y" => Some(Self::Redo),
                "d" => Some(Self::Duplicate),
                "]" => Some(Self::BringToFront),
                "[" => Some(Self::SendToBack),
                _ => None,
            };
        }
        match lower.as_str() {
            "]" => Some(Self::BringForward),
            "[" => Some(Self::SendBackward),
            other if !mods.alt => Tool::from_shortcut(other).map(Self::SelectTool),
            _ => None,
        }
    }
}

/// Persistent UI state visible to the host.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub tool: Tool,
    /// Selected element ids in selection order.
    pub selection: Vec<ElementId>,
}

impl UiState {
    #[must_use]
    pub fn is_selected(&self, id: &ElementId) -> bool {
        self.selection.contains(id)
    }

    /// Add `id` if absent, remove it if present.
    pub fn toggle(&mut self, id: ElementId) {
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
        } else {
            self.selection.push(id);
        }
    }
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging empty canvas or with the middle button.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving the unlocked part of the selection.
    Dragging {
        /// Board-space pointer position at the previous event.
        last_world: Point,
        /// Position of each dragged element when the gesture started.
        origins: Vec<(ElementId, f64, f64)>,
    },
}
