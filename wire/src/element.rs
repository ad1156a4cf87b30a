//! Element model: kinds, content payloads, style, and sparse patches.
//!
//! An [`Element`] is one placed object on a board. Mutations travel as
//! [`ElementPatch`] values where only present fields are applied.
//! [`ElementPatch::inverse_for`] captures the values a patch is about to
//! overwrite, which is what undo and optimistic rollback are built on.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a board element.
pub type ElementId = Uuid;
/// Unique identifier for a board.
pub type BoardId = Uuid;
/// Unique identifier for a user.
pub type UserId = Uuid;

// =============================================================================
// ERRORS
// =============================================================================

/// A malformed element or patch. Always rejected before any store call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
    #[error("opacity must be within 0..=1, got {0}")]
    OpacityOutOfRange(f64),
    #[error("{content} content does not fit a {kind} element")]
    ContentMismatch { kind: ElementKind, content: &'static str },
    #[error("frame {0} cannot contain itself")]
    SelfReference(ElementId),
    #[error("patch changes no fields")]
    EmptyPatch,
}

// =============================================================================
// KINDS AND CONTENT
// =============================================================================

/// The type of a board element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Image,
    Video,
    Text,
    Shape,
    Sticky,
    /// Container that groups other elements by reference.
    Frame,
}

impl ElementKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Text => "text",
            Self::Shape => "shape",
            Self::Sticky => "sticky",
            Self::Frame => "frame",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometric primitive drawn by a `shape` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Triangle,
    Line,
    Arrow,
}

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Uploaded image or video.
    Media {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail_url: Option<String>,
    },
    /// Text body of a text or sticky element.
    Text { body: String },
    Shape { shape: ShapeKind },
    /// Soft parent relation: ids of elements grouped by a frame.
    Frame {
        #[serde(default)]
        children: Vec<ElementId>,
    },
}

impl Content {
    /// Empty payload matching `kind`.
    #[must_use]
    pub fn placeholder(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Image | ElementKind::Video => Self::Media { url: String::new(), thumbnail_url: None },
            ElementKind::Text | ElementKind::Sticky => Self::Text { body: String::new() },
            ElementKind::Shape => Self::Shape { shape: ShapeKind::default() },
            ElementKind::Frame => Self::Frame { children: Vec::new() },
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Media { .. } => "media",
            Self::Text { .. } => "text",
            Self::Shape { .. } => "shape",
            Self::Frame { .. } => "frame",
        }
    }

    /// Whether this payload is valid for an element of `kind`.
    #[must_use]
    pub fn fits(&self, kind: ElementKind) -> bool {
        matches!(
            (self, kind),
            (Self::Media { .. }, ElementKind::Image | ElementKind::Video)
                | (Self::Text { .. }, ElementKind::Text | ElementKind::Sticky)
                | (Self::Shape { .. }, ElementKind::Shape)
                | (Self::Frame { .. }, ElementKind::Frame)
        )
    }

    /// Child ids of a frame payload; empty for every other payload.
    #[must_use]
    pub fn children(&self) -> &[ElementId] {
        match self {
            Self::Frame { children } => children,
            _ => &[],
        }
    }
}

// =============================================================================
// STYLE
// =============================================================================

/// Optional visual attributes. Replaced as a whole by a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Opacity in `0..=1`. Absent means fully opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<bool>,
}

impl Style {
    /// Effective opacity, defaulting to `1.0`.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.opacity.unwrap_or(1.0)
    }

    /// Check numeric attributes.
    ///
    /// # Errors
    ///
    /// Returns the first attribute that is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(opacity) = self.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ValidationError::OpacityOutOfRange(opacity));
            }
        }
        if let Some(width) = self.border_width {
            finite(width, "border_width")?;
        }
        if let Some(size) = self.font_size {
            positive(size, "font_size")?;
        }
        Ok(())
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// One placed object on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub board_id: BoardId,
    pub kind: ElementKind,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees around the bounding-box center.
    pub rotation: f64,
    /// Paint order; lower values are drawn beneath higher values. Not contiguous.
    pub z_index: i64,
    /// Claimed for exclusive editing. Blocks every mutation except its own clearing.
    pub locked: bool,
    pub content: Content,
    #[serde(default)]
    pub style: Style,
    pub created_by: Option<UserId>,
    /// Milliseconds since the Unix epoch. Stamped by the store.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Element {
    /// A 100x100 element of `kind` at the origin with placeholder content.
    #[must_use]
    pub fn new(board_id: BoardId, kind: ElementKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id,
            kind,
            position_x: 0.0,
            position_y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            z_index: 0,
            locked: false,
            content: Content::placeholder(kind),
            style: Style::default(),
            created_by: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Check geometry, style, and content invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        finite(self.position_x, "position_x")?;
        finite(self.position_y, "position_y")?;
        finite(self.rotation, "rotation")?;
        positive(self.width, "width")?;
        positive(self.height, "height")?;
        self.style.validate()?;
        if !self.content.fits(self.kind) {
            return Err(ValidationError::ContentMismatch { kind: self.kind, content: self.content.label() });
        }
        if self.content.children().contains(&self.id) {
            return Err(ValidationError::SelfReference(self.id));
        }
        Ok(())
    }

    /// Apply the present fields of `patch` in place. Timestamps are untouched.
    pub fn apply(&mut self, patch: &ElementPatch) {
        if let Some(x) = patch.position_x {
            self.position_x = x;
        }
        if let Some(y) = patch.position_y {
            self.position_y = y;
        }
        if let Some(w) = patch.width {
            self.width = w;
        }
        if let Some(h) = patch.height {
            self.height = h;
        }
        if let Some(r) = patch.rotation {
            self.rotation = r;
        }
        if let Some(z) = patch.z_index {
            self.z_index = z;
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(style) = &patch.style {
            self.style = style.clone();
        }
    }

    /// Copy of this element with `patch` applied.
    #[must_use]
    pub fn patched(&self, patch: &ElementPatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }

    /// Center of the bounding box.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.position_x + self.width / 2.0, self.position_y + self.height / 2.0)
    }
}

// =============================================================================
// PATCH
// =============================================================================

/// Sparse update for an element. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
}

impl ElementPatch {
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { position_x: Some(x), position_y: Some(y), ..Self::default() }
    }

    #[must_use]
    pub fn bounds(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { position_x: Some(x), position_y: Some(y), width: Some(width), height: Some(height), ..Self::default() }
    }

    #[must_use]
    pub fn rotation(degrees: f64) -> Self {
        Self { rotation: Some(degrees), ..Self::default() }
    }

    #[must_use]
    pub fn z_index(z: i64) -> Self {
        Self { z_index: Some(z), ..Self::default() }
    }

    #[must_use]
    pub fn locked(locked: bool) -> Self {
        Self { locked: Some(locked), ..Self::default() }
    }

    #[must_use]
    pub fn style(style: Style) -> Self {
        Self { style: Some(style), ..Self::default() }
    }

    #[must_use]
    pub fn content(content: Content) -> Self {
        Self { content: Some(content), ..Self::default() }
    }

    /// True when no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when the patch touches any field besides `locked`.
    #[must_use]
    pub fn touches_unlocked_fields(&self) -> bool {
        !Self { locked: None, ..self.clone() }.is_empty()
    }

    /// True for exactly `{locked: false}`.
    #[must_use]
    pub fn is_pure_unlock(&self) -> bool {
        self.locked == Some(false) && !self.touches_unlocked_fields()
    }

    /// Check that the patch is non-empty and every present value is in range.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(x) = self.position_x {
            finite(x, "position_x")?;
        }
        if let Some(y) = self.position_y {
            finite(y, "position_y")?;
        }
        if let Some(r) = self.rotation {
            finite(r, "rotation")?;
        }
        if let Some(w) = self.width {
            positive(w, "width")?;
        }
        if let Some(h) = self.height {
            positive(h, "height")?;
        }
        if let Some(style) = &self.style {
            style.validate()?;
        }
        Ok(())
    }

    /// Patch restoring the current values of `element` for exactly the
    /// fields this patch touches.
    #[must_use]
    pub fn inverse_for(&self, element: &Element) -> Self {
        Self {
            position_x: self.position_x.map(|_| element.position_x),
            position_y: self.position_y.map(|_| element.position_y),
            width: self.width.map(|_| element.width),
            height: self.height.map(|_| element.height),
            rotation: self.rotation.map(|_| element.rotation),
            z_index: self.z_index.map(|_| element.z_index),
            locked: self.locked.map(|_| element.locked),
            content: self.content.as_ref().map(|_| element.content.clone()),
            style: self.style.as_ref().map(|_| element.style.clone()),
        }
    }

    /// Fold `later` over this patch; fields present in `later` win.
    pub fn merge(&mut self, later: &Self) {
        self.position_x = later.position_x.or(self.position_x);
        self.position_y = later.position_y.or(self.position_y);
        self.width = later.width.or(self.width);
        self.height = later.height.or(self.height);
        self.rotation = later.rotation.or(self.rotation);
        self.z_index = later.z_index.or(self.z_index);
        self.locked = later.locked.or(self.locked);
        if later.content.is_some() {
            self.content.clone_from(&later.content);
        }
        if later.style.is_some() {
            self.style.clone_from(&later.style);
        }
    }
}

fn finite(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() { Ok(()) } else { Err(ValidationError::NonFinite { field }) }
}

fn positive(value: f64, field: &'static str) -> Result<(), ValidationError> {
    finite(value, field)?;
    if value > 0.0 { Ok(()) } else { Err(ValidationError::NonPositive { field }) }
}
