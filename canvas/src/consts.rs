//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 8.0;

/// Zoom change per wheel pixel when zooming with a modifier held.
pub const WHEEL_ZOOM_STEP: f64 = 0.001;

// ── Editing ─────────────────────────────────────────────────────

/// Arrow-key nudge distance in world units.
pub const NUDGE_STEP: f64 = 1.0;

/// Arrow-key nudge distance with shift held.
pub const NUDGE_STEP_LARGE: f64 = 10.0;

/// Default size of an element placed with a creation tool, `(width, height)`.
pub const DEFAULT_SHAPE_SIZE: (f64, f64) = (160.0, 100.0);
pub const DEFAULT_TEXT_SIZE: (f64, f64) = (200.0, 40.0);
pub const DEFAULT_STICKY_SIZE: (f64, f64) = (180.0, 180.0);
pub const DEFAULT_FRAME_SIZE: (f64, f64) = (480.0, 320.0);

// ── Presence ────────────────────────────────────────────────────

/// Opacity of a remote cursor that has been idle past the fade window.
pub const FADED_CURSOR_OPACITY: f64 = 0.35;

// ── Export ──────────────────────────────────────────────────────

/// Largest PNG side in pixels, after scaling.
pub const MAX_EXPORT_SIDE_PX: u32 = 8192;

/// World-space margin around the content bounds of an exported image.
pub const EXPORT_PADDING: f64 = 24.0;

/// `BoardDocument.format` tag.
pub const EXPORT_FORMAT: &str = "board-document";

/// `BoardDocument.version`.
pub const EXPORT_VERSION: u32 = 1;
