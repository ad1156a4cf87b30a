//! Session tuning knobs.

/// Per-session settings for the editing engine. Every field has a default
/// suited to an interactive browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Offset applied to duplicated elements, in world units.
    pub duplicate_offset: (f64, f64),
    /// Minimum gap between published cursor samples.
    pub cursor_publish_interval_ms: u64,
    /// A remote cursor without a sample for this long renders faded.
    pub cursor_idle_fade_ms: u64,
    /// Fraction of the remaining distance a remote cursor moves per tick.
    pub cursor_smoothing: f64,
    /// Undo entries kept before the oldest is dropped.
    pub history_limit: usize,
    /// Scale applied to PNG exports.
    pub export_pixel_ratio: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duplicate_offset: (20.0, 20.0),
            cursor_publish_interval_ms: 50,
            cursor_idle_fade_ms: 3000,
            cursor_smoothing: 0.35,
            history_limit: 200,
            export_pixel_ratio: 2.0,
        }
    }
}
