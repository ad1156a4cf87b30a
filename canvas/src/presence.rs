//! Presence: outbound cursor throttling and smoothed remote cursors.
//!
//! All timestamps are caller-supplied milliseconds, so the module stays pure
//! and deterministic under test.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;

use uuid::Uuid;
use wire::{CursorSample, UserId};

use crate::camera::Point;
use crate::config::SessionConfig;
use crate::consts::FADED_CURSOR_OPACITY;

/// Distance below which a smoothed cursor snaps onto its target.
const SNAP_DISTANCE: f64 = 0.01;

// =============================================================================
// OUTBOUND
// =============================================================================

/// Rate limiter for the local cursor. At most one sample per interval; the
/// latest suppressed sample waits for the next allowed tick.
#[derive(Debug, Clone)]
pub struct CursorThrottle {
    interval_ms: u64,
    last_sent: Option<u64>,
    pending: Option<Point>,
}

impl CursorThrottle {
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self { interval_ms, last_sent: None, pending: None }
    }

    /// Offer a new board-space position. Returns it when it may be published now.
    pub fn offer(&mut self, point: Point, now_ms: u64) -> Option<Point> {
        if self.allowed(now_ms) {
            self.last_sent = Some(now_ms);
            self.pending = None;
            return Some(point);
        }
        self.pending = Some(point);
        None
    }

    /// Release the held sample if the interval has elapsed.
    pub fn flush(&mut self, now_ms: u64) -> Option<Point> {
        if self.pending.is_none() || !self.allowed(now_ms) {
            return None;
        }
        self.last_sent = Some(now_ms);
        self.pending.take()
    }

    fn allowed(&self, now_ms: u64) -> bool {
        self.last_sent.is_none_or(|sent| now_ms.saturating_sub(sent) >= self.interval_ms)
    }
}

// =============================================================================
// INBOUND
// =============================================================================

#[derive(Debug, Clone)]
struct RemoteCursor {
    user_id: UserId,
    name: String,
    color: String,
    position: Point,
    target: Point,
    last_seen_ms: u64,
}

/// Render-ready view of one remote cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorView {
    pub client_id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub color: String,
    pub position: Point,
    pub opacity: f64,
}

/// Remote cursors keyed by connection.
#[derive(Debug, Clone)]
pub struct RemoteCursors {
    cursors: HashMap<Uuid, RemoteCursor>,
    smoothing: f64,
    fade_after_ms: u64,
}

impl RemoteCursors {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cursors: HashMap::new(),
            smoothing: config.cursor_smoothing.clamp(0.0, 1.0),
            fade_after_ms: config.cursor_idle_fade_ms,
        }
    }

    /// Record a sample. The first sample of a client snaps; later ones become
    /// the interpolation target.
    pub fn observe(&mut self, sample: &CursorSample, now_ms: u64) {
        let target = Point::new(sample.x, sample.y);
        let cursor = self.cursors.entry(sample.client_id).or_insert_with(|| RemoteCursor {
            user_id: sample.user_id,
            name: sample.name.clone(),
            color: sample.color.clone(),
            position: target,
            target,
            last_seen_ms: now_ms,
        });
        cursor.name.clone_from(&sample.name);
        cursor.color.clone_from(&sample.color);
        cursor.target = target;
        cursor.last_seen_ms = now_ms;
    }

    /// Drop a cursor on peer part or `cursor:left`.
    pub fn remove(&mut self, client_id: &Uuid) -> bool {
        self.cursors.remove(client_id).is_some()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    /// Advance every cursor one frame toward its target.
    pub fn tick(&mut self) {
        for cursor in self.cursors.values_mut() {
            let dx = cursor.target.x - cursor.position.x;
            let dy = cursor.target.y - cursor.position.y;
            if dx.hypot(dy) <= SNAP_DISTANCE {
                cursor.position = cursor.target;
            } else {
                cursor.position = Point::new(
                    cursor.position.x + dx * self.smoothing,
                    cursor.position.y + dy * self.smoothing,
                );
            }
        }
    }

    /// Render opacity, or `None` for an unknown client.
    #[must_use]
    pub fn opacity(&self, client_id: &Uuid, now_ms: u64) -> Option<f64> {
        self.cursors.get(client_id).map(|c| self.fade(c, now_ms))
    }

    /// Current position, or `None` for an unknown client.
    #[must_use]
    pub fn position(&self, client_id: &Uuid) -> Option<Point> {
        self.cursors.get(client_id).map(|c| c.position)
    }

    /// Every cursor, sorted by name then client id.
    #[must_use]
    pub fn views(&self, now_ms: u64) -> Vec<CursorView> {
        let mut views: Vec<CursorView> = self
            .cursors
            .iter()
            .map(|(client_id, c)| CursorView {
                client_id: *client_id,
                user_id: c.user_id,
                name: c.name.clone(),
                color: c.color.clone(),
                position: c.position,
                opacity: self.fade(c, now_ms),
            })
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.client_id.cmp(&b.client_id)));
        views
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    fn fade(&self, cursor: &RemoteCursor, now_ms: u64) -> f64 {
        if now_ms.saturating_sub(cursor.last_seen_ms) >= self.fade_after_ms {
            FADED_CURSOR_OPACITY
        } else {
            1.0
        }
    }
}
