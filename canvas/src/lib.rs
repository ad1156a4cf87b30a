//! Client-side editing engine for the collaborative board.
//!
//! This crate is pure state: it owns one editing session (the local replica
//! of a board, the viewport, tools and selection, undo history, and remote
//! presence) and turns host input events into outbound [`engine::Action`]s.
//! The host forwards those actions to the server over the realtime channel
//! and feeds server replies and broadcasts back in. Nothing here performs I/O.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Session state container [`engine::EngineCore`] and reconciliation |
//! | [`doc`] | In-memory element store and paint order |
//! | [`history`] | Invertible commands and the undo/redo stacks |
//! | [`zorder`] | Stacking arithmetic on `(id, z_index)` pairs |
//! | [`presence`] | Cursor throttling and smoothed remote cursors |
//! | [`export`] | JSON document and PNG export |
//! | [`camera`] | Pan/zoom camera, points, and bounds |
//! | [`input`] | Tools, shortcuts, and the gesture state machine |
//! | [`hit`] | Rotation-aware hit-testing |
//! | [`config`] | Per-session settings |
//! | [`consts`] | Shared numeric constants (zoom limits, nudge steps, export caps) |

pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod export;
pub mod history;
pub mod hit;
pub mod input;
pub mod presence;
pub mod zorder;

pub use config::SessionConfig;
pub use engine::{Action, EngineCore};
pub use export::{BoardDocument, ExportError};
