//! Shared board model and realtime wire format.
//!
//! Both the `server` and the `canvas` session engine speak these types: the
//! element model and its sparse patch, batch update requests and their
//! partial-success reports, the `Frame` envelope, its protobuf codec, and the
//! typed board events carried inside frames.
//!
//! | Module | Role |
//! |--------|------|
//! | [`element`] | `Element`, `Content`, `Style`, `ElementPatch` and validation |
//! | [`batch`] | Batch update requests and `BatchReport` |
//! | [`frame`] | The `Frame` envelope and the `ErrorCode` trait |
//! | [`codec`] | Protobuf encoding of frames for binary transport |
//! | [`event`] | Typed board events (element changes, cursors) over frames |

pub mod batch;
pub mod codec;
pub mod element;
pub mod event;
pub mod frame;

pub use batch::{BatchReport, BatchUpdate, RejectReason, Rejection};
pub use codec::{CodecError, decode_frame, encode_frame};
pub use element::{
    BoardId, Content, Element, ElementId, ElementKind, ElementPatch, ShapeKind, Style, UserId, ValidationError,
};
pub use event::{BoardEvent, CursorSample, EventError};
pub use frame::{Data, ErrorCode, Frame, Status};
