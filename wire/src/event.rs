//! Typed board events carried inside frames.
//!
//! The server broadcasts element changes and cursor traffic to the other
//! clients of a board as request frames. [`BoardEvent`] is the typed view of
//! those frames; `into_frame`/`from_frame` are the only places that know the
//! payload keys.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::{BoardId, Element, ElementId, UserId};
use crate::frame::{Data, Frame};

pub const BOARD_JOIN: &str = "board:join";
pub const BOARD_PART: &str = "board:part";
pub const ELEMENT_CREATE: &str = "element:create";
pub const ELEMENT_UPDATE: &str = "element:update";
pub const ELEMENT_DELETE: &str = "element:delete";
pub const CURSOR_MOVED: &str = "cursor:moved";
pub const CURSOR_LEFT: &str = "cursor:left";

const KEY_ELEMENTS: &str = "elements";
const KEY_IDS: &str = "ids";
const KEY_CURSOR: &str = "cursor";
const KEY_CLIENT_ID: &str = "client_id";

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("syscall {0} is not a board event")]
    UnknownSyscall(String),
    #[error("event payload is missing {0}")]
    MissingField(&'static str),
    #[error("malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One remote pointer position in board coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorSample {
    /// Connection the sample came from. One user may hold several.
    pub client_id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

/// A change another participant made to a board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    ElementsCreated(Vec<Element>),
    /// Server copies of updated elements.
    ElementsUpdated(Vec<Element>),
    ElementsDeleted(Vec<ElementId>),
    CursorMoved(CursorSample),
    /// A connection left the board; its cursor goes away.
    PeerLeft { client_id: Uuid },
}

impl BoardEvent {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::ElementsCreated(_) => ELEMENT_CREATE,
            Self::ElementsUpdated(_) => ELEMENT_UPDATE,
            Self::ElementsDeleted(_) => ELEMENT_DELETE,
            Self::CursorMoved(_) => CURSOR_MOVED,
            Self::PeerLeft { .. } => CURSOR_LEFT,
        }
    }

    /// Wrap the event in a request frame scoped to `board_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Payload`] if an element fails to serialize.
    pub fn into_frame(self, board_id: BoardId) -> Result<Frame, EventError> {
        let syscall = self.syscall();
        let (key, value) = match self {
            Self::ElementsCreated(elements) | Self::ElementsUpdated(elements) => {
                (KEY_ELEMENTS, serde_json::to_value(elements)?)
            }
            Self::ElementsDeleted(ids) => (KEY_IDS, serde_json::to_value(ids)?),
            Self::CursorMoved(sample) => (KEY_CURSOR, serde_json::to_value(sample)?),
            Self::PeerLeft { client_id } => (KEY_CLIENT_ID, serde_json::to_value(client_id)?),
        };
        let mut data = Data::new();
        data.insert(key.to_owned(), value);
        Ok(Frame::request(syscall, data).with_board_id(board_id))
    }

    /// Parse an inbound frame into an event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownSyscall`] for frames that are not board
    /// events and [`EventError::MissingField`] or [`EventError::Payload`] for
    /// malformed payloads.
    pub fn from_frame(frame: &Frame) -> Result<Self, EventError> {
        match frame.syscall.as_str() {
            ELEMENT_CREATE => Ok(Self::ElementsCreated(required(frame, KEY_ELEMENTS)?)),
            ELEMENT_UPDATE => Ok(Self::ElementsUpdated(required(frame, KEY_ELEMENTS)?)),
            ELEMENT_DELETE => Ok(Self::ElementsDeleted(required(frame, KEY_IDS)?)),
            CURSOR_MOVED => Ok(Self::CursorMoved(required(frame, KEY_CURSOR)?)),
            CURSOR_LEFT => Ok(Self::PeerLeft { client_id: required(frame, KEY_CLIENT_ID)? }),
            other => Err(EventError::UnknownSyscall(other.to_owned())),
        }
    }
}

fn required<T: serde::de::DeserializeOwned>(frame: &Frame, key: &'static str) -> Result<T, EventError> {
    frame.field(key)?.ok_or(EventError::MissingField(key))
}
