//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the element store, the board directory, and a map of live board
//! rooms. Each room tracks the connected clients of one board and the
//! outbound queue that feeds each client's websocket.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;
use wire::{BoardId, Frame, UserId};

use crate::config::ServerConfig;
use crate::services::access::{BoardDirectory, MemoryDirectory};
use crate::services::store::{ElementStore, MemoryStore};

// =============================================================================
// BOARD ROOM
// =============================================================================

/// Display identity of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedClient {
    pub user_id: UserId,
    pub name: String,
    pub color: String,
}

/// Live connections of one board. Dropped when the last client parts.
#[derive(Default)]
pub struct BoardRoom {
    /// `client_id` -> sender for outgoing frames.
    pub clients: HashMap<Uuid, mpsc::Sender<Frame>>,
    pub users: HashMap<Uuid, ConnectedClient>,
}

impl BoardRoom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<dyn ElementStore>,
    pub directory: Arc<dyn BoardDirectory>,
    pub rooms: Arc<RwLock<HashMap<BoardId, BoardRoom>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn ElementStore>, directory: Arc<dyn BoardDirectory>) -> Self {
        Self { config, store, directory, rooms: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// State backed by the in-memory store and directory.
    #[must_use]
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()), Arc::new(MemoryDirectory::new()))
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
