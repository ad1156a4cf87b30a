//! Cursor relay — ephemeral presence between clients of one board.
//!
//! Cursor samples are never stored and never logged per message. A sample
//! goes to every other client of the board; a departure tells them to drop
//! that client's cursor.

use uuid::Uuid;
use wire::{BoardEvent, BoardId, CursorSample};

use crate::services::board;
use crate::state::AppState;

/// Forward a cursor sample to the board's other clients.
pub async fn relay_cursor(state: &AppState, board_id: BoardId, sample: CursorSample) {
    let origin = sample.client_id;
    board::publish(state, board_id, BoardEvent::CursorMoved(sample), Some(origin)).await;
}

/// Tell the board's other clients that `client_id` is gone.
pub async fn announce_departure(state: &AppState, board_id: BoardId, client_id: Uuid) {
    board::publish(state, board_id, BoardEvent::PeerLeft { client_id }, Some(client_id)).await;
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;
