//! WebSocket handler — board sessions over JSON or protobuf frames.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by syscall prefix
//! - Broadcast frames from board peers → forward to client
//!
//! Text messages carry JSON frames, binary messages carry protobuf frames.
//! Outbound frames use the encoding of the most recent inbound message.
//!
//! Handler functions validate, call a service, and return an `Outcome`.
//! Element services broadcast their own results to the board (HTTP callers
//! use them too), so element handlers only ever reply to the sender.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. `board:join` → reply with elements + users, peers get `board:join`
//! 3. Element and cursor frames while joined
//! 4. Close or `board:part` → peers get `cursor:left` + `board:part` → cleanup

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{Sink, SinkExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;
use wire::event::{BOARD_JOIN, BOARD_PART};
use wire::{BatchUpdate, BoardId, CursorSample, Data, ElementId, Frame, Status};

use crate::services;
use crate::services::batch::BatchError;
use crate::services::element::ElementDraft;
use crate::state::{AppState, ConnectedClient};

const DEFAULT_NAME: &str = "anonymous";
const DEFAULT_COLOR: &str = "#888888";

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what.
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
    /// Reply to sender with one payload, broadcast different data to peers.
    ReplyAndBroadcast { reply: Data, broadcast: Data },
    /// Nothing goes back to the sender. Used for cursor moves.
    Silent,
}

/// Wire format of a connection's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Protobuf,
}

/// Per-connection session state.
struct Connection {
    client_id: Uuid,
    client: ConnectedClient,
    tx: mpsc::Sender<Frame>,
    board: Option<BoardId>,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(user_id) = params.get("user_id").and_then(|v| v.parse::<Uuid>().ok()) else {
        return (StatusCode::UNAUTHORIZED, "user_id required").into_response();
    };
    let client = ConnectedClient {
        user_id,
        name: params
            .get("name")
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_NAME)
            .to_owned(),
        color: params
            .get("color")
            .filter(|c| services::board::is_hex_color(c))
            .map_or(DEFAULT_COLOR, String::as_str)
            .to_owned(),
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, client))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, client: ConnectedClient) {
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_queue_capacity);
    let mut conn = Connection { client_id: Uuid::new_v4(), client, tx: client_tx, board: None };
    let mut encoding = Encoding::Json;

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", conn.client_id.to_string())
        .with_data("user_id", conn.client.user_id.to_string());
    if send_frame(&mut socket, encoding, &welcome).await.is_err() {
        return;
    }
    info!(client_id = %conn.client_id, user_id = %conn.client.user_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let replies = match msg {
                    Message::Text(text) => {
                        encoding = Encoding::Json;
                        process_inbound_text(&state, &mut conn, &text).await
                    }
                    Message::Binary(bytes) => {
                        encoding = Encoding::Protobuf;
                        process_inbound_bytes(&state, &mut conn, &bytes).await
                    }
                    Message::Close(_) => break,
                    _ => continue,
                };
                if send_all(&mut socket, encoding, &replies).await.is_err() {
                    break;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, encoding, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(board_id) = conn.board.take() {
        leave_board(&state, &conn, board_id).await;
    }
    info!(client_id = %conn.client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one JSON text frame, process it, and return frames for the sender.
async fn process_inbound_text(state: &AppState, conn: &mut Connection, text: &str) -> Vec<Frame> {
    match serde_json::from_str::<Frame>(text) {
        Ok(req) => process_frame(state, conn, req).await,
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: invalid inbound frame");
            vec![gateway_error(format!("invalid json: {e}"))]
        }
    }
}

/// Decode one protobuf binary frame, process it, and return frames for the sender.
async fn process_inbound_bytes(state: &AppState, conn: &mut Connection, bytes: &[u8]) -> Vec<Frame> {
    match wire::decode_frame(bytes) {
        Ok(req) => process_frame(state, conn, req).await,
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: invalid inbound frame");
            vec![gateway_error(format!("invalid frame: {e}"))]
        }
    }
}

async fn process_frame(state: &AppState, conn: &mut Connection, mut req: Frame) -> Vec<Frame> {
    req.from = Some(conn.client.user_id.to_string());

    let prefix = req.prefix().to_owned();
    if prefix != "cursor" {
        info!(client_id = %conn.client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");
    }

    let result = match prefix.as_str() {
        "board" => handle_board(state, conn, &req).await,
        "element" => handle_element(state, conn, &req).await,
        "cursor" => Ok(handle_cursor(state, conn, &req).await),
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            if let Some(board_id) = conn.board {
                let notif = Frame::request(&req.syscall, broadcast).with_board_id(board_id);
                services::board::broadcast(state, board_id, &notif, Some(conn.client_id)).await;
            }
            vec![req.done_with(reply)]
        }
        Ok(Outcome::Silent) => Vec::new(),
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// BOARD HANDLERS
// =============================================================================

async fn handle_board(state: &AppState, conn: &mut Connection, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "join" => {
            let board_id = match req.board_id {
                Some(id) => id,
                None => required::<BoardId>(req, "board_id")?,
            };

            if let Some(old_board) = conn.board.take() {
                leave_board(state, conn, old_board).await;
            }

            let elements =
                services::board::join_board(state, board_id, conn.client_id, conn.client.clone(), conn.tx.clone())
                    .await
                    .map_err(|e| req.error_from(&e))?;
            conn.board = Some(board_id);
            let users = services::board::list_board_users(state, board_id).await;

            let mut reply = Data::new();
            reply.insert("elements".into(), serde_json::to_value(&elements).unwrap_or_default());
            reply.insert("users".into(), serde_json::to_value(&users).unwrap_or_default());

            let mut broadcast = Data::new();
            broadcast.insert("client_id".into(), serde_json::json!(conn.client_id));
            broadcast.insert("user_id".into(), serde_json::json!(conn.client.user_id));
            broadcast.insert("name".into(), serde_json::json!(conn.client.name));
            broadcast.insert("color".into(), serde_json::json!(conn.client.color));

            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        "part" => {
            let Some(board_id) = conn.board.take() else {
                return Err(req.error("not joined to a board"));
            };
            leave_board(state, conn, board_id).await;
            Ok(Outcome::Done)
        }
        op => Err(req.error(format!("unknown board op: {op}"))),
    }
}

/// Tell peers this connection is gone, then drop it from the room.
async fn leave_board(state: &AppState, conn: &Connection, board_id: BoardId) {
    services::cursor::announce_departure(state, board_id, conn.client_id).await;

    let part = Frame::request(BOARD_PART, Data::new())
        .with_board_id(board_id)
        .with_data("client_id", conn.client_id.to_string())
        .with_data("user_id", conn.client.user_id.to_string());
    services::board::broadcast(state, board_id, &part, Some(conn.client_id)).await;

    services::board::part_board(state, board_id, conn.client_id).await;
}

// =============================================================================
// ELEMENT HANDLERS
// =============================================================================

async fn handle_element(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    let Some(board_id) = conn.board else {
        return Err(req.error("must join a board first"));
    };
    let user_id = conn.client.user_id;
    let origin = Some(conn.client_id);

    match req.op() {
        "create" => {
            let drafts: Vec<ElementDraft> = required(req, "elements")?;
            let created = services::element::create_elements(state, user_id, board_id, origin, drafts)
                .await
                .map_err(|e| req.error_from(&e))?;
            let mut data = Data::new();
            data.insert("elements".into(), serde_json::to_value(&created).unwrap_or_default());
            Ok(Outcome::Reply(data))
        }
        "update" => {
            let updates: Vec<BatchUpdate> = required(req, "updates")?;
            match services::batch::apply_batch(state, user_id, board_id, origin, updates).await {
                Ok(report) => {
                    let mut data = Data::new();
                    data.insert("report".into(), serde_json::to_value(&report).unwrap_or_default());
                    Ok(Outcome::Reply(data))
                }
                Err(e) => {
                    let mut frame = req.error_from(&e);
                    if let BatchError::NothingApplied { report } = &e {
                        frame.data.insert("report".into(), serde_json::to_value(report).unwrap_or_default());
                    }
                    Err(frame)
                }
            }
        }
        "delete" => {
            let ids: Vec<ElementId> = required(req, "ids")?;
            let report = services::element::delete_elements(state, user_id, board_id, origin, ids)
                .await
                .map_err(|e| req.error_from(&e))?;
            let mut data = Data::new();
            data.insert("deleted".into(), serde_json::to_value(&report.deleted).unwrap_or_default());
            data.insert("rejected".into(), serde_json::to_value(&report.rejected).unwrap_or_default());
            Ok(Outcome::Reply(data))
        }
        op => Err(req.error(format!("unknown element op: {op}"))),
    }
}

// =============================================================================
// CURSOR HANDLER
// =============================================================================

async fn handle_cursor(state: &AppState, conn: &Connection, req: &Frame) -> Outcome {
    // Cursor moves before joining are dropped without a reply.
    let Some(board_id) = conn.board else {
        return Outcome::Silent;
    };
    let coord = |key: &str| req.data.get(key).and_then(serde_json::Value::as_f64).filter(|v| v.is_finite());
    let (Some(x), Some(y)) = (coord("x"), coord("y")) else {
        return Outcome::Silent;
    };

    let sample = CursorSample {
        client_id: conn.client_id,
        user_id: conn.client.user_id,
        name: conn.client.name.clone(),
        color: conn.client.color.clone(),
        x,
        y,
    };
    services::cursor::relay_cursor(state, board_id, sample).await;
    Outcome::Silent
}

// =============================================================================
// HELPERS
// =============================================================================

fn required<T: DeserializeOwned>(req: &Frame, key: &str) -> Result<T, Frame> {
    match req.field::<T>(key) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(req.error(format!("{key} required"))),
        Err(e) => Err(req.error(format!("invalid {key}: {e}"))),
    }
}

fn gateway_error(message: String) -> Frame {
    Frame::request("gateway:error", Data::new()).with_data("message", message)
}

/// Send frames in order, stopping at the first failure.
async fn send_all<S>(sink: &mut S, encoding: Encoding, frames: &[Frame]) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    for frame in frames {
        send_frame(sink, encoding, frame).await?;
    }
    Ok(())
}

async fn send_frame<S>(sink: &mut S, encoding: Encoding, frame: &Frame) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let is_cursor = frame.prefix() == "cursor";
    if !is_cursor {
        if frame.status == Status::Error {
            let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
            let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
            warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
        } else {
            info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
        }
    }

    let message = match encoding {
        Encoding::Json => match serde_json::to_string(frame) {
            Ok(json) => Message::Text(json.into()),
            Err(e) => {
                warn!(error = %e, "ws: failed to serialize frame");
                return Err(());
            }
        },
        Encoding::Protobuf => Message::Binary(wire::encode_frame(frame).into()),
    };
    sink.send(message).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
