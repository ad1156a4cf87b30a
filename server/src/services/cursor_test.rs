use super::*;
use crate::state::test_helpers::{self, connect, seed_board};

fn sample(client_id: Uuid) -> CursorSample {
    CursorSample {
        client_id,
        user_id: Uuid::new_v4(),
        name: "Ada".into(),
        color: "#ff8800".into(),
        x: 12.5,
        y: -4.25,
    }
}

#[tokio::test]
async fn cursor_reaches_peers_only() {
    let state = test_helpers::test_app_state();
    let board_id = seed_board(&state, Uuid::new_v4()).await;
    let me = Uuid::new_v4();
    let mut own_rx = connect(&state, board_id, me).await;
    let mut peer_rx = connect(&state, board_id, Uuid::new_v4()).await;
    let sent = sample(me);

    relay_cursor(&state, board_id, sent.clone()).await;

    let frame = peer_rx.try_recv().unwrap();
    assert_eq!(frame.syscall, wire::event::CURSOR_MOVED);
    assert_eq!(frame.board_id, Some(board_id));
    assert_eq!(BoardEvent::from_frame(&frame).unwrap(), BoardEvent::CursorMoved(sent));
    assert!(own_rx.try_recv().is_err());
}

#[tokio::test]
async fn departure_is_announced_to_remaining_clients() {
    let state = test_helpers::test_app_state();
    let board_id = seed_board(&state, Uuid::new_v4()).await;
    let leaving = Uuid::new_v4();
    let mut peer_rx = connect(&state, board_id, Uuid::new_v4()).await;

    announce_departure(&state, board_id, leaving).await;

    let event = BoardEvent::from_frame(&peer_rx.try_recv().unwrap()).unwrap();
    assert_eq!(event, BoardEvent::PeerLeft { client_id: leaving });
}

#[tokio::test]
async fn relay_to_empty_board_is_a_no_op() {
    let state = test_helpers::test_app_state();
    relay_cursor(&state, Uuid::new_v4(), sample(Uuid::new_v4())).await;
    assert!(state.rooms.read().await.is_empty());
}
