use super::*;

#[test]
fn board_room_new_is_empty() {
    let room = BoardRoom::new();
    assert!(room.clients.is_empty());
    assert!(room.users.is_empty());
}

#[tokio::test]
async fn in_memory_state_starts_without_rooms() {
    let state = test_helpers::test_app_state();
    assert!(state.rooms.read().await.is_empty());
    assert_eq!(state.config, ServerConfig::default());
}

#[tokio::test]
async fn seed_helpers_register_board_and_elements() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = test_helpers::seed_board(&state, owner).await;

    let board = state.directory.board(board_id).await.expect("board should exist");
    assert_eq!(board.created_by, owner);
    assert_eq!(state.directory.project_owner(board.project_id).await, Some(owner));

    let seeded = test_helpers::seed_elements(&state, board_id, vec![test_helpers::dummy_element(5.0, 1)]).await;
    assert_eq!(seeded[0].board_id, board_id);
    assert_eq!(state.store.list(board_id).await.unwrap().len(), 1);
}
