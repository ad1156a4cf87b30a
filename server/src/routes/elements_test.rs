use super::*;
use serde_json::json;
use uuid::Uuid;

use crate::routes::test_support::call;
use crate::services::access::Role;
use crate::state::test_helpers::{self, add_member, dummy_element, seed_board, seed_elements};

#[tokio::test]
async fn create_then_list() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let uri = format!("/api/boards/{board_id}/elements");

    let (status, created) = call(
        &state,
        "POST",
        &uri,
        Some(owner),
        Some(json!({ "elements": [
            { "kind": "sticky", "width": 120.0, "height": 80.0, "content": { "type": "text", "body": "hi" } },
            { "kind": "shape", "width": 50.0, "height": 50.0 }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.as_array().unwrap().len(), 2);

    let (status, listed) = call(&state, "GET", &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, created);
}

#[tokio::test]
async fn invalid_draft_is_unprocessable() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;

    let (status, body) = call(
        &state,
        "POST",
        &format!("/api/boards/{board_id}/elements"),
        Some(owner),
        Some(json!({ "elements": [{ "kind": "shape", "width": -1.0, "height": 10.0 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E_INVALID_ELEMENT");
}

#[tokio::test]
async fn batch_reports_partial_success() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let mut b = dummy_element(0.0, 2);
    b.locked = true;
    let seeded = seed_elements(&state, board_id, vec![dummy_element(0.0, 1), b]).await;
    let (a, b) = (seeded[0].id, seeded[1].id);

    let (status, report) = call(
        &state,
        "PATCH",
        &format!("/api/boards/{board_id}/elements/batch"),
        Some(owner),
        Some(json!({ "updates": [{ "id": a, "position_x": 10.0 }, { "id": b, "position_x": 20.0 }] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 2);
    assert_eq!(report["applied"][0]["id"], a.to_string());
    assert_eq!(report["applied"][0]["position_x"], 10.0);
    assert_eq!(report["rejected"][0]["id"], b.to_string());
    assert_eq!(report["rejected"][0]["reason"], "locked");
}

#[tokio::test]
async fn batch_with_nothing_applied_is_conflict() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let ghost = Uuid::new_v4();

    let (status, body) = call(
        &state,
        "PATCH",
        &format!("/api/boards/{board_id}/elements/batch"),
        Some(owner),
        Some(json!({ "updates": [{ "id": ghost, "rotation": 45.0 }] })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E_NOTHING_APPLIED");
    assert_eq!(body["report"]["rejected"][0]["reason"], "not_found");
}

#[tokio::test]
async fn viewers_cannot_batch() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let viewer = Uuid::new_v4();
    add_member(&state, board_id, viewer, Role::Viewer).await;
    let seeded = seed_elements(&state, board_id, vec![dummy_element(0.0, 0)]).await;

    let (status, body) = call(
        &state,
        "PATCH",
        &format!("/api/boards/{board_id}/elements/batch"),
        Some(viewer),
        Some(json!({ "updates": [{ "id": seeded[0].id, "position_y": 5.0 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "E_FORBIDDEN");
}

#[tokio::test]
async fn delete_returns_report() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let seeded = seed_elements(&state, board_id, vec![dummy_element(0.0, 0)]).await;
    let ghost = Uuid::new_v4();
    let uri = format!("/api/boards/{board_id}/elements");

    let (status, report) =
        call(&state, "DELETE", &uri, Some(owner), Some(json!({ "ids": [seeded[0].id, ghost] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["deleted"], json!([seeded[0].id]));
    assert_eq!(report["rejected"][0]["reason"], "not_found");

    let (_, listed) = call(&state, "GET", &uri, Some(owner), None).await;
    assert_eq!(listed, json!([]));
}
