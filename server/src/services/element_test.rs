use std::sync::Arc;

use super::*;
use crate::config::ServerConfig;
use crate::services::access::{MemoryDirectory, Role};
use crate::services::store::{ElementStore, Fetched, MemoryStore};
use crate::state::test_helpers::{self, add_member, connect, dummy_element, seed_board, seed_elements};

/// Store that refuses to create one id, and optionally refuses every delete.
struct CreateFailsStore {
    inner: MemoryStore,
    failing: ElementId,
    deletes_fail: bool,
}

#[async_trait::async_trait]
impl ElementStore for CreateFailsStore {
    async fn list(&self, board_id: BoardId) -> Result<Vec<Element>, StoreError> {
        self.inner.list(board_id).await
    }

    async fn get_many(&self, board_id: BoardId, ids: &[ElementId]) -> Result<Fetched, StoreError> {
        self.inner.get_many(board_id, ids).await
    }

    async fn create(&self, element: Element) -> Result<Element, StoreError> {
        if element.id == self.failing {
            return Err(StoreError::Conflict(element.id));
        }
        self.inner.create(element).await
    }

    async fn update(&self, board_id: BoardId, id: ElementId, patch: &ElementPatch) -> Result<Element, StoreError> {
        self.inner.update(board_id, id, patch).await
    }

    async fn delete_many(&self, board_id: BoardId, ids: &[ElementId]) -> Result<Vec<ElementId>, StoreError> {
        if self.deletes_fail {
            return Err(StoreError::Unavailable("read-only replica".into()));
        }
        self.inner.delete_many(board_id, ids).await
    }

    async fn max_z_index(&self, board_id: BoardId) -> Result<Option<i64>, StoreError> {
        self.inner.max_z_index(board_id).await
    }
}

fn state_with_failing_create(failing: ElementId, deletes_fail: bool) -> AppState {
    let store = CreateFailsStore { inner: MemoryStore::new(), failing, deletes_fail };
    AppState::new(ServerConfig::default(), Arc::new(store), Arc::new(MemoryDirectory::new()))
}

fn shape_draft() -> ElementDraft {
    serde_json::from_value(serde_json::json!({ "kind": "shape", "width": 40.0, "height": 30.0 })).unwrap()
}

#[tokio::test]
async fn new_elements_stack_above_current_max() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    seed_elements(&state, board_id, vec![dummy_element(0.0, 4), dummy_element(10.0, 7)]).await;

    let created = create_elements(&state, owner, board_id, None, vec![shape_draft(), shape_draft()])
        .await
        .unwrap();

    let zs: Vec<i64> = created.iter().map(|el| el.z_index).collect();
    assert_eq!(zs, vec![8, 9]);
    assert!(created.iter().all(|el| el.created_by == Some(owner)));
    assert!(created.iter().all(|el| el.created_at > 0));
    assert_eq!(state.store.list(board_id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn first_element_on_empty_board_gets_zero() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;

    let created = create_elements(&state, owner, board_id, None, vec![shape_draft()]).await.unwrap();
    assert_eq!(created[0].z_index, 0);
    assert!(matches!(created[0].content, Content::Shape { .. }));
}

#[tokio::test]
async fn supplied_z_is_kept_and_later_drafts_stack_above_it() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;

    let mut pinned = shape_draft();
    pinned.z_index = Some(20);
    let created = create_elements(&state, owner, board_id, None, vec![pinned, shape_draft()]).await.unwrap();

    assert_eq!(created[0].z_index, 20);
    assert_eq!(created[1].z_index, 21);
}

#[tokio::test]
async fn supplied_ids_are_kept_and_reuse_conflicts() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let original = Element::new(board_id, ElementKind::Sticky);
    let id = original.id;

    let created = create_elements(&state, owner, board_id, None, vec![original.clone().into()]).await.unwrap();
    assert_eq!(created[0].id, id);

    let err = create_elements(&state, owner, board_id, None, vec![original.into()]).await.unwrap_err();
    assert!(matches!(err, ElementError::AlreadyExists(dup) if dup == id));
    assert_eq!(err.error_code(), "E_ELEMENT_CONFLICT");
}

#[tokio::test]
async fn max_z_draft_does_not_overflow() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;

    let mut top = shape_draft();
    top.z_index = Some(i64::MAX);
    let created = create_elements(&state, owner, board_id, None, vec![top, shape_draft()]).await.unwrap();
    assert_eq!(created[0].z_index, i64::MAX);
    assert_eq!(created[1].z_index, i64::MAX);

    let next = create_elements(&state, owner, board_id, None, vec![shape_draft()]).await.unwrap();
    assert_eq!(next[0].z_index, i64::MAX);
}

#[tokio::test]
async fn failed_create_midway_removes_earlier_writes() {
    let second = Element::new(Uuid::nil(), ElementKind::Shape);
    let state = state_with_failing_create(second.id, false);
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let mut peer_rx = connect(&state, board_id, Uuid::new_v4()).await;

    let err = create_elements(&state, owner, board_id, None, vec![shape_draft(), second.into()])
        .await
        .unwrap_err();

    assert!(matches!(err, ElementError::Store(StoreError::Conflict(_))));
    assert!(state.store.list(board_id).await.unwrap().is_empty());
    assert!(peer_rx.try_recv().is_err());
}

#[tokio::test]
async fn failed_rollback_announces_surviving_elements() {
    let second = Element::new(Uuid::nil(), ElementKind::Shape);
    let state = state_with_failing_create(second.id, true);
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let origin = Uuid::new_v4();
    let mut own_rx = connect(&state, board_id, origin).await;

    let first = Element::new(Uuid::nil(), ElementKind::Sticky);
    let first_id = first.id;
    create_elements(&state, owner, board_id, Some(origin), vec![first.into(), second.into()])
        .await
        .unwrap_err();

    let stored = state.store.list(board_id).await.unwrap();
    assert_eq!(stored.iter().map(|el| el.id).collect::<Vec<_>>(), vec![first_id]);
    let event = BoardEvent::from_frame(&own_rx.try_recv().unwrap()).unwrap();
    assert_eq!(event, BoardEvent::ElementsCreated(stored));
}

#[tokio::test]
async fn duplicate_id_within_one_call_conflicts() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let el = Element::new(board_id, ElementKind::Text);

    let err = create_elements(&state, owner, board_id, None, vec![el.clone().into(), el.into()])
        .await
        .unwrap_err();
    assert!(matches!(err, ElementError::AlreadyExists(_)));
    assert!(state.store.list(board_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_draft_rejects_whole_call() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let mut bad = shape_draft();
    bad.width = 0.0;

    let err = create_elements(&state, owner, board_id, None, vec![shape_draft(), bad]).await.unwrap_err();
    assert!(matches!(
        err,
        ElementError::Invalid { source: ValidationError::NonPositive { field: "width" }, .. }
    ));
    assert_eq!(err.error_code(), "E_INVALID_ELEMENT");
    assert!(state.store.list(board_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_content_is_invalid() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let mut draft = shape_draft();
    draft.content = Some(Content::Text { body: "hi".into() });

    let err = create_elements(&state, owner, board_id, None, vec![draft]).await.unwrap_err();
    assert!(matches!(err, ElementError::Invalid { source: ValidationError::ContentMismatch { .. }, .. }));
}

#[tokio::test]
async fn frame_children_must_exist_or_be_created_together() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let existing = seed_elements(&state, board_id, vec![dummy_element(0.0, 0)]).await;

    let sibling = Element::new(board_id, ElementKind::Sticky);
    let mut frame = Element::new(board_id, ElementKind::Frame);
    frame.content = Content::Frame { children: vec![existing[0].id, sibling.id] };
    let created = create_elements(&state, owner, board_id, None, vec![frame.into(), sibling.into()])
        .await
        .unwrap();
    assert_eq!(created.len(), 2);

    let ghost = Uuid::new_v4();
    let mut orphan_frame = Element::new(board_id, ElementKind::Frame);
    orphan_frame.content = Content::Frame { children: vec![ghost] };
    let frame_id = orphan_frame.id;
    let err = create_elements(&state, owner, board_id, None, vec![orphan_frame.into()]).await.unwrap_err();
    assert!(matches!(err, ElementError::UnknownChild { frame, child } if frame == frame_id && child == ghost));
}

#[tokio::test]
async fn size_limits_apply() {
    let mut state = test_helpers::test_app_state();
    state.config.max_batch_size = 2;
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;

    let err = create_elements(&state, owner, board_id, None, Vec::new()).await.unwrap_err();
    assert!(matches!(err, ElementError::Empty));

    let drafts = vec![shape_draft(), shape_draft(), shape_draft()];
    let err = create_elements(&state, owner, board_id, None, drafts).await.unwrap_err();
    assert!(matches!(err, ElementError::TooMany { len: 3, max: 2 }));

    let err = delete_elements(&state, owner, board_id, None, Vec::new()).await.unwrap_err();
    assert!(matches!(err, ElementError::Empty));
}

#[tokio::test]
async fn viewers_cannot_create_or_delete() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let viewer = Uuid::new_v4();
    add_member(&state, board_id, viewer, Role::Viewer).await;
    let seeded = seed_elements(&state, board_id, vec![dummy_element(0.0, 0)]).await;

    let err = create_elements(&state, viewer, board_id, None, vec![shape_draft()]).await.unwrap_err();
    assert!(matches!(err, ElementError::Access(AccessError::Forbidden { .. })));

    let err = delete_elements(&state, viewer, board_id, None, vec![seeded[0].id]).await.unwrap_err();
    assert!(matches!(err, ElementError::Access(AccessError::Forbidden { .. })));
    assert_eq!(err.error_code(), "E_FORBIDDEN");

    let listed = list_elements(&state, viewer, board_id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn strangers_cannot_list() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;

    let err = list_elements(&state, Uuid::new_v4(), board_id).await.unwrap_err();
    assert!(matches!(err, ElementError::Access(AccessError::Forbidden { .. })));
}

#[tokio::test]
async fn list_is_in_paint_order() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    seed_elements(&state, board_id, vec![dummy_element(0.0, 5), dummy_element(1.0, -2), dummy_element(2.0, 3)]).await;

    let zs: Vec<i64> = list_elements(&state, owner, board_id).await.unwrap().iter().map(|e| e.z_index).collect();
    assert_eq!(zs, vec![-2, 3, 5]);
}

#[tokio::test]
async fn delete_reports_partial_success_in_request_order() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let mut locked = dummy_element(0.0, 0);
    locked.locked = true;
    let seeded = seed_elements(&state, board_id, vec![dummy_element(10.0, 1), locked]).await;
    let (free, locked) = (seeded[0].id, seeded[1].id);
    let ghost = Uuid::new_v4();

    let report = delete_elements(&state, owner, board_id, None, vec![ghost, locked, free, free]).await.unwrap();

    assert_eq!(report.deleted, vec![free]);
    let reasons: Vec<(ElementId, RejectReason)> = report.rejected.iter().map(|r| (r.id, r.reason)).collect();
    assert_eq!(reasons, vec![(ghost, RejectReason::NotFound), (locked, RejectReason::Locked)]);
    assert!(report.rejected[1].message.is_some());

    let remaining: Vec<ElementId> = state.store.list(board_id).await.unwrap().iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec![locked]);
}

#[tokio::test]
async fn deleting_children_strips_them_from_frames() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let seeded = seed_elements(&state, board_id, vec![dummy_element(0.0, 0), dummy_element(50.0, 1)]).await;
    let (gone, kept) = (seeded[0].id, seeded[1].id);
    let mut frame = Element::new(board_id, ElementKind::Frame);
    frame.locked = true;
    frame.content = Content::Frame { children: vec![gone, kept] };
    let frame = seed_elements(&state, board_id, vec![frame]).await.remove(0);

    let origin = Uuid::new_v4();
    let mut own_rx = connect(&state, board_id, origin).await;
    let mut peer_rx = connect(&state, board_id, Uuid::new_v4()).await;

    let report = delete_elements(&state, owner, board_id, Some(origin), vec![gone]).await.unwrap();
    assert_eq!(report.deleted, vec![gone]);

    let stored = state.store.get_many(board_id, &[frame.id]).await.unwrap();
    assert_eq!(stored.get(frame.id).unwrap().content.children(), &[kept]);

    let deleted = BoardEvent::from_frame(&peer_rx.try_recv().unwrap()).unwrap();
    assert_eq!(deleted, BoardEvent::ElementsDeleted(vec![gone]));
    let updated = BoardEvent::from_frame(&peer_rx.try_recv().unwrap()).unwrap();
    assert!(matches!(updated, BoardEvent::ElementsUpdated(ref frames) if frames[0].id == frame.id));

    // The origin already knows about the delete, but not about the frame cleanup.
    let own = BoardEvent::from_frame(&own_rx.try_recv().unwrap()).unwrap();
    assert!(matches!(own, BoardEvent::ElementsUpdated(_)));
    assert!(own_rx.try_recv().is_err());
}

#[tokio::test]
async fn create_broadcast_skips_origin() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let origin = Uuid::new_v4();
    let mut own_rx = connect(&state, board_id, origin).await;
    let mut peer_rx = connect(&state, board_id, Uuid::new_v4()).await;

    let created = create_elements(&state, owner, board_id, Some(origin), vec![shape_draft()]).await.unwrap();

    let event = BoardEvent::from_frame(&peer_rx.try_recv().unwrap()).unwrap();
    assert_eq!(event, BoardEvent::ElementsCreated(created));
    assert!(own_rx.try_recv().is_err());
}

#[tokio::test]
async fn nothing_deleted_means_no_broadcast() {
    let state = test_helpers::test_app_state();
    let owner = Uuid::new_v4();
    let board_id = seed_board(&state, owner).await;
    let mut peer_rx = connect(&state, board_id, Uuid::new_v4()).await;

    let report = delete_elements(&state, owner, board_id, None, vec![Uuid::new_v4()]).await.unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(report.rejected.len(), 1);
    assert!(peer_rx.try_recv().is_err());
}

#[test]
fn full_element_json_is_a_valid_draft() {
    let el = Element::new(Uuid::new_v4(), ElementKind::Text);
    let json = serde_json::to_value(&el).unwrap();

    let draft: ElementDraft = serde_json::from_value(json).unwrap();
    assert_eq!(draft.id, Some(el.id));
    assert_eq!(draft.kind, ElementKind::Text);
    assert_eq!(draft.width, 100.0);
    assert_eq!(draft.content, Some(el.content));
}
