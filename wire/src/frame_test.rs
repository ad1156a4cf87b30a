use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("element:update", Data::new());
    assert_eq!(frame.syscall, "element:update");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.board_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let board_id = Uuid::new_v4();
    let req = Frame::request("element:create", Data::new()).with_board_id(board_id);
    let done = req.done_with(Data::new());

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.board_id, Some(board_id));
    assert_eq!(done.syscall, "element:create");
    assert_eq!(done.status, Status::Done);
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Status::Done).unwrap(), serde_json::json!("done"));
    let parsed: Status = serde_json::from_value(serde_json::json!("error")).unwrap();
    assert_eq!(parsed, Status::Error);
    assert!(serde_json::from_value::<Status>(serde_json::json!("item")).is_err());
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("cursor:moved", Data::new());
    assert_eq!(frame.prefix(), "cursor");
    assert_eq!(frame.op(), "moved");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("element is locked")]
    struct Locked;

    impl ErrorCode for Locked {
        fn error_code(&self) -> &'static str {
            "E_LOCKED"
        }
    }

    let req = Frame::request("element:update", Data::new());
    let err = req.error_from(&Locked);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get(FRAME_CODE).and_then(|v| v.as_str()), Some("E_LOCKED"));
    assert_eq!(err.data.get(FRAME_MESSAGE).and_then(|v| v.as_str()), Some("element is locked"));
    assert_eq!(err.data.get(FRAME_RETRYABLE).and_then(serde_json::Value::as_bool), Some(false));
}

#[test]
fn field_reads_typed_values() {
    let id = Uuid::new_v4();
    let frame = Frame::request("element:delete", Data::new()).with_data("ids", serde_json::json!([id]));

    let ids: Option<Vec<Uuid>> = frame.field("ids").unwrap();
    assert_eq!(ids, Some(vec![id]));

    let missing: Option<Vec<Uuid>> = frame.field("absent").unwrap();
    assert!(missing.is_none());

    let bad = Frame::request("element:delete", Data::new()).with_data("ids", "nope");
    assert!(bad.field::<Vec<Uuid>>("ids").is_err());
}

#[test]
fn deserialize_minimal_client_frame() {
    let json = r#"{"id":"7c1f4b8e-8d2a-4f59-9d55-0d3c0b8b1f11","syscall":"board:join","status":"request"}"#;
    let frame: Frame = serde_json::from_str(json).unwrap();
    assert_eq!(frame.syscall, "board:join");
    assert!(frame.data.is_empty());
    assert!(frame.board_id.is_none());
}
