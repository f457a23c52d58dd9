use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request(ROLE, Data::new());
    assert_eq!(frame.syscall, "role");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.room_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn error_reply_inherits_context() {
    let req = Frame::request(JOIN_ROOM, Data::new()).with_room_id("ex1");
    let err = req.error("room_id required");

    assert_eq!(err.parent_id, Some(req.id));
    assert_eq!(err.room_id.as_deref(), Some("ex1"));
    assert_eq!(err.syscall, "join-room");
    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data_str("message"), Some("room_id required"));
}

#[test]
fn wire_event_names_are_stable() {
    assert_eq!(JOIN_ROOM, "join-room");
    assert_eq!(CODE_UPDATE, "code-update");
    assert_eq!(LEAVE_ROOM, "leave-room");
    assert_eq!(ROLE, "role");
    assert_eq!(STUDENT_COUNT, "student-count");
    assert_eq!(NEW_CODE_STATUS, "new-code-status");
    assert_eq!(REDIRECT_LOBBY, "redirect-lobby");
    assert_eq!(NEW_CODE_BLOCK, "new-code-block");
    assert_eq!(CODE_DELETION, "code-deletion");
}

#[test]
fn json_round_trip() {
    let original = Frame::request(CODE_UPDATE, Data::new())
        .with_room_id("ex1")
        .with_data("code", "let x = 1;")
        .with_data("solved", false);

    let json = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.room_id.as_deref(), Some("ex1"));
    assert_eq!(restored.syscall, "code-update");
    assert_eq!(restored.data_str("code"), Some("let x = 1;"));
}

#[test]
fn serialize_omits_missing_room_id() {
    let frame = Frame::request(NEW_CODE_BLOCK, Data::new());
    let value = serde_json::to_value(&frame).expect("serialize");
    assert!(value.get("room_id").is_none());
    assert_eq!(value.get("status").and_then(|v| v.as_str()), Some("request"));
}

#[test]
fn deserialize_minimal_client_frame() {
    // Only syscall and room — every other field defaults.
    let json = r#"{"syscall": "join-room", "room_id": "ex1"}"#;
    let frame: Frame = serde_json::from_str(json).expect("minimal frame should deserialize");
    assert_eq!(frame.syscall, "join-room");
    assert_eq!(frame.status, Status::Request);
    assert_eq!(frame.target_room(), Some("ex1"));
    assert!(frame.data.is_empty());
    assert!(!frame.id.is_nil());
}

#[test]
fn deserialize_without_syscall_fails() {
    let json = r#"{"room_id": "ex1"}"#;
    assert!(serde_json::from_str::<Frame>(json).is_err());
}

#[test]
fn target_room_falls_back_to_data() {
    let frame = Frame::request(CODE_UPDATE, Data::new()).with_data("room_id", "ex7");
    assert_eq!(frame.target_room(), Some("ex7"));
}

#[test]
fn target_room_prefers_envelope() {
    let frame = Frame::request(CODE_UPDATE, Data::new())
        .with_room_id("outer")
        .with_data("room_id", "inner");
    assert_eq!(frame.target_room(), Some("outer"));
}

#[test]
fn target_room_rejects_blank_ids() {
    let frame = Frame::request(JOIN_ROOM, Data::new()).with_room_id("   ");
    assert!(frame.target_room().is_none());

    let frame = Frame::request(JOIN_ROOM, Data::new()).with_data("room_id", 42);
    assert!(frame.target_room().is_none());
}
