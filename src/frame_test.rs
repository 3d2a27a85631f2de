use super::*;
use serde_json::json;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("chat:send", Data::new());
    assert_eq!(frame.syscall, "chat:send");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.session_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request("chat:send", Data::new()).with_session_id("s1");
    let item = req.item(Data::new());

    assert_eq!(item.parent_id, Some(req.id));
    assert_eq!(item.session_id.as_deref(), Some("s1"));
    assert_eq!(item.syscall, "chat:send");
    assert_eq!(item.status, Status::Item);

    let done = req.done_with(Data::from_iter([("status".to_string(), json!("completed"))]));
    assert_eq!(done.status, Status::Done);
    assert_eq!(done.data["status"], "completed");
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
}

#[test]
fn prefix_extraction() {
    assert_eq!(Frame::request("chat:review", Data::new()).prefix(), "chat");
    assert_eq!(Frame::request("noseparator", Data::new()).prefix(), "noseparator");
}

#[test]
fn client_frames_need_only_the_basics() {
    let id = Uuid::new_v4();
    let raw = json!({
        "id": id,
        "syscall": "chat:send",
        "status": "request",
        "data": {"message": "hello", "session_id": "s1"}
    });
    let frame: Frame = serde_json::from_value(raw).unwrap();
    assert_eq!(frame.id, id);
    assert_eq!(frame.ts, 0);
    assert_eq!(frame.data["message"], "hello");

    let wire = serde_json::to_value(&frame).unwrap();
    assert!(wire.get("session_id").is_none());
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    let err = Frame::request("chat:review", Data::new()).error_from(&NotFound);
    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data["code"], "E_NOT_FOUND");
    assert_eq!(err.data["message"], "not found");
    assert_eq!(err.data["retryable"], false);
}

#[test]
fn data_of_flattens_objects() {
    let data = Frame::data_of(&json!({"a": 1}));
    assert_eq!(data["a"], 1);
    let data = Frame::data_of(&"text");
    assert_eq!(data["value"], "text");
}
