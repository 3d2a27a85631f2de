use super::*;
use crate::state::test_helpers::test_app_state;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite;

fn request_text(syscall: &str, data: Value) -> String {
    let Value::Object(data) = data else { panic!("data must be an object") };
    serde_json::to_string(&Frame::request(syscall, data)).unwrap()
}

/// Run one inbound frame and collect everything it sent back.
async fn exchange(state: &AppState, text: &str) -> Vec<Frame> {
    let (tx, mut rx) = mpsc::channel(OUTBOUND_BUFFER);
    process_inbound_text(state, Uuid::new_v4(), text, &tx).await;
    drop(tx);
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn invalid_json_yields_gateway_error() {
    let state = test_app_state();
    let frames = exchange(&state, "{not json").await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].syscall, "gateway:error");
    assert!(frames[0].data["message"].as_str().unwrap().starts_with("invalid json"));
}

#[tokio::test]
async fn unknown_prefix_is_an_error_reply() {
    let state = test_app_state();
    let text = request_text("board:join", json!({}));
    let frames = exchange(&state, &text).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Error);
    assert_eq!(frames[0].data["message"], "unknown prefix: board");
}

#[tokio::test]
async fn chat_send_streams_events_then_the_reply() {
    let state = test_app_state();
    let text = request_text("chat:send", json!({"message": "Write a caption about our coffee", "session_id": "s1"}));
    let frames = exchange(&state, &text).await;

    let (last, items) = frames.split_last().unwrap();
    assert!(!items.is_empty());
    assert!(items.iter().all(|f| f.status == Status::Item && f.syscall == "chat:send"));
    assert_eq!(items.last().unwrap().data["event"], "completed");

    assert_eq!(last.status, Status::Done);
    assert_eq!(last.session_id.as_deref(), Some("s1"));
    assert_eq!(last.data["status"], "completed");
    assert_eq!(last.data["agent_queue"], json!(["content"]));
    assert!(state.sessions.get("s1").await.is_some());
}

#[tokio::test]
async fn frame_session_id_fills_the_payload() {
    let state = test_app_state();
    let req = Frame::request("chat:send", Data::from_iter([("message".to_string(), json!("hello"))])).with_session_id("s9");
    let frames = exchange(&state, &serde_json::to_string(&req).unwrap()).await;
    assert_eq!(frames.last().unwrap().data["session_id"], "s9");
}

#[tokio::test]
async fn chat_errors_carry_codes() {
    let state = test_app_state();
    let frames = exchange(&state, &request_text("chat:send", json!({"message": "  "}))).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Error);
    assert_eq!(frames[0].data["code"], "E_EMPTY_MESSAGE");

    let frames = exchange(&state, &request_text("chat:review", json!({"session_id": "nobody", "action": "approve"}))).await;
    assert_eq!(frames[0].data["code"], "E_NO_PENDING_REVIEW");

    let frames = exchange(&state, &request_text("chat:send", json!({"text": "wrong field"}))).await;
    assert!(frames[0].data["message"].as_str().unwrap().starts_with("invalid chat:send payload"));
}

#[tokio::test]
async fn session_get_and_clear() {
    let state = test_app_state();
    exchange(&state, &request_text("chat:send", json!({"message": "hello", "session_id": "s1"}))).await;

    let frames = exchange(&state, &request_text("session:get", json!({"session_id": "s1"}))).await;
    assert_eq!(frames[0].status, Status::Done);
    assert_eq!(frames[0].data["session_id"], "s1");

    let frames = exchange(&state, &request_text("session:clear", json!({"session_id": "s1"}))).await;
    assert_eq!(frames[0].data["cleared"], true);
    assert!(state.sessions.get("s1").await.is_none());

    let frames = exchange(&state, &request_text("session:get", json!({}))).await;
    assert_eq!(frames[0].data["message"], "session_id required");
}

#[tokio::test]
async fn socket_round_trip() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = crate::routes::app(test_app_state());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.unwrap();

    let next = |msg: Option<Result<tungstenite::Message, tungstenite::Error>>| -> Frame {
        let text = msg.unwrap().unwrap().into_text().unwrap();
        serde_json::from_str(text.as_str()).unwrap()
    };

    let welcome = next(timeout(Duration::from_secs(2), socket.next()).await.unwrap());
    assert_eq!(welcome.syscall, "session:connected");
    assert!(welcome.data.contains_key("client_id"));

    let text = request_text("chat:send", json!({"message": "hello", "session_id": "ws-1"}));
    socket.send(tungstenite::Message::text(text)).await.unwrap();

    let mut done = None;
    while done.is_none() {
        let frame = next(timeout(Duration::from_secs(2), socket.next()).await.unwrap());
        if frame.status.is_terminal() {
            done = Some(frame);
        }
    }
    let done = done.unwrap();
    assert_eq!(done.status, Status::Done);
    assert_eq!(done.data["session_id"], "ws-1");
}
