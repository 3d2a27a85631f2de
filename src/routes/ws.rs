//! WebSocket handler: streamed chat over frames.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → spawned handler task per frame
//! - Frames produced by those tasks → forwarded to the client
//!
//! Handlers never touch the socket. They push frames into the connection's
//! outbound channel, so a long workflow can stream progress while the loop
//! keeps reading.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. `chat:send` → one `item` per workflow event, then `done` with the reply
//! 3. `chat:review` → same stream for the resumed run
//! 4. `session:get` / `session:clear` → single `done`
//! 5. Close → drop the channel; in-flight runs finish and are recorded

use std::future::Future;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame, Status};
use crate::services::chat::{self, ChatError, ChatReply, ChatTurn, ReviewTurn};
use crate::state::AppState;
use crate::workflow::WorkflowEvent;

const OUTBOUND_BUFFER: usize = 256;
const EVENT_BUFFER: usize = 64;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    let (out_tx, mut out_rx) = mpsc::channel::<Frame>(OUTBOUND_BUFFER);

    let welcome = Frame::request("session:connected", Data::new()).with_data("client_id", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }
    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let state = state.clone();
                        let out = out_tx.clone();
                        let text = text.to_string();
                        tokio::spawn(async move {
                            process_inbound_text(&state, client_id, &text, &out).await;
                        });
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = out_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse one inbound text frame, dispatch by prefix and push every reply
/// frame into `out`.
async fn process_inbound_text(state: &AppState, client_id: Uuid, text: &str, out: &mpsc::Sender<Frame>) {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data("message", format!("invalid json: {e}"));
            let _ = out.send(err).await;
            return;
        }
    };
    info!(%client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let reply = match req.prefix() {
        "chat" => handle_chat(state, &req, out).await,
        "session" => handle_session(state, &req).await,
        prefix => req.error(format!("unknown prefix: {prefix}")),
    };
    let _ = out.send(reply).await;
}

fn op(req: &Frame) -> &str {
    req.syscall.split_once(':').map_or("", |(_, op)| op)
}

/// Request data with the frame-level session id filled in when the payload
/// carries none.
fn payload(req: &Frame) -> Value {
    let mut data = req.data.clone();
    if let Some(session_id) = &req.session_id {
        data.entry("session_id").or_insert_with(|| Value::String(session_id.clone()));
    }
    Value::Object(data)
}

// =============================================================================
// CHAT
// =============================================================================

async fn handle_chat(state: &AppState, req: &Frame, out: &mpsc::Sender<Frame>) -> Frame {
    let result = match op(req) {
        "send" => {
            let turn: ChatTurn = match serde_json::from_value(payload(req)) {
                Ok(t) => t,
                Err(e) => return req.error(format!("invalid chat:send payload: {e}")),
            };
            stream_run(req, out, |events| chat::handle(state, turn, Some(events))).await
        }
        "review" => {
            let review: ReviewTurn = match serde_json::from_value(payload(req)) {
                Ok(r) => r,
                Err(e) => return req.error(format!("invalid chat:review payload: {e}")),
            };
            stream_run(req, out, |events| chat::resume(state, review, Some(events))).await
        }
        other => return req.error(format!("unknown chat op: {other}")),
    };

    match result {
        Ok(reply) => {
            let session_id = reply.session_id.clone();
            req.done_with(Frame::data_of(&reply)).with_session_id(session_id)
        }
        Err(e) => req.error_from(&e),
    }
}

/// Run a chat turn while forwarding its workflow events as `item` frames.
/// The forwarder ends once the run drops its event sender.
async fn stream_run<F>(
    req: &Frame,
    out: &mpsc::Sender<Frame>,
    run: impl FnOnce(mpsc::Sender<WorkflowEvent>) -> F,
) -> Result<ChatReply, ChatError>
where
    F: Future<Output = Result<ChatReply, ChatError>>,
{
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let forward = async {
        while let Some(event) = rx.recv().await {
            let _ = out.send(req.item(Frame::data_of(&event))).await;
        }
    };
    let (result, ()) = tokio::join!(run(tx), forward);
    result
}

// =============================================================================
// SESSION
// =============================================================================

async fn handle_session(state: &AppState, req: &Frame) -> Frame {
    let Some(session_id) = payload(req).get("session_id").and_then(Value::as_str).map(str::to_string) else {
        return req.error("session_id required");
    };
    match op(req) {
        "get" => match state.sessions.get(&session_id).await {
            Some(memory) => req.done_with(Frame::data_of(&memory)),
            None => req.error(format!("Session not found: {session_id}")),
        },
        "clear" => {
            let cleared = state.sessions.clear(&session_id).await;
            state.checkpoints.take(&session_id).await;
            req.done_with(Data::from_iter([("cleared".to_string(), Value::Bool(cleared))]))
        }
        other => req.error(format!("unknown session op: {other}")),
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if frame.status != Status::Item {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
