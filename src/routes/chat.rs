//! Chat and session memory routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};

use crate::clock;
use crate::error::ApiError;
use crate::services::chat::{self, ChatError, ChatReply, ChatTurn, ReviewTurn};
use crate::services::session_memory::SessionMemory;
use crate::state::AppState;
use crate::workflow::WorkflowError;

pub(crate) fn chat_error(e: &ChatError) -> ApiError {
    let status = match e {
        ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
        ChatError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        ChatError::NoPendingReview(_) => StatusCode::NOT_FOUND,
        ChatError::Workflow(WorkflowError::NotAwaitingReview) => StatusCode::CONFLICT,
        ChatError::Workflow(WorkflowError::StepLimit(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_code(status, e)
}

/// `POST /chat`: run one chat turn.
pub async fn chat(State(state): State<AppState>, Json(turn): Json<ChatTurn>) -> Result<Json<ChatReply>, ApiError> {
    chat::handle(&state, turn, None)
        .await
        .map(Json)
        .map_err(|e| chat_error(&e))
}

/// `POST /chat/review`: answer a run that is awaiting review.
pub async fn review(State(state): State<AppState>, Json(turn): Json<ReviewTurn>) -> Result<Json<ChatReply>, ApiError> {
    chat::resume(&state, turn, None)
        .await
        .map(Json)
        .map_err(|e| chat_error(&e))
}

fn missing_session(id: &str) -> ApiError {
    ApiError::not_found(format!("Session not found: {id}"))
}

/// `GET /sessions/:id`: the stored memory document.
pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<SessionMemory>, ApiError> {
    state.sessions.get(&id).await.map(Json).ok_or_else(|| missing_session(&id))
}

/// `DELETE /sessions/:id`
pub async fn clear_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    if !state.sessions.clear(&id).await {
        return Err(missing_session(&id));
    }
    state.checkpoints.take(&id).await;
    Ok(Json(json!({ "message": format!("Session {id} cleared") })))
}

/// `GET /sessions/:id/summary`: insights plus the readable summary.
pub async fn session_summary(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let memory = state.sessions.get(&id).await.ok_or_else(|| missing_session(&id))?;
    let now = clock::now_utc();
    let pending_review = state.checkpoints.get(&id).await.and_then(|run| run.review_reason);
    Ok(Json(json!({
        "session_id": id,
        "summary": memory.summary(now),
        "insights": memory.insights(now),
        "total_exchanges": memory.conversation_history.len(),
        "pending_review": pending_review,
    })))
}
