//! Chat service: one user message through routing, the workflow and
//! session memory.
//!
//! DESIGN
//! ======
//! A turn is rate-limited per session, routed with the session's recent
//! conversation as extra context, then run through [`Workflow`]. Finished
//! runs are written to session memory; runs interrupted for human review
//! are parked in the checkpoint store and written to memory once a reviewer
//! resumes them to completion.
//!
//! Both entry points accept an optional event channel so the websocket
//! route can stream progress while HTTP callers just wait for the reply.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::agents::AgentResponse;
use crate::clock;
use crate::error::ErrorCode;
use crate::rate_limit::RateLimitError;
use crate::routing::{self, AgentKind, WorkflowType};
use crate::services::session_memory::SessionMemory;
use crate::state::AppState;
use crate::workflow::{ReviewDecision, Workflow, WorkflowError, WorkflowEvent, WorkflowState, WorkflowStatus};

const ROUTING_CONTEXT_ENTRIES: usize = 5;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error("no workflow is awaiting review for session {0}")]
    NoPendingReview(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::RateLimited(e) => e.error_code(),
            Self::NoPendingReview(_) => "E_NO_PENDING_REVIEW",
            Self::Workflow(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// One incoming chat message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatTurn {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context_data: Map<String, Value>,
}

/// Reviewer answer for a parked run.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewTurn {
    pub session_id: String,
    #[serde(flatten)]
    pub decision: ReviewDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub session_id: String,
    pub workflow_type: WorkflowType,
    pub agent_queue: Vec<AgentKind>,
    pub current_agent: Option<AgentKind>,
    pub agent_responses: Vec<AgentResponse>,
    pub generated_content: Option<Value>,
    pub final_response: Option<String>,
    pub status: WorkflowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
}

impl ChatReply {
    #[must_use]
    pub fn from_state(state: &WorkflowState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            workflow_type: state.workflow_type,
            agent_queue: state.agent_queue.clone(),
            current_agent: state.current_agent,
            agent_responses: state.agent_responses.clone(),
            generated_content: state.generated_content.clone(),
            final_response: state.final_response.clone(),
            status: state.status,
            review_reason: state.review_reason.clone(),
        }
    }
}

/// `web-session-{unix_ms}`, used when a client sends no session id.
#[must_use]
pub fn default_session_id(now: OffsetDateTime) -> String {
    format!("web-session-{}", now.unix_timestamp_nanos() / 1_000_000)
}

/// Router context: the caller's context plus the session's recent turns.
fn routing_context(context_data: &Map<String, Value>, memory: &SessionMemory) -> Map<String, Value> {
    let mut context = context_data.clone();
    if !memory.conversation_history.is_empty() {
        context.insert(
            "conversation_history".into(),
            memory.conversation_context(ROUTING_CONTEXT_ENTRIES).into(),
        );
    }
    context
}

// =============================================================================
// MAIN ENTRY POINTS
// =============================================================================

/// Run one chat turn to completion or to a review interrupt.
///
/// # Errors
///
/// Returns an error for empty messages, exhausted rate limits, or a run
/// that hits the step limit.
pub async fn handle(
    state: &AppState,
    turn: ChatTurn,
    events: Option<mpsc::Sender<WorkflowEvent>>,
) -> Result<ChatReply, ChatError> {
    let message = turn.message.trim();
    if message.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let now = clock::now_utc();
    let session_id = turn
        .session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default_session_id(now));
    info!(%session_id, message_len = message.len(), "chat: message received");

    state.rate_limiter.check_and_record(&session_id)?;
    if state.checkpoints.take(&session_id).await.is_some() {
        info!(%session_id, "chat: new message replaces pending review");
    }

    let memory = state.sessions.get_or_new(&session_id).await;
    let decision = routing::route(state.llm.as_deref(), message, &routing_context(&turn.context_data, &memory)).await;
    info!(
        %session_id,
        primary = %decision.primary_agent,
        workflow = %decision.workflow_type,
        "chat: routed"
    );

    let mut run = WorkflowState::new(message, &session_id, turn.context_data, now);
    run.routing = Some(decision);

    let cx = state.agent_context(memory, now);
    let mut workflow = Workflow::new(&cx);
    if let Some(tx) = events {
        workflow = workflow.with_events(tx);
    }
    let done = workflow.run(run).await?;
    settle(state, &done).await;
    Ok(ChatReply::from_state(&done))
}

/// Continue the run parked for `review.session_id`.
///
/// # Errors
///
/// Returns [`ChatError::NoPendingReview`] when nothing is parked for the
/// session, an exhausted rate limit, or a workflow error. A failed resume
/// leaves the run parked.
pub async fn resume(
    state: &AppState,
    review: ReviewTurn,
    events: Option<mpsc::Sender<WorkflowEvent>>,
) -> Result<ChatReply, ChatError> {
    let session_id = review.session_id;
    state.rate_limiter.check_and_record(&session_id)?;
    let parked = state
        .checkpoints
        .take(&session_id)
        .await
        .ok_or_else(|| ChatError::NoPendingReview(session_id.clone()))?;
    info!(%session_id, action = ?review.decision.action, "chat: review received");

    let now = clock::now_utc();
    let memory = state.sessions.get_or_new(&session_id).await;
    let cx = state.agent_context(memory, now);
    let mut workflow = Workflow::new(&cx);
    if let Some(tx) = events {
        workflow = workflow.with_events(tx);
    }
    let done = match workflow.resume(parked.clone(), review.decision).await {
        Ok(done) => done,
        Err(e) => {
            warn!(%session_id, error = %e, "chat: resume failed, review stays pending");
            state.checkpoints.restore(parked).await;
            return Err(e.into());
        }
    };
    settle(state, &done).await;
    Ok(ChatReply::from_state(&done))
}

/// Park an interrupted run, or record a finished one in session memory.
async fn settle(state: &AppState, run: &WorkflowState) {
    if run.status == WorkflowStatus::AwaitingReview {
        info!(session_id = %run.session_id, "chat: run parked for review");
        state.checkpoints.save(run.clone()).await;
        return;
    }

    let agent = run
        .agent_responses
        .iter()
        .rev()
        .map(|r| r.agent)
        .find(|a| !matches!(a, AgentKind::Orchestrator | AgentKind::ParallelCoordinator))
        .unwrap_or(AgentKind::Orchestrator);
    let queue: Vec<&str> = run.agent_queue.iter().map(|a| a.as_str()).collect();
    let metadata = Map::from_iter([
        ("workflow_type".to_string(), Value::from(run.workflow_type.as_str())),
        ("agent_queue".to_string(), Value::from(queue)),
        ("status".to_string(), Value::from(run.status.as_str())),
        ("agent_count".to_string(), Value::from(run.agent_responses.len())),
    ]);
    let reply = run.final_response.as_deref().unwrap_or_default();
    state
        .sessions
        .record_exchange(&run.session_id, &run.user_request, reply, agent.as_str(), metadata)
        .await;
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
