//! Workflow: runs the agents for one chat turn.
//!
//! DESIGN
//! ======
//! A run is a loop over [`Node`]s. Each node mutates the run's
//! [`WorkflowState`] and names the next node; the edge logic lives in
//! [`graph`] as plain functions over the state so it can be tested without
//! running agents. [`engine::Workflow`] drives the loop, calls agents and
//! reports progress as [`WorkflowEvent`]s on an optional channel.
//!
//! Human review is an interrupt, not a wait: the run returns with status
//! `awaiting_review` and the caller parks the state in a
//! [`CheckpointStore`] until a reviewer answers.
//!
//! LIMITS
//! ======
//! - 64 nodes per run (resumes included)
//! - 2 compliance revisions before human review
//! - 3 attempts per failing agent before human review

pub mod engine;
pub mod graph;
pub mod state;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ErrorCode;
use crate::routing::AgentKind;

pub use engine::Workflow;
pub use state::{ErrorState, ReviewAction, ReviewDecision, WorkflowState, WorkflowStatus};

pub const MAX_STEPS: u32 = 64;
pub const MAX_COMPLIANCE_REVISIONS: u32 = 2;
pub const MAX_RETRIES: u32 = 3;

// =============================================================================
// NODES & EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    RouteRequest,
    Agent(AgentKind),
    ParallelCoordinator,
    HumanReview,
    ApplyFeedback,
    ErrorHandler,
    PrepareResponse,
    Complete,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteRequest => f.write_str("route_request"),
            Self::Agent(kind) => f.write_str(kind.as_str()),
            Self::ParallelCoordinator => f.write_str("parallel_coordinator"),
            Self::HumanReview => f.write_str("human_review"),
            Self::ApplyFeedback => f.write_str("apply_human_feedback"),
            Self::ErrorHandler => f.write_str("error_handler"),
            Self::PrepareResponse => f.write_str("prepare_response"),
            Self::Complete => f.write_str("complete"),
        }
    }
}

/// Progress of a run, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    NodeEntered { node: String },
    AgentStarted { agent: AgentKind },
    AgentCompleted { agent: AgentKind, action: String, result: String },
    AgentFailed { agent: AgentKind, code: String, message: String },
    Interrupted { reason: String },
    Completed { status: WorkflowStatus, final_response: Option<String> },
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow stopped after {0} steps")]
    StepLimit(u32),

    #[error("workflow is not awaiting review")]
    NotAwaitingReview,
}

impl ErrorCode for WorkflowError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::StepLimit(_) => "E_WORKFLOW_STEP_LIMIT",
            Self::NotAwaitingReview => "E_NOT_AWAITING_REVIEW",
        }
    }
}

// =============================================================================
// CHECKPOINTS
// =============================================================================

/// Interrupted runs, one per session.
#[derive(Clone, Default)]
pub struct CheckpointStore {
    inner: Arc<RwLock<HashMap<String, WorkflowState>>>,
}

impl CheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a run. A newer interrupt for the same session replaces the old one.
    pub async fn save(&self, state: WorkflowState) {
        self.inner.write().await.insert(state.session_id.clone(), state);
    }

    pub async fn get(&self, session_id: &str) -> Option<WorkflowState> {
        self.inner.read().await.get(session_id).cloned()
    }

    /// Remove and return the parked run.
    pub async fn take(&self, session_id: &str) -> Option<WorkflowState> {
        self.inner.write().await.remove(session_id)
    }

    /// Put back a run whose resume failed, unless a newer one was parked
    /// for the session in the meantime.
    pub async fn restore(&self, state: WorkflowState) {
        self.inner.write().await.entry(state.session_id.clone()).or_insert(state);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use time::macros::datetime;

    #[test]
    fn nodes_display_like_graph_names() {
        assert_eq!(Node::Agent(AgentKind::PaidSocial).to_string(), "paid_social");
        assert_eq!(Node::ApplyFeedback.to_string(), "apply_human_feedback");
    }

    #[test]
    fn events_are_tagged() {
        let value = serde_json::to_value(WorkflowEvent::AgentStarted { agent: AgentKind::Content }).unwrap();
        assert_eq!(value, serde_json::json!({"event": "agent_started", "agent": "content"}));
    }

    #[tokio::test]
    async fn checkpoints_are_per_session() {
        let store = CheckpointStore::new();
        let now = datetime!(2024-05-01 09:00 UTC);
        store.save(WorkflowState::new("first", "s1", Map::new(), now)).await;
        store.save(WorkflowState::new("second", "s1", Map::new(), now)).await;
        store.save(WorkflowState::new("other", "s2", Map::new(), now)).await;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("s1").await.unwrap().user_request, "second");

        assert!(store.take("s1").await.is_some());
        assert!(store.take("s1").await.is_none());
        assert!(!store.is_empty().await);
    }
}
