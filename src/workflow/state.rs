//! Workflow state: the document threaded through every node of one run.
//!
//! A run owns its state exclusively. Parallel branches work on clones and
//! the engine merges them back, so nothing here needs a lock.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::agents::{AgentResponse, ComplianceStatus, ContentDraft, CrisisLevel, CrisisPlan, PerformanceMetrics};
use crate::routing::{AgentKind, RoutingDecision, TaskAssignment, WorkflowType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Running,
    AwaitingReview,
    Completed,
    Rejected,
    Failed,
}

impl WorkflowStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::AwaitingReview => "awaiting_review",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Last agent failure, kept for the error handler and the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    pub agent: AgentKind,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Revise,
    Reject,
}

/// Human reviewer's answer to an interrupted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub user_request: String,
    pub session_id: String,
    #[serde(default)]
    pub routing: Option<RoutingDecision>,
    #[serde(default)]
    pub workflow_type: WorkflowType,
    #[serde(default)]
    pub agent_queue: Vec<AgentKind>,
    /// Index into `agent_queue` of the agent to run next.
    #[serde(default)]
    pub queue_position: usize,
    #[serde(default)]
    pub current_agent: Option<AgentKind>,
    #[serde(default)]
    pub agent_responses: Vec<AgentResponse>,
    #[serde(default)]
    pub task_decomposition: Vec<TaskAssignment>,
    #[serde(default)]
    pub context_data: Map<String, Value>,

    // Agent outputs.
    #[serde(default)]
    pub content_strategy: Option<Value>,
    #[serde(default)]
    pub draft: Option<ContentDraft>,
    #[serde(default)]
    pub generated_content: Option<Value>,
    #[serde(default)]
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(default)]
    pub compliance_revisions: u32,
    #[serde(default)]
    pub performance_metrics: Option<PerformanceMetrics>,
    #[serde(default)]
    pub crisis_level: Option<CrisisLevel>,
    #[serde(default)]
    pub crisis_response_plan: Option<CrisisPlan>,

    // Review and recovery.
    #[serde(default)]
    pub approval_needed: bool,
    #[serde(default)]
    pub review_reason: Option<String>,
    #[serde(default)]
    pub human_feedback: Option<ReviewDecision>,
    #[serde(default)]
    pub error_state: Option<ErrorState>,
    #[serde(default)]
    pub retry_count: u32,

    #[serde(default)]
    pub final_response: Option<String>,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub steps: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

impl WorkflowState {
    #[must_use]
    pub fn new(
        user_request: impl Into<String>,
        session_id: impl Into<String>,
        context_data: Map<String, Value>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            user_request: user_request.into(),
            session_id: session_id.into(),
            routing: None,
            workflow_type: WorkflowType::Direct,
            agent_queue: Vec::new(),
            queue_position: 0,
            current_agent: None,
            agent_responses: Vec::new(),
            task_decomposition: Vec::new(),
            context_data,
            content_strategy: None,
            draft: None,
            generated_content: None,
            compliance_status: None,
            compliance_revisions: 0,
            performance_metrics: None,
            crisis_level: None,
            crisis_response_plan: None,
            approval_needed: false,
            review_reason: None,
            human_feedback: None,
            error_state: None,
            retry_count: 0,
            final_response: None,
            status: WorkflowStatus::Running,
            steps: 0,
            started_at: now,
        }
    }

    /// Task text assigned to `agent`: the decomposition first, then the
    /// router's per-agent tasks.
    #[must_use]
    pub fn task_for(&self, agent: AgentKind) -> Option<&str> {
        self.task_decomposition
            .iter()
            .find(|t| t.agent == agent)
            .map(|t| t.task.as_str())
            .or_else(|| self.routing.as_ref().and_then(|r| r.task_for(agent)))
    }

    /// Whether `agent` has already produced a response in this run.
    #[must_use]
    pub fn has_run(&self, agent: AgentKind) -> bool {
        self.agent_responses.iter().any(|r| r.agent == agent)
    }

    #[must_use]
    pub fn latest_response(&self, agent: AgentKind) -> Option<&AgentResponse> {
        self.agent_responses.iter().rev().find(|r| r.agent == agent)
    }

    /// String field from the latest response of `agent`.
    #[must_use]
    pub fn response_field(&self, agent: AgentKind, key: &str) -> Option<&str> {
        self.latest_response(agent)
            .and_then(|r| r.data.get(key))
            .and_then(Value::as_str)
    }

    /// Reviewer notes carried into a revision, if any.
    #[must_use]
    pub fn reviewer_notes(&self) -> Option<&str> {
        self.context_data.get("human_feedback").and_then(Value::as_str)
    }

    #[must_use]
    pub fn next_agent(&self) -> Option<AgentKind> {
        self.agent_queue.get(self.queue_position).copied()
    }

    /// Queued agents that have not run yet.
    #[must_use]
    pub fn remaining_queue(&self) -> &[AgentKind] {
        self.agent_queue.get(self.queue_position..).unwrap_or_default()
    }

    /// Move past `agent` if it is the next queued agent. Detours (compliance
    /// gate, conditional edges) leave the queue untouched.
    pub fn advance_past(&mut self, agent: AgentKind) {
        if self.next_agent() == Some(agent) {
            self.queue_position += 1;
        }
    }

    /// Whether a reviewer approved this run.
    #[must_use]
    pub fn approved(&self) -> bool {
        matches!(&self.human_feedback, Some(ReviewDecision { action: ReviewAction::Approve, .. }))
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
