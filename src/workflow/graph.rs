//! Edges of the workflow graph.
//!
//! Every function here takes the state after a node ran and returns the
//! next node. Queued agents run in order; conditional edges insert detours
//! (compliance gate, analytics and community follow-ups) without moving the
//! queue position.

use tracing::info;

use super::state::{ErrorState, ReviewAction, WorkflowState, WorkflowStatus};
use super::{MAX_COMPLIANCE_REVISIONS, MAX_RETRIES, Node};
use crate::agents::analytics::AnalyticsType;
use crate::agents::community::CommunityAction;
use crate::routing::{AgentKind, WorkflowType};

pub const REJECTED_RESPONSE: &str = "Request rejected during human review.";

fn review(state: &mut WorkflowState, reason: impl Into<String>) -> Node {
    state.review_reason = Some(reason.into());
    Node::HumanReview
}

fn requires_review(state: &WorkflowState) -> bool {
    state.routing.as_ref().is_some_and(|r| r.requires_human_review)
}

/// First node after routing.
#[must_use]
pub fn dispatch(state: &WorkflowState) -> Node {
    if let Some(ErrorState { agent, .. }) = &state.error_state {
        return Node::Agent(*agent);
    }
    if state.workflow_type == WorkflowType::Parallel && state.queue_position == 0 {
        return Node::ParallelCoordinator;
    }
    match state.next_agent() {
        Some(agent) => Node::Agent(agent),
        None => Node::PrepareResponse,
    }
}

/// Next queued agent, or the end of the run.
pub fn continue_queue(state: &mut WorkflowState) -> Node {
    match state.next_agent() {
        Some(agent) => Node::Agent(agent),
        None if requires_review(state) && !state.approved() => {
            review(state, "Routing decision requires human review")
        }
        None => Node::PrepareResponse,
    }
}

/// Run `agent` next unless it already ran or is still queued.
fn detour(state: &mut WorkflowState, agent: AgentKind) -> Node {
    if state.has_run(agent) || state.remaining_queue().contains(&agent) {
        continue_queue(state)
    } else {
        Node::Agent(agent)
    }
}

fn compliance_gate(state: &WorkflowState) -> bool {
    state.next_agent() != Some(AgentKind::Compliance)
        && (state.agent_queue.contains(&AgentKind::Publishing) || requires_review(state))
}

fn after_compliance(state: &mut WorkflowState) -> Node {
    let passed = state.compliance_status.as_ref().is_none_or(|c| c.passed);
    if passed {
        continue_queue(state)
    } else if state.compliance_revisions < MAX_COMPLIANCE_REVISIONS {
        state.compliance_revisions += 1;
        info!(session_id = %state.session_id, revision = state.compliance_revisions, "workflow: compliance revision");
        Node::Agent(AgentKind::Content)
    } else {
        review(state, format!("Content still fails compliance after {MAX_COMPLIANCE_REVISIONS} revisions"))
    }
}

/// Edge out of a successful agent node.
pub fn after_agent(state: &mut WorkflowState, agent: AgentKind) -> Node {
    state.advance_past(agent);
    match agent {
        AgentKind::Content if compliance_gate(state) => Node::Agent(AgentKind::Compliance),
        AgentKind::Compliance => after_compliance(state),
        AgentKind::Analytics => {
            match state.response_field(AgentKind::Analytics, "analytics_type").and_then(AnalyticsType::from_name) {
                Some(AnalyticsType::StrategyInput) => detour(state, AgentKind::Strategy),
                Some(AnalyticsType::ContentOptimization) => detour(state, AgentKind::Content),
                Some(AnalyticsType::Report) | None => continue_queue(state),
            }
        }
        AgentKind::Community => {
            match state.response_field(AgentKind::Community, "community_action").and_then(CommunityAction::from_name) {
                Some(CommunityAction::Crisis) => detour(state, AgentKind::Crisis),
                Some(CommunityAction::Monitoring) => detour(state, AgentKind::Listening),
                Some(CommunityAction::Response) | None => continue_queue(state),
            }
        }
        AgentKind::Crisis => after_crisis(state),
        _ => continue_queue(state),
    }
}

fn after_crisis(state: &mut WorkflowState) -> Node {
    match state.crisis_level {
        Some(level) if level.needs_escalation() && !state.approved() => {
            review(state, format!("Crisis severity {} needs human review", level.as_str()))
        }
        _ => continue_queue(state),
    }
}

/// Edge out of the parallel branch: the queue ran as one batch.
pub fn after_parallel(state: &mut WorkflowState) -> Node {
    state.queue_position = state.agent_queue.len();
    after_crisis(state)
}

/// Retry the failed agent until the attempts run out.
pub fn handle_error(state: &mut WorkflowState) -> Node {
    state.retry_count += 1;
    let Some(error) = state.error_state.clone() else {
        return continue_queue(state);
    };
    if error.retryable && state.retry_count < MAX_RETRIES {
        Node::RouteRequest
    } else {
        review(
            state,
            format!("{} failed after {} attempts: {}", error.agent, state.retry_count, error.message),
        )
    }
}

/// Apply the reviewer's decision recorded in `human_feedback`.
pub fn apply_feedback(state: &mut WorkflowState) -> Node {
    state.approval_needed = false;
    let Some(decision) = state.human_feedback.clone() else {
        return Node::PrepareResponse;
    };
    match decision.action {
        ReviewAction::Approve => {
            if let Some(error) = state.error_state.take() {
                state.advance_past(error.agent);
            }
            continue_queue(state)
        }
        ReviewAction::Revise => {
            state.queue_position = 0;
            state.compliance_revisions = 0;
            state.compliance_status = None;
            state.error_state = None;
            state.retry_count = 0;
            Node::RouteRequest
        }
        ReviewAction::Reject => {
            state.status = WorkflowStatus::Rejected;
            state.final_response = Some(match decision.notes {
                Some(notes) => format!("{REJECTED_RESPONSE} {notes}"),
                None => REJECTED_RESPONSE.to_string(),
            });
            Node::Complete
        }
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
