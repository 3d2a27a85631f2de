use super::*;
use crate::agents::{AgentResponse, ComplianceStatus, CrisisLevel, RiskLevel};
use crate::routing::RoutingDecision;
use crate::workflow::ReviewDecision;
use serde_json::Map;
use time::OffsetDateTime;
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2024-05-01 09:00 UTC);

fn queued(agents: &[AgentKind]) -> WorkflowState {
    let mut state = WorkflowState::new("request", "s1", Map::new(), NOW);
    let mut decision = RoutingDecision::direct(agents[0], "test");
    decision.secondary_agents = agents[1..].to_vec();
    if agents.len() > 1 {
        decision.workflow_type = WorkflowType::Sequential;
    }
    state.workflow_type = decision.workflow_type;
    state.agent_queue = decision.agent_queue();
    state.routing = Some(decision);
    state
}

fn respond(state: &mut WorkflowState, agent: AgentKind, key: &str, value: &str) {
    state.agent_responses.push(AgentResponse::new(agent, "test", "ok", NOW).with(key, value));
}

fn failing_compliance() -> Option<ComplianceStatus> {
    Some(ComplianceStatus { passed: false, issues: vec!["too long".into()], risk_level: RiskLevel::Medium })
}

#[test]
fn dispatch_starts_parallel_runs_at_the_coordinator() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Listening]);
    state.workflow_type = WorkflowType::Parallel;
    assert_eq!(dispatch(&state), Node::ParallelCoordinator);

    state.queue_position = 2;
    assert_eq!(dispatch(&state), Node::PrepareResponse);
}

#[test]
fn dispatch_retries_the_failed_agent_first() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Publishing]);
    state.error_state = Some(ErrorState {
        agent: AgentKind::Compliance,
        code: "E_X".into(),
        message: "boom".into(),
        retryable: true,
    });
    assert_eq!(dispatch(&state), Node::Agent(AgentKind::Compliance));
}

#[test]
fn content_before_publishing_passes_the_compliance_gate() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Publishing]);
    assert_eq!(after_agent(&mut state, AgentKind::Content), Node::Agent(AgentKind::Compliance));
    assert_eq!(state.next_agent(), Some(AgentKind::Publishing));

    assert_eq!(after_agent(&mut state, AgentKind::Compliance), Node::Agent(AgentKind::Publishing));
    assert_eq!(after_agent(&mut state, AgentKind::Publishing), Node::PrepareResponse);
}

#[test]
fn content_alone_skips_the_gate() {
    let mut state = queued(&[AgentKind::Content]);
    assert_eq!(after_agent(&mut state, AgentKind::Content), Node::PrepareResponse);
}

#[test]
fn queued_compliance_is_not_doubled() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Compliance, AgentKind::Publishing]);
    assert_eq!(after_agent(&mut state, AgentKind::Content), Node::Agent(AgentKind::Compliance));
    assert_eq!(after_agent(&mut state, AgentKind::Compliance), Node::Agent(AgentKind::Publishing));
}

#[test]
fn failed_compliance_revises_twice_then_asks_a_human() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Publishing]);
    after_agent(&mut state, AgentKind::Content);
    state.compliance_status = failing_compliance();

    assert_eq!(after_agent(&mut state, AgentKind::Compliance), Node::Agent(AgentKind::Content));
    assert_eq!(state.compliance_revisions, 1);
    assert_eq!(after_agent(&mut state, AgentKind::Content), Node::Agent(AgentKind::Compliance));
    assert_eq!(after_agent(&mut state, AgentKind::Compliance), Node::Agent(AgentKind::Content));
    assert_eq!(state.compliance_revisions, 2);

    after_agent(&mut state, AgentKind::Content);
    assert_eq!(after_agent(&mut state, AgentKind::Compliance), Node::HumanReview);
    assert_eq!(state.review_reason.as_deref(), Some("Content still fails compliance after 2 revisions"));
    assert_eq!(state.next_agent(), Some(AgentKind::Publishing));
}

#[test]
fn analytics_type_picks_the_follow_up() {
    let mut state = queued(&[AgentKind::Analytics]);
    respond(&mut state, AgentKind::Analytics, "analytics_type", "strategy_input");
    assert_eq!(after_agent(&mut state, AgentKind::Analytics), Node::Agent(AgentKind::Strategy));

    let mut state = queued(&[AgentKind::Analytics]);
    respond(&mut state, AgentKind::Analytics, "analytics_type", "content_optimization");
    assert_eq!(after_agent(&mut state, AgentKind::Analytics), Node::Agent(AgentKind::Content));

    let mut state = queued(&[AgentKind::Analytics]);
    respond(&mut state, AgentKind::Analytics, "analytics_type", "report");
    assert_eq!(after_agent(&mut state, AgentKind::Analytics), Node::PrepareResponse);
}

#[test]
fn detour_waits_for_an_agent_already_queued() {
    let mut state = queued(&[AgentKind::Analytics, AgentKind::Publishing, AgentKind::Strategy]);
    respond(&mut state, AgentKind::Analytics, "analytics_type", "strategy_input");
    assert_eq!(after_agent(&mut state, AgentKind::Analytics), Node::Agent(AgentKind::Publishing));
}

#[test]
fn community_action_picks_the_follow_up() {
    let mut state = queued(&[AgentKind::Community]);
    respond(&mut state, AgentKind::Community, "community_action", "crisis");
    assert_eq!(after_agent(&mut state, AgentKind::Community), Node::Agent(AgentKind::Crisis));

    let mut state = queued(&[AgentKind::Community]);
    respond(&mut state, AgentKind::Community, "community_action", "monitoring");
    assert_eq!(after_agent(&mut state, AgentKind::Community), Node::Agent(AgentKind::Listening));

    let mut state = queued(&[AgentKind::Community]);
    respond(&mut state, AgentKind::Community, "community_action", "response");
    assert_eq!(after_agent(&mut state, AgentKind::Community), Node::PrepareResponse);
}

#[test]
fn severe_crisis_needs_review_until_approved() {
    let mut state = queued(&[AgentKind::Crisis, AgentKind::Community]);
    state.crisis_level = Some(CrisisLevel::Critical);
    assert_eq!(after_agent(&mut state, AgentKind::Crisis), Node::HumanReview);
    assert_eq!(state.review_reason.as_deref(), Some("Crisis severity critical needs human review"));

    state.human_feedback = Some(ReviewDecision { action: ReviewAction::Approve, notes: None });
    assert_eq!(apply_feedback(&mut state), Node::Agent(AgentKind::Community));

    let mut mild = queued(&[AgentKind::Crisis]);
    mild.crisis_level = Some(CrisisLevel::Medium);
    assert_eq!(after_agent(&mut mild, AgentKind::Crisis), Node::PrepareResponse);
}

#[test]
fn routed_review_happens_once_at_the_end() {
    let mut state = queued(&[AgentKind::Strategy]);
    if let Some(routing) = state.routing.as_mut() {
        routing.requires_human_review = true;
    }
    assert_eq!(after_agent(&mut state, AgentKind::Strategy), Node::HumanReview);
    state.human_feedback = Some(ReviewDecision { action: ReviewAction::Approve, notes: None });
    assert_eq!(apply_feedback(&mut state), Node::PrepareResponse);
}

#[test]
fn errors_retry_then_escalate() {
    let mut state = queued(&[AgentKind::Analytics]);
    state.error_state = Some(ErrorState {
        agent: AgentKind::Analytics,
        code: "E_INSTAGRAM_NETWORK".into(),
        message: "Network error: down".into(),
        retryable: true,
    });
    assert_eq!(handle_error(&mut state), Node::RouteRequest);
    assert_eq!(handle_error(&mut state), Node::RouteRequest);
    assert_eq!(handle_error(&mut state), Node::HumanReview);
    assert_eq!(state.review_reason.as_deref(), Some("analytics failed after 3 attempts: Network error: down"));
}

#[test]
fn permanent_errors_escalate_immediately() {
    let mut state = queued(&[AgentKind::Publishing]);
    state.error_state = Some(ErrorState {
        agent: AgentKind::Publishing,
        code: "E_INVALID_TIME".into(),
        message: "bad time".into(),
        retryable: false,
    });
    assert_eq!(handle_error(&mut state), Node::HumanReview);
    assert_eq!(state.retry_count, 1);
}

#[test]
fn approving_a_failure_skips_the_agent() {
    let mut state = queued(&[AgentKind::Analytics, AgentKind::Content]);
    state.error_state = Some(ErrorState {
        agent: AgentKind::Analytics,
        code: "E_X".into(),
        message: "down".into(),
        retryable: true,
    });
    state.human_feedback = Some(ReviewDecision { action: ReviewAction::Approve, notes: None });
    assert_eq!(apply_feedback(&mut state), Node::Agent(AgentKind::Content));
    assert!(state.error_state.is_none());
}

#[test]
fn revise_restarts_the_queue() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Publishing]);
    state.queue_position = 2;
    state.compliance_revisions = 2;
    state.compliance_status = failing_compliance();
    state.approval_needed = true;
    state.human_feedback = Some(ReviewDecision { action: ReviewAction::Revise, notes: Some("shorter".into()) });

    assert_eq!(apply_feedback(&mut state), Node::RouteRequest);
    assert_eq!(state.queue_position, 0);
    assert_eq!(state.compliance_revisions, 0);
    assert!(state.compliance_status.is_none());
    assert!(!state.approval_needed);
}

#[test]
fn reject_completes_with_the_notes() {
    let mut state = queued(&[AgentKind::Content]);
    state.human_feedback = Some(ReviewDecision { action: ReviewAction::Reject, notes: Some("Off brand.".into()) });
    assert_eq!(apply_feedback(&mut state), Node::Complete);
    assert_eq!(state.status, WorkflowStatus::Rejected);
    assert_eq!(state.final_response.as_deref(), Some("Request rejected during human review. Off brand."));
}

#[test]
fn parallel_batch_finishes_the_queue() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Crisis]);
    state.workflow_type = WorkflowType::Parallel;
    assert_eq!(after_parallel(&mut state), Node::PrepareResponse);
    assert!(state.remaining_queue().is_empty());

    let mut severe = queued(&[AgentKind::Content, AgentKind::Crisis]);
    severe.crisis_level = Some(CrisisLevel::High);
    assert_eq!(after_parallel(&mut severe), Node::HumanReview);
}
