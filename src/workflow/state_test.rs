use super::*;
use crate::routing::TaskAssignment;
use serde_json::json;
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2024-05-01 09:00 UTC);

fn queued(agents: &[AgentKind]) -> WorkflowState {
    let mut state = WorkflowState::new("Create a post then schedule it", "s1", Map::new(), NOW);
    state.agent_queue = agents.to_vec();
    state
}

#[test]
fn new_state_is_running_and_empty() {
    let state = WorkflowState::new("hello", "s1", Map::new(), NOW);
    assert_eq!(state.status, WorkflowStatus::Running);
    assert_eq!(state.workflow_type, WorkflowType::Direct);
    assert!(state.agent_responses.is_empty());
    assert!(state.next_agent().is_none());
    assert!(state.remaining_queue().is_empty());
}

#[test]
fn advance_only_moves_past_the_queued_agent() {
    let mut state = queued(&[AgentKind::Content, AgentKind::Publishing]);
    state.advance_past(AgentKind::Compliance);
    assert_eq!(state.next_agent(), Some(AgentKind::Content));

    state.advance_past(AgentKind::Content);
    assert_eq!(state.next_agent(), Some(AgentKind::Publishing));
    assert_eq!(state.remaining_queue(), [AgentKind::Publishing]);

    state.advance_past(AgentKind::Publishing);
    assert!(state.next_agent().is_none());
    assert!(state.remaining_queue().is_empty());
}

#[test]
fn task_prefers_decomposition_over_router_tasks() {
    let mut decision = RoutingDecision::direct(AgentKind::Content, "test");
    decision.agent_tasks.insert("content".into(), "router task".into());
    decision.agent_tasks.insert("publishing".into(), "schedule it".into());
    let mut state = queued(&[AgentKind::Content]);
    state.routing = Some(decision);
    state.task_decomposition = vec![TaskAssignment { agent: AgentKind::Content, task: "split task".into() }];

    assert_eq!(state.task_for(AgentKind::Content), Some("split task"));
    assert_eq!(state.task_for(AgentKind::Publishing), Some("schedule it"));
    assert_eq!(state.task_for(AgentKind::Crisis), None);
}

#[test]
fn latest_response_wins() {
    let mut state = queued(&[]);
    state.agent_responses.push(AgentResponse::new(AgentKind::Community, "a", "first", NOW).with("community_action", "response"));
    state.agent_responses.push(AgentResponse::new(AgentKind::Community, "a", "second", NOW).with("community_action", "crisis"));
    assert!(state.has_run(AgentKind::Community));
    assert!(!state.has_run(AgentKind::Crisis));
    assert_eq!(state.latest_response(AgentKind::Community).unwrap().result, "second");
    assert_eq!(state.response_field(AgentKind::Community, "community_action"), Some("crisis"));
    assert_eq!(state.response_field(AgentKind::Community, "missing"), None);
}

#[test]
fn approval_and_reviewer_notes() {
    let mut state = queued(&[]);
    assert!(!state.approved());
    state.human_feedback = Some(ReviewDecision { action: ReviewAction::Revise, notes: None });
    assert!(!state.approved());
    state.human_feedback = Some(ReviewDecision { action: ReviewAction::Approve, notes: None });
    assert!(state.approved());

    state.context_data.insert("human_feedback".into(), json!("Make it shorter"));
    assert_eq!(state.reviewer_notes(), Some("Make it shorter"));
}

#[test]
fn review_decision_reads_lowercase_actions() {
    let decision: ReviewDecision = serde_json::from_value(json!({"action": "reject", "notes": "off brand"})).unwrap();
    assert_eq!(decision.action, ReviewAction::Reject);
    assert_eq!(decision.notes.as_deref(), Some("off brand"));
    assert!(serde_json::from_value::<ReviewDecision>(json!({"action": "maybe"})).is_err());
}

#[test]
fn state_survives_a_json_round_trip() {
    let mut state = queued(&[AgentKind::Content]);
    state.status = WorkflowStatus::AwaitingReview;
    state.review_reason = Some("Crisis severity high".into());
    let value = serde_json::to_value(&state).unwrap();
    assert_eq!(value["status"], "awaiting_review");
    assert_eq!(value["agent_queue"], json!(["content"]));
    assert_eq!(value["started_at"], "2024-05-01T09:00:00Z");

    let back: WorkflowState = serde_json::from_value(value).unwrap();
    assert_eq!(back.status, WorkflowStatus::AwaitingReview);
    assert_eq!(back.agent_queue, [AgentKind::Content]);
}
