use super::*;
use crate::llm::LlmChat;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::test_helpers::{MockLlm, test_app_state, test_app_state_with};
use crate::workflow::ReviewAction;
use std::sync::Arc;
use std::time::Duration;
use time::macros::datetime;

fn turn(message: &str, session_id: Option<&str>) -> ChatTurn {
    ChatTurn { message: message.into(), session_id: session_id.map(str::to_string), context_data: Map::new() }
}

fn review(session_id: &str, action: ReviewAction) -> ReviewTurn {
    ReviewTurn { session_id: session_id.into(), decision: ReviewDecision { action, notes: None } }
}

const CRISIS_ROUTE: &str = r#"{"primary_agent": "crisis", "workflow_type": "direct", "reasoning": "angry customers"}"#;

#[test]
fn default_session_id_uses_unix_millis() {
    assert_eq!(default_session_id(datetime!(2024-05-01 09:00 UTC)), "web-session-1714554000000");
}

#[test]
fn routing_context_adds_recent_turns() {
    let mut memory = SessionMemory::new("s1", datetime!(2024-05-01 09:00 UTC));
    let base = Map::from_iter([("brand".to_string(), Value::from("Acme"))]);
    assert_eq!(routing_context(&base, &memory), base);

    memory.add_conversation_entry("hello", "hi there", "general", Map::new(), datetime!(2024-05-01 09:01 UTC));
    let context = routing_context(&base, &memory);
    assert_eq!(context["brand"], "Acme");
    assert!(context["conversation_history"].as_str().unwrap().contains("hello"));
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let state = test_app_state();
    let err = handle(&state, turn("   ", Some("s1")), None).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyMessage));
    assert_eq!(err.error_code(), "E_EMPTY_MESSAGE");
    assert!(state.sessions.get("s1").await.is_none());
}

#[tokio::test]
async fn finished_turn_is_recorded_in_memory() {
    let state = test_app_state();
    let reply = handle(&state, turn("Write a caption about our coffee", Some("s1")), None).await.unwrap();

    assert_eq!(reply.session_id, "s1");
    assert_eq!(reply.status, WorkflowStatus::Completed);
    assert_eq!(reply.agent_queue, [AgentKind::Content]);
    assert!(reply.generated_content.is_some());
    assert!(reply.review_reason.is_none());

    let memory = state.sessions.get("s1").await.unwrap();
    assert_eq!(memory.conversation_history.len(), 1);
    let entry = &memory.conversation_history[0];
    assert_eq!(entry.user_input, "Write a caption about our coffee");
    assert_eq!(entry.agent_name, "content");
    assert_eq!(entry.metadata["workflow_type"], "direct");
    assert_eq!(Some(entry.agent_response.as_str()), reply.final_response.as_deref());
}

#[tokio::test]
async fn missing_session_id_gets_a_generated_one() {
    let state = test_app_state();
    let reply = handle(&state, turn("hello", None), None).await.unwrap();
    assert!(reply.session_id.starts_with("web-session-"));
    assert!(state.sessions.get(&reply.session_id).await.is_some());
}

#[tokio::test]
async fn interrupted_run_waits_for_review() {
    let llm: Arc<dyn LlmChat> = Arc::new(MockLlm::new([CRISIS_ROUTE]));
    let state = test_app_state_with(Some(llm), None);

    let paused = handle(&state, turn("Customers are angry about the recall", Some("s1")), None).await.unwrap();
    assert_eq!(paused.status, WorkflowStatus::AwaitingReview);
    assert_eq!(paused.review_reason.as_deref(), Some("Crisis severity high needs human review"));
    assert!(state.checkpoints.get("s1").await.is_some());
    assert!(state.sessions.get("s1").await.is_none());

    let done = resume(&state, review("s1", ReviewAction::Approve), None).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed);
    assert!(state.checkpoints.is_empty().await);
    let memory = state.sessions.get("s1").await.unwrap();
    assert_eq!(memory.conversation_history[0].agent_name, "crisis");

    let err = resume(&state, review("s1", ReviewAction::Approve), None).await.unwrap_err();
    assert!(matches!(err, ChatError::NoPendingReview(ref s) if s == "s1"));
}

#[tokio::test]
async fn rejected_run_is_recorded_with_its_status() {
    let llm: Arc<dyn LlmChat> = Arc::new(MockLlm::new([CRISIS_ROUTE]));
    let state = test_app_state_with(Some(llm), None);
    handle(&state, turn("Customers are angry about the recall", Some("s1")), None).await.unwrap();

    let done = resume(&state, review("s1", ReviewAction::Reject), None).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Rejected);
    let memory = state.sessions.get("s1").await.unwrap();
    assert_eq!(memory.conversation_history[0].metadata["status"], "rejected");
}

#[tokio::test]
async fn new_message_drops_the_pending_review() {
    let llm: Arc<dyn LlmChat> = Arc::new(MockLlm::new([CRISIS_ROUTE]));
    let state = test_app_state_with(Some(llm), None);
    handle(&state, turn("Customers are angry about the recall", Some("s1")), None).await.unwrap();
    assert_eq!(state.checkpoints.len().await, 1);

    // The mock has no routing reply left, so this routes by keywords.
    handle(&state, turn("hello", Some("s1")), None).await.unwrap();
    assert!(state.checkpoints.get("s1").await.is_none());
}

#[tokio::test]
async fn sessions_are_rate_limited() {
    let mut state = test_app_state();
    state.rate_limiter = RateLimiter::with_config(RateLimitConfig {
        per_session_limit: 1,
        global_limit: 10,
        window: Duration::from_secs(60),
    });

    handle(&state, turn("hello", Some("s1")), None).await.unwrap();
    let err = handle(&state, turn("hello again", Some("s1")), None).await.unwrap_err();
    assert!(matches!(err, ChatError::RateLimited(_)));
    assert_eq!(err.error_code(), "E_RATE_LIMITED");
    assert!(err.retryable());

    assert!(handle(&state, turn("hello", Some("s2")), None).await.is_ok());
}

#[tokio::test]
async fn progress_events_reach_the_channel() {
    let state = test_app_state();
    let (tx, mut rx) = mpsc::channel(64);
    let reply = handle(&state, turn("hello", Some("s1")), Some(tx)).await.unwrap();

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert_eq!(
        last,
        Some(WorkflowEvent::Completed { status: WorkflowStatus::Completed, final_response: reply.final_response })
    );
}

fn generous_limits(state: &mut AppState) {
    state.rate_limiter = RateLimiter::with_config(RateLimitConfig {
        per_session_limit: 100,
        global_limit: 100,
        window: Duration::from_secs(60),
    });
}

#[tokio::test]
async fn repeated_revisions_keep_the_review_alive() {
    let llm: Arc<dyn LlmChat> = Arc::new(MockLlm::new([CRISIS_ROUTE]));
    let mut state = test_app_state_with(Some(llm), None);
    generous_limits(&mut state);
    handle(&state, turn("Customers are angry about the recall", Some("s1")), None).await.unwrap();

    for _ in 0..20 {
        let reply = resume(&state, review("s1", ReviewAction::Revise), None).await.unwrap();
        assert_eq!(reply.status, WorkflowStatus::AwaitingReview);
        assert!(state.checkpoints.get("s1").await.is_some());
    }
    let done = resume(&state, review("s1", ReviewAction::Approve), None).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn failed_resume_leaves_the_run_parked() {
    let state = test_app_state();
    let mut stale = WorkflowState::new("hello", "s1", Map::new(), datetime!(2024-05-01 09:00 UTC));
    stale.status = WorkflowStatus::Running;
    state.checkpoints.save(stale).await;

    let err = resume(&state, review("s1", ReviewAction::Approve), None).await.unwrap_err();
    assert_eq!(err.error_code(), "E_NOT_AWAITING_REVIEW");
    assert!(state.checkpoints.get("s1").await.is_some());
}

#[tokio::test]
async fn reviews_count_against_the_session_rate_limit() {
    let llm: Arc<dyn LlmChat> = Arc::new(MockLlm::new([CRISIS_ROUTE]));
    let mut state = test_app_state_with(Some(llm), None);
    state.rate_limiter = RateLimiter::with_config(RateLimitConfig {
        per_session_limit: 1,
        global_limit: 10,
        window: Duration::from_secs(60),
    });
    handle(&state, turn("Customers are angry about the recall", Some("s1")), None).await.unwrap();

    let err = resume(&state, review("s1", ReviewAction::Revise), None).await.unwrap_err();
    assert!(matches!(err, ChatError::RateLimited(_)));
    assert!(state.checkpoints.get("s1").await.is_some());
}
