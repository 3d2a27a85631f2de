use super::*;
use crate::llm::LlmChat;
use crate::state::test_helpers::{MockLlm, MockPlatform};
use serde_json::Map;
use std::sync::Arc;
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2024-05-01 09:00 UTC);

fn cx(llm: Option<Arc<MockLlm>>, platform: Option<MockPlatform>) -> AgentContext {
    let mut cx = AgentContext::offline("s1", NOW);
    cx.llm = llm.map(|l| l as Arc<dyn LlmChat>);
    cx.platform = platform.map(|p| Arc::new(p) as Arc<dyn SocialPlatform>);
    cx
}

#[test]
fn analyze_summarizes_the_feed() {
    let platform = MockPlatform::healthy();
    let data = analyze(&platform.account, &platform.media, NOW);
    assert!((data.overall_engagement_rate - 14.0).abs() < 1e-9);
    assert!((data.avg_engagement_per_post - 140.0).abs() < 1e-9);
    assert_eq!(data.best_content_type.as_deref(), Some("VIDEO"));
    assert_eq!(data.best_posting_hours, [18, 9]);
    assert_eq!(data.content_type_performance["IMAGE"].count, 1);
    assert!((data.posting_frequency - 0.1).abs() < 1e-9);
    assert_eq!(data.content_gaps, ["Low posting frequency - consider posting more regularly"]);
    assert_eq!(
        data.optimization_opportunities,
        ["Increase posting consistency for better algorithm performance"]
    );
}

#[test]
fn trend_compares_last_two_weeks_to_older_posts() {
    let platform = MockPlatform::healthy();
    let trend = engagement_trend(&platform.media, NOW);
    assert_eq!(trend.performance_trend, "improving");
    assert!((trend.recent_avg_engagement - 180.0).abs() < 1e-9);
    assert!((trend.older_avg_engagement - 60.0).abs() < 1e-9);
    assert!((trend.trend_percentage - 200.0).abs() < 1e-9);

    let flat = engagement_trend(&[], NOW);
    assert_eq!(flat.performance_trend, "stable");
}

#[test]
fn empty_feed_suggests_starting() {
    let data = analyze(&AccountInfo::default(), &[], NOW);
    assert_eq!(data.content_gaps, ["No recent content to analyze"]);
    assert_eq!(
        data.optimization_opportunities,
        ["Start creating content to identify optimization opportunities"]
    );
    assert!(data.best_content_type.is_none());
}

#[tokio::test]
async fn without_llm_the_summary_is_the_answer() {
    let mut state = WorkflowState::new("Plan next month", "s1", Map::new(), NOW);
    let response = StrategyAgent.process(&cx(None, Some(MockPlatform::healthy())), &mut state).await.unwrap();
    assert_eq!(response.action, "strategy_planning");
    assert!(response.result.contains("Best performing format: VIDEO."));
    assert!(response.result.contains("Best posting hours (UTC): 18:00, 09:00."));
    assert!(response.result.ends_with("Focus on increase posting consistency for better algorithm performance."));
    assert_eq!(state.generated_content.unwrap()["type"], "strategy_consultation");
    assert!(state.content_strategy.is_some());
}

#[tokio::test]
async fn llm_sees_data_in_system_prompt() {
    let llm = Arc::new(MockLlm::new(["  Post more reels.  "]));
    let mut state = WorkflowState::new("How do we grow?", "s1", Map::new(), NOW);
    let response = StrategyAgent
        .process(&cx(Some(llm.clone()), Some(MockPlatform::healthy())), &mut state)
        .await
        .unwrap();
    assert_eq!(response.result, "Post more reels.");
    assert_eq!(state.final_response.as_deref(), Some("Post more reels."));

    let call = &llm.calls()[0];
    assert_eq!(call.prompt, "How do we grow?");
    assert_eq!(call.temperature, Some(0.7));
    assert_eq!(call.max_tokens, 1000);
    assert!(call.system.contains("Available Data:"));
    assert!(call.system.contains("\"best_content_type\": \"VIDEO\""));
}

#[tokio::test]
async fn platform_outage_still_plans() {
    let platform = MockPlatform { fail: true, ..MockPlatform::healthy() };
    let mut state = WorkflowState::new("Plan", "s1", Map::new(), NOW);
    let response = StrategyAgent.process(&cx(None, Some(platform)), &mut state).await.unwrap();
    assert!(response.result.contains("no platform data"));
}
