use super::*;
use crate::agents::communication::parse_metrics;
use crate::state::test_helpers::MockPlatform;
use serde_json::Map;
use std::sync::Arc;
use time::macros::datetime;

fn cx(platform: Option<MockPlatform>) -> AgentContext {
    let mut cx = AgentContext::offline("s1", datetime!(2024-05-01 09:00 UTC));
    cx.platform = platform.map(|p| Arc::new(p) as Arc<dyn SocialPlatform>);
    cx
}

fn state(request: &str) -> WorkflowState {
    WorkflowState::new(request, "s1", Map::new(), datetime!(2024-05-01 09:00 UTC))
}

#[tokio::test]
async fn metrics_come_from_account_media_and_insights() {
    let metrics = collect_metrics(&MockPlatform::healthy()).await.unwrap();
    assert_eq!(metrics.followers, 1000);
    assert_eq!(metrics.posts_analyzed, 3);
    assert!((metrics.avg_likes - 116.7).abs() < 1e-9);
    assert!((metrics.avg_comments - 23.3).abs() < 1e-9);
    assert!((metrics.engagement_rate - 14.0).abs() < 1e-9);
    assert_eq!((metrics.reach, metrics.impressions), (300, 1000));
}

#[test]
fn report_text_reads_back_through_the_extractor() {
    let metrics = PerformanceMetrics {
        followers: 5200,
        posts_analyzed: 25,
        avg_likes: 310.4,
        avg_comments: 12.5,
        engagement_rate: 6.21,
        reach: 0,
        impressions: 0,
    };
    let parsed = parse_metrics(&report_text(&metrics));
    assert_eq!(parsed.engagement_rate, Some(6.21));
    assert_eq!(parsed.avg_likes, Some(310.4));
    assert_eq!(parsed.avg_comments, Some(12.5));
    assert_eq!(parsed.followers, Some(5200));
}

#[test]
fn request_picks_the_follow_up_branch() {
    assert_eq!(AnalyticsType::classify("Analyze results for next month's plan"), AnalyticsType::StrategyInput);
    assert_eq!(AnalyticsType::classify("How can we improve reach?"), AnalyticsType::ContentOptimization);
    assert_eq!(AnalyticsType::classify("Show me last week's numbers"), AnalyticsType::Report);
}

#[tokio::test]
async fn agent_sets_metrics_and_branch() {
    let mut s = state("Analyze engagement to plan our strategy");
    let response = AnalyticsAgent.process(&cx(Some(MockPlatform::healthy())), &mut s).await.unwrap();
    assert_eq!(response.action, "performance_analysis");
    assert_eq!(response.data["analytics_type"], "strategy_input");
    assert_eq!(response.data["metrics"]["followers"], 1000);
    assert_eq!(s.performance_metrics.unwrap().reach, 300);
}

#[tokio::test]
async fn missing_platform_reports_zeros() {
    let mut s = state("Show me the numbers");
    let response = AnalyticsAgent.process(&cx(None), &mut s).await.unwrap();
    assert_eq!(s.performance_metrics, Some(PerformanceMetrics::default()));
    assert!(response.result.contains("without platform data"));
}

#[tokio::test]
async fn empty_insights_zero_reach_only() {
    let platform = MockPlatform { account_insights: Vec::new(), ..MockPlatform::healthy() };
    let metrics = collect_metrics(&platform).await.unwrap();
    assert_eq!(metrics.reach, 0);
    assert_eq!(metrics.posts_analyzed, 3);
}

#[tokio::test]
async fn platform_outage_is_an_agent_error() {
    let platform = MockPlatform { fail: true, ..MockPlatform::healthy() };
    let err = AnalyticsAgent.process(&cx(Some(platform)), &mut state("numbers")).await.unwrap_err();
    assert!(matches!(err, AgentError::Platform(_)));
}
