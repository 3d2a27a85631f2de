//! Listening agent: mention volume and sentiment score over recent comments.

use tracing::info;

use super::analytics::round_to;
use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::routing::AgentKind;
use crate::services::dashboard::{self, SentimentReport, SentimentScope};
use crate::workflow::WorkflowState;

/// `(positive - negative) / 100`, in `[-1, 1]`.
#[must_use]
pub fn sentiment_score(report: &SentimentReport) -> f64 {
    let s = &report.summary;
    round_to((f64::from(s.positive_percentage) - f64::from(s.negative_percentage)) / 100.0, 2)
}

pub struct ListeningAgent;

#[async_trait::async_trait]
impl Agent for ListeningAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Listening
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let (report, result) = match cx.platform() {
            Some(platform) => {
                (dashboard::sentiment_report(platform, SentimentScope::FULL).await?, "Social monitoring complete")
            }
            None => (
                dashboard::build_report(Vec::new(), SentimentScope::FULL.samples),
                "Social monitoring complete (no platform data)",
            ),
        };
        let mentions = report.summary.total_comments;
        let score = sentiment_score(&report);
        info!(session_id = %state.session_id, mentions, score, "listening: scan finished");

        state.final_response = Some(format!(
            "Tracked {mentions} recent mentions. Sentiment score {score:+.2} ({}).",
            serde_json::to_value(report.summary.overall_sentiment)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        ));

        Ok(AgentResponse::new(AgentKind::Listening, "social_listening", result, cx.now)
            .with("mentions", mentions)
            .with("sentiment_score", score)
            .with("sample_mentions", report.sample_comments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::instagram::SocialPlatform;
    use crate::state::test_helpers::MockPlatform;
    use serde_json::Map;
    use std::sync::Arc;
    use time::macros::datetime;

    const NOW: time::OffsetDateTime = datetime!(2024-05-01 09:00 UTC);

    #[test]
    fn score_is_net_positive_share() {
        let report = dashboard::build_report(vec!["love it".into(), "terrible".into(), "great".into(), "ok".into()], 5);
        assert!((sentiment_score(&report) - 0.25).abs() < 1e-9);
        assert!(sentiment_score(&dashboard::build_report(Vec::new(), 5)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn counts_every_recent_comment() {
        let mut cx = AgentContext::offline("s1", NOW);
        cx.platform = Some(Arc::new(MockPlatform::healthy()) as Arc<dyn SocialPlatform>);
        let mut state = WorkflowState::new("Monitor brand mentions", "s1", Map::new(), NOW);
        let response = ListeningAgent.process(&cx, &mut state).await.unwrap();

        assert_eq!(response.action, "social_listening");
        assert_eq!(response.data["mentions"], 4);
        assert_eq!(response.data["sentiment_score"], 0.75);
        assert!(state.final_response.unwrap().starts_with("Tracked 4 recent mentions. Sentiment score +0.75"));
    }

    #[tokio::test]
    async fn offline_scan_reports_nothing() {
        let mut state = WorkflowState::new("Monitor", "s1", Map::new(), NOW);
        let response = ListeningAgent.process(&AgentContext::offline("s1", NOW), &mut state).await.unwrap();
        assert_eq!(response.data["mentions"], 0);
        assert!(response.result.contains("no platform data"));
    }
}
