//! Community agent: comment sentiment and reply suggestions.
//!
//! The `community_action` field of the response picks the next edge in the
//! workflow graph: `crisis` hands the run to the crisis agent, `monitoring`
//! to listening, `response` ends the branch.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::crisis::NEGATIVE_ALERT_PERCENT;
use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::routing::AgentKind;
use crate::services::dashboard::{self, SentimentReport, SentimentScope};
use crate::services::sentiment::{self, Sentiment};
use crate::workflow::WorkflowState;

const MAX_REPLY_SUGGESTIONS: usize = 3;
const CRISIS_WORDS: [&str; 5] = ["crisis", "backlash", "angry", "boycott", "scandal"];
const MONITOR_WORDS: [&str; 2] = ["monitor", "track"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityAction {
    Response,
    Crisis,
    Monitoring,
}

impl CommunityAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Crisis => "crisis",
            Self::Monitoring => "monitoring",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "response" => Some(Self::Response),
            "crisis" => Some(Self::Crisis),
            "monitoring" => Some(Self::Monitoring),
            _ => None,
        }
    }

    /// Crisis wording or a high negative share wins over monitoring.
    #[must_use]
    pub fn classify(task: &str, negative_percentage: u32) -> Self {
        let lower = task.to_lowercase();
        if u64::from(negative_percentage) >= NEGATIVE_ALERT_PERCENT || CRISIS_WORDS.iter().any(|w| lower.contains(w)) {
            Self::Crisis
        } else if MONITOR_WORDS.iter().any(|w| lower.contains(w)) {
            Self::Monitoring
        } else {
            Self::Response
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplySuggestion {
    pub comment: String,
    pub sentiment: Sentiment,
    pub reply: &'static str,
}

fn reply_for(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "Thank you so much! We're glad you enjoyed it 🙌",
        Sentiment::Negative => "We're sorry to hear that. Send us a DM so we can make it right.",
        Sentiment::Neutral => "Thanks for stopping by! Let us know what you'd like to see next.",
    }
}

/// Canned replies for the first sampled comments.
#[must_use]
pub fn reply_suggestions(comments: &[String]) -> Vec<ReplySuggestion> {
    comments
        .iter()
        .take(MAX_REPLY_SUGGESTIONS)
        .map(|comment| {
            let sentiment = sentiment::analyze_text(comment).sentiment;
            ReplySuggestion { comment: comment.clone(), sentiment, reply: reply_for(sentiment) }
        })
        .collect()
}

fn summary_text(report: &SentimentReport, suggestions: &[ReplySuggestion]) -> String {
    let s = &report.summary;
    let mut text = if report.has_comments {
        format!(
            "Community sentiment: {}% positive, {}% neutral, {}% negative across {} recent comments.",
            s.positive_percentage, s.neutral_percentage, s.negative_percentage, s.total_comments
        )
    } else {
        "No recent comments to respond to.".to_string()
    };
    if !suggestions.is_empty() {
        text.push_str("\n\nSuggested replies:");
        for suggestion in suggestions {
            text.push_str(&format!("\n- \"{}\" → {}", suggestion.comment, suggestion.reply));
        }
    }
    text
}

pub struct CommunityAgent;

#[async_trait::async_trait]
impl Agent for CommunityAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Community
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let report = match cx.platform() {
            Some(platform) => dashboard::sentiment_report(platform, SentimentScope::DASHBOARD).await?,
            None => dashboard::build_report(Vec::new(), SentimentScope::DASHBOARD.samples),
        };
        let suggestions = reply_suggestions(&report.sample_comments);
        let task = state.task_for(AgentKind::Community).unwrap_or(&state.user_request);
        let action = CommunityAction::classify(task, report.summary.negative_percentage);
        info!(
            session_id = %state.session_id,
            action = action.as_str(),
            comments = report.summary.total_comments,
            "community: sentiment checked"
        );

        state.final_response = Some(summary_text(&report, &suggestions));

        let s = &report.summary;
        Ok(AgentResponse::new(AgentKind::Community, "community_management", "Community engagement analyzed", cx.now)
            .with("community_action", action.as_str())
            .with("overall_sentiment", json!(s.overall_sentiment))
            .with("positive_percentage", s.positive_percentage)
            .with("neutral_percentage", s.neutral_percentage)
            .with("negative_percentage", s.negative_percentage)
            .with("total_comments", s.total_comments)
            .with("reply_suggestions", serde_json::to_value(&suggestions).unwrap_or(Value::Null)))
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

    fn cx(platform: MockPlatform) -> AgentContext {
        let mut cx = AgentContext::offline("s1", NOW);
        cx.platform = Some(Arc::new(platform) as Arc<dyn SocialPlatform>);
        cx
    }

    #[test]
    fn action_follows_wording_and_negativity() {
        assert_eq!(CommunityAction::classify("Reply to today's comments", 10), CommunityAction::Response);
        assert_eq!(CommunityAction::classify("Track mentions this week", 10), CommunityAction::Monitoring);
        assert_eq!(CommunityAction::classify("People are angry", 0), CommunityAction::Crisis);
        assert_eq!(CommunityAction::classify("Track mentions this week", 40), CommunityAction::Crisis);
        assert_eq!(CommunityAction::from_name("monitoring"), Some(CommunityAction::Monitoring));
    }

    #[test]
    fn replies_match_comment_tone() {
        let replies = reply_suggestions(&["love it".to_string(), "terrible service".to_string()]);
        assert_eq!(replies[0].sentiment, Sentiment::Positive);
        assert!(replies[1].reply.starts_with("We're sorry"));
    }

    #[tokio::test]
    async fn recent_comments_drive_the_report() {
        let mut state = WorkflowState::new("Reply to our followers", "s1", Map::new(), NOW);
        let response = CommunityAgent.process(&cx(MockPlatform::healthy()), &mut state).await.unwrap();

        assert_eq!(response.action, "community_management");
        assert_eq!(response.data["community_action"], "response");
        assert_eq!(response.data["total_comments"], 4);
        assert_eq!(response.data["negative_percentage"], 0);
        assert_eq!(response.data["reply_suggestions"].as_array().unwrap().len(), 3);
        assert!(state.final_response.unwrap().contains("Suggested replies:"));
    }

    #[tokio::test]
    async fn platform_failure_is_an_agent_error() {
        let platform = MockPlatform { fail: true, ..MockPlatform::healthy() };
        let mut state = WorkflowState::new("Reply", "s1", Map::new(), NOW);
        let err = CommunityAgent.process(&cx(platform), &mut state).await.unwrap_err();
        assert!(matches!(err, AgentError::Platform(_)));
    }

    #[tokio::test]
    async fn without_platform_nothing_to_answer() {
        let mut state = WorkflowState::new("Reply", "s1", Map::new(), NOW);
        let response = CommunityAgent.process(&AgentContext::offline("s1", NOW), &mut state).await.unwrap();
        assert_eq!(response.data["total_comments"], 0);
        assert_eq!(state.final_response.as_deref(), Some("No recent comments to respond to."));
    }
}
