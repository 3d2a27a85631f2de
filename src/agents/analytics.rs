//! Analytics agent: performance metrics from live platform data.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::routing::AgentKind;
use crate::services::instagram::SocialPlatform;
use crate::workflow::WorkflowState;

const MEDIA_SAMPLE: u32 = 25;
const INSIGHT_DAYS: u32 = 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub followers: u64,
    pub posts_analyzed: usize,
    pub avg_likes: f64,
    pub avg_comments: f64,
    /// Average engagement per post as a percentage of followers.
    pub engagement_rate: f64,
    pub reach: u64,
    pub impressions: u64,
}

/// Where the graph goes after analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsType {
    Report,
    StrategyInput,
    ContentOptimization,
}

impl AnalyticsType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::StrategyInput => "strategy_input",
            Self::ContentOptimization => "content_optimization",
        }
    }

    #[must_use]
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw {
            "report" => Some(Self::Report),
            "strategy_input" => Some(Self::StrategyInput),
            "content_optimization" => Some(Self::ContentOptimization),
            _ => None,
        }
    }

    #[must_use]
    pub fn classify(request: &str) -> Self {
        let lower = request.to_lowercase();
        if lower.contains("strategy") || lower.contains("plan") {
            Self::StrategyInput
        } else if ["content", "optimiz", "improve"].iter().any(|k| lower.contains(k)) {
            Self::ContentOptimization
        } else {
            Self::Report
        }
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Collect metrics. Insight failures only zero reach and impressions.
///
/// # Errors
///
/// Returns an error when the account or media list cannot be loaded.
#[allow(clippy::cast_precision_loss)]
pub async fn collect_metrics(platform: &dyn SocialPlatform) -> Result<PerformanceMetrics, AgentError> {
    let account = platform.account_info().await?;
    let media = platform.media(MEDIA_SAMPLE).await?.data;

    let (mut reach, mut impressions) = (0, 0);
    match platform.account_insights(INSIGHT_DAYS).await {
        Ok(metrics) => {
            for metric in metrics {
                match metric.name.as_str() {
                    "reach" => reach = metric.total(),
                    "impressions" => impressions = metric.total(),
                    _ => {}
                }
            }
        }
        Err(e) => warn!(error = %e, "analytics: account insights unavailable"),
    }

    let posts = media.len();
    let (likes, comments) = media
        .iter()
        .fold((0u64, 0u64), |(l, c), m| (l + m.like_count, c + m.comments_count));
    let (avg_likes, avg_comments) = if posts == 0 {
        (0.0, 0.0)
    } else {
        (likes as f64 / posts as f64, comments as f64 / posts as f64)
    };
    let engagement_rate = if account.followers_count == 0 {
        0.0
    } else {
        (avg_likes + avg_comments) / account.followers_count as f64 * 100.0
    };

    Ok(PerformanceMetrics {
        followers: account.followers_count,
        posts_analyzed: posts,
        avg_likes: round_to(avg_likes, 1),
        avg_comments: round_to(avg_comments, 1),
        engagement_rate: round_to(engagement_rate, 2),
        reach,
        impressions,
    })
}

/// Report text. Phrased so the metric extractor can read it back.
#[must_use]
pub fn report_text(metrics: &PerformanceMetrics) -> String {
    format!(
        "Analytics report for {} followers across {} recent posts. Engagement rate: {:.2}%. \
         Average likes: {:.1} per post. Average comments: {:.1} per post. \
         Reach over the last {INSIGHT_DAYS} days: {}. Impressions: {}.",
        metrics.followers,
        metrics.posts_analyzed,
        metrics.engagement_rate,
        metrics.avg_likes,
        metrics.avg_comments,
        metrics.reach,
        metrics.impressions,
    )
}

pub struct AnalyticsAgent;

#[async_trait::async_trait]
impl Agent for AnalyticsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Analytics
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let (metrics, result) = match cx.platform() {
            Some(platform) => {
                let metrics = collect_metrics(platform).await?;
                let text = report_text(&metrics);
                (metrics, text)
            }
            None => (
                PerformanceMetrics::default(),
                "Analytics report generated without platform data: connect an account for live metrics.".into(),
            ),
        };

        let request = state.task_for(AgentKind::Analytics).unwrap_or(&state.user_request);
        let analytics_type = AnalyticsType::classify(request);
        let metrics_json = serde_json::to_value(&metrics).unwrap_or_default();
        state.performance_metrics = Some(metrics);
        state.final_response = Some(result.clone());

        Ok(AgentResponse::new(AgentKind::Analytics, "performance_analysis", result, cx.now)
            .with("metrics", metrics_json)
            .with("analytics_type", analytics_type.as_str()))
    }
}

#[cfg(test)]
#[path = "analytics_test.rs"]
mod tests;
