//! Strategy agent: data-driven planning over the recent feed.
//!
//! DESIGN
//! ======
//! Platform data is summarized into [`StrategyData`] (engagement rate,
//! format performance, best hours, trend, gaps, opportunities). The summary
//! plus any analytics findings from earlier agents is handed to the LLM as
//! context. Without an LLM the summary itself is rendered as the answer.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::warn;

use super::analytics::round_to;
use super::communication;
use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::llm;
use crate::routing::AgentKind;
use crate::services::instagram::{AccountInfo, InstagramError, MediaItem, SocialPlatform};
use crate::workflow::WorkflowState;

const STRATEGY_MEDIA: u32 = 50;
const STRATEGY_MAX_TOKENS: u32 = 1000;
const STRATEGY_TEMPERATURE: f32 = 0.7;
const FREQUENCY_WINDOW_DAYS: f64 = 30.0;
const TREND_DAYS: i64 = 14;
const CONSISTENCY_DAYS: i64 = 7;
const BEST_HOURS: usize = 3;
const CONTEXT_ITEMS: usize = 2;

const STRATEGY_SYSTEM: &str = "You are an expert social media strategist. Analyze the provided data and create \
actionable strategic recommendations.
If analytics data from previous agents is available, reference specific findings and build strategic \
recommendations on top of them.

Provide:
- Data-driven strategic insights
- Specific actionable recommendations
- Content strategy based on performance data
- Growth tactics and next steps
- Follow-up questions to refine strategy

Be conversational, specific, and reference the actual data provided.";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormatPerformance {
    pub total_engagement: u64,
    pub count: usize,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementTrend {
    /// `improving`, `declining` or `stable`.
    pub performance_trend: &'static str,
    pub recent_avg_engagement: f64,
    pub older_avg_engagement: f64,
    pub trend_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyData {
    pub followers: u64,
    pub overall_engagement_rate: f64,
    pub avg_engagement_per_post: f64,
    pub total_posts_analyzed: usize,
    pub content_type_performance: BTreeMap<String, FormatPerformance>,
    pub best_content_type: Option<String>,
    /// UTC hours, best first.
    pub best_posting_hours: Vec<u8>,
    /// Posts per day over a 30-day window.
    pub posting_frequency: f64,
    pub trend: EngagementTrend,
    pub content_gaps: Vec<String>,
    pub optimization_opportunities: Vec<String>,
}

#[allow(clippy::cast_precision_loss)]
fn mean(total: u64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { total as f64 / count as f64 }
}

fn within_days(post: &MediaItem, now: OffsetDateTime, days: i64) -> bool {
    post.posted_at().is_some_and(|ts| (now - ts).whole_days() <= days)
}

/// Recent (last 14 days) versus older average engagement.
#[must_use]
pub fn engagement_trend(posts: &[MediaItem], now: OffsetDateTime) -> EngagementTrend {
    let (recent, older): (Vec<&MediaItem>, Vec<&MediaItem>) =
        posts.iter().partition(|p| within_days(p, now, TREND_DAYS));
    let avg = |group: &[&MediaItem]| mean(group.iter().map(|p| p.engagement()).sum(), group.len());
    let (recent_avg, older_avg) = (avg(&recent), avg(&older));

    let performance_trend = if recent_avg > older_avg {
        "improving"
    } else if recent_avg < older_avg {
        "declining"
    } else {
        "stable"
    };
    let trend_percentage = if older_avg > 0.0 { (recent_avg - older_avg) / older_avg * 100.0 } else { 0.0 };
    EngagementTrend {
        performance_trend,
        recent_avg_engagement: round_to(recent_avg, 1),
        older_avg_engagement: round_to(older_avg, 1),
        trend_percentage: round_to(trend_percentage, 1),
    }
}

#[allow(clippy::cast_precision_loss)]
fn content_gaps(posts: &[MediaItem]) -> Vec<String> {
    if posts.is_empty() {
        return vec!["No recent content to analyze".into()];
    }
    let mut gaps = Vec::new();
    if !posts.iter().any(|p| p.media_type == "VIDEO") {
        gaps.push("Missing video content - consider adding Reels or video posts".into());
    }
    if !posts.iter().any(|p| p.media_type == "CAROUSEL_ALBUM") {
        gaps.push("Missing carousel posts - great for engagement and storytelling".into());
    }
    let frequency = posts.len() as f64 / FREQUENCY_WINDOW_DAYS;
    if frequency < 0.5 {
        gaps.push("Low posting frequency - consider posting more regularly".into());
    } else if frequency > 2.0 {
        gaps.push("High posting frequency - ensure quality over quantity".into());
    }
    gaps
}

fn opportunities(engagement_rate: f64, posts: &[MediaItem], now: OffsetDateTime) -> Vec<String> {
    if posts.is_empty() {
        return vec!["Start creating content to identify optimization opportunities".into()];
    }
    let mut found = Vec::new();
    if engagement_rate < 1.0 {
        found.push("Low engagement rate - focus on audience-relevant content".into());
    }
    if engagement_rate < 3.0 {
        found.push("Improve call-to-actions and audience interaction".into());
    }
    if posts.iter().filter(|p| within_days(p, now, CONSISTENCY_DAYS)).count() < 3 {
        found.push("Increase posting consistency for better algorithm performance".into());
    }
    found
}

/// Summarize an account and its recent media for planning.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze(account: &AccountInfo, posts: &[MediaItem], now: OffsetDateTime) -> StrategyData {
    let total: u64 = posts.iter().map(MediaItem::engagement).sum();
    let avg_engagement = mean(total, posts.len());
    let engagement_rate = if account.followers_count == 0 {
        0.0
    } else {
        avg_engagement / account.followers_count as f64 * 100.0
    };

    let mut formats: BTreeMap<String, FormatPerformance> = BTreeMap::new();
    let mut hours: BTreeMap<u8, (u64, usize)> = BTreeMap::new();
    for post in posts {
        let entry = formats.entry(post.media_type.clone()).or_default();
        entry.total_engagement += post.engagement();
        entry.count += 1;
        if let Some(ts) = post.posted_at() {
            let slot = hours.entry(ts.to_offset(time::UtcOffset::UTC).hour()).or_default();
            slot.0 += post.engagement();
            slot.1 += 1;
        }
    }
    for perf in formats.values_mut() {
        perf.avg_engagement = round_to(mean(perf.total_engagement, perf.count), 1);
    }

    let best_content_type = formats
        .iter()
        .max_by(|a, b| a.1.avg_engagement.total_cmp(&b.1.avg_engagement))
        .map(|(name, _)| name.clone());

    let mut ranked: Vec<(u8, f64)> = hours.into_iter().map(|(h, (t, c))| (h, mean(t, c))).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let best_posting_hours = ranked.into_iter().take(BEST_HOURS).map(|(h, _)| h).collect();

    StrategyData {
        followers: account.followers_count,
        overall_engagement_rate: round_to(engagement_rate, 2),
        avg_engagement_per_post: round_to(avg_engagement, 1),
        total_posts_analyzed: posts.len(),
        content_type_performance: formats,
        best_content_type,
        best_posting_hours,
        posting_frequency: round_to(posts.len() as f64 / FREQUENCY_WINDOW_DAYS, 2),
        trend: engagement_trend(posts, now),
        content_gaps: content_gaps(posts),
        optimization_opportunities: opportunities(engagement_rate, posts, now),
    }
}

async fn load_data(platform: &dyn SocialPlatform, now: OffsetDateTime) -> Option<StrategyData> {
    let loaded = async {
        let account = platform.account_info().await?;
        let media = platform.media(STRATEGY_MEDIA).await?;
        Ok::<_, InstagramError>(analyze(&account, &media.data, now))
    };
    match loaded.await {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(error = %e, "strategy: platform data unavailable");
            None
        }
    }
}

/// Plain-text plan used when no LLM is configured.
#[must_use]
pub fn summary_text(data: Option<&StrategyData>) -> String {
    let Some(data) = data else {
        return "Strategy overview: no platform data is available yet. Focus on posting consistently 3-5 times \
                per week and track which formats earn the most engagement."
            .into();
    };
    let mut lines = vec![format!(
        "Strategy overview: engagement rate {:.2}% across {} recent posts ({} followers), trend {}.",
        data.overall_engagement_rate, data.total_posts_analyzed, data.followers, data.trend.performance_trend,
    )];
    if let Some(best) = &data.best_content_type {
        lines.push(format!("Best performing format: {best}."));
    }
    if !data.best_posting_hours.is_empty() {
        let hours: Vec<String> = data.best_posting_hours.iter().map(|h| format!("{h:02}:00")).collect();
        lines.push(format!("Best posting hours (UTC): {}.", hours.join(", ")));
    }
    let next = data
        .optimization_opportunities
        .first()
        .or(data.content_gaps.first())
        .map_or("keeping the current cadence", String::as_str);
    lines.push(format!("Focus on {}.", next.to_lowercase()));
    lines.join("\n")
}

pub struct StrategyAgent;

#[async_trait::async_trait]
impl Agent for StrategyAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Strategy
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let request = state.task_for(AgentKind::Strategy).unwrap_or(&state.user_request).to_string();
        let analytics = communication::analytics_insights(state);
        let based_on_analytics = analytics.is_some();
        let previous: Vec<&str> = communication::previous_data(state, AgentKind::Strategy)
            .keys()
            .map(|k| k.as_str())
            .collect();

        let data = match cx.platform() {
            Some(platform) => load_data(platform, cx.now).await,
            None => None,
        };

        let response_text = match cx.llm() {
            Some(llm) => {
                let context = json!({
                    "user_request": request,
                    "strategy_metrics": data.as_ref().map(|d| json!({
                        "engagement_rate": d.overall_engagement_rate,
                        "avg_engagement": d.avg_engagement_per_post,
                        "best_content_type": d.best_content_type.as_deref().unwrap_or("Unknown"),
                        "posting_frequency": d.posting_frequency,
                        "followers": d.followers,
                    })),
                    "analytics_insights": analytics,
                    "content_gaps": data.as_ref().map(|d| d.content_gaps.iter().take(CONTEXT_ITEMS).collect::<Vec<_>>()),
                    "optimization_opportunities": data
                        .as_ref()
                        .map(|d| d.optimization_opportunities.iter().take(CONTEXT_ITEMS).collect::<Vec<_>>()),
                });
                let pretty = serde_json::to_string_pretty(&context).unwrap_or_default();
                let system = format!("{STRATEGY_SYSTEM}\n\nAvailable Data:\n{pretty}");
                llm::complete(llm, &system, &request, STRATEGY_MAX_TOKENS, STRATEGY_TEMPERATURE)
                    .await?
                    .trim()
                    .to_string()
            }
            None => summary_text(data.as_ref()),
        };

        state.content_strategy = Some(json!({
            "summary": response_text,
            "insights": data,
        }));
        state.generated_content = Some(json!({
            "content": response_text,
            "type": "strategy_consultation",
            "status": "completed",
            "based_on_analytics": based_on_analytics,
            "used_previous_agents": previous,
        }));
        state.final_response = Some(response_text.clone());

        Ok(AgentResponse::new(AgentKind::Strategy, "strategy_planning", response_text, cx.now)
            .with("based_on_analytics", based_on_analytics))
    }
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod tests;
