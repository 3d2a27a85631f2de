//! Data handed between agents in one run.
//!
//! Later agents read earlier responses out of the shared state: analytics
//! text is mined for metrics and themes, strategy text is summarized, and
//! everything is rendered into a context block for LLM prompts.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::AgentResponse;
use crate::routing::AgentKind;
use crate::text::truncate_chars;
use crate::workflow::WorkflowState;

const ANALYTICS_SUMMARY_CHARS: usize = 500;
const STRATEGY_SUMMARY_CHARS: usize = 300;

const THEME_KEYWORDS: [(&str, &[&str]); 8] = [
    ("sports", &["sports", "cricket", "soccer", "football", "match", "game"]),
    ("fitness", &["fitness", "workout", "gym", "health", "exercise"]),
    ("lifestyle", &["lifestyle", "daily", "life", "routine"]),
    ("business", &["business", "entrepreneur", "startup", "work"]),
    ("tech", &["tech", "technology", "digital", "app", "software"]),
    ("food", &["food", "recipe", "cooking", "restaurant"]),
    ("travel", &["travel", "trip", "vacation", "destination"]),
    ("motivational", &["motivational", "inspiring", "inspiration"]),
];

/// Agents whose output `agent` builds on.
#[must_use]
pub fn dependencies(agent: AgentKind) -> &'static [AgentKind] {
    match agent {
        AgentKind::Strategy => &[AgentKind::Analytics],
        AgentKind::Content => &[AgentKind::Strategy, AgentKind::Analytics],
        AgentKind::Publishing => &[AgentKind::Content],
        AgentKind::Community => &[AgentKind::Analytics, AgentKind::Content],
        AgentKind::Crisis => &[AgentKind::Analytics, AgentKind::Listening],
        _ => &[],
    }
}

/// Latest response of every other agent, orchestration nodes excluded.
#[must_use]
pub fn previous_data(state: &WorkflowState, current: AgentKind) -> BTreeMap<AgentKind, &AgentResponse> {
    state
        .agent_responses
        .iter()
        .filter(|r| {
            r.agent != current && !matches!(r.agent, AgentKind::Orchestrator | AgentKind::ParallelCoordinator)
        })
        .map(|r| (r.agent, r))
        .collect()
}

fn latest(state: &WorkflowState, agent: AgentKind) -> Option<&AgentResponse> {
    state.agent_responses.iter().rev().find(|r| r.agent == agent)
}

// =============================================================================
// METRICS & THEMES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_likes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_comments: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Themes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_theme: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_content_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub best_posting_times: Vec<String>,
}

struct Patterns {
    engagement: Vec<Regex>,
    likes: Vec<Regex>,
    comments: Vec<Regex>,
    followers: Option<Regex>,
    posting_times: Option<Regex>,
}

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources.iter().filter_map(|s| Regex::new(s).ok()).collect()
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        engagement: compile(&[
            r"engagement rate.*?(\d+\.?\d*)",
            r"(\d+\.?\d*).*?engagement rate",
        ]),
        likes: compile(&[
            r"average likes.*?(\d+\.?\d*)",
            r"average.*?(\d+\.?\d*).*?likes",
            r"(\d+\.?\d*).*?likes.*?per post",
        ]),
        comments: compile(&[
            r"average comments.*?(\d+\.?\d*)",
            r"average.*?(\d+\.?\d*).*?comments",
            r"(\d+\.?\d*).*?comments.*?per post",
        ]),
        followers: Regex::new(r"(\d+)\s+followers").ok(),
        posting_times: Regex::new(r"best.*?time.*?(\d{1,2}:\d{2}).*?(\d{1,2}:\d{2})").ok(),
    })
}

fn first_number(patterns: &[Regex], text: &str) -> Option<f64> {
    patterns
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Pull numeric metrics out of free text. Each metric tries its patterns in
/// order and keeps the first hit.
#[must_use]
pub fn parse_metrics(text: &str) -> ParsedMetrics {
    let lower = text.to_lowercase();
    let p = patterns();
    ParsedMetrics {
        engagement_rate: first_number(&p.engagement, &lower),
        avg_likes: first_number(&p.likes, &lower),
        avg_comments: first_number(&p.comments, &lower),
        followers: p
            .followers
            .as_ref()
            .and_then(|re| re.captures(&lower))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok()),
    }
}

#[must_use]
pub fn extract_themes(text: &str) -> Themes {
    let lower = text.to_lowercase();
    let top_theme = THEME_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(theme, _)| *theme);

    let performing = lower.contains("performing");
    let best_content_type = if lower.contains("images") && (performing || lower.contains("posts are")) {
        Some("images")
    } else if lower.contains("video") && performing {
        Some("video")
    } else if lower.contains("carousel") && performing {
        Some("carousel")
    } else {
        None
    };

    let best_posting_times = patterns()
        .posting_times
        .as_ref()
        .and_then(|re| re.captures(&lower))
        .map(|caps| caps.iter().skip(1).flatten().map(|m| m.as_str().to_string()).collect())
        .unwrap_or_default();

    Themes { top_theme, best_content_type, best_posting_times }
}

// =============================================================================
// INSIGHTS FROM EARLIER AGENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsInsights {
    #[serde(flatten)]
    pub metrics: ParsedMetrics,
    #[serde(flatten)]
    pub themes: Themes,
    pub analytics_summary: String,
}

/// Insights mined from the latest analytics response.
#[must_use]
pub fn analytics_insights(state: &WorkflowState) -> Option<AnalyticsInsights> {
    let response = latest(state, AgentKind::Analytics)?;
    Some(AnalyticsInsights {
        metrics: parse_metrics(&response.result),
        themes: extract_themes(&response.result),
        analytics_summary: truncate_chars(&response.result, ANALYTICS_SUMMARY_CHARS),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyRecommendations {
    pub strategy_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
}

/// Summary of the latest strategy response, with the phrase after
/// "focus on" as the focus area.
#[must_use]
pub fn strategy_recommendations(state: &WorkflowState) -> Option<StrategyRecommendations> {
    let response = latest(state, AgentKind::Strategy)?;
    let lower = response.result.to_lowercase();
    let focus_area = lower.find("focus on ").and_then(|idx| {
        let rest = &lower[idx + "focus on ".len()..];
        let phrase = rest.split(['.', '\n']).next().unwrap_or_default().trim();
        (!phrase.is_empty()).then(|| phrase.to_string())
    });
    Some(StrategyRecommendations {
        strategy_summary: truncate_chars(&response.result, STRATEGY_SUMMARY_CHARS),
        focus_area,
    })
}

/// Prompt block describing what earlier agents produced.
#[must_use]
pub fn build_context(state: &WorkflowState, current: AgentKind) -> String {
    let previous = previous_data(state, current);
    if previous.is_empty() {
        return "No previous agent data available.".into();
    }

    let mut parts = vec![format!("Previous Agent Insights for {current} agent:")];
    if let Some(insights) = analytics_insights(state) {
        parts.push(format!("Analytics Data: {}", pretty(&insights)));
    }
    if let Some(strategy) = strategy_recommendations(state) {
        parts.push(format!("Strategy Recommendations: {}", pretty(&strategy)));
    }
    if let Some(draft) = &state.draft {
        parts.push(format!("Generated Content: {}", pretty(draft)));
    }
    for (agent, response) in &previous {
        if !matches!(agent, AgentKind::Analytics | AgentKind::Strategy | AgentKind::Content) {
            parts.push(format!("{agent}: {}", truncate_chars(&response.result, STRATEGY_SUMMARY_CHARS)));
        }
    }
    parts.join("\n\n")
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
#[path = "communication_test.rs"]
mod tests;
