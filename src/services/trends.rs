//! Trending topics and trend-based content strategy.
//!
//! Trends come from a fixed fallback list (no live trend source). Strategy
//! text is LLM-generated when a model is configured and otherwise built from
//! a deterministic template over the top trends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::clock;
use crate::llm::{self, LlmChat};

const FALLBACK_TRENDS: [&str; 10] = [
    "AI technology",
    "Social media marketing",
    "Content creation",
    "Digital trends",
    "Instagram reels",
    "Viral content",
    "Online business",
    "Personal branding",
    "Influencer marketing",
    "SEO tips",
];

const STRATEGIST_SYSTEM: &str = "You are a social media strategist specializing in trend-based content creation.";
const STRATEGY_MAX_TOKENS: u32 = 800;
const STRATEGY_TEMPERATURE: f32 = 0.7;
/// Niche used for the dashboard's comprehensive strategy.
pub const DEFAULT_NICHE: &str = "sports";
const MAX_RECOMMENDATIONS: usize = 5;
const MAX_RELATED: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub keyword: String,
    pub rank: u32,
    pub category: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStrategy {
    pub strategy: String,
    pub trends_used: Vec<Trend>,
    pub generated_at: String,
    pub niche: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveStrategy {
    pub content_strategy: ContentStrategy,
    pub trending_topics: Vec<Trend>,
    pub interest_analysis: Map<String, Value>,
    pub recommendations: Vec<String>,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAnalysis {
    pub keyword: String,
    pub interest_analysis: Map<String, Value>,
    pub related_queries: Vec<String>,
    pub analyzed_at: String,
}

#[must_use]
pub fn trending_topics() -> Vec<Trend> {
    let timestamp = clock::now_iso();
    FALLBACK_TRENDS
        .iter()
        .zip(1..)
        .map(|(keyword, rank)| Trend {
            keyword: (*keyword).to_string(),
            rank,
            category: "fallback".into(),
            timestamp: timestamp.clone(),
        })
        .collect()
}

fn strategy_prompt(trends: &[Trend], niche: &str) -> String {
    let listed = trends
        .iter()
        .take(5)
        .map(|t| format!("- {} (Rank #{})", t.keyword, t.rank))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on these current trending topics, create a content strategy for a {niche} Instagram account:\n\n\
         Current Trends:\n{listed}\n\n\
         Provide:\n\
         1. 3 specific content ideas that connect these trends to {niche}\n\
         2. Optimal posting strategy\n\
         3. Hashtag recommendations\n\
         4. Content format suggestions (Reels, Posts, Stories)\n\n\
         Keep recommendations practical and actionable."
    )
}

/// Deterministic strategy from the top three trends.
#[must_use]
pub fn basic_strategy(trends: &[Trend], niche: &str) -> ContentStrategy {
    let top: Vec<&str> = trends.iter().take(3).map(|t| t.keyword.as_str()).collect();
    let strategy = format!(
        "Content Strategy for {niche}:\n\n\
         1. Trending Topics to Leverage:\n   - {}\n\n\
         2. Content Ideas:\n   - Create posts connecting {niche} to trending topics\n   \
         - Use trending hashtags in your niche\n   - Post during peak hours (2-6 PM)\n\n\
         3. Formats to Try:\n   - Reels with trending audio\n   - Carousel posts explaining trends\n   \
         - Stories with polls about trends",
        top.join(", ")
    );
    ContentStrategy {
        strategy,
        trends_used: trends.iter().take(3).cloned().collect(),
        generated_at: clock::now_iso(),
        niche: niche.to_string(),
    }
}

/// LLM strategy over the top five trends; any LLM failure falls back to
/// [`basic_strategy`].
pub async fn generate_strategy(llm: Option<&dyn LlmChat>, trends: &[Trend], niche: &str) -> ContentStrategy {
    let Some(llm) = llm else {
        return basic_strategy(trends, niche);
    };
    let prompt = strategy_prompt(trends, niche);
    match llm::complete(llm, STRATEGIST_SYSTEM, &prompt, STRATEGY_MAX_TOKENS, STRATEGY_TEMPERATURE).await {
        Ok(text) if !text.trim().is_empty() => ContentStrategy {
            strategy: text.trim().to_string(),
            trends_used: trends.iter().take(5).cloned().collect(),
            generated_at: clock::now_iso(),
            niche: niche.to_string(),
        },
        Ok(_) => basic_strategy(trends, niche),
        Err(e) => {
            warn!(error = %e, "trends: strategy generation failed, using template");
            basic_strategy(trends, niche)
        }
    }
}

#[must_use]
pub fn recommendations(trends: &[Trend]) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(first) = trends.first() {
        out.push(format!("Leverage trending topic: '{}' in your next post", first.keyword));
    }
    out.extend(
        [
            "Post during peak engagement hours (2-6 PM)",
            "Use trending hashtags relevant to your niche",
            "Create Reels with trending audio for maximum reach",
        ]
        .map(String::from),
    );
    out.truncate(MAX_RECOMMENDATIONS);
    out
}

pub async fn comprehensive_strategy(llm: Option<&dyn LlmChat>) -> ComprehensiveStrategy {
    let trends = trending_topics();
    let content_strategy = generate_strategy(llm, &trends, DEFAULT_NICHE).await;
    ComprehensiveStrategy {
        content_strategy,
        recommendations: recommendations(&trends),
        trending_topics: trends.into_iter().take(10).collect(),
        interest_analysis: Map::new(),
        last_updated: clock::now_iso(),
    }
}

/// Fallback trends sharing at least one word with `keyword`.
#[must_use]
pub fn related_queries(keyword: &str) -> Vec<String> {
    let wanted: Vec<String> = keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    FALLBACK_TRENDS
        .iter()
        .filter(|trend| {
            !trend.eq_ignore_ascii_case(keyword)
                && trend
                    .split_whitespace()
                    .any(|w| wanted.iter().any(|k| k == &w.to_lowercase()))
        })
        .take(MAX_RELATED)
        .map(|t| (*t).to_string())
        .collect()
}

#[must_use]
pub fn topic_analysis(keyword: &str) -> TopicAnalysis {
    TopicAnalysis {
        keyword: keyword.to_string(),
        interest_analysis: Map::new(),
        related_queries: related_queries(keyword),
        analyzed_at: clock::now_iso(),
    }
}

#[cfg(test)]
#[path = "trends_test.rs"]
mod tests;
