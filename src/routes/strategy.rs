//! Trend-driven content strategy routes.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::services::Envelope;
use crate::services::trends::{self, ComprehensiveStrategy, ContentStrategy, TopicAnalysis, Trend};
use crate::state::AppState;

const DEFAULT_TREND_LIMIT: usize = 10;
const GENERIC_NICHE: &str = "general";

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StrategyRequest {
    #[serde(default)]
    pub niche: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrendList {
    pub trends: Vec<Trend>,
    pub count: usize,
    pub last_updated: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedStrategy {
    pub strategy: ContentStrategy,
    pub trends_analyzed: usize,
}

pub async fn content_strategy(State(state): State<AppState>) -> Json<Envelope<ComprehensiveStrategy>> {
    Json(Envelope::ok(trends::comprehensive_strategy(state.llm.as_deref()).await))
}

pub async fn trending_topics(Query(query): Query<TrendQuery>) -> Json<Envelope<TrendList>> {
    let mut list = trends::trending_topics();
    list.truncate(query.limit.unwrap_or(DEFAULT_TREND_LIMIT));
    let last_updated = list.first().map(|t| t.timestamp.clone());
    Json(Envelope::ok(TrendList { count: list.len(), trends: list, last_updated }))
}

/// `POST /api/generate-strategy`: `{niche}` defaults to `general`.
pub async fn generate_strategy(
    State(state): State<AppState>,
    Json(body): Json<StrategyRequest>,
) -> Json<Envelope<GeneratedStrategy>> {
    let niche = body
        .niche
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(GENERIC_NICHE);
    let trends = trends::trending_topics();
    let strategy = trends::generate_strategy(state.llm.as_deref(), &trends, niche).await;
    Json(Envelope::ok(GeneratedStrategy { strategy, trends_analyzed: trends.len() }))
}

pub async fn topic_analysis(Path(keyword): Path<String>) -> Json<Envelope<TopicAnalysis>> {
    Json(Envelope::ok(trends::topic_analysis(&keyword)))
}
