//! Instagram, dashboard and analytics routes.
//!
//! Direct platform reads answer `{success, data}` and map platform failures
//! to HTTP errors. The insight breakdowns always answer 200: a failed fetch
//! becomes `{success: false, data: []}` so the charts render empty.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use futures::future::join_all;
use serde::Deserialize;
use tracing::warn;

use crate::clock;
use crate::error::ApiError;
use crate::services::Envelope;
use crate::services::dashboard::{self, DashboardData, SentimentReport, SentimentScope};
use crate::services::insights::{
    self, AudienceSlice, DayInsight, PERFORMANCE_INSIGHT_POSTS, PerformanceDay, ReachMetric, TimeSlot, WeekTrend,
};
use crate::services::instagram::{
    AccountInfo, Comment, ConnectionStatus, Hashtag, InsightMetric, InstagramError, MediaItem, MediaPage,
    SocialPlatform, Story, TopPost,
};
use crate::state::AppState;

const NOT_CONFIGURED: &str = "Instagram is not configured";
const DEFAULT_MEDIA_LIMIT: u32 = 25;
const DEFAULT_TOP_POSTS: usize = 10;
const INSIGHT_DAYS: u32 = 7;
const MAX_INSIGHT_DAYS: u32 = 30;
const INSIGHT_MEDIA: u32 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

fn platform(state: &AppState) -> Result<&dyn SocialPlatform, ApiError> {
    state.platform.as_deref().ok_or_else(|| ApiError::unavailable(NOT_CONFIGURED))
}

pub(crate) fn platform_error(e: &InstagramError) -> ApiError {
    let status = match e {
        InstagramError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        InstagramError::MediaRequired => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    ApiError::from_code(status, e)
}

fn enveloped<T>(result: Result<T, InstagramError>) -> Result<Json<Envelope<T>>, ApiError> {
    result.map(|data| Json(Envelope::ok(data))).map_err(|e| platform_error(&e))
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// `GET /dashboard/data`: account, media, top posts and sentiment at once.
pub async fn dashboard(State(state): State<AppState>) -> Json<Envelope<DashboardData>> {
    let data = match state.platform.as_deref() {
        Some(platform) => dashboard::snapshot(platform).await,
        None => DashboardData::unavailable(NOT_CONFIGURED),
    };
    Json(Envelope::ok(data))
}

/// `GET /instagram/sentiment`
pub async fn sentiment(State(state): State<AppState>) -> Result<Json<Envelope<SentimentReport>>, ApiError> {
    let platform = platform(&state)?;
    enveloped(dashboard::sentiment_report(platform, SentimentScope::FULL).await)
}

// =============================================================================
// PLATFORM READS
// =============================================================================

/// `GET /instagram/validate`: 502 with the failure message when the
/// account cannot be read.
pub async fn validate(State(state): State<AppState>) -> Result<Json<ConnectionStatus>, ApiError> {
    let status = platform(&state)?.validate_connection().await;
    if !status.success {
        return Err(ApiError {
            status: StatusCode::BAD_GATEWAY,
            code: "E_PLATFORM_CONNECTION",
            message: status.message,
            retryable: true,
        });
    }
    Ok(Json(status))
}

pub async fn account(State(state): State<AppState>) -> Result<Json<Envelope<AccountInfo>>, ApiError> {
    enveloped(platform(&state)?.account_info().await)
}

pub async fn media(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Envelope<MediaPage>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_MEDIA_LIMIT);
    enveloped(platform(&state)?.media(limit).await)
}

pub async fn top_posts(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Envelope<Vec<TopPost>>>, ApiError> {
    let limit = query.limit.map_or(DEFAULT_TOP_POSTS, |n| n as usize);
    enveloped(platform(&state)?.top_posts(limit).await)
}

/// `GET /instagram/insights/account?days=`: daily account metrics over the
/// last `days` (7 by default, at most 30).
pub async fn account_insights(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Envelope<Vec<InsightMetric>>>, ApiError> {
    let days = query.days.unwrap_or(INSIGHT_DAYS).clamp(1, MAX_INSIGHT_DAYS);
    enveloped(platform(&state)?.account_insights(days).await)
}

pub async fn media_insights(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Vec<InsightMetric>>>, ApiError> {
    enveloped(platform(&state)?.media_insights(&id).await)
}

pub async fn comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Envelope<Vec<Comment>>>, ApiError> {
    enveloped(platform(&state)?.comments(&id, query.limit).await)
}

pub async fn stories(State(state): State<AppState>) -> Result<Json<Envelope<Vec<Story>>>, ApiError> {
    enveloped(platform(&state)?.stories().await)
}

pub async fn demographics(State(state): State<AppState>) -> Result<Json<Envelope<Vec<InsightMetric>>>, ApiError> {
    enveloped(platform(&state)?.audience_demographics().await)
}

/// `GET /instagram/hashtag/:id`: top media for a Graph hashtag id.
pub async fn hashtag(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Envelope<Hashtag>>, ApiError> {
    enveloped(platform(&state)?.hashtag(&id).await)
}

// =============================================================================
// INSIGHT BREAKDOWNS
// =============================================================================

fn breakdown<T>(label: &str, result: Result<Vec<T>, String>) -> Json<Envelope<Vec<T>>> {
    match result {
        Ok(data) => Json(Envelope::ok(data)),
        Err(e) => {
            warn!(breakdown = label, error = %e, "insights: fetch failed");
            Json(Envelope::failed(e, Vec::new()))
        }
    }
}

/// Account insights are required; media only feeds engagement and may be
/// missing.
async fn account_and_media(state: &AppState) -> Result<(Vec<InsightMetric>, Vec<MediaItem>), String> {
    let platform = state.platform.as_deref().ok_or_else(|| NOT_CONFIGURED.to_string())?;
    let (account, media) = tokio::join!(platform.account_insights(INSIGHT_DAYS), platform.media(INSIGHT_MEDIA));
    let account = account.map_err(|e| e.to_string())?;
    let media = media.map(|page| page.data).unwrap_or_else(|e| {
        warn!(error = %e, "insights: media unavailable, engagement will be zero");
        Vec::new()
    });
    Ok((account, media))
}

async fn recent_media(state: &AppState) -> Result<Vec<MediaItem>, String> {
    let platform = state.platform.as_deref().ok_or_else(|| NOT_CONFIGURED.to_string())?;
    platform.media(INSIGHT_MEDIA).await.map(|page| page.data).map_err(|e| e.to_string())
}

pub async fn weekly(State(state): State<AppState>) -> Json<Envelope<Vec<DayInsight>>> {
    let result = account_and_media(&state)
        .await
        .map(|(account, media)| insights::weekly(&account, &media, clock::now_utc()));
    breakdown("weekly", result)
}

/// Daily performance; saves come from the latest posts' own insights.
pub async fn performance(State(state): State<AppState>) -> Json<Envelope<Vec<PerformanceDay>>> {
    let result = match account_and_media(&state).await {
        Ok((account, media)) => {
            let saves = saves_by_post(&state, &media).await;
            Ok(insights::performance(&account, &media, &saves, clock::now_utc()))
        }
        Err(e) => Err(e),
    };
    breakdown("performance", result)
}

async fn saves_by_post(state: &AppState, media: &[MediaItem]) -> HashMap<String, u64> {
    let Some(platform) = state.platform.as_deref() else {
        return HashMap::new();
    };
    let posts = &media[..media.len().min(PERFORMANCE_INSIGHT_POSTS)];
    let fetched = join_all(posts.iter().map(|post| platform.media_insights(&post.id))).await;
    posts
        .iter()
        .zip(fetched)
        .filter_map(|(post, result)| match result {
            Ok(metrics) => Some((post.id.clone(), insights::saved_total(&metrics))),
            Err(e) => {
                warn!(media_id = %post.id, error = %e, "insights: saves unavailable");
                None
            }
        })
        .collect()
}

pub async fn audience(State(state): State<AppState>) -> Json<Envelope<Vec<AudienceSlice>>> {
    let result = match state.platform.as_deref() {
        Some(platform) => platform
            .audience_demographics()
            .await
            .map(|d| insights::audience(&d))
            .map_err(|e| e.to_string()),
        None => Err(NOT_CONFIGURED.to_string()),
    };
    breakdown("audience", result)
}

pub async fn engagement_time(State(state): State<AppState>) -> Json<Envelope<Vec<TimeSlot>>> {
    let result = recent_media(&state).await.map(|media| insights::engagement_by_time(&media));
    breakdown("engagement-time", result)
}

pub async fn engagement_trends(State(state): State<AppState>) -> Json<Envelope<Vec<WeekTrend>>> {
    let result = recent_media(&state).await.map(|media| insights::engagement_trends(&media));
    breakdown("engagement-trends", result)
}

pub async fn reach(State(state): State<AppState>) -> Json<Envelope<Vec<ReachMetric>>> {
    let result = match state.platform.as_deref() {
        Some(platform) => platform
            .account_insights(INSIGHT_DAYS)
            .await
            .map(|account| insights::reach(&account))
            .map_err(|e| e.to_string()),
        None => Err(NOT_CONFIGURED.to_string()),
    };
    breakdown("reach", result)
}
