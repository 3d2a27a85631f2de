//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the HTTP API and the chat websocket under one Axum router. Every
//! route shares [`AppState`]; CORS is open (the dashboard is served from a
//! different origin) and each request is traced.

pub mod chat;
pub mod instagram;
pub mod posts;
pub mod strategy;
pub mod ws;

use std::time::Instant;

use axum::Router;
use axum::response::Json;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clock;
use crate::state::AppState;

pub const SERVICE_BANNER: &str = "AI Social Media Manager API is running!";

#[must_use]
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/performance/health", get(performance_health))
        .route("/chat", post(chat::chat))
        .route("/chat/review", post(chat::review))
        .route("/sessions/{id}", get(chat::get_session).delete(chat::clear_session))
        .route("/sessions/{id}/summary", get(chat::session_summary))
        .route("/dashboard/data", get(instagram::dashboard))
        .route("/instagram/validate", get(instagram::validate))
        .route("/instagram/account", get(instagram::account))
        .route("/instagram/media", get(instagram::media))
        .route("/instagram/top-posts", get(instagram::top_posts))
        .route("/instagram/media/{id}/insights", get(instagram::media_insights))
        .route("/instagram/media/{id}/comments", get(instagram::comments))
        .route("/instagram/comments/{id}", get(instagram::comments))
        .route("/instagram/insights/account", get(instagram::account_insights))
        .route("/instagram/insights/media/{id}", get(instagram::media_insights))
        .route("/instagram/stories", get(instagram::stories))
        .route("/instagram/demographics", get(instagram::demographics))
        .route("/instagram/hashtag/{id}", get(instagram::hashtag))
        .route("/instagram/sentiment", get(instagram::sentiment))
        .route("/instagram/insights/weekly", get(instagram::weekly))
        .route("/instagram/insights/performance", get(instagram::performance))
        .route("/instagram/insights/audience", get(instagram::audience))
        .route("/instagram/insights/engagement-time", get(instagram::engagement_time))
        .route("/instagram/insights/engagement-trends", get(instagram::engagement_trends))
        .route("/instagram/insights/reach", get(instagram::reach))
        .route("/api/scheduled-posts", get(posts::list).post(posts::create))
        .route("/api/scheduled-posts/{id}", get(posts::get).put(posts::update).delete(posts::delete))
        .route("/api/scheduled-posts/{id}/reschedule", post(posts::reschedule))
        .route("/api/scheduled-posts/{id}/publish", post(posts::publish))
        .route("/api/calendar/{year}/{month}", get(posts::calendar))
        .route("/api/content-strategy", get(strategy::content_strategy))
        .route("/api/trending-topics", get(strategy::trending_topics))
        .route("/api/generate-strategy", post(strategy::generate_strategy))
        .route("/api/topic-analysis/{keyword}", get(strategy::topic_analysis))
        .route("/ws", get(ws::handle_ws))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": SERVICE_BANNER }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": clock::now_iso() }))
}

async fn performance_health() -> Json<Value> {
    let started = Instant::now();
    let timestamp = clock::now_iso();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    Json(json!({
        "status": "healthy",
        "response_time_ms": (elapsed_ms * 100.0).round() / 100.0,
        "api_status": "running",
        "timestamp": timestamp,
    }))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
