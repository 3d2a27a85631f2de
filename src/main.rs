mod agents;
mod clock;
mod config;
mod db;
mod error;
mod frame;
mod llm;
mod rate_limit;
mod routes;
mod routing;
mod services;
mod state;
mod store;
mod text;
mod workflow;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::llm::{LlmChat, LlmClient};
use crate::services::instagram::{InstagramClient, SocialPlatform};
use crate::services::{persistence, scheduler};
use crate::state::AppState;

const JANITOR_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    let pool = match &config.database_url {
        Some(url) => Some(
            db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed"),
        ),
        None => {
            warn!("DATABASE_URL not set; posts and sessions stay in memory");
            None
        }
    };

    let llm: Option<Arc<dyn LlmChat>> = match LlmClient::from_env() {
        Ok(client) => {
            info!(model = client.model(), "llm: configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!(error = %e, "llm: not configured, using keyword routing and templates");
            None
        }
    };

    let platform: Option<Arc<dyn SocialPlatform>> = match InstagramClient::from_env() {
        Ok(client) => {
            info!(account_id = client.account_id(), "instagram: configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!(error = %e, "instagram: not configured, platform routes will answer 503");
            None
        }
    };

    let state = AppState::new(pool, llm, platform);
    if let Some(pool) = &state.pool {
        persistence::hydrate(pool, &state).await.expect("hydrate from database failed");
    }

    let _persistence =
        persistence::spawn_persistence_task(state.clone(), Duration::from_millis(config.flush_interval_ms));
    if config.scheduler_enabled {
        let _publisher = scheduler::spawn_publisher(
            state.posts.clone(),
            state.platform.clone(),
            scheduler::SchedulerConfig::from_env(),
        );
    }
    let _janitor = spawn_janitor(state.clone(), config.session_max_age_days);

    let app = routes::app(state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    info!(port = config.port, "social-manager listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    if let Some(pool) = &state.pool {
        persistence::flush_all_dirty(pool, &state).await;
    }
    info!("social-manager stopped");
}

/// Hourly cleanup of expired sessions and idle rate-limit buckets.
fn spawn_janitor(state: AppState, max_age_days: i64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(JANITOR_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let sessions = state.sessions.clear_old(max_age_days, clock::now_utc()).await;
            let buckets = state.rate_limiter.prune_idle();
            if sessions + buckets > 0 {
                info!(sessions, buckets, "janitor: pruned");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "shutdown signal listener failed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
