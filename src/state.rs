//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! Scheduled posts and session memory live in memory behind tracked tables
//! and are flushed to Postgres by the persistence task. Interrupted
//! workflow runs wait in the checkpoint store until a reviewer answers.
//! The LLM, the social platform and the database are all optional so the
//! server boots with any subset configured.

use std::sync::Arc;

use sqlx::PgPool;
use time::OffsetDateTime;

use crate::agents::AgentContext;
use crate::llm::LlmChat;
use crate::rate_limit::RateLimiter;
use crate::services::instagram::SocialPlatform;
use crate::services::scheduler::PostStore;
use crate::services::session_memory::{SessionMemory, SessionStore};
use crate::workflow::CheckpointStore;

/// Shared application state. Clone is required by Axum; every field is
/// Arc-backed or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// `None` when `DATABASE_URL` is unset: state stays in memory only.
    pub pool: Option<PgPool>,
    /// `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    /// `None` if platform credentials are not configured.
    pub platform: Option<Arc<dyn SocialPlatform>>,
    pub posts: PostStore,
    pub sessions: SessionStore,
    pub checkpoints: CheckpointStore,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(
        pool: Option<PgPool>,
        llm: Option<Arc<dyn LlmChat>>,
        platform: Option<Arc<dyn SocialPlatform>>,
    ) -> Self {
        Self {
            pool,
            llm,
            platform,
            posts: PostStore::new(),
            sessions: SessionStore::new(),
            checkpoints: CheckpointStore::new(),
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Dependencies for one workflow run over `memory`.
    #[must_use]
    pub fn agent_context(&self, memory: SessionMemory, now: OffsetDateTime) -> AgentContext {
        AgentContext {
            llm: self.llm.clone(),
            platform: self.platform.clone(),
            posts: self.posts.clone(),
            memory,
            now,
        }
    }
}

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;
