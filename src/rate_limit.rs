//! In-memory rate limiting for chat turns.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`.
//! Two limits are enforced, both over the same window:
//! - Per-session: 10 chat turns
//! - Global: 60 chat turns (each turn may fan out into several LLM calls)
//!
//! A rejected turn is not recorded, so a client that backs off regains
//! capacity as soon as its oldest turn leaves the window.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::env_parse;
use crate::error::ErrorCode;

const DEFAULT_PER_SESSION_LIMIT: usize = 10;
const DEFAULT_GLOBAL_LIMIT: usize = 60;
const DEFAULT_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_session_limit: usize,
    pub global_limit: usize,
    pub window: Duration,
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            per_session_limit: env_parse("CHAT_RATE_LIMIT_PER_SESSION", DEFAULT_PER_SESSION_LIMIT),
            global_limit: env_parse("CHAT_RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            window: Duration::from_secs(env_parse("CHAT_RATE_LIMIT_WINDOW_SECS", DEFAULT_WINDOW_SECS)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_session_limit: DEFAULT_PER_SESSION_LIMIT,
            global_limit: DEFAULT_GLOBAL_LIMIT,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RateLimitError {
    #[error("session rate limit exceeded (max {limit} messages/{window_secs}s)")]
    PerSessionExceeded { limit: usize, window_secs: u64 },
    #[error("global rate limit exceeded (max {limit} messages/{window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

impl ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PerSessionExceeded { .. } => "E_RATE_LIMITED",
            Self::GlobalExceeded { .. } => "E_GLOBAL_RATE_LIMITED",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

#[derive(Default)]
struct RateLimiterInner {
    /// Per-session turn timestamps.
    session_requests: HashMap<String, VecDeque<Instant>>,
    /// Global turn timestamps.
    global_requests: VecDeque<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(RateLimiterInner::default())), config }
    }

    /// Check the session and global limits, then record the turn.
    ///
    /// # Errors
    ///
    /// Returns the first limit that is already full.
    pub fn check_and_record(&self, session_id: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(session_id, Instant::now())
    }

    fn check_and_record_at(&self, session_id: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let cfg = self.config;

        prune_window(&mut inner.global_requests, now, cfg.window);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded { limit: cfg.global_limit, window_secs: cfg.window.as_secs() });
        }

        let session_deque = inner.session_requests.entry(session_id.to_string()).or_default();
        prune_window(session_deque, now, cfg.window);
        if session_deque.len() >= cfg.per_session_limit {
            return Err(RateLimitError::PerSessionExceeded {
                limit: cfg.per_session_limit,
                window_secs: cfg.window.as_secs(),
            });
        }

        session_deque.push_back(now);
        inner.global_requests.push_back(now);
        Ok(())
    }

    /// Drop sessions whose window has fully drained.
    pub fn prune_idle(&self) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let window = self.config.window;
        let before = inner.session_requests.len();
        inner.session_requests.retain(|_, deque| {
            prune_window(deque, now, window);
            !deque.is_empty()
        });
        before - inner.session_requests.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
