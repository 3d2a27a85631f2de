//! Environment-driven configuration helpers.
//!
//! Every subsystem owns a small `*Config::from_env()` built from these
//! helpers, so defaults live next to the code that uses them. `.env` files are
//! loaded once in `main` through `dotenvy`.

use std::str::FromStr;

/// Parse `key` as `T`, falling back to `default` when unset or malformed.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Read a boolean flag. Accepts `1/true/yes/on` and `0/false/no/off`.
pub fn env_bool(key: &str, default: bool) -> bool {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Read a non-empty string value.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// SERVER CONFIG
// =============================================================================

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 500;
pub const DEFAULT_SESSION_MAX_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Unset means in-memory only.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub flush_interval_ms: u64,
    pub session_max_age_days: i64,
    /// Background publisher for due posts.
    pub scheduler_enabled: bool,
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: env_string("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            flush_interval_ms: env_parse("FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS).max(50),
            session_max_age_days: env_parse("SESSION_MAX_AGE_DAYS", DEFAULT_SESSION_MAX_AGE_DAYS).max(1),
            scheduler_enabled: env_bool("SCHEDULER_ENABLED", true),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
