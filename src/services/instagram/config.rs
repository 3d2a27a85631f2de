//! Instagram client configuration parsed from environment variables.

use super::types::InstagramError;

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v19.0";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstagramConfig {
    pub access_token: String,
    /// Instagram business account id.
    pub account_id: String,
    pub graph_url: String,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl InstagramConfig {
    /// - `INSTAGRAM_ACCESS_TOKEN`: required
    /// - `INSTAGRAM_PAGE_ID`: required, falls back to `FACEBOOK_PAGE_ID`
    /// - `INSTAGRAM_GRAPH_URL`: default `https://graph.facebook.com/v19.0`
    /// - `INSTAGRAM_CACHE_TTL_SECS`: default 300
    /// - `INSTAGRAM_TIMEOUT_SECS`: default 30
    ///
    /// # Errors
    ///
    /// Returns [`InstagramError::NotConfigured`] when the token or account id is missing.
    pub fn from_env() -> Result<Self, InstagramError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns [`InstagramError::NotConfigured`] when the token or account id is missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, InstagramError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let access_token = non_empty("INSTAGRAM_ACCESS_TOKEN")
            .ok_or_else(|| InstagramError::NotConfigured("INSTAGRAM_ACCESS_TOKEN not set".into()))?;
        let account_id = non_empty("INSTAGRAM_PAGE_ID")
            .or_else(|| non_empty("FACEBOOK_PAGE_ID"))
            .ok_or_else(|| InstagramError::NotConfigured("INSTAGRAM_PAGE_ID not set".into()))?;
        let graph_url = non_empty("INSTAGRAM_GRAPH_URL")
            .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let parse_secs = |key: &str, default: u64| {
            non_empty(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            access_token,
            account_id,
            graph_url,
            cache_ttl_secs: parse_secs("INSTAGRAM_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            timeout_secs: parse_secs("INSTAGRAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        })
    }
}
