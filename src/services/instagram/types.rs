//! Instagram Graph API types: account, media, insights, comments, errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InstagramError {
    #[error("Instagram is not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// An `error` object returned inside a 200 body.
    #[error("{0}")]
    Graph(String),

    #[error("Request timeout - Instagram API is not responding")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid JSON response: {0}")]
    Parse(String),

    #[error("Instagram requires an image or video to publish")]
    MediaRequired,

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for InstagramError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "E_PLATFORM_NOT_CONFIGURED",
            Self::Http { .. } => "E_PLATFORM_HTTP",
            Self::Graph(_) => "E_PLATFORM_API",
            Self::Timeout => "E_PLATFORM_TIMEOUT",
            Self::Network(_) => "E_PLATFORM_NETWORK",
            Self::Parse(_) => "E_PLATFORM_PARSE",
            Self::MediaRequired => "E_MEDIA_REQUIRED",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_) | Self::Http { status: 429 | 500..=599, .. })
    }
}

impl From<reqwest::Error> for InstagramError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() { Self::Timeout } else { Self::Network(e.to_string()) }
    }
}

// =============================================================================
// ACCOUNT & MEDIA
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub follows_count: u64,
    #[serde(default)]
    pub media_count: u64,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub profile_picture_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub caption: String,
    /// Graph timestamp, e.g. `2024-01-15T10:30:00+0000`.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub media_product_type: String,
}

fn default_media_type() -> String {
    "IMAGE".to_string()
}

impl MediaItem {
    #[must_use]
    pub fn engagement(&self) -> u64 {
        self.like_count + self.comments_count
    }

    #[must_use]
    pub fn posted_at(&self) -> Option<OffsetDateTime> {
        parse_graph_time(&self.timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPage {
    pub data: Vec<MediaItem>,
    #[serde(default)]
    pub paging: Value,
}

/// A post ranked by likes + comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPost {
    pub id: String,
    pub caption: String,
    pub media_url: String,
    pub permalink: String,
    pub timestamp: String,
    pub likes: u64,
    pub comments: u64,
    pub engagement: u64,
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub like_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hashtag {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub media_count: u64,
}

// =============================================================================
// INSIGHTS
// =============================================================================

/// One metric from an `/insights` edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightMetric {
    pub name: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub values: Vec<InsightValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightValue {
    /// A number for most metrics, an object for demographic breakdowns.
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl InsightValue {
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.value.as_u64().unwrap_or_default()
    }
}

impl InsightMetric {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.values.iter().map(InsightValue::as_u64).sum()
    }
}

/// Result of a connection check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    pub account_info: Option<AccountInfo>,
}

// =============================================================================
// TIME
// =============================================================================

/// Parse RFC 3339 or the Graph API's `+0000` offset form.
#[must_use]
pub fn parse_graph_time(raw: &str) -> Option<OffsetDateTime> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let graph = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
    );
    OffsetDateTime::parse(raw, &graph).ok()
}
