//! Dashboard snapshot and comment sentiment reports.
//!
//! DESIGN
//! ======
//! The four dashboard branches (account, media, top posts, sentiment) run
//! concurrently and fail independently. A failed branch becomes an
//! unsuccessful envelope with empty data; sentiment falls back to a fixed
//! 70/25/5 split so the gauge always renders.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use super::Envelope;
use super::instagram::{AccountInfo, InstagramError, MediaPage, SocialPlatform, TopPost};
use super::sentiment::{self, CommentsSentiment};

const DASHBOARD_MEDIA: u32 = 10;
const DASHBOARD_TOP_POSTS: usize = 5;

/// How much of the feed a sentiment report samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentScope {
    pub media_limit: u32,
    pub posts: usize,
    pub comments_per_post: Option<u32>,
    pub samples: usize,
}

impl SentimentScope {
    /// Lightweight scope used by the dashboard.
    pub const DASHBOARD: Self = Self { media_limit: 5, posts: 3, comments_per_post: Some(10), samples: 5 };
    /// Scope used by the standalone sentiment endpoint.
    pub const FULL: Self = Self { media_limit: 10, posts: 5, comments_per_post: None, samples: 10 };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    #[serde(flatten)]
    pub summary: CommentsSentiment,
    pub sample_comments: Vec<String>,
    pub has_comments: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub account: Envelope<Option<AccountInfo>>,
    pub media: Envelope<MediaPage>,
    pub top_posts: Envelope<Vec<TopPost>>,
    pub sentiment: Envelope<Value>,
}

impl DashboardData {
    /// Every branch failed with `reason`; used when no platform is wired.
    #[must_use]
    pub fn unavailable(reason: &str) -> Self {
        Self {
            account: Envelope::failed(reason, None),
            media: Envelope::failed(reason, MediaPage::default()),
            top_posts: Envelope::failed(reason, Vec::new()),
            sentiment: Envelope::failed(reason, fallback_sentiment()),
        }
    }
}

/// Comment texts from the first `scope.posts` media items.
///
/// Posts whose comments fail to load are skipped.
pub async fn collect_comments(platform: &dyn SocialPlatform, media: &MediaPage, scope: SentimentScope) -> Vec<String> {
    let fetches = media
        .data
        .iter()
        .take(scope.posts)
        .map(|post| platform.comments(&post.id, scope.comments_per_post));
    let mut texts = Vec::new();
    for (post, result) in media.data.iter().zip(join_all(fetches).await) {
        match result {
            Ok(comments) => texts.extend(comments.into_iter().map(|c| c.text).filter(|t| !t.is_empty())),
            Err(e) => warn!(media_id = %post.id, error = %e, "dashboard: comments unavailable"),
        }
    }
    texts
}

/// Sentiment over recent comments plus a sample of the raw text.
///
/// # Errors
///
/// Returns an error when the media list cannot be loaded.
pub async fn sentiment_report(
    platform: &dyn SocialPlatform,
    scope: SentimentScope,
) -> Result<SentimentReport, InstagramError> {
    let media = platform.media(scope.media_limit).await?;
    let comments = collect_comments(platform, &media, scope).await;
    Ok(build_report(comments, scope.samples))
}

#[must_use]
pub fn build_report(comments: Vec<String>, samples: usize) -> SentimentReport {
    let summary = sentiment::analyze_comments(&comments);
    let has_comments = !comments.is_empty();
    let mut sample_comments = comments;
    sample_comments.truncate(samples);
    SentimentReport { summary, sample_comments, has_comments }
}

#[must_use]
pub fn fallback_sentiment() -> Value {
    json!({
        "positive_percentage": 70,
        "neutral_percentage": 25,
        "negative_percentage": 5,
    })
}

pub async fn snapshot(platform: &dyn SocialPlatform) -> DashboardData {
    let (account, media, top_posts, sentiment) = tokio::join!(
        platform.account_info(),
        platform.media(DASHBOARD_MEDIA),
        platform.top_posts(DASHBOARD_TOP_POSTS),
        sentiment_report(platform, SentimentScope::DASHBOARD),
    );

    let sentiment = match sentiment.map(serde_json::to_value) {
        Ok(Ok(report)) => Envelope::ok(report),
        Ok(Err(e)) => Envelope::failed(e, fallback_sentiment()),
        Err(e) => {
            warn!(error = %e, "dashboard: sentiment fallback");
            Envelope::failed(e, fallback_sentiment())
        }
    };

    DashboardData {
        account: Envelope::from_result(account.map(Some)),
        media: Envelope::from_result(media),
        top_posts: Envelope::from_result(top_posts),
        sentiment,
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
