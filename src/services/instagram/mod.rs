//! Instagram: social platform access behind the `SocialPlatform` trait.
//!
//! DESIGN
//! ======
//! Routes, agents and the scheduler hold an `Arc<dyn SocialPlatform>`. The
//! production implementation is [`client::InstagramClient`], a thin Graph
//! API wrapper with a TTL cache for account and media reads. Derived views
//! such as top posts and the connection check are default trait methods so
//! mocks get them for free.

pub mod client;
pub mod config;
pub mod types;

use crate::text::truncate_chars;

pub use client::InstagramClient;
pub use types::{
    AccountInfo, Comment, ConnectionStatus, Hashtag, InsightMetric, InsightValue, InstagramError, MediaItem,
    MediaPage, Story, TopPost,
};

/// Media window scanned when ranking top posts.
pub const TOP_POSTS_SCAN: u32 = 50;
const TOP_POST_CAPTION_CHARS: usize = 100;

#[async_trait::async_trait]
pub trait SocialPlatform: Send + Sync {
    async fn account_info(&self) -> Result<AccountInfo, InstagramError>;

    async fn media(&self, limit: u32) -> Result<MediaPage, InstagramError>;

    async fn media_insights(&self, media_id: &str) -> Result<Vec<InsightMetric>, InstagramError>;

    async fn audience_demographics(&self) -> Result<Vec<InsightMetric>, InstagramError>;

    /// Daily account metrics for the last `days` days.
    async fn account_insights(&self, days: u32) -> Result<Vec<InsightMetric>, InstagramError>;

    async fn stories(&self) -> Result<Vec<Story>, InstagramError>;

    async fn comments(&self, media_id: &str, limit: Option<u32>) -> Result<Vec<Comment>, InstagramError>;

    async fn hashtag(&self, hashtag_id: &str) -> Result<Hashtag, InstagramError>;

    /// Publish an image post. Returns the published media id.
    async fn publish_post(&self, image_url: Option<&str>, caption: &str) -> Result<String, InstagramError>;

    /// Highest-engagement posts among the latest [`TOP_POSTS_SCAN`] media.
    async fn top_posts(&self, limit: usize) -> Result<Vec<TopPost>, InstagramError> {
        let page = self.media(TOP_POSTS_SCAN).await?;
        Ok(rank_top_posts(&page.data, limit))
    }

    async fn validate_connection(&self) -> ConnectionStatus {
        match self.account_info().await {
            Ok(account) => ConnectionStatus {
                success: true,
                message: "Instagram API connection successful".into(),
                account_info: Some(account),
            },
            Err(e) => ConnectionStatus {
                success: false,
                message: format!("Instagram API connection failed: {e}"),
                account_info: None,
            },
        }
    }
}

/// Rank by likes + comments, descending. Ties keep feed order.
#[must_use]
pub fn rank_top_posts(media: &[MediaItem], limit: usize) -> Vec<TopPost> {
    let mut posts: Vec<TopPost> = media
        .iter()
        .map(|m| TopPost {
            id: m.id.clone(),
            caption: truncate_chars(&m.caption, TOP_POST_CAPTION_CHARS),
            media_url: m.media_url.clone(),
            permalink: m.permalink.clone(),
            timestamp: m.timestamp.clone(),
            likes: m.like_count,
            comments: m.comments_count,
            engagement: m.engagement(),
            media_type: m.media_type.clone(),
        })
        .collect();
    posts.sort_by(|a, b| b.engagement.cmp(&a.engagement));
    posts.truncate(limit);
    posts
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
