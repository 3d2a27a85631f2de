//! Scheduler: scheduled posts, calendar view and the background publisher.
//!
//! DESIGN
//! ======
//! Posts live in a `TrackedTable` behind a tokio `RwLock`; the persistence
//! task flushes dirty rows to Postgres. The publisher wakes every poll
//! interval, claims posts that are `scheduled` and due within the tolerance
//! (flipping them to `publishing` under the write lock so a post is claimed
//! once), then publishes outside the lock.
//!
//! LIFECYCLE
//! =========
//! scheduled → publishing → (published | failed)
//! failed → scheduled via reschedule.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::instagram::{InstagramError, SocialPlatform};
use crate::clock;
use crate::config::env_parse;
use crate::error::ErrorCode;
use crate::store::TrackedTable;
use crate::text::truncate_chars;

const CALENDAR_CONTENT_CHARS: usize = 50;
const INTERRUPTED_BY_RESTART: &str = "interrupted by restart";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    Failed,
}

impl PostStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::Linkedin => "linkedin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: Uuid,
    pub content: String,
    pub platform: Platform,
    pub media_type: MediaType,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_time: OffsetDateTime,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub published_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

impl ScheduledPost {
    #[must_use]
    pub fn has_media(&self) -> bool {
        !self.media_urls.is_empty()
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub content: String,
    pub platform: Platform,
    pub scheduled_time: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

/// Body of an update request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub platform: Option<Platform>,
    pub scheduled_time: Option<String>,
    pub image_url: Option<String>,
    pub media_urls: Option<Vec<String>>,
    pub media_type: Option<MediaType>,
    pub status: Option<PostStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: Uuid,
    pub content: String,
    pub platform: Platform,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_time: OffsetDateTime,
    pub status: PostStatus,
    pub media_type: MediaType,
    pub has_media: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u8,
    pub posts: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub post_id: Uuid,
    pub published_id: String,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Post not found: {0}")]
    NotFound(Uuid),

    #[error("invalid scheduled_time: {0}")]
    InvalidTime(String),

    #[error("invalid month: {0}")]
    InvalidMonth(u8),

    #[error("post content must not be empty")]
    EmptyContent,

    #[error("post {0} is being published")]
    Busy(Uuid),

    #[error("post {0} is already published")]
    AlreadyPublished(Uuid),

    #[error("status {0} is set by the publisher only")]
    StatusNotSettable(&'static str),

    #[error("publishing to {0} is not supported")]
    UnsupportedPlatform(&'static str),

    #[error("social platform is not configured")]
    PlatformUnavailable,

    #[error("publish failed: {0}")]
    Publish(#[from] InstagramError),
}

impl ErrorCode for SchedulerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_POST_NOT_FOUND",
            Self::InvalidTime(_) => "E_INVALID_TIME",
            Self::InvalidMonth(_) => "E_INVALID_MONTH",
            Self::EmptyContent => "E_EMPTY_CONTENT",
            Self::Busy(_) => "E_POST_BUSY",
            Self::AlreadyPublished(_) => "E_ALREADY_PUBLISHED",
            Self::StatusNotSettable(_) => "E_STATUS_NOT_SETTABLE",
            Self::UnsupportedPlatform(_) => "E_UNSUPPORTED_PLATFORM",
            Self::PlatformUnavailable => "E_PLATFORM_NOT_CONFIGURED",
            Self::Publish(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Busy(_)) || matches!(self, Self::Publish(e) if e.retryable())
    }
}

fn parse_time(raw: &str) -> Result<OffsetDateTime, SchedulerError> {
    clock::parse_timestamp(raw).ok_or_else(|| SchedulerError::InvalidTime(raw.to_string()))
}

/// Explicit URLs win; otherwise a single `image_url` becomes the media list.
fn collect_media(image_url: Option<String>, media_urls: Vec<String>) -> Vec<String> {
    if media_urls.is_empty() {
        image_url.into_iter().filter(|u| !u.trim().is_empty()).collect()
    } else {
        media_urls
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub poll_secs: u64,
    pub tolerance_secs: i64,
}

impl SchedulerConfig {
    /// `SCHEDULER_POLL_SECS` (30), `SCHEDULER_TOLERANCE_SECS` (30).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            poll_secs: env_parse("SCHEDULER_POLL_SECS", 30u64).max(1),
            tolerance_secs: env_parse("SCHEDULER_TOLERANCE_SECS", 30i64),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { poll_secs: 30, tolerance_secs: 30 }
    }
}

// =============================================================================
// POST STORE
// =============================================================================

pub type PostTable = TrackedTable<Uuid, ScheduledPost>;

#[derive(Clone, Default)]
pub struct PostStore {
    table: Arc<RwLock<PostTable>>,
}

impl PostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared table, for the persistence task.
    #[must_use]
    pub fn table(&self) -> &Arc<RwLock<PostTable>> {
        &self.table
    }

    /// Posts ordered by scheduled time, optionally filtered by status.
    pub async fn list(&self, status: Option<PostStatus>) -> Vec<ScheduledPost> {
        let table = self.table.read().await;
        let mut posts: Vec<ScheduledPost> = table
            .values()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        posts.sort_by_key(|p| (p.scheduled_time, p.id));
        posts
    }

    pub async fn get(&self, id: Uuid) -> Result<ScheduledPost, SchedulerError> {
        self.table
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SchedulerError::NotFound(id))
    }

    pub async fn create(&self, input: NewPost) -> Result<ScheduledPost, SchedulerError> {
        self.create_at(input, clock::now_utc()).await
    }

    pub(crate) async fn create_at(&self, input: NewPost, now: OffsetDateTime) -> Result<ScheduledPost, SchedulerError> {
        self.create_with(input, json!({ "created_manually": true }), now).await
    }

    /// Create with caller-supplied metadata. Used by the publishing agent.
    pub(crate) async fn create_with(
        &self,
        input: NewPost,
        metadata: Value,
        now: OffsetDateTime,
    ) -> Result<ScheduledPost, SchedulerError> {
        if input.content.trim().is_empty() {
            return Err(SchedulerError::EmptyContent);
        }
        let scheduled_time = parse_time(&input.scheduled_time)?;
        let media_urls = collect_media(input.image_url, input.media_urls);
        let media_type = input
            .media_type
            .unwrap_or(if media_urls.is_empty() { MediaType::Text } else { MediaType::Image });

        let post = ScheduledPost {
            id: Uuid::new_v4(),
            content: input.content,
            platform: input.platform,
            media_type,
            media_urls,
            scheduled_time,
            status: PostStatus::Scheduled,
            created_at: now,
            updated_at: None,
            published_at: None,
            published_id: None,
            error_message: None,
            metadata,
        };
        self.table.write().await.insert(post.id, post.clone());
        info!(post_id = %post.id, platform = post.platform.as_str(), "scheduler: post created");
        Ok(post)
    }

    pub async fn update(&self, id: Uuid, patch: PostUpdate) -> Result<ScheduledPost, SchedulerError> {
        if patch.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(SchedulerError::EmptyContent);
        }
        if let Some(status @ (PostStatus::Publishing | PostStatus::Published)) = patch.status {
            return Err(SchedulerError::StatusNotSettable(status.as_str()));
        }
        let scheduled_time = patch.scheduled_time.as_deref().map(parse_time).transpose()?;
        let media = match (patch.image_url, patch.media_urls) {
            (None, None) => None,
            (image_url, media_urls) => Some(collect_media(image_url, media_urls.unwrap_or_default())),
        };
        let now = clock::now_utc();

        let mut table = self.table.write().await;
        let status = table.get(&id).map(|p| p.status).ok_or(SchedulerError::NotFound(id))?;
        if status == PostStatus::Publishing {
            return Err(SchedulerError::Busy(id));
        }
        table
            .update(&id, |post| {
                if let Some(content) = patch.content {
                    post.content = content;
                }
                if let Some(platform) = patch.platform {
                    post.platform = platform;
                }
                if let Some(ts) = scheduled_time {
                    post.scheduled_time = ts;
                }
                if let Some(urls) = media {
                    post.media_type = if urls.is_empty() { MediaType::Text } else { MediaType::Image };
                    post.media_urls = urls;
                }
                if let Some(media_type) = patch.media_type {
                    post.media_type = media_type;
                }
                if let Some(status) = patch.status {
                    post.status = status;
                }
                post.updated_at = Some(now);
                post.clone()
            })
            .ok_or(SchedulerError::NotFound(id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<ScheduledPost, SchedulerError> {
        let removed = self.table.write().await.remove(&id);
        let post = removed.ok_or(SchedulerError::NotFound(id))?;
        info!(post_id = %id, "scheduler: post deleted");
        Ok(post)
    }

    /// Move a post to a new time. Failed posts go back to `scheduled`.
    pub async fn reschedule(&self, id: Uuid, new_time: &str) -> Result<ScheduledPost, SchedulerError> {
        let scheduled_time = parse_time(new_time)?;
        let now = clock::now_utc();
        let mut table = self.table.write().await;
        let status = table.get(&id).map(|p| p.status).ok_or(SchedulerError::NotFound(id))?;
        if status == PostStatus::Publishing {
            return Err(SchedulerError::Busy(id));
        }
        table
            .update(&id, |post| {
                post.scheduled_time = scheduled_time;
                if post.status == PostStatus::Failed {
                    post.status = PostStatus::Scheduled;
                    post.error_message = None;
                }
                post.updated_at = Some(now);
                post.clone()
            })
            .ok_or(SchedulerError::NotFound(id))
    }

    pub async fn calendar(&self, year: i32, month: u8) -> Result<CalendarMonth, SchedulerError> {
        let month_enum = time::Month::try_from(month).map_err(|_| SchedulerError::InvalidMonth(month))?;
        let posts = self
            .list(None)
            .await
            .into_iter()
            .filter(|p| {
                let utc = p.scheduled_time.to_offset(time::UtcOffset::UTC);
                utc.year() == year && utc.month() == month_enum
            })
            .map(|p| CalendarEntry {
                id: p.id,
                content: truncate_chars(&p.content, CALENDAR_CONTENT_CHARS),
                platform: p.platform,
                scheduled_time: p.scheduled_time,
                status: p.status,
                media_type: p.media_type,
                has_media: p.has_media(),
            })
            .collect();
        Ok(CalendarMonth { year, month, posts })
    }

    /// Scheduled posts due by `now + tolerance`, without claiming them.
    pub async fn due(&self, now: OffsetDateTime, tolerance: time::Duration) -> Vec<ScheduledPost> {
        let cutoff = now + tolerance;
        self.list(Some(PostStatus::Scheduled))
            .await
            .into_iter()
            .filter(|p| p.scheduled_time <= cutoff)
            .collect()
    }

    /// Flip due posts to `publishing` and return them.
    pub async fn claim_due(&self, now: OffsetDateTime, tolerance: time::Duration) -> Vec<ScheduledPost> {
        let cutoff = now + tolerance;
        let mut table = self.table.write().await;
        let ids: Vec<Uuid> = table
            .values()
            .filter(|p| p.status == PostStatus::Scheduled && p.scheduled_time <= cutoff)
            .map(|p| p.id)
            .collect();
        let mut claimed: Vec<ScheduledPost> = ids
            .iter()
            .filter_map(|id| {
                table.update(id, |post| {
                    post.status = PostStatus::Publishing;
                    post.clone()
                })
            })
            .collect();
        claimed.sort_by_key(|p| p.scheduled_time);
        claimed
    }

    async fn claim_one(&self, id: Uuid) -> Result<ScheduledPost, SchedulerError> {
        let mut table = self.table.write().await;
        match table.get(&id).map(|p| p.status).ok_or(SchedulerError::NotFound(id))? {
            PostStatus::Publishing => return Err(SchedulerError::Busy(id)),
            PostStatus::Published => return Err(SchedulerError::AlreadyPublished(id)),
            PostStatus::Draft | PostStatus::Scheduled | PostStatus::Failed => {}
        }
        table
            .update(&id, |post| {
                post.status = PostStatus::Publishing;
                post.clone()
            })
            .ok_or(SchedulerError::NotFound(id))
    }

    /// Load persisted posts. A post saved mid-publish lost its publisher on
    /// restart; it comes back `failed` so it can be rescheduled or retried.
    /// Returns the number of posts recovered that way.
    pub async fn hydrate(&self, rows: Vec<(Uuid, ScheduledPost)>) -> usize {
        let now = clock::now_utc();
        let mut table = self.table.write().await;
        let stuck: Vec<Uuid> = rows
            .iter()
            .filter(|(_, p)| p.status == PostStatus::Publishing)
            .map(|(id, _)| *id)
            .collect();
        table.hydrate(rows);
        for id in &stuck {
            table.update(id, |post| {
                post.status = PostStatus::Failed;
                post.error_message = Some(INTERRUPTED_BY_RESTART.to_string());
                post.updated_at = Some(now);
            });
            warn!(post_id = %id, "scheduler: publish interrupted by restart");
        }
        stuck.len()
    }

    async fn mark_failed(&self, id: Uuid, error: &SchedulerError) {
        let now = clock::now_utc();
        self.table.write().await.update(&id, |post| {
            post.status = PostStatus::Failed;
            post.error_message = Some(error.to_string());
            post.updated_at = Some(now);
        });
    }
}

// =============================================================================
// PUBLISHING
// =============================================================================

async fn deliver(platform: Option<&dyn SocialPlatform>, post: &ScheduledPost) -> Result<String, SchedulerError> {
    if post.platform != Platform::Instagram {
        return Err(SchedulerError::UnsupportedPlatform(post.platform.as_str()));
    }
    let platform = platform.ok_or(SchedulerError::PlatformUnavailable)?;
    let image = post.media_urls.first().map(String::as_str);
    Ok(platform.publish_post(image, &post.content).await?)
}

/// Publish a claimed post. Success marks it `published` with the platform's
/// media id; failure marks it `failed` with the error message.
async fn publish_claimed(
    store: &PostStore,
    platform: Option<&dyn SocialPlatform>,
    post: ScheduledPost,
) -> Result<PublishOutcome, SchedulerError> {
    match deliver(platform, &post).await {
        Ok(published_id) => {
            let now = clock::now_utc();
            store.table.write().await.update(&post.id, |row| {
                row.status = PostStatus::Published;
                row.published_at = Some(now);
                row.published_id = Some(published_id.clone());
                row.error_message = None;
                row.updated_at = Some(now);
            });
            info!(post_id = %post.id, %published_id, "scheduler: post published");
            Ok(PublishOutcome { post_id: post.id, published_id })
        }
        Err(e) => {
            warn!(post_id = %post.id, error = %e, "scheduler: publish failed");
            store.mark_failed(post.id, &e).await;
            Err(e)
        }
    }
}

/// Publish one post immediately, regardless of its scheduled time.
///
/// # Errors
///
/// `NotFound`, `Busy` when already publishing, `AlreadyPublished`, or the
/// publish failure.
pub async fn publish_now(
    store: &PostStore,
    platform: Option<&dyn SocialPlatform>,
    id: Uuid,
) -> Result<PublishOutcome, SchedulerError> {
    let post = store.claim_one(id).await?;
    publish_claimed(store, platform, post).await
}

/// One publisher pass. Returns `(published, failed)` counts.
pub async fn run_due(
    store: &PostStore,
    platform: Option<&dyn SocialPlatform>,
    now: OffsetDateTime,
    tolerance: time::Duration,
) -> (usize, usize) {
    let claimed = store.claim_due(now, tolerance).await;
    let mut published = 0;
    let mut failed = 0;
    for post in claimed {
        match publish_claimed(store, platform, post).await {
            Ok(_) => published += 1,
            Err(_) => failed += 1,
        }
    }
    (published, failed)
}

pub fn spawn_publisher(
    store: PostStore,
    platform: Option<Arc<dyn SocialPlatform>>,
    config: SchedulerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(poll_secs = config.poll_secs, "scheduler: publisher started");
        let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let (published, failed) = run_due(
                &store,
                platform.as_deref(),
                clock::now_utc(),
                time::Duration::seconds(config.tolerance_secs),
            )
            .await;
            if published + failed > 0 {
                info!(published, failed, "scheduler: pass complete");
            }
        }
    })
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
