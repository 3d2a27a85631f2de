//! Graph API client for an Instagram business account.
//!
//! Every request carries the access token as a query parameter. A non-200
//! status becomes [`InstagramError::Http`]; a 200 body with an `error`
//! object becomes [`InstagramError::Graph`]. Account and media reads are
//! cached for the configured TTL.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{info, warn};

use super::config::InstagramConfig;
use super::types::{AccountInfo, Comment, Hashtag, InsightMetric, InstagramError, MediaPage, Story};
use super::SocialPlatform;
use crate::services::cache::TtlCache;

const ACCOUNT_FIELDS: &str =
    "id,media_count,followers_count,follows_count,name,username,website,biography,profile_picture_url";
const MEDIA_FIELDS: &str = "id,media_type,media_url,thumbnail_url,permalink,caption,timestamp,like_count,comments_count,media_product_type";
const MEDIA_INSIGHT_METRICS: &str = "engagement,impressions,reach,saved,video_views";
const ACCOUNT_INSIGHT_METRICS: &str = "impressions,reach,profile_views,website_clicks,follower_count";
const DEMOGRAPHIC_METRICS: &str = "audience_gender_age,audience_city,audience_country";
const STORY_FIELDS: &str = "id,media_type,media_url,thumbnail_url,timestamp";
const COMMENT_FIELDS: &str = "id,text,timestamp,username,like_count";
const HASHTAG_FIELDS: &str = "id,name,media_count";

#[derive(Clone)]
enum Cached {
    Account(AccountInfo),
    Media(MediaPage),
}

pub struct InstagramClient {
    http: reqwest::Client,
    config: InstagramConfig,
    cache: TtlCache<Cached>,
}

impl InstagramClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: InstagramConfig) -> Result<Self, InstagramError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InstagramError::HttpClientBuild(e.to_string()))?;
        let cache = TtlCache::new(Duration::from_secs(config.cache_ttl_secs));
        Ok(Self { http, config, cache })
    }

    /// # Errors
    ///
    /// Returns [`InstagramError::NotConfigured`] when credentials are absent.
    pub fn from_env() -> Result<Self, InstagramError> {
        Self::new(InstagramConfig::from_env()?)
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T, InstagramError> {
        let url = format!("{}/{}", self.config.graph_url, path.trim_start_matches('/'));
        info!(%path, "instagram: GET");
        let response = self
            .http
            .get(url)
            .query(params)
            .query(&[("access_token", self.config.access_token.as_str())])
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = check_graph_body(status, &text).inspect_err(|e| warn!(%path, error = %e, "instagram: request failed"))?;
        serde_json::from_value(body).map_err(|e| InstagramError::Parse(e.to_string()))
    }

    async fn post(&self, path: &str, params: &[(&str, String)]) -> Result<Value, InstagramError> {
        let url = format!("{}/{}", self.config.graph_url, path.trim_start_matches('/'));
        info!(%path, "instagram: POST");
        let response = self
            .http
            .post(url)
            .query(params)
            .query(&[("access_token", self.config.access_token.as_str())])
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        check_graph_body(status, &text).inspect_err(|e| warn!(%path, error = %e, "instagram: request failed"))
    }

    async fn insights(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<InsightMetric>, InstagramError> {
        let envelope: DataEnvelope<InsightMetric> = self.get(path, params).await?;
        Ok(envelope.data)
    }
}

#[derive(serde::Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[async_trait::async_trait]
impl SocialPlatform for InstagramClient {
    async fn account_info(&self) -> Result<AccountInfo, InstagramError> {
        if let Some(Cached::Account(account)) = self.cache.get("account_info") {
            return Ok(account);
        }
        let account: AccountInfo = self
            .get(&self.config.account_id, &[("fields", ACCOUNT_FIELDS.to_string())])
            .await?;
        info!(username = %account.username, followers = account.followers_count, "instagram: account loaded");
        self.cache.insert("account_info", Cached::Account(account.clone()));
        Ok(account)
    }

    async fn media(&self, limit: u32) -> Result<MediaPage, InstagramError> {
        let key = format!("media_list_{limit}");
        if let Some(Cached::Media(page)) = self.cache.get(&key) {
            return Ok(page);
        }
        let path = format!("{}/media", self.config.account_id);
        let page: MediaPage = self
            .get(&path, &[("fields", MEDIA_FIELDS.to_string()), ("limit", limit.to_string())])
            .await?;
        info!(count = page.data.len(), limit, "instagram: media loaded");
        self.cache.insert(key, Cached::Media(page.clone()));
        Ok(page)
    }

    async fn media_insights(&self, media_id: &str) -> Result<Vec<InsightMetric>, InstagramError> {
        let path = format!("{media_id}/insights");
        self.insights(&path, &[("metric", MEDIA_INSIGHT_METRICS.to_string())])
            .await
    }

    async fn audience_demographics(&self) -> Result<Vec<InsightMetric>, InstagramError> {
        let path = format!("{}/insights", self.config.account_id);
        self.insights(
            &path,
            &[("metric", DEMOGRAPHIC_METRICS.to_string()), ("period", "lifetime".to_string())],
        )
        .await
    }

    async fn account_insights(&self, days: u32) -> Result<Vec<InsightMetric>, InstagramError> {
        let (since, until) = insight_window(OffsetDateTime::now_utc(), days);
        let path = format!("{}/insights", self.config.account_id);
        self.insights(
            &path,
            &[
                ("metric", ACCOUNT_INSIGHT_METRICS.to_string()),
                ("period", "day".to_string()),
                ("since", since),
                ("until", until),
            ],
        )
        .await
    }

    async fn stories(&self) -> Result<Vec<Story>, InstagramError> {
        let path = format!("{}/stories", self.config.account_id);
        let envelope: DataEnvelope<Story> = self.get(&path, &[("fields", STORY_FIELDS.to_string())]).await?;
        Ok(envelope.data)
    }

    async fn comments(&self, media_id: &str, limit: Option<u32>) -> Result<Vec<Comment>, InstagramError> {
        let path = format!("{media_id}/comments");
        let mut params = vec![("fields", COMMENT_FIELDS.to_string())];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        let envelope: DataEnvelope<Comment> = self.get(&path, &params).await?;
        Ok(envelope.data)
    }

    async fn hashtag(&self, hashtag_id: &str) -> Result<Hashtag, InstagramError> {
        self.get(hashtag_id, &[("fields", HASHTAG_FIELDS.to_string())])
            .await
    }

    async fn publish_post(&self, image_url: Option<&str>, caption: &str) -> Result<String, InstagramError> {
        let image_url = image_url
            .filter(|u| !u.trim().is_empty())
            .ok_or(InstagramError::MediaRequired)?;

        let container = self
            .post(
                &format!("{}/media", self.config.account_id),
                &[("image_url", image_url.to_string()), ("caption", caption.to_string())],
            )
            .await?;
        let creation_id = id_field(&container)?;

        let published = self
            .post(
                &format!("{}/media_publish", self.config.account_id),
                &[("creation_id", creation_id)],
            )
            .await?;
        let media_id = id_field(&published)?;
        info!(%media_id, "instagram: post published");
        self.cache.clear();
        Ok(media_id)
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Turn a raw Graph response into its JSON body or a typed error.
pub(crate) fn check_graph_body(status: u16, text: &str) -> Result<Value, InstagramError> {
    if status != 200 {
        return Err(InstagramError::Http { status, body: text.to_string() });
    }
    let body: Value = serde_json::from_str(text).map_err(|e| InstagramError::Parse(e.to_string()))?;
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown Facebook API error");
        return Err(InstagramError::Graph(message.to_string()));
    }
    Ok(body)
}

/// `since`/`until` dates (`YYYY-MM-DD`) covering the last `days` days.
pub(crate) fn insight_window(now: OffsetDateTime, days: u32) -> (String, String) {
    let fmt = format_description!("[year]-[month]-[day]");
    let since = now - time::Duration::days(i64::from(days));
    let render = |ts: OffsetDateTime| ts.date().format(&fmt).unwrap_or_default();
    (render(since), render(now))
}

fn id_field(body: &Value) -> Result<String, InstagramError> {
    body.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InstagramError::Parse("response is missing `id`".into()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
