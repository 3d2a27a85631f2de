//! Publishing agent: turns the current draft into a scheduled post.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime, Time};

use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::clock;
use crate::routing::AgentKind;
use crate::services::scheduler::{NewPost, Platform};
use crate::workflow::WorkflowState;

/// Posting hour (UTC) when nothing better is known.
pub const DEFAULT_POSTING_HOUR: u8 = 18;

fn datetime_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2})?(?:Z|[+-]\d{2}:\d{2})?").ok()
        })
        .as_ref()
}

/// First ISO datetime mentioned in `text`.
#[must_use]
pub fn requested_time(text: &str) -> Option<OffsetDateTime> {
    datetime_pattern()?
        .find_iter(text)
        .find_map(|m| clock::parse_timestamp(m.as_str()))
}

/// Next occurrence of `hour:00` UTC strictly after `now`.
#[must_use]
pub fn next_slot(now: OffsetDateTime, hour: u8) -> OffsetDateTime {
    let now = now.to_offset(time::UtcOffset::UTC);
    let at = Time::from_hms(hour % 24, 0, 0).unwrap_or(Time::MIDNIGHT);
    let today = now.replace_time(at);
    if today > now { today } else { today + Duration::days(1) }
}

/// Best hour found by the strategy agent earlier in the run.
fn strategy_hour(state: &WorkflowState) -> Option<u8> {
    let hours = state.content_strategy.as_ref()?.pointer("/insights/best_posting_hours")?;
    hours.get(0)?.as_u64().and_then(|h| u8::try_from(h).ok())
}

pub struct PublishingAgent;

#[async_trait::async_trait]
impl Agent for PublishingAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Publishing
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let Some(draft) = state.draft.clone() else {
            return Ok(AgentResponse::new(
                AgentKind::Publishing,
                "content_publishing",
                "No generated content to schedule yet. Ask for a post first.",
                cx.now,
            )
            .with("status", "skipped"));
        };

        let request = state.task_for(AgentKind::Publishing).unwrap_or(&state.user_request);
        let when = requested_time(request)
            .filter(|t| *t > cx.now)
            .unwrap_or_else(|| next_slot(cx.now, strategy_hour(state).unwrap_or(DEFAULT_POSTING_HOUR)));
        let image_url = state.context_data.get("image_url").and_then(Value::as_str).map(str::to_string);

        let input = NewPost {
            content: draft.full_caption(),
            platform: Platform::Instagram,
            scheduled_time: clock::iso(when),
            image_url,
            media_urls: Vec::new(),
            media_type: None,
        };
        let metadata = json!({
            "created_manually": false,
            "source": "publishing_agent",
            "session_id": state.session_id,
        });
        let post = cx.posts.create_with(input, metadata, cx.now).await?;

        let scheduled = clock::iso(post.scheduled_time);
        state.context_data.insert("scheduled_post_id".into(), post.id.to_string().into());
        state.final_response = Some(format!("{}\n\nScheduled for {scheduled} on Instagram.", draft.full_caption()));

        let mut response = AgentResponse::new(
            AgentKind::Publishing,
            "content_publishing",
            format!("Content scheduled for {scheduled} on Instagram"),
            cx.now,
        )
        .with("post_id", post.id.to_string())
        .with("scheduled_time", scheduled)
        .with("platforms", vec![Platform::Instagram.as_str()])
        .with("status", "scheduled");
        if !post.has_media() {
            response = response.with("warning", "No image attached; add one before the post is due");
        }
        Ok(response)
    }
}

#[cfg(test)]
#[path = "publishing_test.rs"]
mod tests;
