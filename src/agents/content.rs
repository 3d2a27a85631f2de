//! Content agent: captions, hashtags and visual ideas.
//!
//! The LLM is asked for a JSON draft; any reply that does not parse, or no
//! LLM at all, produces a template draft. When the compliance gate sent the
//! run back here, the reported issues go into the prompt and the draft is
//! forced inside the guidelines before it is stored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::communication::{self, AnalyticsInsights};
use super::compliance::{MAX_CAPTION_CHARS, MAX_HASHTAGS, RESTRICTED_TERMS};
use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::llm;
use crate::routing::{AgentKind, WorkflowType};
use crate::text::{prefix_chars, truncate_chars};
use crate::workflow::WorkflowState;

const CONTENT_MAX_TOKENS: u32 = 800;
const CONTENT_TEMPERATURE: f32 = 0.7;
const TOPIC_CHARS: usize = 120;

pub const DEFAULT_HASHTAGS: [&str; 3] = ["#trending", "#socialmedia", "#content"];

const CONTENT_SYSTEM: &str = "You are a social media content creator for Instagram. Write one post for the \
request using the context from other agents.

Respond with JSON only:
{\"caption\": \"post caption without hashtags\", \"hashtags\": [\"#tag\"], \
\"visual_suggestions\": [\"short description of an image or video idea\"]}

Keep captions under 2200 characters, use at most 30 hashtags and avoid \
promotional claims such as guaranteed results.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub caption: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub visual_suggestions: Vec<String>,
}

impl ContentDraft {
    /// Caption followed by the hashtag line, as it would be published.
    #[must_use]
    pub fn full_caption(&self) -> String {
        if self.hashtags.is_empty() {
            self.caption.clone()
        } else {
            format!("{}\n\n{}", self.caption, self.hashtags.join(" "))
        }
    }

    /// Strip restricted phrases, cap hashtags and trim the caption so the
    /// published text fits the platform limit.
    pub fn apply_guidelines(&mut self) {
        for term in RESTRICTED_TERMS {
            if let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(term))) {
                self.caption = re.replace_all(&self.caption, "").into_owned();
            }
        }
        self.caption = self.caption.split_whitespace().collect::<Vec<_>>().join(" ");
        self.hashtags.truncate(MAX_HASHTAGS);

        let tags_chars = if self.hashtags.is_empty() { 0 } else { self.hashtags.join(" ").chars().count() + 2 };
        let budget = MAX_CAPTION_CHARS.saturating_sub(tags_chars);
        self.caption = prefix_chars(&self.caption, budget).trim_end().to_string();
    }
}

/// `#tag` form, deduplicated, blanks dropped.
fn normalize_hashtags(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let word: String = tag.trim().trim_start_matches('#').split_whitespace().collect();
        if word.is_empty() {
            continue;
        }
        let tag = format!("#{word}");
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    }
    tags
}

fn strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Parse a JSON draft out of an LLM reply.
#[must_use]
pub fn parse_draft(reply: &str) -> Option<ContentDraft> {
    let value: Value = serde_json::from_str(llm::json_block(reply)?).ok()?;
    let caption = value.get("caption").and_then(Value::as_str)?.trim().to_string();
    if caption.is_empty() {
        return None;
    }
    let hashtags = normalize_hashtags(strings(value.get("hashtags")));
    let visuals = value.get("visual_suggestions").or_else(|| value.get("visuals"));
    Some(ContentDraft { caption, hashtags, visual_suggestions: strings_or_line(visuals) })
}

fn strings_or_line(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        other => strings(other),
    }
}

/// Deterministic draft built from the task and analytics themes.
#[must_use]
pub fn template_draft(task: &str, insights: Option<&AnalyticsInsights>) -> ContentDraft {
    let topic = truncate_chars(task.trim(), TOPIC_CHARS);
    let caption = format!("{topic}\n\nWhat do you think? Tell us in the comments!");

    let theme = insights.and_then(|i| i.themes.top_theme);
    let hashtags = normalize_hashtags(
        theme
            .map(|t| format!("#{t}"))
            .into_iter()
            .chain(DEFAULT_HASHTAGS.iter().map(|t| (*t).to_string())),
    );

    let format = insights.and_then(|i| i.themes.best_content_type).unwrap_or("images");
    let visual_suggestions = vec![
        format!("Lead with {format}; that format performs best for this account"),
        "Use bright, high-contrast visuals with a clear focal point".to_string(),
    ];
    ContentDraft { caption, hashtags, visual_suggestions }
}

fn content_prompt(state: &WorkflowState, task: &str, context: &str) -> String {
    let mut prompt = format!("Request: {task}\n\n{context}");
    if let Some(strategy) = &state.content_strategy {
        prompt.push_str(&format!("\n\nContent strategy: {strategy}"));
    }
    if let Some(status) = state.compliance_status.as_ref().filter(|s| !s.passed) {
        prompt.push_str("\n\nThe previous draft failed compliance. Fix these issues:\n");
        for issue in &status.issues {
            prompt.push_str(&format!("- {issue}\n"));
        }
    }
    if let Some(notes) = state.reviewer_notes() {
        prompt.push_str(&format!("\n\nReviewer notes: {notes}"));
    }
    prompt
}

pub struct ContentAgent;

#[async_trait::async_trait]
impl Agent for ContentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Content
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let task = state.task_for(AgentKind::Content).unwrap_or(&state.user_request).to_string();
        let insights = communication::analytics_insights(state);
        let revising = state.compliance_status.as_ref().is_some_and(|s| !s.passed);

        let llm_draft = match cx.llm() {
            Some(llm) => {
                let context = communication::build_context(state, AgentKind::Content);
                let prompt = content_prompt(state, &task, &context);
                let reply =
                    llm::complete(llm, CONTENT_SYSTEM, &prompt, CONTENT_MAX_TOKENS, CONTENT_TEMPERATURE).await?;
                parse_draft(&reply)
            }
            None => None,
        };
        let mut draft = llm_draft.unwrap_or_else(|| template_draft(&task, insights.as_ref()));
        if revising {
            draft.apply_guidelines();
        }

        state.generated_content = Some(json!({
            "type": "content_creation",
            "posts": [draft.caption],
            "hashtags": draft.hashtags.join(" "),
            "visuals": draft.visual_suggestions,
            "revision": state.compliance_revisions,
        }));
        if state.workflow_type == WorkflowType::Sequential {
            state.context_data.insert("content_results".into(), serde_json::to_value(&draft).unwrap_or_default());
            state.context_data.insert("current_task".into(), task.into());
        }
        state.final_response = Some(draft.full_caption());

        let response = AgentResponse::new(AgentKind::Content, "content_creation", "Content generated successfully", cx.now)
            .with("caption", draft.caption.clone())
            .with("hashtags", draft.hashtags.clone())
            .with("revision", state.compliance_revisions);
        state.draft = Some(draft);
        Ok(response)
    }
}

#[cfg(test)]
#[path = "content_test.rs"]
mod tests;
