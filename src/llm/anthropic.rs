//! Anthropic Messages API (`/v1/messages`), text blocks only.

use super::config::LlmTimeouts;
use super::types::{ChatRequest, ChatResponse, LlmError, Message};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Client`] if the HTTP client cannot be built.
    pub fn new(api_key: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        Ok(Self { http: super::http_client(timeouts)?, api_key })
    }

    /// # Errors
    ///
    /// Returns an error on transport failure, non-200 status or a malformed body.
    pub async fn chat(&self, model: &str, request: ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let body = MessagesBody {
            model,
            max_tokens: request.max_tokens,
            system: request.system,
            messages: request.messages,
            temperature: request.temperature,
        };
        let request = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        decode_reply(&super::send(request).await?)
    }
}

#[derive(serde::Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(serde::Deserialize)]
struct MessagesReply {
    content: Vec<Block>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

/// Thinking and tool blocks are never requested; anything but text is skipped.
#[derive(serde::Deserialize)]
#[serde(tag = "type")]
enum Block {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Skipped,
}

#[derive(serde::Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

pub(crate) fn decode_reply(json: &str) -> Result<ChatResponse, LlmError> {
    let reply: MessagesReply = serde_json::from_str(json).map_err(|e| LlmError::Decode(e.to_string()))?;

    let text: String = reply
        .content
        .into_iter()
        .filter_map(|block| match block {
            Block::Text { text } => Some(text),
            Block::Skipped => None,
        })
        .collect();
    let stop_reason = if reply.stop_reason.as_deref() == Some("max_tokens") { "max_tokens" } else { "end_turn" };

    Ok(ChatResponse {
        text,
        model: reply.model,
        stop_reason: stop_reason.to_string(),
        input_tokens: reply.usage.input_tokens,
        output_tokens: reply.usage.output_tokens,
    })
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
