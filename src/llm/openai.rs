//! OpenAI-compatible Chat Completions client.
//!
//! Works against any `/chat/completions` endpoint that speaks the `OpenAI`
//! wire format. The default base URL points at Groq.

use serde::Serialize;
use serde_json::Value;

use super::config::LlmTimeouts;
use super::types::{ChatRequest, ChatResponse, LlmError, Message};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Client`] if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: &str, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { http: super::http_client(timeouts)?, api_key, base_url })
    }

    /// # Errors
    ///
    /// Returns an error on transport failure, non-200 status or a malformed body.
    pub async fn chat(&self, model: &str, request: ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let msgs = build_messages(request.system, request.messages);
        let body = CcRequest {
            model,
            max_tokens: request.max_tokens,
            messages: &msgs,
            temperature: request.temperature,
        };
        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        parse_chat_completions_response(&super::send(request).await?)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [CcMessage<'a>],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Debug, PartialEq)]
struct CcMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn build_messages<'a>(system: &'a str, messages: &'a [Message]) -> Vec<CcMessage<'a>> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    if !system.trim().is_empty() {
        out.push(CcMessage { role: "system", content: system });
    }
    out.extend(
        messages
            .iter()
            .map(|m| CcMessage { role: &m.role, content: &m.content }),
    );
    out
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<ChatResponse, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::Decode(e.to_string()))?;
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();
    let usage = |field: &str| {
        root.get("usage")
            .and_then(|u| u.get(field))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };

    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::Decode("chat_completions: missing choices[0]".to_string()));
    };

    let text = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let stop_reason = match choice.get("finish_reason").and_then(Value::as_str) {
        Some("length") => "max_tokens",
        _ => "end_turn",
    };

    Ok(ChatResponse {
        text,
        model,
        stop_reason: stop_reason.to_string(),
        input_tokens: usage("prompt_tokens"),
        output_tokens: usage("completion_tokens"),
    })
}
