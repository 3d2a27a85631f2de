//! LLM: multi-provider adapter behind the agents and the router.
//!
//! DESIGN
//! ======
//! Text-in, text-out. `LlmClient` dispatches to Anthropic or any
//! OpenAI-compatible endpoint based on `LLM_PROVIDER`. Everything above this
//! module talks to `Arc<dyn LlmChat>` so tests can swap in a scripted mock.

pub mod anthropic;
pub mod config;
pub mod openai;
pub mod types;

use std::time::Duration;

use config::{LlmConfig, LlmProviderKind, LlmTimeouts};
pub use types::{ChatRequest, ChatResponse, LlmChat, LlmError, Message};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client that dispatches to either Anthropic or `OpenAI`.
pub struct LlmClient {
    inner: LlmProvider,
    model: String,
}

enum LlmProvider {
    Anthropic(anthropic::AnthropicClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// Build an LLM client from environment variables. See [`LlmConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_config(LlmConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = match config.provider {
            LlmProviderKind::Anthropic => {
                LlmProvider::Anthropic(anthropic::AnthropicClient::new(config.api_key, config.timeouts)?)
            }
            LlmProviderKind::OpenAi => LlmProvider::OpenAi(openai::OpenAiClient::new(
                config.api_key,
                &config.openai_base_url,
                config.timeouts,
            )?),
        };
        Ok(Self { inner, model: config.model })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        match &self.inner {
            LlmProvider::Anthropic(c) => c.chat(&self.model, request).await,
            LlmProvider::OpenAi(c) => c.chat(&self.model, request).await,
        }
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

fn http_client(timeouts: LlmTimeouts) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| LlmError::Client(e.to_string()))
}

/// Send a prepared provider request and return the raw 200 body.
async fn send(request: reqwest::RequestBuilder) -> Result<String, LlmError> {
    let response = request.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| LlmError::Transport(e.to_string()))?;
    reply_body(status, body)
}

fn reply_body(status: u16, body: String) -> Result<String, LlmError> {
    if status == 200 { Ok(body) } else { Err(LlmError::Status { status, body }) }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Single-turn completion: one user prompt under a system prompt.
///
/// # Errors
///
/// Propagates the provider error.
pub async fn complete(
    llm: &dyn LlmChat,
    system: &str,
    prompt: &str,
    max_tokens: u32,
    temperature: f32,
) -> Result<String, LlmError> {
    let messages = [Message::user(prompt)];
    let response = llm
        .chat(ChatRequest { system, messages: &messages, max_tokens, temperature: Some(temperature) })
        .await?;
    Ok(response.text)
}

/// Slice from the first `{` to the last `}`. Models often wrap JSON in prose
/// or code fences.
#[must_use]
pub fn json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
