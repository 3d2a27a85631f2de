//! Text-only chat types shared by both providers.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Failures reaching the configured LLM. Every caller treats these as
/// "no LLM this time" and falls back to deterministic output, so the codes
/// mostly surface in logs.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("unknown LLM_PROVIDER: {0}")]
    UnknownProvider(String),

    /// The variable named by `LLM_API_KEY_ENV` is unset or blank.
    #[error("LLM key variable {var} is not set")]
    MissingKey { var: String },

    /// Connect, timeout or body read failure.
    #[error("LLM request failed: {0}")]
    Transport(String),

    /// Non-200 reply. `body` is kept for the log line.
    #[error("LLM provider answered {status}")]
    Status { status: u16, body: String },

    /// The reply was not the completion shape we expect.
    #[error("LLM reply unreadable: {0}")]
    Decode(String),

    #[error("LLM HTTP client build failed: {0}")]
    Client(String),
}

impl ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "E_LLM_PROVIDER",
            Self::MissingKey { .. } => "E_LLM_KEY_MISSING",
            Self::Transport(_) => "E_LLM_TRANSPORT",
            Self::Status { .. } => "E_LLM_STATUS",
            Self::Decode(_) => "E_LLM_DECODE",
            Self::Client(_) => "E_LLM_CLIENT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A single conversation turn. `role` is `user` or `assistant`; the system
/// prompt travels separately in [`ChatRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// One completion request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    /// Sampling temperature. Provider default when `None`.
    pub temperature: Option<f32>,
}

/// A completion flattened to its text; non-text blocks are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub model: String,
    /// Normalized to `end_turn` or `max_tokens`.
    pub stop_reason: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// =============================================================================
// LLM CHAT TRAIT
// =============================================================================

/// The one seam agents, the router and the strategy writer call through.
#[async_trait::async_trait]
pub trait LlmChat: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the provider cannot be reached or its reply
    /// cannot be read.
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
