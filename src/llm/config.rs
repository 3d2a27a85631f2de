//! LLM configuration parsed from environment variables.

use super::types::LlmError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Anthropic,
    /// Any `OpenAI`-compatible Chat Completions endpoint (Groq by default).
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub api_key: String,
    pub model: String,
    pub openai_base_url: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// - `LLM_PROVIDER`: `openai` (default) or `anthropic`
    /// - `LLM_API_KEY_ENV`: names the env var holding the key. Defaults to
    ///   `GROQ_API_KEY` for `openai` and `ANTHROPIC_API_KEY` for `anthropic`.
    /// - `LLM_MODEL`: provider default when absent
    /// - `LLM_OPENAI_BASE_URL`: Groq's `OpenAI`-compatible endpoint by default
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or a missing key.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LlmConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or a missing key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let provider = parse_provider(lookup("LLM_PROVIDER").as_deref())?;

        let key_var = lookup("LLM_API_KEY_ENV").unwrap_or_else(|| default_key_var(provider).to_string());
        let api_key = lookup(&key_var)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingKey { var: key_var.clone() })?;

        let model = lookup("LLM_MODEL").unwrap_or_else(|| default_model(provider).to_string());
        let openai_base_url = lookup("LLM_OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let parse_secs = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };
        let timeouts = LlmTimeouts {
            request_secs: parse_secs("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_secs("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { provider, api_key, model, openai_base_url, timeouts })
    }
}

fn parse_provider(raw: Option<&str>) -> Result<LlmProviderKind, LlmError> {
    match raw.unwrap_or("openai") {
        "anthropic" => Ok(LlmProviderKind::Anthropic),
        "openai" | "groq" => Ok(LlmProviderKind::OpenAi),
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

fn default_key_var(provider: LlmProviderKind) -> &'static str {
    match provider {
        LlmProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        LlmProviderKind::OpenAi => "GROQ_API_KEY",
    }
}

fn default_model(provider: LlmProviderKind) -> &'static str {
    match provider {
        LlmProviderKind::Anthropic => "claude-sonnet-4-5-20250929",
        LlmProviderKind::OpenAi => "openai/gpt-oss-120b",
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
