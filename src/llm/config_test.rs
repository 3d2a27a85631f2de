use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_to_groq_compatible_openai() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[("GROQ_API_KEY", "gsk-test")])).unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.model, "openai/gpt-oss-120b");
    assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(cfg.api_key, "gsk-test");
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn anthropic_uses_its_own_key_var() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[
        ("LLM_PROVIDER", "anthropic"),
        ("ANTHROPIC_API_KEY", "sk-ant"),
    ]))
    .unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Anthropic);
    assert_eq!(cfg.model, "claude-sonnet-4-5-20250929");
    assert_eq!(cfg.api_key, "sk-ant");
}

#[test]
fn parses_overrides() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[
        ("LLM_PROVIDER", "openai"),
        ("LLM_API_KEY_ENV", "OPENAI_API_KEY"),
        ("OPENAI_API_KEY", "sk-test"),
        ("LLM_MODEL", "gpt-4o-mini"),
        ("LLM_OPENAI_BASE_URL", "https://example.test/v1/"),
        ("LLM_REQUEST_TIMEOUT_SECS", "42"),
        ("LLM_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.openai_base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn missing_key_names_variable() {
    let err = LlmConfig::from_lookup(lookup_from(&[])).unwrap_err();
    assert!(matches!(err, LlmError::MissingKey { ref var } if var == "GROQ_API_KEY"));
}

#[test]
fn blank_key_counts_as_missing() {
    let err = LlmConfig::from_lookup(lookup_from(&[("GROQ_API_KEY", "  ")])).unwrap_err();
    assert!(matches!(err, LlmError::MissingKey { .. }));
}

#[test]
fn unknown_provider_errors() {
    let err = LlmConfig::from_lookup(lookup_from(&[("LLM_PROVIDER", "bad"), ("GROQ_API_KEY", "k")]))
        .unwrap_err()
        .to_string();
    assert!(err.contains("unknown LLM_PROVIDER"));
}
