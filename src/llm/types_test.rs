use super::*;

#[test]
fn throttling_and_outages_are_retryable() {
    let status = |status| LlmError::Status { status, body: String::new() };
    assert!(status(429).retryable());
    assert!(status(503).retryable());
    assert!(!status(400).retryable());
    assert!(LlmError::Transport("reset".into()).retryable());
    assert!(!LlmError::Decode("eof".into()).retryable());
}

#[test]
fn codes_carry_the_llm_prefix() {
    assert_eq!(LlmError::MissingKey { var: "GROQ_API_KEY".into() }.error_code(), "E_LLM_KEY_MISSING");
    assert_eq!(LlmError::UnknownProvider("x".into()).error_code(), "E_LLM_PROVIDER");
    assert_eq!(LlmError::Client("x".into()).error_code(), "E_LLM_CLIENT");
}

#[test]
fn missing_key_message_names_var() {
    let err = LlmError::MissingKey { var: "GROQ_API_KEY".into() };
    assert_eq!(err.to_string(), "LLM key variable GROQ_API_KEY is not set");
}

#[test]
fn message_constructors_set_role() {
    assert_eq!(Message::user("hi").role, "user");
    assert_eq!(Message::assistant("hello").role, "assistant");
}

#[test]
fn message_serializes_flat() {
    let json = serde_json::to_value(Message::user("plan my week")).unwrap();
    assert_eq!(json, serde_json::json!({"role": "user", "content": "plan my week"}));
}
