use super::*;
use serde_json::json;
use crate::error::ErrorCode;

#[test]
fn reply_text_skips_thinking() {
    let body = json!({
        "model": "claude-sonnet-4-5-20250929",
        "content": [
            { "type": "thinking", "thinking": "hmm" },
            { "type": "text", "text": "Post at " },
            { "type": "text", "text": "6PM." }
        ],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 12, "output_tokens": 4 }
    })
    .to_string();

    let reply = decode_reply(&body).unwrap();
    assert_eq!(reply.text, "Post at 6PM.");
    assert_eq!(reply.stop_reason, "end_turn");
    assert_eq!((reply.input_tokens, reply.output_tokens), (12, 4));
}

#[test]
fn truncated_reply_reports_max_tokens() {
    let body = json!({
        "model": "m",
        "content": [{ "type": "text", "text": "cut" }],
        "stop_reason": "max_tokens",
        "usage": { "input_tokens": 1, "output_tokens": 1 }
    })
    .to_string();
    assert_eq!(decode_reply(&body).unwrap().stop_reason, "max_tokens");
}

#[test]
fn unreadable_reply_is_decode_error() {
    let err = decode_reply("not json").unwrap_err();
    assert_eq!(err.error_code(), "E_LLM_DECODE");
    assert!(!err.retryable());
}

#[test]
fn body_omits_empty_system_and_temperature() {
    let messages = [Message::user("hi")];
    let body = MessagesBody { model: "m", max_tokens: 10, system: "", messages: &messages, temperature: None };
    let value = serde_json::to_value(&body).unwrap();
    assert!(value.get("system").is_none());
    assert!(value.get("temperature").is_none());
    assert_eq!(value["messages"][0]["content"], "hi");
}
