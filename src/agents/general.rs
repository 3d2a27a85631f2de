//! General agent: open conversation with session memory.
//!
//! Failures never abort the run: the user gets an apology as the answer.

use serde_json::json;
use tracing::{info, warn};

use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::llm;
use crate::routing::AgentKind;
use crate::services::session_memory::SessionMemory;
use crate::text::truncate_chars;
use crate::workflow::WorkflowState;

const GENERAL_MAX_TOKENS: u32 = 1000;
const GENERAL_TEMPERATURE: f32 = 0.8;
const RECENT_EXCHANGES: usize = 5;
const RESPONSE_PREVIEW_CHARS: usize = 150;

pub const NO_LLM_REPLY: &str =
    "I'm sorry, but I'm not able to connect to my language model right now. Please check your API configuration.";
const EMPTY_REPLY: &str = "I understand your question, but I'm having trouble generating a response right now.";

const GENERAL_SYSTEM: &str = "You are a friendly, knowledgeable assistant inside a social media management tool. \
Hold a natural conversation, remember what was said earlier in the session, give clear and actionable answers, \
ask a follow-up question when it helps and say so when you do not know something.";

/// The last few exchanges, agent replies shortened.
#[must_use]
pub fn conversation_context(memory: &SessionMemory) -> Option<String> {
    let history = &memory.conversation_history;
    if history.is_empty() {
        return None;
    }
    let mut out = String::from("Previous conversation:");
    for entry in &history[history.len().saturating_sub(RECENT_EXCHANGES)..] {
        out.push_str("\n\nUser said: ");
        out.push_str(&entry.user_input);
        if !entry.agent_response.is_empty() {
            out.push_str("\nYou responded: ");
            out.push_str(&truncate_chars(&entry.agent_response, RESPONSE_PREVIEW_CHARS));
        }
    }
    Some(out)
}

#[must_use]
pub fn build_prompt(request: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!(
            "Current user request: {request}\n\n{context}\n\nPlease respond naturally to the current request, taking \
             into account our previous conversation."
        ),
        None => format!(
            "User request: {request}\n\nThis appears to be the start of our conversation. Please respond helpfully \
             and engage in natural conversation."
        ),
    }
}

pub struct GeneralAgent;

#[async_trait::async_trait]
impl Agent for GeneralAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::General
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let context = conversation_context(&cx.memory);
        let used_context = context.is_some();
        let prompt = build_prompt(&state.user_request, context.as_deref());

        let reply = match cx.llm() {
            None => NO_LLM_REPLY.to_string(),
            Some(llm) => {
                match llm::complete(llm, GENERAL_SYSTEM, &prompt, GENERAL_MAX_TOKENS, GENERAL_TEMPERATURE).await {
                    Ok(text) if text.trim().is_empty() => EMPTY_REPLY.to_string(),
                    Ok(text) => text.trim().to_string(),
                    Err(e) => {
                        warn!(session_id = %state.session_id, error = %e, "general: llm call failed");
                        format!(
                            "I'm experiencing some technical difficulties right now. Please try again in a moment! \
                             Error: {e}"
                        )
                    }
                }
            }
        };
        info!(session_id = %state.session_id, used_context, chars = reply.len(), "general: replied");

        state.generated_content = Some(json!({
            "type": "general_conversation",
            "content": reply,
            "status": "completed",
            "used_session_context": used_context,
        }));
        state.final_response = Some(reply.clone());

        Ok(AgentResponse::new(AgentKind::General, "general_conversation", reply, cx.now)
            .with("conversation_context_used", used_context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmChat;
    use crate::state::test_helpers::MockLlm;
    use serde_json::Map;
    use std::sync::Arc;
    use time::macros::datetime;

    const NOW: time::OffsetDateTime = datetime!(2024-05-01 09:00 UTC);

    fn memory_with(exchanges: usize) -> SessionMemory {
        let mut memory = SessionMemory::new("s1", NOW);
        for i in 0..exchanges {
            memory.add_conversation_entry(&format!("question {i}"), &"a".repeat(200), "general", Map::new(), NOW);
        }
        memory
    }

    #[test]
    fn context_keeps_last_five_and_shortens_replies() {
        assert!(conversation_context(&SessionMemory::new("s1", NOW)).is_none());
        let context = conversation_context(&memory_with(7)).unwrap();
        assert!(!context.contains("question 1\n"));
        assert!(context.contains("User said: question 2"));
        assert!(context.contains("User said: question 6"));
        assert!(context.contains(&format!("You responded: {}...", "a".repeat(150))));
    }

    #[test]
    fn prompt_mentions_a_fresh_start() {
        assert!(build_prompt("hi", None).contains("start of our conversation"));
        assert!(build_prompt("hi", Some("Previous conversation:")).starts_with("Current user request: hi"));
    }

    #[tokio::test]
    async fn llm_reply_becomes_the_answer() {
        let llm = Arc::new(MockLlm::new(["  Hello there!  "]));
        let mut cx = AgentContext::offline("s1", NOW);
        cx.llm = Some(llm.clone() as Arc<dyn LlmChat>);
        cx.memory = memory_with(1);
        let mut state = WorkflowState::new("hi again", "s1", Map::new(), NOW);

        let response = GeneralAgent.process(&cx, &mut state).await.unwrap();
        assert_eq!(response.result, "Hello there!");
        assert_eq!(response.data["conversation_context_used"], true);
        assert_eq!(state.generated_content.unwrap()["type"], "general_conversation");

        let call = &llm.calls()[0];
        assert_eq!(call.temperature, Some(0.8));
        assert!(call.prompt.contains("User said: question 0"));
    }

    #[tokio::test]
    async fn failures_become_apologies() {
        let mut state = WorkflowState::new("hi", "s1", Map::new(), NOW);
        let offline = GeneralAgent.process(&AgentContext::offline("s1", NOW), &mut state).await.unwrap();
        assert_eq!(offline.result, NO_LLM_REPLY);

        let mut cx = AgentContext::offline("s1", NOW);
        cx.llm = Some(Arc::new(MockLlm::failing()) as Arc<dyn LlmChat>);
        let failed = GeneralAgent.process(&cx, &mut state).await.unwrap();
        assert!(failed.result.starts_with("I'm experiencing some technical difficulties"));
    }
}
