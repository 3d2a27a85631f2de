use super::*;
use serde_json::json;
use time::macros::datetime;

const T0: OffsetDateTime = datetime!(2024-05-01 09:00 UTC);

fn memory_with(agents: &[&str]) -> SessionMemory {
    let mut memory = SessionMemory::new("web-session-1", T0);
    for (i, agent) in agents.iter().enumerate() {
        memory.add_conversation_entry(&format!("question {i}"), &format!("answer {i}"), agent, Map::new(), T0);
    }
    memory
}

// =========================================================================
// apply
// =========================================================================

#[test]
fn apply_merges_maps_and_dedupes_lists() {
    let mut memory = SessionMemory::new("s", T0);
    let update = MemoryUpdate {
        user_preferences: Map::from_iter([("tone".to_string(), json!("casual"))]),
        key_topics: vec!["cricket".into(), "cricket".into(), "reels".into()],
        ..MemoryUpdate::default()
    };
    memory.apply(update, T0 + time::Duration::minutes(1));
    memory.apply(
        MemoryUpdate { key_topics: vec!["reels".into(), "fitness".into()], ..MemoryUpdate::default() },
        T0,
    );
    assert_eq!(memory.key_topics, ["cricket", "reels", "fitness"]);
    assert_eq!(memory.user_preferences["tone"], "casual");
}

#[test]
fn long_context_strings_are_truncated() {
    let mut memory = SessionMemory::new("s", T0);
    let update = MemoryUpdate {
        context_summary: Map::from_iter([("notes".to_string(), json!("x".repeat(2500)))]),
        ..MemoryUpdate::default()
    };
    memory.apply(update, T0);
    let notes = memory.context_summary["notes"].as_str().unwrap();
    assert_eq!(notes.len(), 2003);
    assert!(notes.ends_with("..."));
}

#[test]
fn history_is_capped_to_newest_entries() {
    let mut memory = SessionMemory::new("s", T0);
    for i in 0..105 {
        memory.add_conversation_entry(&format!("q{i}"), "a", "general", Map::new(), T0);
    }
    assert_eq!(memory.conversation_history.len(), MAX_HISTORY);
    assert_eq!(memory.conversation_history[0].user_input, "q5");
    assert_eq!(memory.agent_interactions["general_interactions"], 105);
}

// =========================================================================
// context rendering
// =========================================================================

#[test]
fn empty_context_message() {
    let memory = SessionMemory::new("s", T0);
    assert_eq!(memory.conversation_context(10), "No previous conversation context available.");
}

#[test]
fn context_lists_recent_entries_with_ellipsis() {
    let mut memory = memory_with(&["strategy", "content", "analytics"]);
    memory.add_conversation_entry(
        "last",
        &"r".repeat(300),
        "general",
        Map::from_iter([("workflow".to_string(), json!("direct"))]),
        T0,
    );
    let context = memory.conversation_context(2);
    assert!(context.starts_with("Recent Conversation Context:"));
    assert!(context.contains("\n1. User: question 2"));
    assert!(context.contains("   analytics: answer 2..."));
    assert!(context.contains(&format!("   general: {}...", "r".repeat(200))));
    assert!(context.contains("   Metadata: {\"workflow\":\"direct\"}"));
    assert!(!context.contains("question 1"));
}

#[test]
fn agent_context_excludes_own_responses() {
    let memory = memory_with(&["strategy", "content", "strategy"]);
    let ctx = memory.agent_context("strategy");
    assert_eq!(ctx.conversation_history.len(), 3);
    assert_eq!(ctx.previous_agent_responses.len(), 1);
    assert_eq!(ctx.previous_agent_responses[0].agent, "content");
}

// =========================================================================
// insights / summary
// =========================================================================

#[test]
fn duration_label_picks_largest_unit() {
    let memory = SessionMemory::new("s", T0);
    assert_eq!(memory.duration_label(T0 + time::Duration::minutes(59)), "59 minutes");
    assert_eq!(memory.duration_label(T0 + time::Duration::minutes(150)), "2 hours");
    assert_eq!(memory.duration_label(T0 + time::Duration::hours(50)), "2 days");
}

#[test]
fn most_active_agent_prefers_earliest_on_tie() {
    assert_eq!(SessionMemory::new("s", T0).most_active_agent(), "None");
    assert_eq!(memory_with(&["content", "strategy", "strategy", "content"]).most_active_agent(), "content");
    assert_eq!(memory_with(&["content", "strategy", "strategy"]).most_active_agent(), "strategy");
}

#[test]
fn engagement_level_thresholds() {
    assert_eq!(memory_with(&["a", "b"]).engagement_level(), "Low - Just starting");
    assert_eq!(memory_with(&["a"; 3]).engagement_level(), "Medium - Building conversation");
    assert_eq!(memory_with(&["a"; 10]).engagement_level(), "High - Active conversation");
}

#[test]
fn summary_lists_all_fields() {
    let mut memory = memory_with(&["strategy"]);
    memory.apply(
        MemoryUpdate {
            key_topics: vec!["cricket".into()],
            user_preferences: Map::from_iter([("niche".to_string(), json!("sports"))]),
            ..MemoryUpdate::default()
        },
        T0,
    );
    let summary = memory.summary(T0 + time::Duration::minutes(5));
    assert!(summary.starts_with("Session Summary (web-session-1):"));
    assert!(summary.contains("- Duration: 5 minutes"));
    assert!(summary.contains("- Most Active Agent: strategy"));
    assert!(summary.contains("- Conversation Topics: cricket"));
    assert!(summary.contains("- Key Preferences: niche"));
    assert!(summary.contains("- Total Interactions: 1"));
    assert!(summary.contains("- Last Updated: 2024-05-01T09:00:00Z"));
}

// =========================================================================
// store
// =========================================================================

#[tokio::test]
async fn store_records_exchanges_and_clears() {
    let store = SessionStore::new();
    assert!(store.get("abc").await.is_none());
    assert_eq!(store.get_or_new("abc").await.conversation_history.len(), 0);
    assert!(store.get("abc").await.is_none());

    store.record_exchange("abc", "hi", "hello", "general", Map::new()).await;
    store.record_exchange("abc", "plan?", "sure", "strategy", Map::new()).await;
    let memory = store.get("abc").await.unwrap();
    assert_eq!(memory.conversation_history.len(), 2);
    assert_eq!(memory.agent_interactions["strategy_interactions"], 1);

    assert!(store.clear("abc").await);
    assert!(!store.clear("abc").await);
}

#[tokio::test]
async fn clear_old_removes_by_created_at() {
    let store = SessionStore::new();
    store.table().write().await.hydrate([
        ("old".to_string(), SessionMemory::new("old", T0)),
        ("new".to_string(), SessionMemory::new("new", T0 + time::Duration::days(6))),
    ]);
    let removed = store.clear_old(7, T0 + time::Duration::days(8)).await;
    assert_eq!(removed, 1);
    assert!(store.get("new").await.is_some());
    assert!(store.get("old").await.is_none());
}
