//! Session memory: per-session conversation history shared by agents.
//!
//! DESIGN
//! ======
//! One `SessionMemory` document per chat session id, held in a
//! `TrackedTable` and flushed to Postgres by the persistence task. The
//! document methods are pure (callers pass `now`) so formatting and
//! truncation rules are unit-testable; `SessionStore` wraps them with the
//! async lock.
//!
//! LIMITS
//! ======
//! - history keeps the newest 100 entries
//! - string values in `context_summary`, `agent_interactions` and
//!   `user_preferences` are cut to 2000 chars plus `...`

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::info;

use crate::clock;
use crate::store::TrackedTable;
use crate::text::prefix_chars;

pub const MAX_HISTORY: usize = 100;
pub const MAX_CONTEXT_CHARS: usize = 2000;
pub const DEFAULT_CONTEXT_ENTRIES: usize = 10;
const CONTEXT_RESPONSE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_input: String,
    pub agent_response: String,
    pub agent_name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMemory {
    pub session_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    #[serde(default)]
    pub conversation_history: Vec<ConversationEntry>,
    #[serde(default)]
    pub context_summary: Map<String, Value>,
    #[serde(default)]
    pub agent_interactions: Map<String, Value>,
    #[serde(default)]
    pub user_preferences: Map<String, Value>,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub important_facts: Vec<String>,
    #[serde(default)]
    pub session_metadata: Map<String, Value>,
}

/// A batch of changes applied by [`SessionMemory::apply`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MemoryUpdate {
    pub conversation_entry: Option<ConversationEntry>,
    pub context_summary: Map<String, Value>,
    pub agent_interactions: Map<String, Value>,
    pub user_preferences: Map<String, Value>,
    pub key_topics: Vec<String>,
    pub important_facts: Vec<String>,
    pub session_metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviousResponse {
    pub agent: String,
    pub response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// What one agent sees of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentMemoryContext {
    pub session_id: String,
    pub conversation_history: Vec<ConversationEntry>,
    pub key_topics: Vec<String>,
    pub important_facts: Vec<String>,
    pub user_preferences: Map<String, Value>,
    pub previous_agent_responses: Vec<PreviousResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInsights {
    pub session_duration: String,
    pub most_active_agent: String,
    pub conversation_topics: Vec<String>,
    pub user_engagement_level: String,
    pub key_preferences: Vec<String>,
}

fn merge_capped(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
    for value in target.values_mut() {
        if let Value::String(s) = value {
            if s.chars().count() > MAX_CONTEXT_CHARS {
                *s = format!("{}...", prefix_chars(s, MAX_CONTEXT_CHARS));
            }
        }
    }
}

fn push_unique(target: &mut Vec<String>, incoming: Vec<String>) {
    for item in incoming {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

impl SessionMemory {
    #[must_use]
    pub fn new(session_id: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_updated: now,
            conversation_history: Vec::new(),
            context_summary: Map::new(),
            agent_interactions: Map::new(),
            user_preferences: Map::new(),
            key_topics: Vec::new(),
            important_facts: Vec::new(),
            session_metadata: Map::new(),
        }
    }

    pub fn apply(&mut self, update: MemoryUpdate, now: OffsetDateTime) {
        if let Some(entry) = update.conversation_entry {
            self.conversation_history.push(entry);
        }
        merge_capped(&mut self.context_summary, update.context_summary);
        merge_capped(&mut self.agent_interactions, update.agent_interactions);
        merge_capped(&mut self.user_preferences, update.user_preferences);
        push_unique(&mut self.key_topics, update.key_topics);
        push_unique(&mut self.important_facts, update.important_facts);
        self.session_metadata.extend(update.session_metadata);

        let overflow = self.conversation_history.len().saturating_sub(MAX_HISTORY);
        self.conversation_history.drain(..overflow);
        self.last_updated = now;
    }

    /// Append one exchange and bump `{agent}_interactions`.
    pub fn add_conversation_entry(
        &mut self,
        user_input: &str,
        agent_response: &str,
        agent_name: &str,
        metadata: Map<String, Value>,
        now: OffsetDateTime,
    ) {
        let key = format!("{agent_name}_interactions");
        let count = self
            .agent_interactions
            .get(&key)
            .and_then(Value::as_u64)
            .unwrap_or_default();
        let update = MemoryUpdate {
            conversation_entry: Some(ConversationEntry {
                timestamp: now,
                user_input: user_input.to_string(),
                agent_response: agent_response.to_string(),
                agent_name: agent_name.to_string(),
                metadata,
            }),
            agent_interactions: Map::from_iter([(key, Value::from(count + 1))]),
            ..MemoryUpdate::default()
        };
        self.apply(update, now);
    }

    /// Numbered recap of the newest `max_entries` exchanges.
    #[must_use]
    pub fn conversation_context(&self, max_entries: usize) -> String {
        if self.conversation_history.is_empty() {
            return "No previous conversation context available.".into();
        }
        let start = self.conversation_history.len().saturating_sub(max_entries);
        let mut parts = vec!["Recent Conversation Context:".to_string()];
        for (i, entry) in self.conversation_history[start..].iter().enumerate() {
            parts.push(format!("\n{}. User: {}", i + 1, entry.user_input));
            parts.push(format!(
                "   {}: {}...",
                entry.agent_name,
                prefix_chars(&entry.agent_response, CONTEXT_RESPONSE_CHARS)
            ));
            if !entry.metadata.is_empty() {
                parts.push(format!("   Metadata: {}", Value::Object(entry.metadata.clone())));
            }
        }
        parts.join("\n")
    }

    #[must_use]
    pub fn agent_context(&self, agent_name: &str) -> AgentMemoryContext {
        AgentMemoryContext {
            session_id: self.session_id.clone(),
            conversation_history: self.conversation_history.clone(),
            key_topics: self.key_topics.clone(),
            important_facts: self.important_facts.clone(),
            user_preferences: self.user_preferences.clone(),
            previous_agent_responses: self
                .conversation_history
                .iter()
                .filter(|e| e.agent_name != agent_name)
                .map(|e| PreviousResponse {
                    agent: e.agent_name.clone(),
                    response: e.agent_response.clone(),
                    timestamp: e.timestamp,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn duration_label(&self, now: OffsetDateTime) -> String {
        let elapsed = now - self.created_at;
        let days = elapsed.whole_days();
        let seconds_in_day = (elapsed - time::Duration::days(days)).whole_seconds();
        if days > 0 {
            format!("{days} days")
        } else if seconds_in_day > 3600 {
            format!("{} hours", seconds_in_day / 3600)
        } else {
            format!("{} minutes", seconds_in_day.max(0) / 60)
        }
    }

    /// Agent with the most history entries; the earliest wins ties.
    #[must_use]
    pub fn most_active_agent(&self) -> String {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for entry in &self.conversation_history {
            match counts.iter_mut().find(|(name, _)| *name == entry.agent_name) {
                Some((_, n)) => *n += 1,
                None => counts.push((&entry.agent_name, 1)),
            }
        }
        counts
            .iter()
            .fold(None::<(&str, usize)>, |best, &(name, n)| match best {
                Some((_, top)) if top >= n => best,
                _ => Some((name, n)),
            })
            .map_or_else(|| "None".to_string(), |(name, _)| name.to_string())
    }

    #[must_use]
    pub fn engagement_level(&self) -> &'static str {
        match self.conversation_history.len() {
            0..3 => "Low - Just starting",
            3..10 => "Medium - Building conversation",
            _ => "High - Active conversation",
        }
    }

    #[must_use]
    pub fn insights(&self, now: OffsetDateTime) -> SessionInsights {
        SessionInsights {
            session_duration: self.duration_label(now),
            most_active_agent: self.most_active_agent(),
            conversation_topics: self.key_topics.iter().take(5).cloned().collect(),
            user_engagement_level: self.engagement_level().to_string(),
            key_preferences: self.user_preferences.keys().take(3).cloned().collect(),
        }
    }

    #[must_use]
    pub fn summary(&self, now: OffsetDateTime) -> String {
        let insights = self.insights(now);
        format!(
            "Session Summary ({}):\n\
             - Duration: {}\n\
             - Most Active Agent: {}\n\
             - Engagement Level: {}\n\
             - Conversation Topics: {}\n\
             - Key Preferences: {}\n\
             - Total Interactions: {}\n\
             - Last Updated: {}",
            self.session_id,
            insights.session_duration,
            insights.most_active_agent,
            insights.user_engagement_level,
            insights.conversation_topics.join(", "),
            insights.key_preferences.join(", "),
            self.conversation_history.len(),
            clock::iso(self.last_updated),
        )
    }
}

// =============================================================================
// STORE
// =============================================================================

pub type SessionTable = TrackedTable<String, SessionMemory>;

#[derive(Clone, Default)]
pub struct SessionStore {
    table: Arc<RwLock<SessionTable>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(&self) -> &Arc<RwLock<SessionTable>> {
        &self.table
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionMemory> {
        self.table.read().await.get(&session_id.to_string()).cloned()
    }

    /// Existing memory, or a fresh document (not stored until first write).
    pub async fn get_or_new(&self, session_id: &str) -> SessionMemory {
        match self.get(session_id).await {
            Some(memory) => memory,
            None => SessionMemory::new(session_id, clock::now_utc()),
        }
    }

    /// Mutate the session document, creating it first if needed.
    pub async fn with<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionMemory) -> R) -> R {
        let key = session_id.to_string();
        let mut table = self.table.write().await;
        let mut memory = table
            .get(&key)
            .cloned()
            .unwrap_or_else(|| SessionMemory::new(session_id, clock::now_utc()));
        let out = f(&mut memory);
        table.insert(key, memory);
        out
    }

    pub async fn record_exchange(
        &self,
        session_id: &str,
        user_input: &str,
        agent_response: &str,
        agent_name: &str,
        metadata: Map<String, Value>,
    ) {
        let now = clock::now_utc();
        self.with(session_id, |memory| {
            memory.add_conversation_entry(user_input, agent_response, agent_name, metadata, now);
        })
        .await;
    }

    pub async fn apply(&self, session_id: &str, update: MemoryUpdate) {
        let now = clock::now_utc();
        self.with(session_id, |memory| memory.apply(update, now)).await;
    }

    /// Returns whether a session was removed.
    pub async fn clear(&self, session_id: &str) -> bool {
        let removed = self.table.write().await.remove(&session_id.to_string());
        if removed.is_some() {
            info!(%session_id, "session: cleared");
        }
        removed.is_some()
    }

    /// Remove sessions created more than `max_age_days` before `now`.
    pub async fn clear_old(&self, max_age_days: i64, now: OffsetDateTime) -> usize {
        let cutoff = now - time::Duration::days(max_age_days);
        let removed = self
            .table
            .write()
            .await
            .remove_where(|_, memory| memory.created_at < cutoff);
        if !removed.is_empty() {
            info!(count = removed.len(), "session: cleared old sessions");
        }
        removed.len()
    }
}

#[cfg(test)]
#[path = "session_memory_test.rs"]
mod tests;
