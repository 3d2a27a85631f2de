//! Turning router replies into [`RoutingDecision`]s.

use serde_json::{Map, Value};

use super::{AgentKind, Priority, RoutingDecision, TaskAssignment, WorkflowType, fallback_routing};
use crate::llm;

/// Keyword groups for text replies, checked in order.
const TEXT_AGENT_KEYWORDS: [(AgentKind, &[&str]); 8] = [
    (AgentKind::Content, &["create", "write", "generate", "post", "caption", "copy"]),
    (AgentKind::Strategy, &["strategy", "plan", "calendar", "trend", "competitor"]),
    (AgentKind::Publishing, &["publish", "schedule", "post", "share", "upload"]),
    (AgentKind::Analytics, &["analyze", "report", "metrics", "performance", "roi"]),
    (AgentKind::Community, &["respond", "engage", "comment", "reply", "community"]),
    (AgentKind::Listening, &["monitor", "listen", "track", "mention", "sentiment"]),
    (AgentKind::Crisis, &["crisis", "urgent", "emergency", "issue", "problem"]),
    (AgentKind::Compliance, &["compliance", "legal", "safety", "moderate", "risk"]),
];

/// Parse a router reply.
///
/// A JSON object anywhere in the reply wins. Replies without valid JSON go
/// through [`parse_text_response`]; an empty reply routes on the original
/// request instead.
#[must_use]
pub fn parse_routing_response(reply: &str, request: &str) -> RoutingDecision {
    if reply.trim().is_empty() {
        return fallback_routing(request);
    }
    let parsed = llm::json_block(reply).and_then(|raw| serde_json::from_str::<Value>(raw).ok());
    match parsed {
        Some(Value::Object(map)) => from_json(&map),
        _ => parse_text_response(reply),
    }
}

fn from_json(map: &Map<String, Value>) -> RoutingDecision {
    let primary_agent = str_field(map, "primary_agent")
        .and_then(AgentKind::from_name)
        .unwrap_or(AgentKind::Strategy);
    let workflow_type = str_field(map, "workflow_type")
        .and_then(WorkflowType::from_name)
        .unwrap_or_default();
    let priority = str_field(map, "priority").and_then(Priority::from_name).unwrap_or_default();

    let secondary_agents = map
        .get("secondary_agents")
        .and_then(Value::as_array)
        .map(|agents| agents.iter().filter_map(Value::as_str).filter_map(AgentKind::from_name).collect())
        .unwrap_or_default();

    let parallel_tasks = map
        .get("parallel_tasks")
        .and_then(Value::as_array)
        .map(|tasks| tasks.iter().filter_map(task_assignment).collect())
        .unwrap_or_default();

    RoutingDecision {
        primary_agent,
        workflow_type,
        reasoning: str_field(map, "reasoning").unwrap_or_default().to_string(),
        secondary_agents,
        parallel_tasks,
        agent_tasks: std::collections::BTreeMap::new(),
        requires_human_review: map.get("requires_human_review").and_then(Value::as_bool).unwrap_or(false),
        priority,
    }
}

fn task_assignment(value: &Value) -> Option<TaskAssignment> {
    let agent = value.get("agent").and_then(Value::as_str).and_then(AgentKind::from_name)?;
    let task = value
        .get("task")
        .or_else(|| value.get("description"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(TaskAssignment { agent, task: task.to_string() })
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Keyword reading of a free-text router reply.
#[must_use]
pub fn parse_text_response(reply: &str) -> RoutingDecision {
    let lower = reply.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let primary_agent = TEXT_AGENT_KEYWORDS
        .iter()
        .find(|(_, words)| has(words))
        .map_or(AgentKind::Strategy, |(agent, _)| *agent);

    let workflow_type = if has(&["parallel", "simultaneous"]) {
        WorkflowType::Parallel
    } else if has(&["sequential", "then", "after"]) {
        WorkflowType::Sequential
    } else {
        WorkflowType::Direct
    };

    let mut decision = RoutingDecision::direct(primary_agent, "Parsed from text response");
    decision.workflow_type = workflow_type;
    decision.requires_human_review = has(&["review", "approve"]);
    if has(&["urgent", "critical"]) {
        decision.priority = Priority::High;
    }
    decision
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
