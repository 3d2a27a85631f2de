//! Deterministic keyword routing used when the model is unavailable.

use super::{AgentKind, Priority, RoutingDecision, WorkflowType};

/// Ordered step detection for multi-step requests.
const STEP_KEYWORDS: [(AgentKind, &[&str]); 5] = [
    (AgentKind::Analytics, &["analyze", "performance", "metrics", "insights", "data"]),
    (AgentKind::Content, &["create", "generate", "write", "content", "post", "reel", "script"]),
    (AgentKind::Publishing, &["schedule", "publish", "post", "optimal time"]),
    (AgentKind::Community, &["monitor", "comments", "sentiment", "engagement", "discussion"]),
    (AgentKind::Listening, &["listen", "mentions", "track", "monitor"]),
];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Conservative single-agent routing. Only content plus scheduling becomes a
/// sequential run.
#[must_use]
pub fn fallback_routing(request: &str) -> RoutingDecision {
    let lower = request.to_lowercase();

    if contains_any(&lower, &["create", "write", "generate", "post", "caption", "content"]) {
        if contains_any(&lower, &["schedule", "publish"]) {
            let mut decision = RoutingDecision::direct(
                AgentKind::Content,
                "Content creation with scheduling requires sequential workflow",
            );
            decision.workflow_type = WorkflowType::Sequential;
            decision.secondary_agents = vec![AgentKind::Publishing];
            return decision;
        }
        return RoutingDecision::direct(AgentKind::Content, "Direct content creation task");
    }

    if contains_any(&lower, &["analyze", "report", "metrics", "performance"]) {
        return RoutingDecision::direct(
            AgentKind::Analytics,
            "Analytics task that can be handled by a single agent",
        );
    }

    if contains_any(&lower, &["crisis", "urgent", "emergency"]) {
        let mut decision =
            RoutingDecision::direct(AgentKind::Crisis, "Crisis management task that requires immediate attention");
        decision.requires_human_review = true;
        decision.priority = Priority::Critical;
        return decision;
    }

    if contains_any(&lower, &["respond", "reply", "engage", "comment"]) {
        let mut decision = RoutingDecision::direct(AgentKind::Community, "Direct community engagement task");
        decision.priority = Priority::High;
        return decision;
    }

    if contains_any(&lower, &["strategy", "plan", "calendar", "competitor"]) {
        return RoutingDecision::direct(AgentKind::Strategy, "Strategic planning task");
    }

    RoutingDecision::direct(AgentKind::Strategy, "Default routing to strategy agent")
}

/// Multi-step detection: every matching step joins the chain once, in the
/// fixed order analytics, content, publishing, community, listening.
#[must_use]
pub fn enhanced_fallback_routing(request: &str) -> RoutingDecision {
    let lower = request.to_lowercase();

    let mut steps: Vec<AgentKind> = Vec::new();
    for (agent, words) in STEP_KEYWORDS {
        if contains_any(&lower, words) && !steps.contains(&agent) {
            steps.push(agent);
        }
    }

    match steps.as_slice() {
        [] => RoutingDecision::direct(AgentKind::Strategy, "Unclear request, defaulting to strategy agent"),
        [only] => RoutingDecision::direct(*only, format!("Single-step workflow for {only} agent")),
        [first, rest @ ..] => {
            let names: Vec<&str> = steps.iter().map(|s| s.as_str()).collect();
            let mut decision = RoutingDecision::direct(
                *first,
                format!(
                    "Complex multi-step workflow detected with {} agents: {}",
                    steps.len(),
                    names.join(", ")
                ),
            );
            decision.workflow_type = WorkflowType::Sequential;
            decision.secondary_agents = rest.to_vec();
            decision.requires_human_review = contains_any(&lower, &["approval", "review"]);
            if lower.contains("urgent") {
                decision.priority = Priority::High;
            }
            decision
        }
    }
}

#[cfg(test)]
#[path = "fallback_test.rs"]
mod tests;
