//! Prompt text for routing, task decomposition and complexity analysis.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use super::AgentKind;

pub const ROUTER_SYSTEM: &str = r#"You are an intelligent task router for an AI Social Media Manager system.
Your job is to analyze user requests and determine which agent(s) should handle them.

Available agents and their capabilities:
- strategy: Content strategy planning, trend research, content calendar, competitor analysis
- content: Content creation, text generation, visual ideation, hashtag optimization
- publishing: Content scheduling, cross-platform publishing, optimal timing
- community: Community management, responses, sentiment analysis, customer queries
- listening: Social listening, brand mentions, industry intelligence, influencer tracking
- analytics: Performance analysis, ROI measurement, predictive analytics, reporting
- crisis: Crisis management, issue detection, response coordination, reputation recovery
- compliance: Brand safety, content moderation, legal compliance, risk assessment
- influencer: Influencer discovery, partnership management, campaign tracking
- paid_social: Paid advertising, campaign optimization, budget management
- general: General conversation, casual chat, questions, explanations, help with any topic

CRITICAL: For complex multi-step requests, you MUST identify ALL required agents in the correct sequence.

Workflow types:
- direct: Single agent can handle the entire task
- sequential: Multiple agents work in order (most common for complex requests)
- parallel: Independent tasks that can run simultaneously

RESPOND ONLY IN VALID JSON FORMAT:
{
    "primary_agent": "first_agent_name",
    "workflow_type": "sequential",
    "reasoning": "Brief explanation",
    "secondary_agents": ["agent2", "agent3", "agent4"],
    "parallel_tasks": [{"agent": "agent_name", "task": "independent task"}],
    "requires_human_review": false,
    "priority": "medium"
}

Example for complex request:
"Analyze performance, create content, and schedule posts"
{
    "primary_agent": "analytics",
    "workflow_type": "sequential",
    "reasoning": "Multi-step workflow: analyze first, then create content based on insights, then schedule",
    "secondary_agents": ["content", "publishing"],
    "requires_human_review": false,
    "priority": "medium"
}"#;

pub const DECOMPOSER_SYSTEM: &str =
    "You are a task decomposer. Break complex requests into specific, focused tasks for each agent.";

pub const COMPLEXITY_SYSTEM: &str = "You are a task complexity analyzer.";

/// User turn for the routing call. Context entries render as `- key: value`.
#[must_use]
pub fn routing_prompt(request: &str, context: &Map<String, Value>) -> String {
    let mut prompt = format!("User Request: {request}\n\n");
    if !context.is_empty() {
        prompt.push_str("Additional Context:\n");
        for (key, value) in context {
            let _ = writeln!(prompt, "- {key}: {}", display_value(value));
        }
        prompt.push('\n');
    }
    prompt.push_str(
        "Based on this request, determine the appropriate routing.\n\
         Consider:\n\
         1. The main task or goal\n\
         2. Any subtasks that need to be completed\n\
         3. Whether tasks can be parallelized\n\
         4. If human review is needed for sensitive content\n\
         5. The priority level based on urgency or impact\n\n\
         Respond with the JSON routing decision.",
    );
    prompt
}

#[must_use]
pub fn decompose_prompt(request: &str, agents: &[AgentKind]) -> String {
    let names: Vec<&str> = agents.iter().map(|a| a.as_str()).collect();
    format!(
        "Break down this complex request into specific tasks for each agent:\n\n\
         User Request: {request}\n\n\
         Agents in sequence: {}\n\n\
         For each agent, provide ONLY the specific task they should focus on, not the entire request.\n\n\
         Respond in JSON format:\n\
         {{\n    \
         \"analytics\": \"Analyze Instagram performance from past 2 weeks and identify top-performing content types\",\n    \
         \"content\": \"Generate 5 reel ideas with scripts based on analytics insights\",\n    \
         \"publishing\": \"Schedule the 5 reels at optimal times over next week\",\n    \
         \"community\": \"Monitor comments and generate sentiment analysis report\"\n\
         }}",
        names.join(", ")
    )
}

#[must_use]
pub fn complexity_prompt(request: &str) -> String {
    format!(
        "Analyze this request and determine if it contains multiple independent tasks that could be executed in parallel:\n\n\
         Request: {request}\n\n\
         Identify:\n\
         1. Independent tasks that don't depend on each other\n\
         2. Tasks that must be done sequentially\n\
         3. Estimated complexity (simple/moderate/complex)\n\n\
         Respond in JSON format:\n\
         {{\n    \
         \"independent_tasks\": [\"task1\", \"task2\"],\n    \
         \"sequential_tasks\": [\"task1\", \"task2\"],\n    \
         \"complexity\": \"simple|moderate|complex\",\n    \
         \"parallel_benefit\": true/false\n\
         }}"
    )
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
