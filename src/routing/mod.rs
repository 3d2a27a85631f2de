//! Router: maps a user request onto agents and a workflow shape.
//!
//! DESIGN
//! ======
//! One LLM call (temperature 0.1) returns a JSON routing decision. Parsing
//! is lenient: missing fields default, unknown agents are dropped, and a
//! reply without JSON goes through a keyword parser. Every failure path ends
//! in the deterministic keyword router in [`fallback`], so `route` itself
//! never fails.
//!
//! Sequential decisions must name at least one follow-up agent; a
//! sequential reply with an empty chain is replaced by the keyword router,
//! which can detect multi-step requests on its own.

pub mod fallback;
pub mod parse;
pub mod prompts;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::llm::{self, LlmChat};

pub use fallback::{enhanced_fallback_routing, fallback_routing};
pub use parse::{parse_routing_response, parse_text_response};

const ROUTE_MAX_TOKENS: u32 = 800;
const DECOMPOSE_MAX_TOKENS: u32 = 500;
const COMPLEXITY_MAX_TOKENS: u32 = 300;
const ROUTE_TEMPERATURE: f32 = 0.1;

// =============================================================================
// AGENTS
// =============================================================================

/// Every node that can produce an agent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Orchestrator,
    Strategy,
    Content,
    Publishing,
    Community,
    Listening,
    Analytics,
    Crisis,
    Compliance,
    Influencer,
    PaidSocial,
    General,
    ParallelCoordinator,
}

impl AgentKind {
    /// Agents the router may select.
    pub const ROUTABLE: [Self; 11] = [
        Self::Strategy,
        Self::Content,
        Self::Publishing,
        Self::Community,
        Self::Listening,
        Self::Analytics,
        Self::Crisis,
        Self::Compliance,
        Self::Influencer,
        Self::PaidSocial,
        Self::General,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::Strategy => "strategy",
            Self::Content => "content",
            Self::Publishing => "publishing",
            Self::Community => "community",
            Self::Listening => "listening",
            Self::Analytics => "analytics",
            Self::Crisis => "crisis",
            Self::Compliance => "compliance",
            Self::Influencer => "influencer",
            Self::PaidSocial => "paid_social",
            Self::General => "general",
            Self::ParallelCoordinator => "parallel_coordinator",
        }
    }

    /// Parse a routable agent name. Accepts `paid social` and `paid-social`.
    #[must_use]
    pub fn from_name(raw: &str) -> Option<Self> {
        let name = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ROUTABLE.into_iter().find(|kind| kind.as_str() == name)
    }

    #[must_use]
    pub fn capability(self) -> &'static str {
        match self {
            Self::Orchestrator => "Intent classification and workflow coordination",
            Self::Strategy => {
                "Content strategy planning, trend research, content calendar creation, competitor analysis"
            }
            Self::Content => {
                "Content creation, text generation, visual ideation, hashtag optimization, copywriting"
            }
            Self::Publishing => {
                "Content scheduling, cross-platform publishing, optimal timing, queue management"
            }
            Self::Community => {
                "Community management, real-time responses, sentiment analysis, customer queries"
            }
            Self::Listening => {
                "Social listening, brand mentions monitoring, industry intelligence, influencer tracking"
            }
            Self::Analytics => "Performance analysis, ROI measurement, predictive analytics, reporting",
            Self::Crisis => "Crisis management, issue detection, response coordination, reputation recovery",
            Self::Compliance => "Brand safety, content moderation, legal compliance, risk assessment",
            Self::Influencer => "Influencer discovery, partnership management, campaign tracking",
            Self::PaidSocial => "Paid advertising, campaign optimization, budget management",
            Self::General => "General conversation, casual chat, questions, explanations, help with any topic",
            Self::ParallelCoordinator => "Task decomposition and parallel execution coordination",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DECISION
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    #[default]
    Direct,
    Sequential,
    Parallel,
}

impl WorkflowType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }

    fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "sequential" => Some(Self::Sequential),
            "parallel" => Some(Self::Parallel),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// One unit of work handed to a single agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub agent: AgentKind,
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub primary_agent: AgentKind,
    pub workflow_type: WorkflowType,
    pub reasoning: String,
    #[serde(default)]
    pub secondary_agents: Vec<AgentKind>,
    #[serde(default)]
    pub parallel_tasks: Vec<TaskAssignment>,
    /// Per-agent focus for sequential runs, keyed by agent name.
    #[serde(default)]
    pub agent_tasks: BTreeMap<String, String>,
    #[serde(default)]
    pub requires_human_review: bool,
    #[serde(default)]
    pub priority: Priority,
}

impl RoutingDecision {
    /// Single-agent decision with default flags.
    #[must_use]
    pub fn direct(agent: AgentKind, reasoning: impl Into<String>) -> Self {
        Self {
            primary_agent: agent,
            workflow_type: WorkflowType::Direct,
            reasoning: reasoning.into(),
            secondary_agents: Vec::new(),
            parallel_tasks: Vec::new(),
            agent_tasks: BTreeMap::new(),
            requires_human_review: false,
            priority: Priority::Medium,
        }
    }

    /// Primary agent followed by the secondaries, without repeats.
    #[must_use]
    pub fn agent_queue(&self) -> Vec<AgentKind> {
        let mut queue = vec![self.primary_agent];
        for agent in &self.secondary_agents {
            if !queue.contains(agent) {
                queue.push(*agent);
            }
        }
        queue
    }

    /// Focus text for `agent`, when the decomposer produced one.
    #[must_use]
    pub fn task_for(&self, agent: AgentKind) -> Option<&str> {
        self.agent_tasks.get(agent.as_str()).map(String::as_str)
    }
}

/// Result of [`analyze_complexity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    #[serde(default)]
    pub independent_tasks: Vec<String>,
    #[serde(default)]
    pub sequential_tasks: Vec<String>,
    #[serde(default = "default_complexity")]
    pub complexity: String,
    #[serde(default)]
    pub parallel_benefit: bool,
}

fn default_complexity() -> String {
    "moderate".into()
}

impl ComplexityAnalysis {
    fn fallback(request: &str) -> Self {
        Self {
            independent_tasks: Vec::new(),
            sequential_tasks: vec![request.to_string()],
            complexity: default_complexity(),
            parallel_benefit: false,
        }
    }
}

// =============================================================================
// ROUTING
// =============================================================================

/// Route a request. Never fails: LLM errors use the keyword router.
pub async fn route(llm: Option<&dyn LlmChat>, request: &str, context: &Map<String, Value>) -> RoutingDecision {
    let Some(llm) = llm else {
        return enhanced_fallback_routing(request);
    };

    let prompt = prompts::routing_prompt(request, context);
    let reply =
        match llm::complete(llm, prompts::ROUTER_SYSTEM, &prompt, ROUTE_MAX_TOKENS, ROUTE_TEMPERATURE).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "router: llm failed, using keyword routing");
                return enhanced_fallback_routing(request);
            }
        };

    let mut decision = parse_routing_response(&reply, request);
    if decision.workflow_type == WorkflowType::Sequential {
        if decision.secondary_agents.is_empty() {
            warn!("router: sequential decision without follow-up agents, using keyword routing");
            return enhanced_fallback_routing(request);
        }
        decision.agent_tasks = decompose_tasks(llm, request, &decision.agent_queue()).await;
    }

    info!(
        primary = %decision.primary_agent,
        workflow = %decision.workflow_type,
        secondary = decision.secondary_agents.len(),
        "router: decision"
    );
    decision
}

/// Ask the model for one focused task per agent. Empty on any failure.
pub async fn decompose_tasks(llm: &dyn LlmChat, request: &str, agents: &[AgentKind]) -> BTreeMap<String, String> {
    let prompt = prompts::decompose_prompt(request, agents);
    let reply = match llm::complete(
        llm,
        prompts::DECOMPOSER_SYSTEM,
        &prompt,
        DECOMPOSE_MAX_TOKENS,
        ROUTE_TEMPERATURE,
    )
    .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "router: task decomposition failed");
            return BTreeMap::new();
        }
    };

    let Some(Value::Object(map)) = llm::json_block(&reply).and_then(|raw| serde_json::from_str(raw).ok()) else {
        return BTreeMap::new();
    };
    map.into_iter()
        .filter_map(|(agent, task)| match task {
            Value::String(task) => Some((agent, task)),
            _ => None,
        })
        .collect()
}

/// LLM-assisted estimate of whether a request splits into independent tasks.
pub async fn analyze_complexity(llm: Option<&dyn LlmChat>, request: &str) -> ComplexityAnalysis {
    let Some(llm) = llm else {
        return ComplexityAnalysis::fallback(request);
    };
    let prompt = prompts::complexity_prompt(request);
    match llm::complete(llm, prompts::COMPLEXITY_SYSTEM, &prompt, COMPLEXITY_MAX_TOKENS, ROUTE_TEMPERATURE).await
    {
        Ok(reply) => llm::json_block(&reply)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| ComplexityAnalysis::fallback(request)),
        Err(e) => {
            warn!(error = %e, "router: complexity analysis failed");
            ComplexityAnalysis::fallback(request)
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
