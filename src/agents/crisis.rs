//! Crisis agent: severity assessment and a response plan.
//!
//! Severity is the highest of three signals: keywords in the task, the
//! negative share reported by the community agent, and any level already on
//! the state. High and critical plans need escalation; the workflow sends
//! those runs to human review.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::routing::AgentKind;
use crate::workflow::WorkflowState;

/// Negative comment share (percent) that counts as a high-severity signal.
pub const NEGATIVE_ALERT_PERCENT: u64 = 40;

const CRITICAL_TERMS: [&str; 5] = ["lawsuit", "emergency", "viral backlash", "boycott", "data breach"];
const HIGH_TERMS: [&str; 4] = ["crisis", "scandal", "outrage", "angry"];
const MEDIUM_TERMS: [&str; 3] = ["complaint", "negative", "criticism"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl CrisisLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[must_use]
    pub fn needs_escalation(self) -> bool {
        self >= Self::High
    }

    fn response_strategy(self) -> &'static str {
        match self {
            Self::Low => "Monitor the conversation and answer through normal community channels",
            Self::Medium => "Acknowledge the concerns publicly and follow up with affected users within 24 hours",
            Self::High => "Pause scheduled content, post a holding statement and escalate to the communications lead",
            Self::Critical => {
                "Pause all publishing, issue an official statement and escalate to leadership and legal immediately"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisPlan {
    pub severity: CrisisLevel,
    pub response_strategy: String,
    pub escalation_needed: bool,
}

impl CrisisPlan {
    #[must_use]
    pub fn for_level(severity: CrisisLevel) -> Self {
        Self {
            severity,
            response_strategy: severity.response_strategy().to_string(),
            escalation_needed: severity.needs_escalation(),
        }
    }
}

/// Severity implied by the wording of `text`.
#[must_use]
pub fn keyword_level(text: &str) -> CrisisLevel {
    let lower = text.to_lowercase();
    let hit = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));
    if hit(&CRITICAL_TERMS) {
        CrisisLevel::Critical
    } else if hit(&HIGH_TERMS) {
        CrisisLevel::High
    } else if hit(&MEDIUM_TERMS) {
        CrisisLevel::Medium
    } else {
        CrisisLevel::Low
    }
}

fn sentiment_level(state: &WorkflowState) -> CrisisLevel {
    let negative = state
        .latest_response(AgentKind::Community)
        .and_then(|r| r.data.get("negative_percentage"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if negative >= NEGATIVE_ALERT_PERCENT { CrisisLevel::High } else { CrisisLevel::Low }
}

/// Combined severity for the current run.
#[must_use]
pub fn assess(state: &WorkflowState) -> CrisisLevel {
    let task = state.task_for(AgentKind::Crisis).unwrap_or(&state.user_request);
    keyword_level(task)
        .max(keyword_level(&state.user_request))
        .max(sentiment_level(state))
        .max(state.crisis_level.unwrap_or_default())
}

pub struct CrisisAgent;

#[async_trait::async_trait]
impl Agent for CrisisAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Crisis
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let level = assess(state);
        let plan = CrisisPlan::for_level(level);
        info!(session_id = %state.session_id, severity = level.as_str(), "crisis: assessed");

        state.final_response = Some(format!(
            "Crisis severity: {}. {}.{}",
            level.as_str(),
            plan.response_strategy,
            if plan.escalation_needed { " Escalation required." } else { "" }
        ));
        state.crisis_level = Some(level);
        state.crisis_response_plan = Some(plan.clone());

        Ok(AgentResponse::new(AgentKind::Crisis, "crisis_management", "Crisis response initiated", cx.now)
            .with("severity", level.as_str())
            .with("escalation_needed", plan.escalation_needed)
            .with("response_strategy", plan.response_strategy))
    }
}
