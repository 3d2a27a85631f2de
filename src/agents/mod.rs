//! Agents: the workers a workflow run dispatches to.
//!
//! DESIGN
//! ======
//! Each agent reads the shared [`WorkflowState`], may write its own typed
//! slot (draft, compliance status, metrics, crisis plan) and returns one
//! [`AgentResponse`]. The engine records the response; agents never push to
//! `agent_responses` themselves.
//!
//! External dependencies arrive through [`AgentContext`]. An absent LLM or
//! platform is never an error: agents fall back to deterministic output.
//! Upstream failures are returned as [`AgentError`] and drive the
//! workflow's retry path.

pub mod analytics;
pub mod communication;
pub mod community;
pub mod compliance;
pub mod content;
pub mod coordination;
pub mod crisis;
pub mod general;
pub mod listening;
pub mod planning;
pub mod publishing;
pub mod strategy;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::error::ErrorCode;
use crate::llm::{LlmChat, LlmError};
use crate::routing::AgentKind;
use crate::services::instagram::{InstagramError, SocialPlatform};
use crate::services::scheduler::{PostStore, SchedulerError};
use crate::services::session_memory::SessionMemory;
use crate::workflow::WorkflowState;

pub use analytics::PerformanceMetrics;
pub use compliance::{ComplianceStatus, RiskLevel};
pub use content::ContentDraft;
pub use crisis::{CrisisLevel, CrisisPlan};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("llm call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("platform call failed: {0}")]
    Platform(#[from] InstagramError),

    #[error("scheduling failed: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl ErrorCode for AgentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Llm(e) => e.error_code(),
            Self::Platform(e) => e.error_code(),
            Self::Scheduler(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.retryable(),
            Self::Platform(e) => e.retryable(),
            Self::Scheduler(e) => e.retryable(),
        }
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// One entry in a run's `agent_responses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent: AgentKind,
    pub action: String,
    pub result: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl AgentResponse {
    #[must_use]
    pub fn new(agent: AgentKind, action: &str, result: impl Into<String>, now: OffsetDateTime) -> Self {
        Self { agent, action: action.to_string(), result: result.into(), data: Map::new(), timestamp: now }
    }

    /// Attach a data field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Dependencies shared by every agent in one run.
#[derive(Clone)]
pub struct AgentContext {
    pub llm: Option<Arc<dyn LlmChat>>,
    pub platform: Option<Arc<dyn SocialPlatform>>,
    pub posts: PostStore,
    /// Snapshot of the session's memory taken when the run started.
    pub memory: SessionMemory,
    pub now: OffsetDateTime,
}

impl AgentContext {
    /// Context with no LLM, no platform and an empty post store.
    #[must_use]
    pub fn offline(session_id: &str, now: OffsetDateTime) -> Self {
        Self { llm: None, platform: None, posts: PostStore::new(), memory: SessionMemory::new(session_id, now), now }
    }

    #[must_use]
    pub fn llm(&self) -> Option<&dyn LlmChat> {
        self.llm.as_deref()
    }

    #[must_use]
    pub fn platform(&self) -> Option<&dyn SocialPlatform> {
        self.platform.as_deref()
    }
}

// =============================================================================
// AGENT TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Run once against the shared state.
    ///
    /// # Errors
    ///
    /// Returns an error when an upstream dependency fails.
    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError>;
}

/// The agent behind a node.
#[must_use]
pub fn agent_for(kind: AgentKind) -> &'static dyn Agent {
    match kind {
        AgentKind::Orchestrator => &coordination::OrchestratorAgent,
        AgentKind::Strategy => &strategy::StrategyAgent,
        AgentKind::Content => &content::ContentAgent,
        AgentKind::Publishing => &publishing::PublishingAgent,
        AgentKind::Community => &community::CommunityAgent,
        AgentKind::Listening => &listening::ListeningAgent,
        AgentKind::Analytics => &analytics::AnalyticsAgent,
        AgentKind::Crisis => &crisis::CrisisAgent,
        AgentKind::Compliance => &compliance::ComplianceAgent,
        AgentKind::Influencer => &planning::InfluencerAgent,
        AgentKind::PaidSocial => &planning::PaidSocialAgent,
        AgentKind::General => &general::GeneralAgent,
        AgentKind::ParallelCoordinator => &coordination::ParallelCoordinatorAgent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::AgentKind;

    #[test]
    fn every_kind_has_a_matching_agent() {
        for kind in AgentKind::ROUTABLE {
            assert_eq!(agent_for(kind).kind(), kind);
        }
        assert_eq!(agent_for(AgentKind::Orchestrator).kind(), AgentKind::Orchestrator);
        assert_eq!(agent_for(AgentKind::ParallelCoordinator).kind(), AgentKind::ParallelCoordinator);
    }

    #[test]
    fn response_data_is_omitted_when_empty() {
        let now = time::macros::datetime!(2024-05-01 09:00 UTC);
        let bare = serde_json::to_value(AgentResponse::new(AgentKind::Crisis, "crisis_management", "ok", now)).unwrap();
        assert!(bare.get("data").is_none());
        assert_eq!(bare["agent"], "crisis");
        assert_eq!(bare["timestamp"], "2024-05-01T09:00:00Z");

        let rich = AgentResponse::new(AgentKind::Crisis, "crisis_management", "ok", now).with("severity", "high");
        assert_eq!(rich.data["severity"], "high");
    }
}
