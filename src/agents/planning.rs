//! Influencer and paid social planning.
//!
//! Neither agent talks to an external service. They turn the request and
//! whatever the analytics agent measured into a short plan.

use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::routing::AgentKind;
use crate::workflow::WorkflowState;

// =============================================================================
// INFLUENCER
// =============================================================================

const INFLUENCERS_IDENTIFIED: u32 = 5;
const PARTNERSHIP_OPPORTUNITIES: u32 = 3;

/// Creator tiers worth approaching for an account of this size.
#[must_use]
pub fn recommended_tiers(followers: Option<u64>) -> Vec<&'static str> {
    match followers {
        Some(n) if n < 10_000 => vec!["nano", "micro"],
        Some(n) if n < 100_000 => vec!["micro", "mid-tier"],
        Some(_) => vec!["mid-tier", "macro"],
        None => vec!["micro"],
    }
}

pub struct InfluencerAgent;

#[async_trait::async_trait]
impl Agent for InfluencerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Influencer
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let followers = state.performance_metrics.as_ref().map(|m| m.followers).filter(|n| *n > 0);
        let tiers = recommended_tiers(followers);
        info!(session_id = %state.session_id, ?tiers, "influencer: plan ready");

        state.final_response = Some(format!(
            "Identified {INFLUENCERS_IDENTIFIED} potential influencers and {PARTNERSHIP_OPPORTUNITIES} partnership \
             opportunities. Focus on {} creators.",
            tiers.join(" and ")
        ));

        Ok(AgentResponse::new(AgentKind::Influencer, "influencer_management", "Influencer analysis complete", cx.now)
            .with("influencers_identified", INFLUENCERS_IDENTIFIED)
            .with("partnership_opportunities", PARTNERSHIP_OPPORTUNITIES)
            .with("recommended_tiers", tiers))
    }
}

// =============================================================================
// PAID SOCIAL
// =============================================================================

pub const DEFAULT_BUDGET: u64 = 5000;
const CPC_CENTS: u64 = 50;
const REACH_PER_DOLLAR: u64 = 10;

fn budget_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\s?(\d[\d,]*)").ok()).as_ref()
}

/// First dollar amount in `text`, commas allowed.
#[must_use]
pub fn requested_budget(text: &str) -> Option<u64> {
    let caps = budget_pattern()?.captures(text)?;
    caps[1].replace(',', "").parse().ok().filter(|b| *b > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdEstimate {
    pub budget: u64,
    pub estimated_reach: u64,
    pub estimated_clicks: u64,
}

#[must_use]
pub fn estimate(budget: u64) -> AdEstimate {
    AdEstimate {
        budget,
        estimated_reach: budget.saturating_mul(REACH_PER_DOLLAR),
        estimated_clicks: budget.saturating_mul(100) / CPC_CENTS,
    }
}

pub struct PaidSocialAgent;

#[async_trait::async_trait]
impl Agent for PaidSocialAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::PaidSocial
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let task = state.task_for(AgentKind::PaidSocial).unwrap_or(&state.user_request);
        let plan = estimate(requested_budget(task).unwrap_or(DEFAULT_BUDGET));
        let cpc = 0.5;
        info!(session_id = %state.session_id, budget = plan.budget, "paid_social: campaign sized");

        state.final_response = Some(format!(
            "Budget ${} at ${cpc:.2} per click: about {} clicks and an estimated reach of {}.",
            plan.budget, plan.estimated_clicks, plan.estimated_reach
        ));

        Ok(AgentResponse::new(AgentKind::PaidSocial, "paid_advertising", "Ad campaign optimized", cx.now)
            .with("budget_allocated", plan.budget)
            .with("estimated_reach", plan.estimated_reach)
            .with("estimated_clicks", plan.estimated_clicks)
            .with("cpc", cpc))
    }
}
