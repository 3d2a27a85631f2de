//! Compliance agent: brand-safety gate in front of publishing.

use serde::{Deserialize, Serialize};

use super::content::ContentDraft;
use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::routing::AgentKind;
use crate::workflow::WorkflowState;

/// Instagram caption limit, hashtags included.
pub const MAX_CAPTION_CHARS: usize = 2200;
pub const MAX_HASHTAGS: usize = 30;

/// Phrases that platform ad and endorsement policies flag.
pub const RESTRICTED_TERMS: [&str; 8] = [
    "guaranteed results",
    "get rich quick",
    "miracle cure",
    "risk-free",
    "100% free",
    "buy followers",
    "free money",
    "click here",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStatus {
    pub passed: bool,
    pub issues: Vec<String>,
    pub risk_level: RiskLevel,
}

/// Check a draft against length, hashtag and wording rules.
#[must_use]
pub fn check_draft(draft: &ContentDraft) -> ComplianceStatus {
    let mut issues = Vec::new();

    let chars = draft.full_caption().chars().count();
    if chars > MAX_CAPTION_CHARS {
        issues.push(format!("Caption is {chars} characters; the limit is {MAX_CAPTION_CHARS}"));
    }
    if draft.hashtags.len() > MAX_HASHTAGS {
        issues.push(format!("{} hashtags used; the limit is {MAX_HASHTAGS}", draft.hashtags.len()));
    }
    let lower = draft.caption.to_lowercase();
    for term in RESTRICTED_TERMS.iter().filter(|t| lower.contains(*t)) {
        issues.push(format!("Restricted phrase: \"{term}\""));
    }

    let risk_level = match issues.len() {
        0 => RiskLevel::Low,
        1 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };
    ComplianceStatus { passed: issues.is_empty(), issues, risk_level }
}

pub struct ComplianceAgent;

#[async_trait::async_trait]
impl Agent for ComplianceAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Compliance
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let status = state.draft.as_ref().map(check_draft).unwrap_or(ComplianceStatus {
            passed: true,
            issues: Vec::new(),
            risk_level: RiskLevel::Low,
        });

        let result = if status.passed {
            "Compliance check completed".to_string()
        } else {
            format!("Compliance check failed: {}", status.issues.join("; "))
        };
        let response = AgentResponse::new(AgentKind::Compliance, "compliance_check", result, cx.now)
            .with("status", if status.passed { "passed" } else { "failed" })
            .with("risk_level", serde_json::to_value(status.risk_level).unwrap_or_default())
            .with("issues", status.issues.clone());
        state.compliance_status = Some(status);
        Ok(response)
    }
}

#[cfg(test)]
#[path = "compliance_test.rs"]
mod tests;
