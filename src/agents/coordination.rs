//! Orchestration nodes: intent classification and parallel task planning.

use super::{Agent, AgentContext, AgentError, AgentResponse};
use crate::routing::{AgentKind, TaskAssignment};
use crate::workflow::WorkflowState;

pub struct OrchestratorAgent;

#[async_trait::async_trait]
impl Agent for OrchestratorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Orchestrator
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let mut response = AgentResponse::new(
            AgentKind::Orchestrator,
            "intent_classification",
            "Intent classified and workflow determined",
            cx.now,
        );
        if let Some(decision) = &state.routing {
            let queue: Vec<&str> = decision.agent_queue().into_iter().map(AgentKind::as_str).collect();
            response = response
                .with("primary_agent", decision.primary_agent.as_str())
                .with("workflow_type", decision.workflow_type.as_str())
                .with("agent_queue", queue)
                .with("reasoning", decision.reasoning.clone());
        }
        Ok(response)
    }
}

pub struct ParallelCoordinatorAgent;

/// Independent tasks for a parallel run. The router's explicit tasks win;
/// otherwise every queued agent gets the whole request.
#[must_use]
pub fn plan_parallel_tasks(state: &WorkflowState) -> Vec<TaskAssignment> {
    let planned = state
        .routing
        .as_ref()
        .map(|r| r.parallel_tasks.clone())
        .unwrap_or_default();
    if !planned.is_empty() {
        return planned;
    }
    state
        .agent_queue
        .iter()
        .map(|&agent| TaskAssignment {
            agent,
            task: state.task_for(agent).unwrap_or(&state.user_request).to_string(),
        })
        .collect()
}

#[async_trait::async_trait]
impl Agent for ParallelCoordinatorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ParallelCoordinator
    }

    async fn process(&self, cx: &AgentContext, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let tasks = plan_parallel_tasks(state);
        let agents: Vec<&str> = tasks.iter().map(|t| t.agent.as_str()).collect();
        let response = AgentResponse::new(
            AgentKind::ParallelCoordinator,
            "parallel_coordination",
            "Tasks decomposed for parallel execution",
            cx.now,
        )
        .with("task_count", tasks.len())
        .with("agents", agents);
        state.task_decomposition = tasks;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{RoutingDecision, WorkflowType};
    use serde_json::Map;
    use time::macros::datetime;

    fn state() -> WorkflowState {
        WorkflowState::new("Write captions and check mentions", "s1", Map::new(), datetime!(2024-05-01 09:00 UTC))
    }

    #[tokio::test]
    async fn orchestrator_records_classification() {
        let cx = AgentContext::offline("s1", datetime!(2024-05-01 09:00 UTC));
        let response = OrchestratorAgent.process(&cx, &mut state()).await.unwrap();
        assert_eq!(response.action, "intent_classification");
        assert_eq!(response.result, "Intent classified and workflow determined");
        assert!(response.data.is_empty());

        let mut routed = state();
        let mut decision = RoutingDecision::direct(AgentKind::Content, "captions first");
        decision.workflow_type = WorkflowType::Sequential;
        decision.secondary_agents = vec![AgentKind::Listening];
        routed.routing = Some(decision);
        let response = OrchestratorAgent.process(&cx, &mut routed).await.unwrap();
        assert_eq!(response.data["workflow_type"], "sequential");
        assert_eq!(response.data["agent_queue"], serde_json::json!(["content", "listening"]));
    }

    #[tokio::test]
    async fn coordinator_prefers_router_tasks() {
        let mut s = state();
        let mut decision = RoutingDecision::direct(AgentKind::Content, "split");
        decision.workflow_type = WorkflowType::Parallel;
        decision.parallel_tasks = vec![TaskAssignment { agent: AgentKind::Listening, task: "scan".into() }];
        s.routing = Some(decision);
        s.agent_queue = vec![AgentKind::Content, AgentKind::Listening];

        let cx = AgentContext::offline("s1", datetime!(2024-05-01 09:00 UTC));
        let response = ParallelCoordinatorAgent.process(&cx, &mut s).await.unwrap();
        assert_eq!(response.data["task_count"], 1);
        assert_eq!(s.task_decomposition, [TaskAssignment { agent: AgentKind::Listening, task: "scan".into() }]);
    }

    #[test]
    fn queue_becomes_tasks_without_router_plan() {
        let mut s = state();
        s.agent_queue = vec![AgentKind::Content, AgentKind::Listening];
        let tasks = plan_parallel_tasks(&s);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.task == "Write captions and check mentions"));
    }
}
