//! Node loop for one run.

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::graph;
use super::state::{ErrorState, ReviewDecision, WorkflowState, WorkflowStatus};
use super::{MAX_STEPS, Node, WorkflowError, WorkflowEvent};
use crate::agents::{self, AgentContext, AgentError, AgentResponse};
use crate::error::ErrorCode;
use crate::routing::{self, AgentKind, TaskAssignment};

pub const DEFAULT_RESPONSE_PREFIX: &str = "Completed workflow with";
/// Action recorded for a parallel branch whose agent returned an error.
pub const FAILED_BRANCH_ACTION: &str = "agent_failed";

/// Runs workflow nodes against one agent context.
pub struct Workflow<'a> {
    cx: &'a AgentContext,
    events: Option<mpsc::Sender<WorkflowEvent>>,
}

impl<'a> Workflow<'a> {
    #[must_use]
    pub fn new(cx: &'a AgentContext) -> Self {
        Self { cx, events: None }
    }

    /// Report progress on `events`. A closed receiver is ignored.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::Sender<WorkflowEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run from the orchestrator until the run completes or is interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::StepLimit`] when the run does not settle.
    pub async fn run(&self, state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        info!(session_id = %state.session_id, "workflow: started");
        self.drive(state, Node::Agent(AgentKind::Orchestrator)).await
    }

    /// Continue an interrupted run with the reviewer's decision. The step
    /// guard counts from zero again for each resume.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAwaitingReview`] when `state` was not
    /// interrupted, or [`WorkflowError::StepLimit`].
    pub async fn resume(
        &self,
        mut state: WorkflowState,
        decision: ReviewDecision,
    ) -> Result<WorkflowState, WorkflowError> {
        if state.status != WorkflowStatus::AwaitingReview {
            return Err(WorkflowError::NotAwaitingReview);
        }
        info!(session_id = %state.session_id, action = ?decision.action, "workflow: review received");
        state.steps = 0;
        if let Some(notes) = &decision.notes {
            state.context_data.insert("human_feedback".into(), notes.clone().into());
        } else {
            state.context_data.remove("human_feedback");
        }
        state.human_feedback = Some(decision);
        state.review_reason = None;
        state.status = WorkflowStatus::Running;
        self.drive(state, Node::ApplyFeedback).await
    }

    async fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).await.is_err() {
                debug!("workflow: event receiver dropped");
            }
        }
    }

    async fn drive(&self, mut state: WorkflowState, mut node: Node) -> Result<WorkflowState, WorkflowError> {
        loop {
            if state.steps >= MAX_STEPS {
                state.status = WorkflowStatus::Failed;
                warn!(session_id = %state.session_id, steps = state.steps, %node, "workflow: step limit reached");
                return Err(WorkflowError::StepLimit(MAX_STEPS));
            }
            state.steps += 1;
            self.emit(WorkflowEvent::NodeEntered { node: node.to_string() }).await;

            node = match node {
                Node::RouteRequest => self.route_request(&mut state).await,
                Node::Agent(kind) => self.run_agent(&mut state, kind).await,
                Node::ParallelCoordinator => self.run_parallel(&mut state).await,
                Node::ApplyFeedback => graph::apply_feedback(&mut state),
                Node::ErrorHandler => graph::handle_error(&mut state),
                Node::PrepareResponse => {
                    prepare_response(&mut state);
                    Node::Complete
                }
                Node::HumanReview => {
                    state.approval_needed = true;
                    state.status = WorkflowStatus::AwaitingReview;
                    let reason = state.review_reason.clone().unwrap_or_else(|| "Human review requested".into());
                    info!(session_id = %state.session_id, %reason, "workflow: awaiting review");
                    self.emit(WorkflowEvent::Interrupted { reason }).await;
                    return Ok(state);
                }
                Node::Complete => {
                    if state.status != WorkflowStatus::Rejected {
                        state.status = WorkflowStatus::Completed;
                    }
                    info!(
                        session_id = %state.session_id,
                        status = state.status.as_str(),
                        responses = state.agent_responses.len(),
                        steps = state.steps,
                        "workflow: finished"
                    );
                    self.emit(WorkflowEvent::Completed {
                        status: state.status,
                        final_response: state.final_response.clone(),
                    })
                    .await;
                    return Ok(state);
                }
            };
        }
    }

    async fn route_request(&self, state: &mut WorkflowState) -> Node {
        if state.routing.is_none() {
            let decision = routing::route(self.cx.llm(), &state.user_request, &state.context_data).await;
            state.routing = Some(decision);
        }
        if state.agent_queue.is_empty() {
            if let Some(decision) = &state.routing {
                state.workflow_type = decision.workflow_type;
                state.agent_queue = decision.agent_queue();
            }
        }
        graph::dispatch(state)
    }

    async fn run_agent(&self, state: &mut WorkflowState, kind: AgentKind) -> Node {
        self.emit(WorkflowEvent::AgentStarted { agent: kind }).await;
        if !self.invoke(state, kind).await {
            Node::ErrorHandler
        } else if kind == AgentKind::Orchestrator {
            Node::RouteRequest
        } else {
            graph::after_agent(state, kind)
        }
    }

    /// Run one agent on the main state. Returns whether it succeeded; a
    /// failure is recorded in `error_state`.
    async fn invoke(&self, state: &mut WorkflowState, kind: AgentKind) -> bool {
        state.current_agent = Some(kind);
        match agents::agent_for(kind).process(self.cx, state).await {
            Ok(response) => {
                self.record(state, response).await;
                if state.error_state.as_ref().is_some_and(|e| e.agent == kind) {
                    state.error_state = None;
                }
                true
            }
            Err(e) => {
                self.report_failure(state, kind, &e).await;
                state.error_state = Some(ErrorState {
                    agent: kind,
                    code: e.error_code().to_string(),
                    message: e.to_string(),
                    retryable: e.retryable(),
                });
                false
            }
        }
    }

    async fn record(&self, state: &mut WorkflowState, response: AgentResponse) {
        info!(
            session_id = %state.session_id,
            agent = %response.agent,
            action = %response.action,
            "workflow: agent completed"
        );
        self.emit(WorkflowEvent::AgentCompleted {
            agent: response.agent,
            action: response.action.clone(),
            result: response.result.clone(),
        })
        .await;
        state.agent_responses.push(response);
    }

    async fn report_failure(&self, state: &WorkflowState, kind: AgentKind, e: &AgentError) {
        warn!(session_id = %state.session_id, agent = %kind, error = %e, "workflow: agent failed");
        self.emit(WorkflowEvent::AgentFailed { agent: kind, code: e.error_code().to_string(), message: e.to_string() })
            .await;
    }

    /// Decompose, run every task on its own copy of the state, then fold the
    /// copies back in task order.
    async fn run_parallel(&self, state: &mut WorkflowState) -> Node {
        if !self.invoke(state, AgentKind::ParallelCoordinator).await {
            return Node::ErrorHandler;
        }
        debug!(session_id = %state.session_id, tasks = state.task_decomposition.len(), "workflow: fan out");

        let branches: Vec<(TaskAssignment, WorkflowState)> = state
            .task_decomposition
            .iter()
            .map(|task| {
                let mut branch = state.clone();
                branch.task_decomposition = vec![task.clone()];
                branch.final_response = None;
                branch.current_agent = Some(task.agent);
                (task.clone(), branch)
            })
            .collect();
        for (task, _) in &branches {
            self.emit(WorkflowEvent::AgentStarted { agent: task.agent }).await;
        }

        let results = join_all(branches.into_iter().map(|(task, mut branch)| async move {
            let result = agents::agent_for(task.agent).process(self.cx, &mut branch).await;
            (task, branch, result)
        }))
        .await;

        let mut answers = Vec::new();
        for (task, branch, result) in results {
            match result {
                Ok(response) => {
                    if let Some(text) = &branch.final_response {
                        answers.push(format!("{}: {text}", task.agent));
                    }
                    merge_branch(state, branch);
                    self.record(state, response).await;
                }
                Err(e) => {
                    self.report_failure(state, task.agent, &e).await;
                    let failed = AgentResponse::new(task.agent, FAILED_BRANCH_ACTION, e.to_string(), self.cx.now)
                        .with("code", e.error_code())
                        .with("retryable", e.retryable());
                    state.agent_responses.push(failed);
                }
            }
        }
        if !answers.is_empty() {
            state.final_response = Some(answers.join("\n\n"));
        }
        graph::after_parallel(state)
    }
}

/// Typed slots a branch filled that the main state has not.
fn merge_branch(state: &mut WorkflowState, branch: WorkflowState) {
    state.content_strategy = state.content_strategy.take().or(branch.content_strategy);
    state.draft = state.draft.take().or(branch.draft);
    state.generated_content = state.generated_content.take().or(branch.generated_content);
    state.compliance_status = state.compliance_status.take().or(branch.compliance_status);
    state.performance_metrics = state.performance_metrics.take().or(branch.performance_metrics);
    state.crisis_response_plan = state.crisis_response_plan.take().or(branch.crisis_response_plan);
    state.crisis_level = state.crisis_level.max(branch.crisis_level);
    for (key, value) in branch.context_data {
        state.context_data.entry(key).or_insert(value);
    }
}

fn prepare_response(state: &mut WorkflowState) {
    if state.final_response.as_deref().is_none_or(|text| text.trim().is_empty()) {
        state.final_response =
            Some(format!("{DEFAULT_RESPONSE_PREFIX} {} agent responses", state.agent_responses.len()));
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
