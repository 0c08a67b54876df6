//! Assigner: routes the next subtask to an executor, or answers it directly.
//!
//! The assigner reads the next unstarted subtask together with the plan
//! results so far, the executor roster, and any distilled lesson from a prior
//! failure, then either writes detailed instructions and dispatches to an
//! executor (`ASSIGN_AGENT`) or short-circuits with the answer itself
//! (`DIRECT_ANSWER`). A direct answer resolves the subtask to `Success`
//! immediately; no executor is invoked for it.

use crate::taskforce::client_wrapper::ClientWrapper;
use crate::taskforce::config::EngineConfig;
use crate::taskforce::error::EngineError;
use crate::taskforce::ledger::{SubtaskMode, TaskLedger};
use crate::taskforce::llm_gateway::LLMGateway;
use crate::taskforce::prompts;
use crate::taskforce::protocol;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of one assignment, as recorded on the ledger.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    /// Id of the subtask that was assigned.
    pub task_id: usize,
    /// How the subtask is being discharged.
    pub mode: SubtaskMode,
    /// Executor name for `AssignAgent`, synthetic marker otherwise.
    pub agent: String,
}

/// Task assigner that matches subtasks to worker capabilities.
pub struct Assigner {
    gateway: LLMGateway,
}

impl Assigner {
    /// Create an assigner over the given client.
    pub fn new(client: Arc<dyn ClientWrapper>, config: &EngineConfig) -> Self {
        Self {
            gateway: LLMGateway::new(client, config.role_timeout),
        }
    }

    /// Assign the next unstarted subtask.
    ///
    /// `known_executors` is the set of registry keys valid at dispatch time.
    /// Selecting any other name is an [`EngineError::UnknownExecutor`]; the
    /// subtask is left in `NotStarted` and the orchestrator decides whether
    /// reflection budget remains.
    pub async fn assign(
        &mut self,
        ledger: &mut TaskLedger,
        known_executors: &HashSet<String>,
    ) -> Result<AssignOutcome, EngineError> {
        let task_id = ledger.next_not_started().ok_or_else(|| {
            EngineError::ProtocolParse("assign called with no unstarted subtask".into())
        })?;
        let task_name = ledger
            .subtask(task_id)
            .map(|t| t.name.clone())
            .unwrap_or_default();

        self.gateway
            .set_instructions(prompts::build_assign_system_prompt(ledger));
        let user_prompt = prompts::build_assign_user_prompt(ledger, &task_name);

        let reply = self.gateway.run(&user_prompt).await?;
        ledger.append_trajectory("assigner", reply.record);

        let assignment = protocol::parse_assignment(&reply.final_output)?;
        match assignment.mode {
            SubtaskMode::DirectAnswer => {
                let answer = assignment.direct_answer.unwrap_or_default();
                ledger.resolve_direct(task_id, assignment.agent.clone(), answer);
                Ok(AssignOutcome {
                    task_id,
                    mode: SubtaskMode::DirectAnswer,
                    agent: assignment.agent,
                })
            }
            SubtaskMode::AssignAgent => {
                if !known_executors.contains(&assignment.agent) {
                    log::error!(
                        "Assigner selected unknown executor '{}' for subtask {}",
                        assignment.agent,
                        task_id
                    );
                    return Err(EngineError::UnknownExecutor(assignment.agent));
                }
                let description = assignment.description.unwrap_or_else(|| task_name.clone());
                ledger.assign_subtask(task_id, assignment.agent.clone(), description);
                Ok(AssignOutcome {
                    task_id,
                    mode: SubtaskMode::AssignAgent,
                    agent: assignment.agent,
                })
            }
        }
    }
}
