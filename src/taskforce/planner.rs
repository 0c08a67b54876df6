//! Planner: decomposition, result checking, plan revision, and reflection.
//!
//! The planner owns four operations in the run lifecycle:
//!
//! - [`plan_task`](Planner::plan_task) — produce the initial plan, or a
//!   replan when `failure_info` is present from a prior reflection;
//! - [`plan_check`](Planner::plan_check) — classify a just-executed subtask
//!   as success / partial success / failed;
//! - [`plan_update`](Planner::plan_update) — decide whether the remaining
//!   tail still makes sense, rewriting it within a bounded modify budget;
//! - [`reflect_on_failure`](Planner::reflect_on_failure) — distill why an
//!   attempt failed, seeding the next replan.

use crate::taskforce::client_wrapper::ClientWrapper;
use crate::taskforce::config::EngineConfig;
use crate::taskforce::error::EngineError;
use crate::taskforce::ledger::TaskLedger;
use crate::taskforce::llm_gateway::LLMGateway;
use crate::taskforce::prompts;
use crate::taskforce::protocol::{self, PlanChoice};
use std::sync::Arc;

/// Task planner that handles decomposition and plan maintenance.
pub struct Planner {
    gateway: LLMGateway,
    modify_plan_budget: u32,
    initial_budget: u32,
}

impl Planner {
    /// Create a planner over the given client.
    pub fn new(client: Arc<dyn ClientWrapper>, config: &EngineConfig) -> Self {
        let mut gateway = LLMGateway::new(client, config.role_timeout);
        gateway.set_instructions(prompts::PLANNER_SYSTEM_PROMPT);
        Self {
            gateway,
            modify_plan_budget: config.modify_plan_budget,
            initial_budget: config.modify_plan_budget,
        }
    }

    /// Restore the plan-modify budget at the start of a run.
    pub fn begin_run(&mut self) {
        self.modify_plan_budget = self.initial_budget;
    }

    /// Remaining plan-modify budget (strictly decreasing across `update`
    /// choices, never below zero).
    pub fn remaining_budget(&self) -> u32 {
        self.modify_plan_budget
    }

    /// Produce a plan from the overall task and executor roster.
    ///
    /// When `failure_info` is non-empty this is a replan: the prompt includes
    /// the failure analysis, and an emitted
    /// `<helpful_experience_or_fact>` lesson is stored on the ledger for
    /// subsequent assigner prompts. The new plan replaces any prior plan.
    pub async fn plan_task(&self, ledger: &mut TaskLedger) -> Result<(), EngineError> {
        let replanning = !ledger.failure_info().is_empty();
        let prompt = if replanning {
            prompts::build_replan_prompt(ledger)
        } else {
            prompts::build_plan_prompt(ledger)
        };

        let reply = self.gateway.run(&prompt).await?;
        ledger.append_trajectory("planner", reply.record);

        let tasks = protocol::parse_plan_tasks(&reply.final_output);
        ledger.set_plan(tasks);

        if replanning {
            if let Some(experience) = protocol::parse_experience(&reply.final_output) {
                ledger.set_experience_from_failure(experience);
            }
        }
        Ok(())
    }

    /// Classify a finished subtask's result and write the status.
    pub async fn plan_check(
        &self,
        ledger: &mut TaskLedger,
        task_id: usize,
    ) -> Result<(), EngineError> {
        let task = ledger
            .subtask(task_id)
            .ok_or_else(|| EngineError::ProtocolParse(format!("no subtask with id {}", task_id)))?
            .clone();
        let prompt = prompts::build_plan_check_prompt(ledger, &task);

        let reply = self.gateway.run(&prompt).await?;
        ledger.append_trajectory("planner", reply.record);

        let status = protocol::parse_task_status(&reply.final_output);
        ledger.set_subtask_status(task_id, status);
        Ok(())
    }

    /// Decide whether the remaining plan tail should change.
    ///
    /// Only called while at least one subtask is still unstarted. An `update`
    /// choice replaces the tail after `cursor_id` and consumes one unit of the
    /// modify budget; with the budget exhausted, or with an empty replacement
    /// tail, the choice is coerced to `continue`.
    pub async fn plan_update(
        &mut self,
        ledger: &mut TaskLedger,
        cursor_id: usize,
    ) -> Result<PlanChoice, EngineError> {
        let blocks = ledger.formatted_plan_with_results();
        let previous_plan = blocks[..cursor_id.min(blocks.len())].join("\n");
        let unfinished_plan = blocks[cursor_id.min(blocks.len())..].join("\n");
        let prompt = prompts::build_plan_update_prompt(ledger, &previous_plan, &unfinished_plan);

        let reply = self.gateway.run(&prompt).await?;
        ledger.append_trajectory("planner", reply.record);

        let (choice, updated_tail) = protocol::parse_plan_update(&reply.final_output)?;
        match choice {
            PlanChoice::Continue | PlanChoice::EarlyCompletion => Ok(choice),
            PlanChoice::Update => {
                if self.modify_plan_budget == 0 {
                    log::warn!("Plan-modify budget exhausted, continuing with existing plan");
                    return Ok(PlanChoice::Continue);
                }
                match updated_tail {
                    Some(tail) => {
                        self.modify_plan_budget -= 1;
                        ledger.replace_plan_tail(cursor_id, tail);
                        Ok(PlanChoice::Update)
                    }
                    None => Ok(PlanChoice::Continue),
                }
            }
        }
    }

    /// Analyze a failed attempt and store the analysis as `failure_info`.
    ///
    /// `additional_context` carries the quality-gate or self-check rationale
    /// when the trigger was not a failed subtask; it is appended to the
    /// model's analysis so the next replan sees both.
    pub async fn reflect_on_failure(
        &self,
        ledger: &mut TaskLedger,
        additional_context: &str,
    ) -> Result<(), EngineError> {
        let prompt = prompts::build_reflection_prompt(ledger, additional_context);

        let reply = self.gateway.run(&prompt).await?;
        ledger.append_trajectory("planner_reflect_on_failure", reply.record);

        let mut analysis = reply.final_output;
        if !additional_context.is_empty() {
            analysis.push_str("\n\n");
            analysis.push_str(additional_context);
        }
        ledger.set_failure_info(analysis);
        Ok(())
    }
}
