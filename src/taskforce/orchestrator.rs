//! Top-level orchestration state machine.
//!
//! The [`Orchestrator`] drives four cooperating roles — planner, assigner,
//! executors, answerer — around one shared [`TaskLedger`], through a bounded
//! outer reflection loop wrapped around the inner execution loop:
//!
//! ```text
//! PLAN ─▶ DISPATCH ─▶ EXECUTE ─▶ CHECK ─▶ UPDATE ─▶ (DISPATCH | GATE)
//!  ▲                                                      │
//!  └───────────────── REFLECT ◀───────────(gate failed)───┘
//! ```
//!
//! The inner loop walks the plan strictly by subtask id: the assigner picks
//! the discharge mode, the chosen executor runs its tool loop, the planner
//! classifies the result and may revise the remaining tail. When the plan is
//! drained (or cut short by an early-completion decision) the quality gate
//! runs: any failed subtask, a weak confidence/uniqueness grade, or a
//! self-check rejection sends the run back through reflection and a replan,
//! up to `max_reflection` times. The ledger the run returns always carries a
//! `final_output` — the gated answer on success, the most recent tentative
//! answer otherwise.
//!
//! The orchestrator is single-threaded cooperative with respect to the
//! ledger: at any moment at most one role is mutating it, and the only
//! suspension points are LLM calls and tool invocations.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskforce::{EngineConfig, Executor, Orchestrator, ToolRegistry};
//! use taskforce::clients::openai::OpenAIClient;
//! use taskforce::tools::calculator::CalculatorTool;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(OpenAIClient::new(
//!     &std::env::var("OPENAI_API_KEY")?,
//!     "gpt-4.1-mini",
//! ));
//! let config = EngineConfig::default();
//!
//! let mut tools = ToolRegistry::new();
//! tools.register(Arc::new(CalculatorTool::new()));
//!
//! let mut orchestrator = Orchestrator::new(client.clone(), config.clone());
//! orchestrator.add_executor(Executor::new(
//!     "MathExec",
//!     "Solves numeric questions with a calculator",
//!     client,
//!     tools,
//!     &config,
//! ))?;
//!
//! let ledger = orchestrator.run("What is 21*2?", None).await?;
//! println!("{}", ledger.final_output());
//! # Ok(())
//! # }
//! ```

use crate::taskforce::answerer::Answerer;
use crate::taskforce::assigner::Assigner;
use crate::taskforce::client_wrapper::ClientWrapper;
use crate::taskforce::config::EngineConfig;
use crate::taskforce::error::EngineError;
use crate::taskforce::executor::Executor;
use crate::taskforce::ledger::{SubtaskMode, TaskLedger};
use crate::taskforce::planner::Planner;
use crate::taskforce::prompts;
use crate::taskforce::protocol::PlanChoice;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Why the inner execution loop stopped.
enum InnerStop {
    /// Every subtask reached a terminal state.
    PlanDrained,
    /// The planner declared the overall task already answered.
    EarlyCompletion,
    /// The assigner picked an executor that does not exist.
    AssignmentFailed(String),
}

/// The orchestration engine coordinating one run at a time.
pub struct Orchestrator {
    planner: Planner,
    assigner: Assigner,
    answerer: Answerer,
    executors: HashMap<String, Executor>,
    executor_order: Vec<String>,
    config: EngineConfig,
}

impl Orchestrator {
    /// Create an orchestrator whose coordination roles all share `client`.
    pub fn new(client: Arc<dyn ClientWrapper>, config: EngineConfig) -> Self {
        Self {
            planner: Planner::new(Arc::clone(&client), &config),
            assigner: Assigner::new(Arc::clone(&client), &config),
            answerer: Answerer::new(client, &config),
            executors: HashMap::new(),
            executor_order: Vec::new(),
            config,
        }
    }

    /// Route planner (and plan-maintenance) calls to a dedicated client.
    pub fn with_planner_client(mut self, client: Arc<dyn ClientWrapper>) -> Self {
        self.planner = Planner::new(client, &self.config);
        self
    }

    /// Route answer extraction and self-checking to a dedicated client.
    pub fn with_answerer_client(mut self, client: Arc<dyn ClientWrapper>) -> Self {
        self.answerer = Answerer::new(client, &self.config);
        self
    }

    /// Register an executor under its descriptor name.
    ///
    /// Returns an error if the name is already taken; registration order
    /// determines how the roster is presented to the planner and assigner.
    pub fn add_executor(&mut self, executor: Executor) -> Result<(), EngineError> {
        let name = executor.name().to_string();
        if self.executors.contains_key(&name) {
            return Err(EngineError::Configuration(format!(
                "executor '{}' is already registered",
                name
            )));
        }
        self.executor_order.push(name.clone());
        self.executors.insert(name, executor);
        Ok(())
    }

    /// Execute one full run and return its ledger.
    ///
    /// `trace_id` correlates log lines for the run; a fresh UUID is generated
    /// when absent. The returned ledger's `final_output` is non-empty whenever
    /// the answerer produced anything at all.
    pub async fn run(
        &mut self,
        input: &str,
        trace_id: Option<String>,
    ) -> Result<TaskLedger, EngineError> {
        if self.executors.is_empty() {
            return Err(EngineError::NoExecutors);
        }
        let trace_id = trace_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        log::info!("[{}] Starting run: {}", trace_id, input);

        let descriptors = self
            .executor_order
            .iter()
            .filter_map(|name| self.executors.get(name))
            .map(|e| e.descriptor().clone())
            .collect();
        let mut ledger = TaskLedger::new(input, descriptors);
        let known_executors: HashSet<String> = self.executor_order.iter().cloned().collect();

        self.planner.begin_run();
        let mut reflection = 0usize;

        loop {
            log::info!("[{}] Generating plan...", trace_id);
            self.planner.plan_task(&mut ledger).await?;
            log::info!(
                "[{}] Plan ({} subtasks):\n{}",
                trace_id,
                ledger.plan().len(),
                ledger.formatted_plan()
            );

            let stop = self.run_inner_loop(&mut ledger, &known_executors, &trace_id).await?;

            if let InnerStop::AssignmentFailed(agent) = stop {
                // Unknown executor: reflect if budget remains, else fatal.
                if reflection >= self.config.max_reflection {
                    return Err(EngineError::UnknownExecutor(agent));
                }
                reflection += 1;
                let context = format!(
                    "The assignment step selected \"{}\", which is not one of the \
                     available worker agents. The next plan must only rely on the \
                     agents that actually exist.",
                    agent
                );
                self.planner.reflect_on_failure(&mut ledger, &context).await?;
                continue;
            }

            // ---- quality gate ----
            if reflection >= self.config.max_reflection {
                break;
            }
            reflection += 1;
            log::info!(
                "[{}] Gate evaluation, reflection {}/{}",
                trace_id,
                reflection,
                self.config.max_reflection
            );

            if ledger.has_failed_subtask() {
                log::warn!("[{}] Plan contains a failed subtask, reflecting", trace_id);
                self.planner.reflect_on_failure(&mut ledger, "").await?;
                continue;
            }

            self.answerer.extract_final_answer(&mut ledger).await?;
            let (quality_ok, failure_reason) = ledger.check_tentative_answer_quality();
            if !quality_ok {
                log::warn!(
                    "[{}] Tentative answer rejected by quality check: {}",
                    trace_id,
                    failure_reason
                );
                let context = prompts::quality_failure_context(&failure_reason);
                self.planner.reflect_on_failure(&mut ledger, &context).await?;
                continue;
            }

            let (self_check_passed, analysis) = self.answerer.self_check(&mut ledger).await?;
            if !self_check_passed {
                log::warn!("[{}] Tentative answer rejected by self-check", trace_id);
                let context =
                    prompts::self_check_failure_context(ledger.tentative_answer(), &analysis);
                self.planner.reflect_on_failure(&mut ledger, &context).await?;
                continue;
            }

            // Both gate stages passed.
            let answer = ledger.tentative_answer().to_string();
            ledger.set_final_output(answer);
            log::info!("[{}] Run complete, gate passed", trace_id);
            return Ok(ledger);
        }

        // Reflection budget exhausted: fall back to the most recent tentative
        // answer (possibly empty if the answerer never ran).
        if ledger.final_output().is_empty() {
            let answer = ledger.tentative_answer().to_string();
            ledger.set_final_output(answer);
        }
        log::info!("[{}] Run complete, reflection budget exhausted", trace_id);
        Ok(ledger)
    }

    /// The inner plan-execution loop: dispatch, execute, check, update.
    async fn run_inner_loop(
        &mut self,
        ledger: &mut TaskLedger,
        known_executors: &HashSet<String>,
        trace_id: &str,
    ) -> Result<InnerStop, EngineError> {
        while ledger.next_not_started().is_some() {
            let outcome = match self.assigner.assign(ledger, known_executors).await {
                Ok(outcome) => outcome,
                Err(EngineError::UnknownExecutor(agent)) => {
                    return Ok(InnerStop::AssignmentFailed(agent));
                }
                Err(e) => return Err(e),
            };
            log::info!(
                "[{}] Subtask {} assigned to {} ({:?})",
                trace_id,
                outcome.task_id,
                outcome.agent,
                outcome.mode
            );

            if outcome.mode == SubtaskMode::AssignAgent {
                // Membership was validated at assign time; the map lookup is
                // repeated here against the live registry.
                let executor = self
                    .executors
                    .get(&outcome.agent)
                    .ok_or_else(|| EngineError::UnknownExecutor(outcome.agent.clone()))?;
                executor.execute(ledger, outcome.task_id).await?;
                self.planner.plan_check(ledger, outcome.task_id).await?;
                if let Some(task) = ledger.subtask(outcome.task_id) {
                    log::info!(
                        "[{}] Subtask {} checked: {}",
                        trace_id,
                        outcome.task_id,
                        task.status
                    );
                }
            }

            if ledger.next_not_started().is_none() {
                break;
            }
            let choice = self.planner.plan_update(ledger, outcome.task_id).await?;
            log::info!("[{}] Plan update choice: {:?}", trace_id, choice);
            if choice == PlanChoice::EarlyCompletion {
                return Ok(InnerStop::EarlyCompletion);
            }
        }
        Ok(InnerStop::PlanDrained)
    }
}
