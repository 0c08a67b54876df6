//! The shared task ledger.
//!
//! A [`TaskLedger`] is the single mutable record of one orchestration run: the
//! overall task, the current plan, per-subtask execution state, the append-only
//! trajectory of raw LLM interactions, failure analysis carried between
//! reflection passes, and the tentative/final answers.
//!
//! The ledger is owned exclusively by the [`Orchestrator`](crate::Orchestrator)
//! for the duration of a run and handed to the role components by mutable
//! reference. Roles mutate it only through the narrow operations defined here
//! (`set_plan`, `replace_plan_tail`, `set_subtask_result`, ...), which keep the
//! structural invariants checkable in one place:
//!
//! - plan ids are always `1..=N` without gaps;
//! - a plan-tail replacement preserves the finished prefix verbatim;
//! - a subtask that reached a terminal status is never modified again.
//!
//! # Example
//!
//! ```
//! use taskforce::ledger::{ExecutorDescriptor, TaskLedger};
//!
//! let mut ledger = TaskLedger::new(
//!     "What is the tallest mountain on Mars?",
//!     vec![ExecutorDescriptor::new(
//!         "Researcher",
//!         "Looks facts up on the web",
//!         vec!["web_fetch".into()],
//!     )],
//! );
//!
//! ledger.set_plan(vec!["find the mountain".into(), "report its height".into()]);
//! assert_eq!(ledger.plan().len(), 2);
//! assert_eq!(ledger.next_not_started(), Some(1));
//! ```

use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle states of a [`Subtask`].
///
/// `Success`, `PartialSuccess`, and `Failed` are terminal: once one of them is
/// written, the ledger refuses further status changes for that subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskStatus {
    NotStarted,
    InProgress,
    Success,
    PartialSuccess,
    Failed,
}

impl SubtaskStatus {
    /// Whether this status ends the subtask's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubtaskStatus::Success | SubtaskStatus::PartialSuccess | SubtaskStatus::Failed
        )
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubtaskStatus::NotStarted => "not started",
            SubtaskStatus::InProgress => "in progress",
            SubtaskStatus::Success => "success",
            SubtaskStatus::PartialSuccess => "partial success",
            SubtaskStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// How a subtask is discharged: dispatched to an executor, or answered
/// directly by the assigner without any tool work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskMode {
    AssignAgent,
    DirectAnswer,
}

/// Confidence grade attached to a tentative answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        write!(f, "{}", s)
    }
}

/// Whether the extracted answer is the single defensible answer to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    Unique,
    NonUnique,
    Unclear,
}

impl fmt::Display for Uniqueness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Uniqueness::Unique => "unique",
            Uniqueness::NonUnique => "non-unique",
            Uniqueness::Unclear => "unclear",
        };
        write!(f, "{}", s)
    }
}

/// One planned unit of work.
#[derive(Debug, Clone)]
pub struct Subtask {
    /// 1-based position in the plan. Stable for the finished prefix across
    /// plan-tail replacements.
    pub id: usize,
    /// Short imperative description produced by the planner.
    pub name: String,
    /// Detailed instructions attached by the assigner (assign-agent mode only).
    pub description: Option<String>,
    /// Current lifecycle state.
    pub status: SubtaskStatus,
    /// Discharge mode chosen by the assigner.
    pub mode: Option<SubtaskMode>,
    /// Executor name, or the synthetic marker for direct answers.
    pub assigned_agent: Option<String>,
    /// Populated only in direct-answer mode.
    pub direct_answer: Option<String>,
    /// Concise final result text.
    pub result: Option<String>,
    /// Full result payload (e.g. the executor's step transcript).
    pub result_detailed: Option<String>,
}

impl Subtask {
    fn new(id: usize, name: String) -> Self {
        Self {
            id,
            name,
            description: None,
            status: SubtaskStatus::NotStarted,
            mode: None,
            assigned_agent: None,
            direct_answer: None,
            result: None,
            result_detailed: None,
        }
    }

    /// Render this subtask as the tagged block fed into role prompts.
    ///
    /// The result line is present only once a result has been recorded.
    pub fn formatted_with_result(&self) -> String {
        let mut lines = vec![
            format!("<task_id:{}>{}</task_id:{}>", self.id, self.name, self.id),
            format!("<task_status>{}</task_status>", self.status),
        ];
        if let Some(result) = &self.result {
            lines.push(format!("<task_result>{}</task_result>", result));
        }
        lines.join("\n")
    }
}

/// Static description of one executor: its name, what it is good at, and the
/// tools it carries. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct ExecutorDescriptor {
    pub name: String,
    pub description: String,
    pub toolnames: Vec<String>,
}

impl ExecutorDescriptor {
    /// Create a descriptor from the executor's identity and tool list.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        toolnames: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            toolnames,
        }
    }
}

/// Raw record of a single LLM round-trip.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Model identifier reported by the client.
    pub model: String,
    /// System prompt in effect for the call, if any.
    pub instructions: Option<String>,
    /// The user prompt sent.
    pub prompt: String,
    /// The raw model response text.
    pub response: String,
    /// UTC timestamp recorded when the call completed.
    pub timestamp: DateTime<Utc>,
}

/// One entry of the append-only trajectory: which actor produced which raw
/// LLM interaction. Never consulted for control flow; kept for post-hoc
/// inspection.
#[derive(Debug, Clone)]
pub struct TrajectoryEntry {
    pub actor: String,
    pub record: RunRecord,
}

/// Shared mutable record of one orchestration run.
pub struct TaskLedger {
    overall_task: String,
    executor_descriptors: Vec<ExecutorDescriptor>,
    plan: Vec<Subtask>,
    trajectory: Vec<TrajectoryEntry>,
    failure_info: String,
    experience_from_failure: String,
    tentative_answer: String,
    tentative_confidence: Option<Confidence>,
    tentative_uniqueness: Option<Uniqueness>,
    final_output: String,
}

impl TaskLedger {
    /// Create a fresh ledger for one run.
    pub fn new(overall_task: impl Into<String>, descriptors: Vec<ExecutorDescriptor>) -> Self {
        Self {
            overall_task: overall_task.into(),
            executor_descriptors: descriptors,
            plan: Vec::new(),
            trajectory: Vec::new(),
            failure_info: String::new(),
            experience_from_failure: String::new(),
            tentative_answer: String::new(),
            tentative_confidence: None,
            tentative_uniqueness: None,
            final_output: String::new(),
        }
    }

    // ---- read accessors ----

    /// The user-supplied natural-language request seeding this run.
    pub fn overall_task(&self) -> &str {
        &self.overall_task
    }

    /// The current plan, ordered by subtask id.
    pub fn plan(&self) -> &[Subtask] {
        &self.plan
    }

    /// Borrow a subtask by its 1-based id.
    pub fn subtask(&self, id: usize) -> Option<&Subtask> {
        self.plan.get(id.checked_sub(1)?)
    }

    /// The id of the first subtask still in `NotStarted`, if any.
    ///
    /// Subtask execution is strictly sequential: the orchestrator always picks
    /// the lowest-id unstarted subtask next.
    pub fn next_not_started(&self) -> Option<usize> {
        self.plan
            .iter()
            .find(|t| t.status == SubtaskStatus::NotStarted)
            .map(|t| t.id)
    }

    /// Whether any subtask ended in `Failed`.
    pub fn has_failed_subtask(&self) -> bool {
        self.plan.iter().any(|t| t.status == SubtaskStatus::Failed)
    }

    /// Executor descriptors registered for this run.
    pub fn executor_descriptors(&self) -> &[ExecutorDescriptor] {
        &self.executor_descriptors
    }

    /// Render the executor roster for role prompts:
    /// `- name: description` with an indented tool list per entry.
    pub fn executors_info_block(&self) -> String {
        self.executor_descriptors
            .iter()
            .map(|d| {
                format!(
                    "- {}: {}\n  Available tools: {}",
                    d.name,
                    d.description,
                    d.toolnames.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the executor names as a bracketed list, e.g. `["A", "B"]`.
    pub fn executor_names_list(&self) -> String {
        let names: Vec<String> = self
            .executor_descriptors
            .iter()
            .map(|d| format!("\"{}\"", d.name))
            .collect();
        format!("[{}]", names.join(", "))
    }

    /// Compact plan rendering: one `"{id}. {name} - Status: {status}"` line
    /// per subtask.
    pub fn formatted_plan(&self) -> String {
        self.plan
            .iter()
            .map(|t| format!("{}. {} - Status: {}", t.id, t.name, t.status))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Per-subtask tagged result blocks, in plan order.
    pub fn formatted_plan_with_results(&self) -> Vec<String> {
        self.plan.iter().map(|t| t.formatted_with_result()).collect()
    }

    /// Append-only record of raw LLM interactions.
    pub fn trajectory(&self) -> &[TrajectoryEntry] {
        &self.trajectory
    }

    /// Failure analysis from the most recent reflection, empty before any.
    pub fn failure_info(&self) -> &str {
        &self.failure_info
    }

    /// Distilled lesson extracted during a replan, empty before any.
    pub fn experience_from_failure(&self) -> &str {
        &self.experience_from_failure
    }

    /// Candidate final answer produced by the answerer before gating.
    pub fn tentative_answer(&self) -> &str {
        &self.tentative_answer
    }

    /// Confidence grade of the tentative answer, if one was extracted.
    pub fn tentative_confidence(&self) -> Option<Confidence> {
        self.tentative_confidence
    }

    /// Uniqueness grade of the tentative answer, if one was extracted.
    pub fn tentative_uniqueness(&self) -> Option<Uniqueness> {
        self.tentative_uniqueness
    }

    /// The accepted final answer, empty until a gate passes or the run
    /// finalizes with its fallback.
    pub fn final_output(&self) -> &str {
        &self.final_output
    }

    /// Evaluate the first stage of the quality gate.
    ///
    /// The tentative answer is acceptable iff confidence is high or medium AND
    /// uniqueness is not `non-unique`. On rejection the returned string names
    /// every reason, joined with `" and "`.
    pub fn check_tentative_answer_quality(&self) -> (bool, String) {
        let confidence_ok = matches!(
            self.tentative_confidence,
            Some(Confidence::High) | Some(Confidence::Medium)
        );
        let uniqueness_ok = !matches!(self.tentative_uniqueness, Some(Uniqueness::NonUnique));
        let acceptable = confidence_ok && uniqueness_ok;

        let mut reasons = Vec::new();
        if !acceptable {
            if !confidence_ok {
                reasons.push("answer confidence too low");
            }
            if matches!(
                self.tentative_uniqueness,
                Some(Uniqueness::Unclear) | Some(Uniqueness::NonUnique) | None
            ) {
                reasons.push("answer uniqueness insufficient");
            }
        }
        (acceptable, reasons.join(" and "))
    }

    // ---- narrow mutation operations ----

    /// Append one raw LLM interaction to the trajectory.
    pub fn append_trajectory(&mut self, actor: impl Into<String>, record: RunRecord) {
        self.trajectory.push(TrajectoryEntry {
            actor: actor.into(),
            record,
        });
    }

    /// Replace the whole plan with freshly numbered subtasks, ids `1..=N`,
    /// all `NotStarted`.
    pub fn set_plan(&mut self, names: Vec<String>) {
        self.plan = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Subtask::new(i + 1, name))
            .collect();
    }

    /// Replace every subtask after `cursor_id` with freshly numbered ones.
    ///
    /// Subtasks `1..=cursor_id` (the finished prefix) are preserved verbatim;
    /// the new tail is numbered starting at `cursor_id + 1`.
    pub fn replace_plan_tail(&mut self, cursor_id: usize, names: Vec<String>) {
        self.plan.truncate(cursor_id);
        for (i, name) in names.into_iter().enumerate() {
            self.plan.push(Subtask::new(cursor_id + i + 1, name));
        }
    }

    /// Record an assign-agent decision: the subtask leaves `NotStarted`,
    /// carries the detailed description, and is marked in progress.
    pub fn assign_subtask(
        &mut self,
        id: usize,
        agent: impl Into<String>,
        description: impl Into<String>,
    ) {
        if let Some(task) = self.subtask_mut_nonterminal(id) {
            task.mode = Some(SubtaskMode::AssignAgent);
            task.assigned_agent = Some(agent.into());
            task.description = Some(description.into());
            task.status = SubtaskStatus::InProgress;
        }
    }

    /// Record a direct-answer decision: the subtask short-circuits straight to
    /// `Success` with `result == result_detailed == answer`, and no executor
    /// is ever invoked for it.
    pub fn resolve_direct(&mut self, id: usize, agent: impl Into<String>, answer: impl Into<String>) {
        if let Some(task) = self.subtask_mut_nonterminal(id) {
            let answer = answer.into();
            task.mode = Some(SubtaskMode::DirectAnswer);
            task.assigned_agent = Some(agent.into());
            task.direct_answer = Some(answer.clone());
            task.result = Some(answer.clone());
            task.result_detailed = Some(answer);
            task.status = SubtaskStatus::Success;
        }
    }

    /// Record an executor's result payload. The status stays `InProgress`
    /// until the planner classifies it.
    pub fn set_subtask_result(
        &mut self,
        id: usize,
        result: impl Into<String>,
        result_detailed: impl Into<String>,
    ) {
        if let Some(task) = self.subtask_mut_nonterminal(id) {
            task.result = Some(result.into());
            task.result_detailed = Some(result_detailed.into());
        }
    }

    /// Write a subtask's status. Writes onto a terminal status are no-ops so
    /// that trivial replays cannot rewrite history.
    pub fn set_subtask_status(&mut self, id: usize, status: SubtaskStatus) {
        match self.subtask_mut_nonterminal(id) {
            Some(task) => task.status = status,
            None => log::warn!("Ignoring status write to finished subtask {}", id),
        }
    }

    /// Overwrite the stored failure analysis.
    pub fn set_failure_info(&mut self, info: impl Into<String>) {
        self.failure_info = info.into();
    }

    /// Store a distilled lesson for subsequent assigner prompts.
    pub fn set_experience_from_failure(&mut self, experience: impl Into<String>) {
        self.experience_from_failure = experience.into();
    }

    /// Record the answerer's extraction.
    pub fn set_tentative_answer(
        &mut self,
        answer: impl Into<String>,
        confidence: Confidence,
        uniqueness: Uniqueness,
    ) {
        self.tentative_answer = answer.into();
        self.tentative_confidence = Some(confidence);
        self.tentative_uniqueness = Some(uniqueness);
    }

    /// Set the accepted final answer.
    pub fn set_final_output(&mut self, output: impl Into<String>) {
        self.final_output = output.into();
    }

    fn subtask_mut_nonterminal(&mut self, id: usize) -> Option<&mut Subtask> {
        let index = id.checked_sub(1)?;
        let task = self.plan.get_mut(index)?;
        if task.status.is_terminal() {
            None
        } else {
            Some(task)
        }
    }
}
