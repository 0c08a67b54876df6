//! End-to-end orchestration scenarios against a scripted mock client.
//!
//! Every test drives the real state machine with a deterministic sequence of
//! role responses, then asserts on the returned ledger: plan shape, statuses,
//! final output, and the reflection/fallback rules.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use taskforce::ledger::{SubtaskMode, SubtaskStatus};
use taskforce::{
    ClientWrapper, EngineConfig, EngineError, Executor, Message, Orchestrator, Role, ToolRegistry,
};

/// Mock client that returns scripted responses in order. When the script is
/// exhausted the last response repeats.
struct SequentialMockClient {
    responses: Vec<String>,
    call_count: AtomicUsize,
}

impl SequentialMockClient {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: responses.into_iter().map(|s| s.to_string()).collect(),
            call_count: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientWrapper for SequentialMockClient {
    async fn send_message(
        &self,
        _messages: &[Message],
    ) -> Result<Message, Box<dyn std::error::Error + Send + Sync>> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .get(index)
            .or_else(|| self.responses.last())
            .ok_or("missing mock response")?;
        Ok(Message {
            role: Role::Assistant,
            content: Arc::from(response.as_str()),
        })
    }

    fn model_name(&self) -> &str {
        "mock-sequential"
    }
}

fn orchestrator_with_executors(
    client: Arc<SequentialMockClient>,
    config: EngineConfig,
    names: &[&str],
) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(client.clone(), config.clone());
    for name in names {
        orchestrator
            .add_executor(Executor::new(
                *name,
                format!("{} test executor", name),
                client.clone(),
                ToolRegistry::new(),
                &config,
            ))
            .unwrap();
    }
    orchestrator
}

// ─── S1: happy path, single step ──────────────────────────────────────────────

#[tokio::test]
async fn happy_path_single_direct_answer() {
    let client = Arc::new(SequentialMockClient::new(vec![
        // plan
        "<task>compute 21*2</task>",
        // assign: direct answer short-circuit
        "<mode>DIRECT_ANSWER</mode><selected_agent>MathExec</selected_agent>\
         <direct_answer>42</direct_answer>",
        // answer extraction
        "<answer>42</answer><confidence>high</confidence>\
         <answer_uniqueness>unique</answer_uniqueness>",
        // self-check
        "<correct>yes</correct>",
    ]));
    let config = EngineConfig::default();
    let mut orchestrator = orchestrator_with_executors(client.clone(), config, &["MathExec"]);

    let ledger = orchestrator.run("What is 21*2?", None).await.unwrap();

    assert_eq!(ledger.final_output(), "42");
    assert_eq!(ledger.plan().len(), 1);
    let task = ledger.subtask(1).unwrap();
    assert_eq!(task.status, SubtaskStatus::Success);
    assert_eq!(task.mode, Some(SubtaskMode::DirectAnswer));
    assert_eq!(task.result.as_deref(), Some("42"));
    // Exactly plan + assign + extract + self-check; no executor, no update,
    // no reflection.
    assert_eq!(client.calls(), 4);
    let planner_calls = ledger
        .trajectory()
        .iter()
        .filter(|e| e.actor == "planner")
        .count();
    assert_eq!(planner_calls, 1);
}

// ─── S2: plan update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn plan_update_replaces_tail_and_preserves_prefix() {
    let client = Arc::new(SequentialMockClient::new(vec![
        // plan: two tasks
        "<task>A</task><task>B</task>",
        // assign A to Exec1
        "<mode>ASSIGN_AGENT</mode><selected_agent>Exec1</selected_agent>\
         <detailed_task_description>do A carefully</detailed_task_description>",
        // executor terminal response (no tool call)
        "r1",
        // plan check for A
        "<task_status>success</task_status>",
        // plan update: replace tail
        "<choice>update</choice><updated_unfinished_task_plan>\
         <task>B'</task><task>C</task></updated_unfinished_task_plan>",
        // assign B' directly
        "<mode>DIRECT_ANSWER</mode><selected_agent>Exec1</selected_agent>\
         <direct_answer>b done</direct_answer>",
        // plan update after B': stop early
        "<choice>early_completion</choice>",
        // answer extraction
        "<answer>done</answer><confidence>high</confidence>\
         <answer_uniqueness>unique</answer_uniqueness>",
        // self-check
        "<correct>yes</correct>",
    ]));
    let config = EngineConfig::default();
    let mut orchestrator = orchestrator_with_executors(client.clone(), config, &["Exec1"]);

    let ledger = orchestrator.run("multi step task", None).await.unwrap();

    let plan = ledger.plan();
    assert_eq!(plan.len(), 3);
    assert_eq!(plan[0].name, "A");
    assert_eq!(plan[0].id, 1);
    assert_eq!(plan[0].status, SubtaskStatus::Success);
    assert_eq!(plan[0].result.as_deref(), Some("r1"));
    assert_eq!(plan[1].name, "B'");
    assert_eq!(plan[1].id, 2);
    assert_eq!(plan[1].status, SubtaskStatus::Success);
    assert_eq!(plan[2].name, "C");
    assert_eq!(plan[2].id, 3);
    // Early completion left C unstarted; the gate still ran on partial results.
    assert_eq!(plan[2].status, SubtaskStatus::NotStarted);
    assert_eq!(ledger.final_output(), "done");
}

// ─── S4: failed-task reflection ───────────────────────────────────────────────

#[tokio::test]
async fn failed_subtask_triggers_reflection_and_replan() {
    let client = Arc::new(SequentialMockClient::new(vec![
        // plan #1
        "<task>T1</task>",
        // assign T1
        "<mode>ASSIGN_AGENT</mode><selected_agent>Exec1</selected_agent>\
         <detailed_task_description>do T1</detailed_task_description>",
        // executor result
        "could not find anything",
        // plan check: failed
        "<task_status>failed</task_status>",
        // reflection
        "the search strategy was wrong",
        // plan #2 (replan), with a distilled lesson
        "<task>T1 with a better source</task>\
         <helpful_experience_or_fact>use the archive</helpful_experience_or_fact>",
        // assign: direct answer
        "<mode>DIRECT_ANSWER</mode><selected_agent>Exec1</selected_agent>\
         <direct_answer>done</direct_answer>",
    ]));
    let config = EngineConfig::default().with_max_reflection(1);
    let mut orchestrator = orchestrator_with_executors(client.clone(), config, &["Exec1"]);

    let ledger = orchestrator.run("hard task", None).await.unwrap();

    // Reflection stored the analysis and the replan extracted the lesson.
    assert!(ledger.failure_info().contains("the search strategy was wrong"));
    assert_eq!(ledger.experience_from_failure(), "use the archive");
    // plan_task ran twice: bounded by max_reflection + 1.
    let planner_plans = ledger
        .trajectory()
        .iter()
        .filter(|e| e.actor == "planner")
        .count();
    assert!(planner_plans >= 2);
    // The answerer never ran, so the fallback final output is empty.
    assert_eq!(ledger.final_output(), "");
    assert_eq!(client.calls(), 7);
}

// ─── S5: self-check rejection ─────────────────────────────────────────────────

#[tokio::test]
async fn self_check_rejection_reflects_with_analysis() {
    let client = Arc::new(SequentialMockClient::new(vec![
        // plan #1
        "<task>find X</task>",
        // assign: direct answer
        "<mode>DIRECT_ANSWER</mode><selected_agent>Exec1</selected_agent>\
         <direct_answer>X-result</direct_answer>",
        // answer extraction: passes the quality gate
        "<answer>X</answer><confidence>medium</confidence>\
         <answer_uniqueness>unique</answer_uniqueness>",
        // self-check: rejection with analysis
        "missing citation<correct>no</correct>",
        // reflection
        "need to cite the source",
        // plan #2
        "<task>find X with citation</task>",
        // assign: direct answer again
        "<mode>DIRECT_ANSWER</mode><selected_agent>Exec1</selected_agent>\
         <direct_answer>X2</direct_answer>",
    ]));
    let config = EngineConfig::default().with_max_reflection(1);
    let mut orchestrator = orchestrator_with_executors(client.clone(), config, &["Exec1"]);

    let ledger = orchestrator.run("cite X", None).await.unwrap();

    // The self-check analysis reached the reflection context.
    assert!(ledger.failure_info().contains("missing citation"));
    // Budget exhausted on the second pass; the most recent tentative answer
    // becomes the final output.
    assert_eq!(ledger.final_output(), "X");
}

// ─── quality-gate rejection ───────────────────────────────────────────────────

#[tokio::test]
async fn low_confidence_answer_triggers_reflection() {
    let client = Arc::new(SequentialMockClient::new(vec![
        // plan #1
        "<task>guess</task>",
        // assign
        "<mode>DIRECT_ANSWER</mode><selected_agent>Exec1</selected_agent>\
         <direct_answer>maybe</direct_answer>",
        // extraction: low confidence fails the gate before any self-check
        "<answer>maybe</answer><confidence>low</confidence>\
         <answer_uniqueness>unclear</answer_uniqueness>",
        // reflection
        "evidence was too thin",
        // plan #2
        "<task>verify properly</task>",
        // assign
        "<mode>DIRECT_ANSWER</mode><selected_agent>Exec1</selected_agent>\
         <direct_answer>verified</direct_answer>",
    ]));
    let config = EngineConfig::default().with_max_reflection(1);
    let mut orchestrator = orchestrator_with_executors(client.clone(), config, &["Exec1"]);

    let ledger = orchestrator.run("uncertain task", None).await.unwrap();

    assert!(ledger.failure_info().contains("answer confidence too low"));
    // Fallback finalization: most recent tentative answer.
    assert_eq!(ledger.final_output(), "maybe");
    assert_eq!(client.calls(), 6);
}

// ─── assignment to an unknown executor ────────────────────────────────────────

#[tokio::test]
async fn unknown_executor_reflects_then_fails_when_budget_exhausted() {
    let client = Arc::new(SequentialMockClient::new(vec![
        // plan #1
        "<task>T</task>",
        // assign to a nonexistent executor
        "<mode>ASSIGN_AGENT</mode><selected_agent>Ghost</selected_agent>\
         <detailed_task_description>do T</detailed_task_description>",
        // reflection after the assignment failure
        "the plan relied on an agent that does not exist",
        // plan #2
        "<task>T again</task>",
        // assign to the same nonexistent executor: now fatal
        "<mode>ASSIGN_AGENT</mode><selected_agent>Ghost</selected_agent>\
         <detailed_task_description>do T</detailed_task_description>",
    ]));
    let config = EngineConfig::default().with_max_reflection(1);
    let mut orchestrator = orchestrator_with_executors(client.clone(), config, &["Exec1"]);

    let result = orchestrator.run("task", None).await;
    match result {
        Err(EngineError::UnknownExecutor(name)) => assert_eq!(name, "Ghost"),
        other => panic!("expected UnknownExecutor, got {:?}", other.map(|_| ())),
    }
}

// ─── configuration errors ─────────────────────────────────────────────────────

#[tokio::test]
async fn run_without_executors_is_an_error() {
    let client = Arc::new(SequentialMockClient::new(vec!["<task>x</task>"]));
    let mut orchestrator = Orchestrator::new(client, EngineConfig::default());
    assert!(matches!(
        orchestrator.run("task", None).await,
        Err(EngineError::NoExecutors)
    ));
}

#[tokio::test]
async fn duplicate_executor_registration_is_an_error() {
    let client = Arc::new(SequentialMockClient::new(vec!["x"]));
    let config = EngineConfig::default();
    let mut orchestrator = Orchestrator::new(client.clone(), config.clone());
    orchestrator
        .add_executor(Executor::new(
            "Exec1",
            "first",
            client.clone(),
            ToolRegistry::new(),
            &config,
        ))
        .unwrap();
    let duplicate = Executor::new("Exec1", "second", client, ToolRegistry::new(), &config);
    assert!(matches!(
        orchestrator.add_executor(duplicate),
        Err(EngineError::Configuration(_))
    ));
}

// ─── trajectory bookkeeping ───────────────────────────────────────────────────

#[tokio::test]
async fn trajectory_records_every_role_interaction() {
    let client = Arc::new(SequentialMockClient::new(vec![
        "<task>compute</task>",
        "<mode>ASSIGN_AGENT</mode><selected_agent>Exec1</selected_agent>\
         <detailed_task_description>compute it</detailed_task_description>",
        "the result is 7",
        "<task_status>success</task_status>",
        "<answer>7</answer><confidence>high</confidence>\
         <answer_uniqueness>unique</answer_uniqueness>",
        "<correct>yes</correct>",
    ]));
    let config = EngineConfig::default();
    let mut orchestrator = orchestrator_with_executors(client.clone(), config, &["Exec1"]);

    let ledger = orchestrator.run("compute", None).await.unwrap();

    let actors: Vec<&str> = ledger
        .trajectory()
        .iter()
        .map(|e| e.actor.as_str())
        .collect();
    assert_eq!(
        actors,
        vec![
            "planner",
            "assigner",
            "executor:Exec1",
            "planner",
            "answerer_extract_final_answer",
            "answerer_self_check",
        ]
    );
    assert_eq!(ledger.final_output(), "7");
}
