//! Tests for the task ledger: plan numbering, prefix preservation, terminal
//! status writes, and the answer-quality predicate.

use taskforce::ledger::{
    Confidence, ExecutorDescriptor, SubtaskMode, SubtaskStatus, TaskLedger, Uniqueness,
};

fn descriptors() -> Vec<ExecutorDescriptor> {
    vec![
        ExecutorDescriptor::new(
            "Researcher",
            "Finds facts on the web",
            vec!["web_fetch".to_string()],
        ),
        ExecutorDescriptor::new(
            "MathExec",
            "Solves numeric questions",
            vec!["calculator".to_string()],
        ),
    ]
}

fn ledger_with_plan(names: &[&str]) -> TaskLedger {
    let mut ledger = TaskLedger::new("overall task", descriptors());
    ledger.set_plan(names.iter().map(|s| s.to_string()).collect());
    ledger
}

#[test]
fn set_plan_numbers_ids_from_one() {
    let ledger = ledger_with_plan(&["a", "b", "c"]);
    for (i, task) in ledger.plan().iter().enumerate() {
        assert_eq!(task.id, i + 1);
        assert_eq!(task.status, SubtaskStatus::NotStarted);
    }
}

#[test]
fn replace_plan_tail_preserves_finished_prefix() {
    let mut ledger = ledger_with_plan(&["a", "b", "c"]);
    ledger.assign_subtask(1, "Researcher", "do a");
    ledger.set_subtask_result(1, "result a", "detailed a");
    ledger.set_subtask_status(1, SubtaskStatus::Success);

    ledger.replace_plan_tail(1, vec!["b2".to_string(), "c2".to_string(), "d2".to_string()]);

    let plan = ledger.plan();
    assert_eq!(plan.len(), 4);
    // Finished prefix untouched.
    assert_eq!(plan[0].id, 1);
    assert_eq!(plan[0].name, "a");
    assert_eq!(plan[0].status, SubtaskStatus::Success);
    assert_eq!(plan[0].result.as_deref(), Some("result a"));
    // Tail renumbered without gaps.
    assert_eq!(plan[1].id, 2);
    assert_eq!(plan[1].name, "b2");
    assert_eq!(plan[3].id, 4);
    assert_eq!(plan[3].name, "d2");
    for task in &plan[1..] {
        assert_eq!(task.status, SubtaskStatus::NotStarted);
    }
}

#[test]
fn ids_stay_contiguous_after_every_mutation() {
    let mut ledger = ledger_with_plan(&["a", "b", "c", "d"]);
    ledger.replace_plan_tail(2, vec!["x".to_string()]);
    for (i, task) in ledger.plan().iter().enumerate() {
        assert_eq!(task.id, i + 1);
    }
    ledger.replace_plan_tail(3, Vec::new());
    assert_eq!(ledger.plan().len(), 3);
    for (i, task) in ledger.plan().iter().enumerate() {
        assert_eq!(task.id, i + 1);
    }
}

#[test]
fn terminal_status_is_monotonic() {
    let mut ledger = ledger_with_plan(&["a"]);
    ledger.assign_subtask(1, "Researcher", "do a");
    ledger.set_subtask_result(1, "r", "rd");
    ledger.set_subtask_status(1, SubtaskStatus::Failed);

    // A replayed write is a no-op.
    ledger.set_subtask_status(1, SubtaskStatus::Success);
    assert_eq!(ledger.subtask(1).unwrap().status, SubtaskStatus::Failed);

    // So is a late result write.
    ledger.set_subtask_result(1, "other", "other");
    assert_eq!(ledger.subtask(1).unwrap().result.as_deref(), Some("r"));
}

#[test]
fn direct_answer_short_circuit_sets_result_and_status() {
    let mut ledger = ledger_with_plan(&["trivial"]);
    ledger.resolve_direct(1, "MathExec", "42");

    let task = ledger.subtask(1).unwrap();
    assert_eq!(task.status, SubtaskStatus::Success);
    assert_eq!(task.mode, Some(SubtaskMode::DirectAnswer));
    assert_eq!(task.direct_answer.as_deref(), Some("42"));
    assert_eq!(task.result.as_deref(), Some("42"));
    assert_eq!(task.result_detailed.as_deref(), Some("42"));
}

#[test]
fn next_not_started_walks_in_id_order() {
    let mut ledger = ledger_with_plan(&["a", "b"]);
    assert_eq!(ledger.next_not_started(), Some(1));
    ledger.resolve_direct(1, "MathExec", "done");
    assert_eq!(ledger.next_not_started(), Some(2));
    ledger.resolve_direct(2, "MathExec", "done");
    assert_eq!(ledger.next_not_started(), None);
}

#[test]
fn has_failed_subtask_reflects_plan_state() {
    let mut ledger = ledger_with_plan(&["a", "b"]);
    assert!(!ledger.has_failed_subtask());
    ledger.assign_subtask(1, "Researcher", "do a");
    ledger.set_subtask_status(1, SubtaskStatus::Failed);
    assert!(ledger.has_failed_subtask());
}

#[test]
fn quality_check_accepts_medium_unique() {
    let mut ledger = ledger_with_plan(&["a"]);
    ledger.set_tentative_answer("answer", Confidence::Medium, Uniqueness::Unique);
    let (ok, reason) = ledger.check_tentative_answer_quality();
    assert!(ok);
    assert!(reason.is_empty());
}

#[test]
fn quality_check_rejects_low_confidence() {
    let mut ledger = ledger_with_plan(&["a"]);
    ledger.set_tentative_answer("answer", Confidence::Low, Uniqueness::Unique);
    let (ok, reason) = ledger.check_tentative_answer_quality();
    assert!(!ok);
    assert_eq!(reason, "answer confidence too low");
}

#[test]
fn quality_check_rejects_non_unique() {
    let mut ledger = ledger_with_plan(&["a"]);
    ledger.set_tentative_answer("answer", Confidence::High, Uniqueness::NonUnique);
    let (ok, reason) = ledger.check_tentative_answer_quality();
    assert!(!ok);
    assert_eq!(reason, "answer uniqueness insufficient");
}

#[test]
fn quality_check_aggregates_both_reasons() {
    let mut ledger = ledger_with_plan(&["a"]);
    ledger.set_tentative_answer("answer", Confidence::Low, Uniqueness::NonUnique);
    let (ok, reason) = ledger.check_tentative_answer_quality();
    assert!(!ok);
    assert_eq!(
        reason,
        "answer confidence too low and answer uniqueness insufficient"
    );
}

#[test]
fn unclear_uniqueness_alone_is_acceptable() {
    // Unclear fails only in combination with low confidence; the gate rejects
    // non-unique, not unclear.
    let mut ledger = ledger_with_plan(&["a"]);
    ledger.set_tentative_answer("answer", Confidence::High, Uniqueness::Unclear);
    let (ok, _) = ledger.check_tentative_answer_quality();
    assert!(ok);
}

#[test]
fn formatted_with_result_includes_result_only_when_present() {
    let mut ledger = ledger_with_plan(&["find it"]);
    let without = ledger.subtask(1).unwrap().formatted_with_result();
    assert!(without.contains("<task_id:1>find it</task_id:1>"));
    assert!(without.contains("<task_status>not started</task_status>"));
    assert!(!without.contains("<task_result>"));

    ledger.assign_subtask(1, "Researcher", "go find it");
    ledger.set_subtask_result(1, "found", "found in detail");
    let with = ledger.subtask(1).unwrap().formatted_with_result();
    assert!(with.contains("<task_result>found</task_result>"));
}

#[test]
fn executor_info_block_lists_names_and_tools() {
    let ledger = ledger_with_plan(&["a"]);
    let info = ledger.executors_info_block();
    assert!(info.contains("- Researcher: Finds facts on the web"));
    assert!(info.contains("Available tools: web_fetch"));
    assert_eq!(ledger.executor_names_list(), "[\"Researcher\", \"MathExec\"]");
}
