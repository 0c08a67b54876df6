//! Prompt templates for the four roles.
//!
//! All templates keep to the tagged-text protocol parsed by
//! [`crate::taskforce::protocol`]: every machine-read field is wrapped in an
//! angle-bracketed tag the model is told to emit verbatim.

use crate::taskforce::ledger::{Subtask, TaskLedger};

pub(crate) const PLANNER_SYSTEM_PROMPT: &str = "\
You are the planning component of a task-solving system. You break an overall \
task into an ordered list of subtasks, each solvable by one of the available \
worker agents, and you revise plans when execution reveals new information. \
Keep plans short and concrete; prefer few decisive subtasks over many vague \
ones.";

pub(crate) fn build_plan_prompt(ledger: &TaskLedger) -> String {
    format!(
        "Overall task:\n{task}\n\n\
         Available worker agents:\n{agents}\n\n\
         Decompose the overall task into an ordered plan of subtasks. Each \
         subtask must be a single imperative sentence that one worker agent \
         can complete on its own. Output one <task>...</task> tag per subtask, \
         in execution order, and nothing else between them.",
        task = ledger.overall_task(),
        agents = ledger.executors_info_block(),
    )
}

pub(crate) fn build_replan_prompt(ledger: &TaskLedger) -> String {
    format!(
        "Overall task:\n{task}\n\n\
         Available worker agents:\n{agents}\n\n\
         A previous attempt at this task failed. Analysis of the failure:\n\
         {failure}\n\n\
         Produce a fresh ordered plan of subtasks that avoids the failure \
         above. Output one <task>...</task> tag per subtask, in execution \
         order. If the failure analysis contains a concrete fact or lesson \
         that later steps should know, also emit it inside a single \
         <helpful_experience_or_fact>...</helpful_experience_or_fact> tag.",
        task = ledger.overall_task(),
        agents = ledger.executors_info_block(),
        failure = ledger.failure_info(),
    )
}

pub(crate) fn build_plan_update_prompt(
    ledger: &TaskLedger,
    previous_plan: &str,
    unfinished_plan: &str,
) -> String {
    format!(
        "Overall task:\n{task}\n\n\
         Subtasks finished so far, with their results:\n{previous}\n\n\
         Remaining subtasks:\n{unfinished}\n\n\
         Decide how to proceed and output exactly one \
         <choice>continue|update|early_completion</choice> tag:\n\
         - continue: the remaining subtasks are still the right next steps.\n\
         - update: the remaining subtasks should be replaced. In this case \
         also output the replacement as \
         <updated_unfinished_task_plan><task>...</task>...</updated_unfinished_task_plan>. \
         Finished subtasks are never revisited.\n\
         - early_completion: the results so far already answer the overall \
         task and no further subtask is needed.",
        task = ledger.overall_task(),
        previous = previous_plan,
        unfinished = unfinished_plan,
    )
}

pub(crate) fn build_plan_check_prompt(ledger: &TaskLedger, task: &Subtask) -> String {
    format!(
        "Overall task:\n{overall}\n\n\
         Current plan:\n{plan}\n\n\
         Subtask {id} just finished executing.\n\
         Subtask name: {name}\n\
         Subtask instructions: {description}\n\
         Subtask result:\n{result}\n\n\
         Judge whether the result accomplishes the subtask. Output exactly one \
         <task_status>success|partial_success|failed</task_status> tag. Use \
         partial_success when the result is usable but incomplete or shaky, \
         and failed when it cannot be built upon.",
        overall = ledger.overall_task(),
        plan = ledger.formatted_plan(),
        id = task.id,
        name = task.name,
        description = task.description.as_deref().unwrap_or("(none)"),
        result = task.result.as_deref().unwrap_or("(no result recorded)"),
    )
}

pub(crate) fn build_reflection_prompt(ledger: &TaskLedger, additional_context: &str) -> String {
    let context_block = if additional_context.is_empty() {
        String::new()
    } else {
        format!("\n\n{}\n\n", additional_context)
    };
    format!(
        "Question:\n{question}\n\n\
         Subtask results from the attempt:\n{results}{context}\n\
         The attempt did not produce an accepted answer. Analyze what went \
         wrong: which subtask or judgment failed, why, and what a next attempt \
         must do differently. Be specific about facts that were established \
         and should be reused. Write the analysis as plain prose.",
        question = ledger.overall_task(),
        results = ledger.formatted_plan_with_results().join("\n\n"),
        context = context_block,
    )
}

/// Reflection context used when the quality gate rejects the tentative answer.
pub(crate) fn quality_failure_context(failure_reason: &str) -> String {
    format!(
        "The extracted answer was rejected by the answer-quality check: {}. \
         The next plan must gather evidence strong enough to support a \
         confident, unambiguous answer.",
        failure_reason
    )
}

/// Reflection context used when the self-check rejects the tentative answer.
pub(crate) fn self_check_failure_context(tentative_answer: &str, analysis: &str) -> String {
    format!(
        "The tentative answer \"{}\" failed a self-consistency check.\n\
         Checker analysis:\n{}",
        tentative_answer, analysis
    )
}

pub(crate) fn build_assign_system_prompt(ledger: &TaskLedger) -> String {
    let experience_block = if ledger.experience_from_failure().is_empty() {
        String::new()
    } else {
        format!(
            "\n<helpful_experience_for_replan>\n{}\n</helpful_experience_for_replan>\n",
            ledger.experience_from_failure()
        )
    };
    format!(
        "You are the assignment component of a task-solving system. You route \
         each subtask to the worker agent best equipped for it, or answer it \
         yourself when no tool work is needed.\n\n\
         Overall task:\n{task}\n\n\
         Plan with results so far:\n{plan}\n\n\
         Available worker agents:\n{agents}\n{experience}",
        task = ledger.overall_task(),
        plan = ledger.formatted_plan_with_results().join("\n"),
        agents = ledger.executors_info_block(),
        experience = experience_block,
    )
}

pub(crate) fn build_assign_user_prompt(ledger: &TaskLedger, next_task_name: &str) -> String {
    format!(
        "Next subtask to dispatch:\n{next}\n\n\
         Valid agent names: {names}\n\n\
         Output:\n\
         <mode>ASSIGN_AGENT|DIRECT_ANSWER</mode>\n\
         <selected_agent>one of the valid agent names</selected_agent>\n\
         and then exactly one of:\n\
         <detailed_task_description>complete, self-contained instructions for \
         the agent, including any facts from earlier results it needs\
         </detailed_task_description>\n\
         <direct_answer>the answer, when the subtask needs no agent or tool \
         work at all</direct_answer>",
        next = next_task_name,
        names = ledger.executor_names_list(),
    )
}

pub(crate) fn build_final_answer_prompt(ledger: &TaskLedger) -> String {
    format!(
        "Question:\n{question}\n\n\
         Subtask results:\n{results}\n\n\
         Extract the final answer to the question from the results above. \
         Output:\n\
         <answer>the final answer, as directly as the question allows</answer>\n\
         <confidence>high|medium|low</confidence>\n\
         <answer_uniqueness>unique|non-unique|unclear</answer_uniqueness>\n\
         Confidence reflects how well the results support the answer. \
         Uniqueness is whether this is the single defensible answer, or one of \
         several the results would equally support.",
        question = ledger.overall_task(),
        results = ledger.formatted_plan_with_results().join("\n\n"),
    )
}

pub(crate) fn build_self_check_prompt(ledger: &TaskLedger) -> String {
    format!(
        "Question:\n{question}\n\n\
         Subtask results:\n{results}\n\n\
         Attempted answer:\n{answer}\n\n\
         Check the attempted answer against the results: does it follow from \
         them, answer the question actually asked, and respect any format the \
         question demands? Explain what you verified, then output exactly one \
         <correct>yes|no</correct> tag.",
        question = ledger.overall_task(),
        results = ledger.formatted_plan_with_results().join("\n\n"),
        answer = ledger.tentative_answer(),
    )
}

/// System prompt for an executor conversation.
pub(crate) fn build_executor_system_prompt(
    name: &str,
    description: &str,
    overall_task: &str,
) -> String {
    format!(
        "You are {name}, a worker agent: {description}. You are completing one \
         subtask of a larger effort. The overall task, for context only, is:\n\
         {overall}\n\n\
         Work the subtask you are given to completion and finish with a \
         self-contained report of what you found or produced.",
        name = name,
        description = description,
        overall = overall_task,
    )
}

/// Tool roster and invocation format appended to the executor's first message.
pub(crate) fn tool_usage_block(tool_descriptions: &str) -> String {
    format!(
        "\n\nYou have access to the following tools:\n{tools}\n\
         To use a tool, respond with a JSON object in the following format:\n\
         {{\"tool_call\": {{\"name\": \"tool_name\", \"parameters\": {{...}}}}}}\n\
         After the tool runs, its result is sent back to you and you can \
         continue. When you have everything you need, reply with your final \
         report and no tool call.",
        tools = tool_descriptions,
    )
}

/// Demand a terminal answer once the tool-step bound is reached.
pub(crate) const FORCE_FINAL_MESSAGE: &str = "\
Tool budget exhausted. Do not call any more tools. Reply now with your best \
final report based on what you have.";
