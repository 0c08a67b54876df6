//! Tagged-text protocol shared by all roles.
//!
//! Role models reply in plain text with angle-bracketed sections
//! (`<task>…</task>`, `<choice>…</choice>`, ...). This module holds the small
//! hand-rolled scanner that extracts those sections plus one parse function
//! per role output. The scanner tolerates surrounding prose, unknown sibling
//! tags, and arbitrary whitespace; parsing is total except for the few
//! malformed shapes that have no safe default, which surface as
//! [`EngineError::ProtocolParse`].
//!
//! Parsing defaults (all case-insensitive, values trimmed):
//!
//! | output | missing tag | unrecognized value |
//! |---|---|---|
//! | task status | partial success | partial success (contains "partial" coerces too) |
//! | plan-update choice | continue | error |
//! | confidence | low | low |
//! | uniqueness | unclear | unclear |
//! | self-check verdict | no | no |

use crate::taskforce::error::EngineError;
use crate::taskforce::ledger::{Confidence, SubtaskMode, SubtaskStatus, Uniqueness};

/// Extract the first `<tag>…</tag>` region, untrimmed.
///
/// Returns `None` when either delimiter is absent. Nested occurrences of the
/// same tag are not supported (none of the role outputs use them).
pub fn extract_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = text.find(&open)? + open.len();
    let end = start + text[start..].find(&close)?;
    Some(&text[start..end])
}

/// Extract every `<tag>…</tag>` region in document order, trimmed, with empty
/// regions dropped.
pub fn extract_all_tags(text: &str, tag: &str) -> Vec<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let body_start = start + open.len();
        match rest[body_start..].find(&close) {
            Some(offset) => {
                let body = rest[body_start..body_start + offset].trim();
                if !body.is_empty() {
                    out.push(body.to_string());
                }
                rest = &rest[body_start + offset + close.len()..];
            }
            None => break,
        }
    }
    out
}

/// Plan-update decision emitted by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanChoice {
    Continue,
    Update,
    EarlyCompletion,
}

/// Parsed assigner output.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub mode: SubtaskMode,
    pub agent: String,
    /// Present in assign-agent mode.
    pub description: Option<String>,
    /// Present in direct-answer mode.
    pub direct_answer: Option<String>,
}

/// Parse the ordered subtask names from a plan (or replan) response.
pub fn parse_plan_tasks(response: &str) -> Vec<String> {
    extract_all_tags(response, "task")
}

/// Parse the optional distilled lesson emitted during a replan.
pub fn parse_experience(response: &str) -> Option<String> {
    extract_tag(response, "helpful_experience_or_fact")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a plan-update response into a choice and, for `update`, the
/// replacement tail.
///
/// A missing `<choice>` tag defaults to `continue`; an unrecognized choice
/// value is a protocol error. The replacement tail accepts both `<task>` and
/// numbered `<task_id:N>` items; an `update` choice with no parseable items
/// yields `(Update, None)` and is coerced to `continue` by the planner.
pub fn parse_plan_update(
    response: &str,
) -> Result<(PlanChoice, Option<Vec<String>>), EngineError> {
    let choice = match extract_tag(response, "choice") {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "continue" => PlanChoice::Continue,
            "update" => PlanChoice::Update,
            "early_completion" => PlanChoice::EarlyCompletion,
            other => {
                return Err(EngineError::ProtocolParse(format!(
                    "unexpected plan-update choice: {}",
                    other
                )))
            }
        },
        None => {
            log::warn!("No <choice> tag in plan-update response, defaulting to continue");
            PlanChoice::Continue
        }
    };

    let updated_tasks = if choice == PlanChoice::Update {
        match extract_tag(response, "updated_unfinished_task_plan") {
            Some(block) => {
                let tasks = scan_task_items(block);
                if tasks.is_empty() {
                    log::warn!("Updated plan block contained no tasks");
                    None
                } else {
                    Some(tasks)
                }
            }
            None => {
                log::warn!("Update chosen but no <updated_unfinished_task_plan> block found");
                None
            }
        }
    } else {
        None
    };

    Ok((choice, updated_tasks))
}

/// Scan a replacement-plan block for task items.
///
/// Accepts both plain `<task>` tags and numbered `<task_id:3>` tags, since
/// models frequently echo the numbered form they were shown in prompts.
fn scan_task_items(block: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = block;
    while let Some(start) = rest.find("<task") {
        // The opening tag must be exactly <task> or <task_id:...>.
        let after = &rest[start + "<task".len()..];
        let tag_ok = after.starts_with('>') || after.starts_with("_id:");
        let Some(open_end) = after.find('>') else { break };
        let body_start = start + "<task".len() + open_end + 1;
        if !tag_ok {
            rest = &rest[body_start..];
            continue;
        }
        match rest[body_start..].find("</task") {
            Some(offset) => {
                let body = rest[body_start..body_start + offset].trim();
                if !body.is_empty() {
                    out.push(body.to_string());
                }
                // Skip past the closing tag's '>'.
                let close_at = body_start + offset;
                let advance = rest[close_at..]
                    .find('>')
                    .map(|i| close_at + i + 1)
                    .unwrap_or(rest.len());
                rest = &rest[advance..];
            }
            None => break,
        }
    }
    out
}

/// Parse a plan-check response into a terminal subtask status.
///
/// Any value containing "partial" is coerced to partial success; unrecognized
/// or missing values default to partial success as well.
pub fn parse_task_status(response: &str) -> SubtaskStatus {
    match extract_tag(response, "task_status") {
        Some(raw) => {
            let status = raw.trim().to_lowercase();
            if status.contains("partial") {
                SubtaskStatus::PartialSuccess
            } else if status == "success" {
                SubtaskStatus::Success
            } else if status == "failed" {
                SubtaskStatus::Failed
            } else {
                log::warn!(
                    "Unexpected task status value: {}, defaulting to partial success",
                    status
                );
                SubtaskStatus::PartialSuccess
            }
        }
        None => {
            log::warn!("No <task_status> tag in plan-check response, defaulting to partial success");
            SubtaskStatus::PartialSuccess
        }
    }
}

/// Parse an assigner response.
///
/// The mode and selected agent are mandatory, as is the payload matching the
/// mode (a direct answer, or a detailed task description). Anything else is a
/// protocol error: there is no safe way to dispatch a half-specified
/// assignment.
pub fn parse_assignment(response: &str) -> Result<Assignment, EngineError> {
    let mode_raw = extract_tag(response, "mode")
        .map(str::trim)
        .ok_or_else(|| EngineError::ProtocolParse("assignment is missing <mode>".into()))?;
    let agent = extract_tag(response, "selected_agent")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            EngineError::ProtocolParse("assignment is missing <selected_agent>".into())
        })?;

    if mode_raw == "DIRECT_ANSWER" {
        let direct_answer = extract_tag(response, "direct_answer")
            .map(str::trim)
            .ok_or_else(|| {
                EngineError::ProtocolParse(
                    "direct-answer assignment is missing <direct_answer>".into(),
                )
            })?;
        Ok(Assignment {
            mode: SubtaskMode::DirectAnswer,
            agent: agent.to_string(),
            description: None,
            direct_answer: Some(direct_answer.to_string()),
        })
    } else {
        let description = extract_tag(response, "detailed_task_description")
            .map(str::trim)
            .ok_or_else(|| {
                EngineError::ProtocolParse(
                    "agent assignment is missing <detailed_task_description>".into(),
                )
            })?;
        Ok(Assignment {
            mode: SubtaskMode::AssignAgent,
            agent: agent.to_string(),
            description: Some(description.to_string()),
            direct_answer: None,
        })
    }
}

/// `true` when `text` mentions `word` as a standalone token, tolerating
/// sentence framing and adjacent whitespace.
fn mentions(text: &str, word: &str) -> bool {
    text == word
        || text.starts_with(&format!("{} ", word))
        || text.ends_with(&format!(" {}", word))
        || text.contains(&format!(" {} ", word))
}

/// Parse the answerer's extraction response into `(answer, confidence,
/// uniqueness)`.
///
/// A missing `<answer>` tag falls back to the full response text. Note that
/// `non-unique` is tested before `unique`: the latter is a suffix of the
/// former, so the order matters.
pub fn parse_final_answer(response: &str) -> (String, Confidence, Uniqueness) {
    let answer = extract_tag(response, "answer")
        .map(str::trim)
        .unwrap_or_else(|| response.trim())
        .to_string();

    let confidence_text = extract_tag(response, "confidence")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();
    let confidence = if mentions(&confidence_text, "high") {
        Confidence::High
    } else if mentions(&confidence_text, "medium") {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    let uniqueness_text = extract_tag(response, "answer_uniqueness")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();
    let uniqueness = if mentions(&uniqueness_text, "non-unique") {
        Uniqueness::NonUnique
    } else if mentions(&uniqueness_text, "unique") {
        Uniqueness::Unique
    } else {
        Uniqueness::Unclear
    };

    (answer, confidence, uniqueness)
}

/// Parse a self-check response into `(passed, analysis)`.
///
/// The verdict is `true` only for an explicit `<correct>yes</correct>`; a
/// missing tag counts as a rejection. The analysis is the full response text
/// so the reflection prompt sees the checker's reasoning.
pub fn parse_self_check(response: &str) -> (bool, String) {
    let passed = extract_tag(response, "correct")
        .map(|s| s.trim().eq_ignore_ascii_case("yes"))
        .unwrap_or(false);
    (passed, response.trim().to_string())
}
