//! Executor: discharges one subtask through a bounded tool-use conversation.
//!
//! An [`Executor`] pairs an [`ExecutorDescriptor`] (identity + advertised
//! tools) with a chat client and a [`ToolRegistry`]. `execute()` runs the
//! conversation loop: the model may request tools by emitting
//! `{"tool_call": {"name": "...", "parameters": {...}}}` anywhere in a
//! response; each call is dispatched synchronously, its result is fed back,
//! and the loop ends when the model replies without a tool call or the step
//! bound is reached. Tool failures stay inside the conversation — the model
//! sees them and adapts; they never abort the subtask.
//!
//! On return the subtask carries its concise result (the terminal response)
//! and a detailed transcript. Classification of the result is the planner's
//! job: the executor leaves the status as `InProgress`.

use crate::taskforce::client_wrapper::{ClientWrapper, Role};
use crate::taskforce::config::EngineConfig;
use crate::taskforce::error::EngineError;
use crate::taskforce::ledger::{ExecutorDescriptor, RunRecord, TaskLedger};
use crate::taskforce::llm_session::LLMSession;
use crate::taskforce::prompts;
use crate::taskforce::tool_protocol::ToolRegistry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// A parsed tool call extracted from a model response.
#[derive(Debug, Clone)]
struct ToolCall {
    name: String,
    parameters: serde_json::Value,
}

/// A named agent with a fixed tool set that runs a tool-use conversation to
/// discharge one subtask.
pub struct Executor {
    descriptor: ExecutorDescriptor,
    client: Arc<dyn ClientWrapper>,
    tools: ToolRegistry,
    max_steps: usize,
    llm_timeout: Duration,
    max_session_tokens: usize,
}

impl Executor {
    /// Create an executor from its identity, client, and tool registry.
    ///
    /// The descriptor's `toolnames` are derived from the registry so the
    /// roster advertised to the assigner always matches what the executor can
    /// actually run.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
        tools: ToolRegistry,
        config: &EngineConfig,
    ) -> Self {
        let descriptor = ExecutorDescriptor::new(name, description, tools.names());
        Self {
            descriptor,
            client,
            tools,
            max_steps: config.executor_max_steps,
            llm_timeout: config.executor_timeout,
            max_session_tokens: config.max_session_tokens,
        }
    }

    /// The executor's registry key.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The static descriptor advertised to planner and assigner.
    pub fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    /// Run the tool-use conversation for one subtask.
    ///
    /// Writes `result` and `result_detailed` on the subtask; the status is
    /// left for `plan_check` to classify. Only LLM transport failures abort;
    /// every tool-level problem is folded into the conversation.
    pub async fn execute(
        &self,
        ledger: &mut TaskLedger,
        task_id: usize,
    ) -> Result<(), EngineError> {
        let task = ledger
            .subtask(task_id)
            .ok_or_else(|| EngineError::ProtocolParse(format!("no subtask with id {}", task_id)))?;
        let instructions = task
            .description
            .clone()
            .unwrap_or_else(|| task.name.clone());

        let system_prompt = prompts::build_executor_system_prompt(
            &self.descriptor.name,
            &self.descriptor.description,
            ledger.overall_task(),
        );
        let mut session = LLMSession::new(
            Arc::clone(&self.client),
            system_prompt.clone(),
            self.max_session_tokens,
        );

        let mut message = format!("Your subtask:\n{}", instructions);
        if !self.tools.is_empty() {
            message.push_str(&prompts::tool_usage_block(&self.tools.describe_for_prompt()));
        }

        let actor = format!("executor:{}", self.descriptor.name);
        let mut transcript: Vec<String> = Vec::new();
        let mut final_report = String::new();
        let mut steps = 0;

        loop {
            let response = self
                .session_call(&mut session, &system_prompt, &actor, message, ledger)
                .await?;
            transcript.push(format!("[{}]\n{}", self.descriptor.name, response));

            let Some(call) = parse_tool_call(&response) else {
                final_report = response;
                break;
            };

            if steps >= self.max_steps {
                log::warn!(
                    "Executor {} hit the {}-step bound on subtask {}, forcing a final answer",
                    self.descriptor.name,
                    self.max_steps,
                    task_id
                );
                let forced = self
                    .session_call(
                        &mut session,
                        &system_prompt,
                        &actor,
                        prompts::FORCE_FINAL_MESSAGE.to_string(),
                        ledger,
                    )
                    .await?;
                transcript.push(format!("[{}]\n{}", self.descriptor.name, forced));
                final_report = forced;
                break;
            }
            steps += 1;

            log::info!(
                "Executor {} calling tool {} (step {}/{})",
                self.descriptor.name,
                call.name,
                steps,
                self.max_steps
            );
            let result = self.tools.invoke(&call.name, call.parameters.clone()).await;
            let payload = result.to_conversation_payload();
            let payload_text =
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
            transcript.push(format!("[tool:{}]\n{}", call.name, payload_text));

            message = if result.success {
                format!("Tool '{}' returned:\n{}", call.name, payload_text)
            } else {
                format!(
                    "Tool '{}' failed:\n{}\nAdjust your approach or try another tool.",
                    call.name, payload_text
                )
            };
        }

        ledger.set_subtask_result(task_id, final_report, transcript.join("\n\n"));
        Ok(())
    }

    /// One model round-trip inside the session, with deadline and trajectory
    /// recording.
    async fn session_call(
        &self,
        session: &mut LLMSession,
        system_prompt: &str,
        actor: &str,
        message: String,
        ledger: &mut TaskLedger,
    ) -> Result<String, EngineError> {
        let prompt_copy = message.clone();
        let response =
            tokio::time::timeout(self.llm_timeout, session.send_message(Role::User, message))
                .await
                .map_err(|_| {
                    EngineError::LlmCallFailed(format!(
                        "executor {} call timed out after {:?}",
                        self.descriptor.name, self.llm_timeout
                    ))
                })?
                .map_err(|e| EngineError::LlmCallFailed(e.to_string()))?;

        let text = response.content.to_string();
        ledger.append_trajectory(
            actor,
            RunRecord {
                model: self.client.model_name().to_string(),
                instructions: Some(system_prompt.to_string()),
                prompt: prompt_copy,
                response: text.clone(),
                timestamp: Utc::now(),
            },
        );
        Ok(text)
    }
}

/// Parse the first JSON tool call from a response string.
///
/// Scans for the literal `{"tool_call"` marker and takes everything through
/// the last closing brace, so a call embedded in surrounding prose still
/// parses. Returns `None` when the marker is absent, the JSON is malformed,
/// or the required fields are missing — the response is then treated as the
/// executor's terminal report.
fn parse_tool_call(response: &str) -> Option<ToolCall> {
    let marker = "{\"tool_call\"";
    let start_idx = response.find(marker)?;
    let end_idx = response[start_idx..].rfind('}')?;
    let tool_json = &response[start_idx..=start_idx + end_idx];

    let parsed: serde_json::Value = serde_json::from_str(tool_json).ok()?;
    let tool_call_obj = parsed.get("tool_call")?;
    let name = tool_call_obj.get("name")?.as_str()?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    let parameters = tool_call_obj.get("parameters")?.clone();
    Some(ToolCall { name, parameters })
}

#[cfg(test)]
mod tests {
    use super::parse_tool_call;

    #[test]
    fn parses_tool_call_embedded_in_prose() {
        let response = "Let me check.\n{\"tool_call\": {\"name\": \"calculator\", \
                        \"parameters\": {\"expression\": \"2+2\"}}}\nWorking on it.";
        let call = parse_tool_call(response).unwrap();
        assert_eq!(call.name, "calculator");
        assert_eq!(call.parameters["expression"], "2+2");
    }

    #[test]
    fn plain_text_is_not_a_tool_call() {
        assert!(parse_tool_call("All done, here is the report.").is_none());
    }

    #[test]
    fn malformed_json_is_not_a_tool_call() {
        assert!(parse_tool_call("{\"tool_call\": {\"name\": ").is_none());
    }
}
