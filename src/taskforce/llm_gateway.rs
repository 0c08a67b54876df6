//! One-shot gateway to the language model.
//!
//! The planner, assigner, and answerer each speak to the model through an
//! [`LLMGateway`]: a [`ClientWrapper`] plus an optional system prompt and a
//! per-call deadline. Every call returns both the final text and a
//! [`RunRecord`] that the caller appends to the ledger's trajectory, so no
//! role interaction is lost.
//!
//! This is the only place where provider errors are converted into the
//! engine's single [`EngineError::LlmCallFailed`] kind; retries, if any,
//! belong to the underlying client.

use crate::taskforce::client_wrapper::{ClientWrapper, Message};
use crate::taskforce::error::EngineError;
use crate::taskforce::ledger::RunRecord;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Result of one gateway call: the model's text plus its trajectory record.
pub struct GatewayReply {
    pub final_output: String,
    pub record: RunRecord,
}

/// Uniform request/response interface over a chat-completion model.
pub struct LLMGateway {
    client: Arc<dyn ClientWrapper>,
    instructions: Option<String>,
    timeout: Duration,
}

impl LLMGateway {
    /// Create a gateway with no system prompt.
    pub fn new(client: Arc<dyn ClientWrapper>, timeout: Duration) -> Self {
        Self {
            client,
            instructions: None,
            timeout,
        }
    }

    /// Set or replace the system prompt used for subsequent calls.
    pub fn set_instructions(&mut self, instructions: impl Into<String>) {
        self.instructions = Some(instructions.into());
    }

    /// The model identifier reported by the underlying client.
    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Send one prompt and return the response text with its run record.
    ///
    /// Timeouts, transport failures, and provider errors all surface as
    /// [`EngineError::LlmCallFailed`].
    pub async fn run(&self, prompt: &str) -> Result<GatewayReply, EngineError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(instructions) = &self.instructions {
            messages.push(Message::system(instructions));
        }
        messages.push(Message::user(prompt));

        let response = tokio::time::timeout(self.timeout, self.client.send_message(&messages))
            .await
            .map_err(|_| {
                EngineError::LlmCallFailed(format!(
                    "call to {} timed out after {:?}",
                    self.client.model_name(),
                    self.timeout
                ))
            })?
            .map_err(|e| EngineError::LlmCallFailed(e.to_string()))?;

        let final_output = response.content.to_string();
        let record = RunRecord {
            model: self.client.model_name().to_string(),
            instructions: self.instructions.clone(),
            prompt: prompt.to_string(),
            response: final_output.clone(),
            timestamp: Utc::now(),
        };
        Ok(GatewayReply {
            final_output,
            record,
        })
    }
}
