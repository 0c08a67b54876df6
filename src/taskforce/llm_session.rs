//! Conversational session with rolling history.
//!
//! Executor conversations are multi-turn: the model proposes a tool call, the
//! engine feeds back the result, and so on until a terminal response. The
//! `LLMSession` keeps that dialogue within the model's context budget by
//! maintaining the running history and trimming the oldest messages when the
//! estimated token count exceeds the limit. One-shot role prompts do not need
//! any of this and use [`crate::LLMGateway`] instead.
//!
//! Token counting is approximate (one token per four characters). That is
//! plenty for a trim heuristic; exact accounting comes from the provider via
//! [`ClientWrapper::get_last_usage`] when available.

use crate::taskforce::client_wrapper::{ClientWrapper, Message, Role};
use std::error::Error;
use std::sync::Arc;

/// Represents a conversational session with an LLM.
///
/// The session keeps the system prompt separate from the conversation history
/// and re-inserts it at the head of every request, so trimming never discards
/// the priming message.
pub struct LLMSession {
    /// The client used for sending messages to the LLM.
    client: Arc<dyn ClientWrapper>,
    /// The system prompt for the session.
    system_prompt: Message,
    /// Conversation history excluding the system prompt.
    conversation_history: Vec<Message>,
    /// The maximum number of (estimated) tokens allowed in the conversation.
    max_tokens: usize,
    /// The current estimated token count including the system prompt.
    token_count: usize,
}

impl LLMSession {
    /// Create a new session with the given client, system prompt, and token budget.
    pub fn new(client: Arc<dyn ClientWrapper>, system_prompt: String, max_tokens: usize) -> Self {
        let system_prompt_message = Message::system(&system_prompt);
        let system_prompt_tokens = count_message_tokens(&system_prompt_message);
        LLMSession {
            client,
            system_prompt: system_prompt_message,
            conversation_history: Vec::new(),
            max_tokens,
            token_count: system_prompt_tokens,
        }
    }

    /// Send a message to the LLM and append both it and the response to the
    /// conversation history, trimming as needed to stay inside the budget.
    pub async fn send_message(
        &mut self,
        role: Role,
        content: String,
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        let message = Message {
            role,
            content: Arc::from(content.as_str()),
        };
        self.token_count += count_message_tokens(&message);
        self.conversation_history.push(message);
        self.trim_conversation_history();

        // Request = system prompt + trimmed history.
        let mut request = Vec::with_capacity(self.conversation_history.len() + 1);
        request.push(self.system_prompt.clone());
        request.extend(self.conversation_history.iter().cloned());

        let response = self.client.send_message(&request).await?;

        self.token_count += count_message_tokens(&response);
        self.conversation_history.push(response.clone());
        self.trim_conversation_history();

        Ok(response)
    }

    /// Replace the system prompt, adjusting the token estimate.
    pub fn set_system_prompt(&mut self, prompt: String) {
        let old_prompt_tokens = count_message_tokens(&self.system_prompt);
        self.system_prompt = Message::system(&prompt);
        let new_prompt_tokens = count_message_tokens(&self.system_prompt);
        self.token_count = self.token_count - old_prompt_tokens + new_prompt_tokens;
    }

    /// Borrow the underlying client.
    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }

    /// The conversation history accumulated so far, excluding the system prompt.
    pub fn conversation_history(&self) -> &[Message] {
        &self.conversation_history
    }

    /// Drop oldest messages until the estimate fits the budget.
    fn trim_conversation_history(&mut self) {
        while self.token_count > self.max_tokens && !self.conversation_history.is_empty() {
            let removed = self.conversation_history.remove(0);
            self.token_count -= count_message_tokens(&removed);
        }
    }
}

/// Estimates the number of tokens in a string: one token per 4 characters.
fn count_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}

/// Estimates the number of tokens in a message, with a fixed charge for the role.
fn count_message_tokens(message: &Message) -> usize {
    1 + count_tokens(&message.content)
}
