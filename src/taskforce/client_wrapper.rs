//! Shared primitives for provider-agnostic chat-completion clients.
//!
//! The engine talks to a language model exclusively through the
//! [`ClientWrapper`] trait and the lightweight data types in this module. The
//! trait abstracts over concrete vendor implementations while the supporting
//! structs describe chat messages and token accounting. Conversation
//! bookkeeping lives one layer up, in [`crate::LLMSession`] (multi-turn
//! executor conversations) and [`crate::LLMGateway`] (one-shot role prompts).
//!
//! # Basic request/response
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use taskforce::{ClientWrapper, Message, Role};
//! use taskforce::clients::openai::OpenAIClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let key = std::env::var("OPENAI_API_KEY")?;
//!     let client = OpenAIClient::new(&key, "gpt-4.1-mini");
//!
//!     let response = client
//!         .send_message(&[Message {
//!             role: Role::User,
//!             content: Arc::from("Who are you?"),
//!         }])
//!         .await?;
//!
//!     println!("Assistant: {}", response.content);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Represents the possible roles for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// A system authored message that primes or constrains assistant behaviour.
    System,
    /// A user authored message.
    User,
    /// An assistant authored message (model responses).
    Assistant,
}

/// How many tokens were spent on prompt vs. completion?
#[derive(Clone, Debug)]
pub struct TokenUsage {
    /// Number of prompt/input tokens billed by the provider.
    pub input_tokens: usize,
    /// Number of generated/output tokens billed by the provider.
    pub output_tokens: usize,
    /// Convenience total equal to `input_tokens + output_tokens`.
    pub total_tokens: usize,
}

/// Represents a generic message exchanged with an LLM.
#[derive(Clone)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The message body.  Stored as `Arc<str>` so that histories and
    /// trajectory records can be cheaply cloned.
    pub content: Arc<str>,
}

impl Message {
    /// Convenience constructor for a system message.
    pub fn system(content: impl AsRef<str>) -> Self {
        Self {
            role: Role::System,
            content: Arc::from(content.as_ref()),
        }
    }

    /// Convenience constructor for a user message.
    pub fn user(content: impl AsRef<str>) -> Self {
        Self {
            role: Role::User,
            content: Arc::from(content.as_ref()),
        }
    }

    /// Convenience constructor for an assistant message.
    pub fn assistant(content: impl AsRef<str>) -> Self {
        Self {
            role: Role::Assistant,
            content: Arc::from(content.as_ref()),
        }
    }
}

/// Trait defining the interface to interact with chat-completion services.
///
/// A `ClientWrapper` instance is responsible for translating requests into the
/// provider-specific wire format and for returning responses in a uniform
/// shape. All implementations must be thread-safe (`Send + Sync`) so they can
/// be shared between async tasks. Where a provider exposes token accounting,
/// wrappers should capture it and make it visible via
/// [`ClientWrapper::get_last_usage`].
///
/// The role prompts of this engine use plain text with tagged sections; no
/// structured function-calling feature is required of the provider.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send a full request/response style chat completion.
    ///
    /// The `messages` slice must include any system priming message the caller
    /// wishes to send.
    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>>;

    /// Return the identifier used to select the upstream model (e.g. `"gpt-4.1"`).
    fn model_name(&self) -> &str;

    /// Hook to retrieve usage from the most recent [`ClientWrapper::send_message`] call.
    ///
    /// Wrappers that propagate token accounting should override
    /// [`ClientWrapper::usage_slot`].
    async fn get_last_usage(&self) -> Option<TokenUsage> {
        if let Some(slot) = self.usage_slot() {
            slot.lock().await.clone()
        } else {
            None
        }
    }

    /// Expose a shared mutable slot where the implementation can persist token
    /// usage. By default wrappers report no usage data.
    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        None
    }
}
