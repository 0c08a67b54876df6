//! OpenAI-compatible chat client exposing the `ClientWrapper` trait.
//!
//! The `OpenAIClient` speaks the widely-mirrored `/chat/completions` wire
//! format, so pointing it at a different base URL is enough to reach any
//! OpenAI-compatible vendor (Azure deployments, local inference servers,
//! aggregation proxies).
//!
//! # Selecting a model and sending a message
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
//!     let reply = client
//!         .send_message(&[Message {
//!             role: Role::User,
//!             content: Arc::<str>::from("Summarize the plan in one line."),
//!         }])
//!         .await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

use crate::taskforce::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

/// Client wrapper for OpenAI-compatible chat-completion endpoints.
pub struct OpenAIClient {
    /// Shared HTTP client with connection pooling.
    http: reqwest::Client,
    /// Bearer token for the API.
    secret_key: String,
    /// Model identifier used for subsequent requests.
    pub model: String,
    /// Base URL for API calls (no trailing slash).
    base_url: String,
    /// Storage for the most recent token usage report.
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Create a client against the public OpenAI endpoint.
    pub fn new(secret_key: &str, model: &str) -> Self {
        Self::new_with_base_url(secret_key, model, DEFAULT_BASE_URL)
    }

    /// Create a client pointing at a custom OpenAI-compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model: &str, base_url: &str) -> Self {
        OpenAIClient {
            http: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_usage: Mutex::new(None),
        }
    }

    fn role_str(role: &Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        let body = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: Self::role_str(&m.role),
                    content: &m.content,
                })
                .collect(),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("provider returned {}: {}", status, detail).into());
        }

        let parsed: ChatResponse = response.json().await?;

        if let Some(usage) = parsed.usage {
            *self.token_usage.lock().await = Some(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or("provider response contained no choices")?;

        Ok(Message {
            role: Role::Assistant,
            content: Arc::from(content.as_str()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
