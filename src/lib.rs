// src/lib.rs

// Import the top-level `taskforce` module.
pub mod taskforce;

// Re-exporting key items so callers don't have to navigate the whole hierarchy.
pub use taskforce::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
pub use taskforce::config::EngineConfig;
pub use taskforce::error::EngineError;
pub use taskforce::executor::Executor;
pub use taskforce::ledger::{ExecutorDescriptor, Subtask, SubtaskStatus, TaskLedger};
pub use taskforce::orchestrator::Orchestrator;
pub use taskforce::tool_protocol::{ToolAdapter, ToolRegistry};
pub use taskforce::{LLMGateway, LLMSession};

// Module-level re-exports for the common import style
// (`taskforce::clients::openai::OpenAIClient`, `taskforce::tools::...`).
pub use taskforce::{
    answerer, assigner, client_wrapper, clients, config, error, executor, ledger, llm_gateway,
    llm_session, orchestrator, planner, protocol, tool_protocol, tools,
};
