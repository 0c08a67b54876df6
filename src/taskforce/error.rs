//! Engine-level error kinds.
//!
//! Every role operation surfaces failures through [`EngineError`]. The set is
//! deliberately small: tool failures never reach this level (they are fed back
//! into the executor's conversation as structured results), and sandbox
//! timeouts are reported as structured records by the sandboxes themselves.

use std::error::Error;
use std::fmt;

/// Errors that can abort a role operation or an entire run.
///
/// # Examples
///
/// ```
/// use taskforce::EngineError;
///
/// let err = EngineError::UnknownExecutor("WebSurfer".into());
/// assert_eq!(err.to_string(), "Unknown executor: WebSurfer");
/// ```
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Transport, timeout, or provider failure from the underlying model.
    /// Fatal to the run; retries belong to the client layer, not here.
    LlmCallFailed(String),

    /// Tagged role output was malformed in a way that has no documented
    /// default (e.g. an assignment with neither a task description nor a
    /// direct answer).
    ProtocolParse(String),

    /// The assigner selected an executor name that is not registered.
    /// Seeds `failure_info` and triggers a reflection pass when budget
    /// remains; fatal otherwise.
    UnknownExecutor(String),

    /// A run was started with no registered executors.
    NoExecutors,

    /// Invalid engine setup (e.g. a duplicate executor registration).
    Configuration(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::LlmCallFailed(msg) => write!(f, "LLM call failed: {}", msg),
            EngineError::ProtocolParse(msg) => write!(f, "Protocol parse error: {}", msg),
            EngineError::UnknownExecutor(name) => write!(f, "Unknown executor: {}", name),
            EngineError::NoExecutors => write!(f, "No executors registered"),
            EngineError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for EngineError {}
