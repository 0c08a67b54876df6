//! Engine configuration.
//!
//! Users construct [`EngineConfig`] directly or start from [`Default`] and
//! adjust with the `with_*` setters. No config-file parsing dependencies are
//! introduced; wire it to your own settings source.

use std::time::Duration;

/// Tunable bounds for one orchestration run.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use taskforce::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_max_reflection(2)
///     .with_role_timeout(Duration::from_secs(30));
/// assert_eq!(config.max_reflection, 2);
/// assert_eq!(config.modify_plan_budget, 3);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on reflection passes (outer replan loop). At least 1.
    pub max_reflection: usize,
    /// How many times the planner may rewrite the remaining plan tail in one
    /// run before `update` choices are coerced to `continue`.
    pub modify_plan_budget: u32,
    /// Tool-call steps an executor may take on one subtask before it is
    /// forced to produce a final report.
    pub executor_max_steps: usize,
    /// Deadline for planner/assigner/answerer calls.
    pub role_timeout: Duration,
    /// Deadline for each executor model call (content generation runs longer
    /// than the coordination roles).
    pub executor_timeout: Duration,
    /// Token budget for an executor's conversation history.
    pub max_session_tokens: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reflection: 1,
            modify_plan_budget: 3,
            executor_max_steps: 10,
            role_timeout: Duration::from_secs(60),
            executor_timeout: Duration::from_secs(180),
            max_session_tokens: 128_000,
        }
    }
}

impl EngineConfig {
    /// Override the reflection bound (values below 1 are clamped to 1).
    pub fn with_max_reflection(mut self, max_reflection: usize) -> Self {
        self.max_reflection = max_reflection.max(1);
        self
    }

    /// Override the plan-modify budget.
    pub fn with_modify_plan_budget(mut self, budget: u32) -> Self {
        self.modify_plan_budget = budget;
        self
    }

    /// Override the executor step bound.
    pub fn with_executor_max_steps(mut self, steps: usize) -> Self {
        self.executor_max_steps = steps;
        self
    }

    /// Override the deadline for coordination-role calls.
    pub fn with_role_timeout(mut self, timeout: Duration) -> Self {
        self.role_timeout = timeout;
        self
    }

    /// Override the deadline for executor model calls.
    pub fn with_executor_timeout(mut self, timeout: Duration) -> Self {
        self.executor_timeout = timeout;
        self
    }

    /// Override the executor conversation token budget.
    pub fn with_max_session_tokens(mut self, tokens: usize) -> Self {
        self.max_session_tokens = tokens;
        self
    }
}
