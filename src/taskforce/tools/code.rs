//! Sandboxed script execution.
//!
//! [`CodeSandbox`] runs model-written scripts (Python by default) inside the
//! run's workspace with the same rails as the bash sandbox: wallclock
//! timeout, optional memory cap, minimal environment, ANSI-scrubbed output.
//! In addition it tracks which files the script created in the workspace, so
//! the executor can report generated artifacts.
//!
//! Each invocation spawns a fresh interpreter process. A script that fails to
//! return within the timeout is killed with its process — nothing is reused
//! from a run that went over its deadline.

use crate::taskforce::tool_protocol::{
    ToolAdapter, ToolMetadata, ToolParameter, ToolParameterType, ToolResult,
};
use crate::taskforce::tools::bash::{BashSandbox, SandboxError, SandboxOutput};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

/// Sandboxed runner for model-written scripts.
#[derive(Clone)]
pub struct CodeSandbox {
    /// Shell-level sandbox the interpreter is launched through.
    sandbox: BashSandbox,
    /// Interpreter binary, `python3` unless overridden.
    interpreter: String,
}

/// Result of one script execution: the process outcome plus any files the
/// script created in the workspace.
#[derive(Debug, Clone)]
pub struct CodeRunOutput {
    pub output: SandboxOutput,
    pub created_files: Vec<String>,
}

impl CodeSandbox {
    /// Create a code sandbox rooted at `workspace`.
    pub fn new(workspace: PathBuf) -> std::io::Result<Self> {
        Ok(Self {
            sandbox: BashSandbox::new(workspace)?.with_timeout(30),
            interpreter: "python3".to_string(),
        })
    }

    /// Override the interpreter binary (e.g. `node`, a pinned `python3.12`).
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Override the wallclock timeout in seconds (default 30).
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.sandbox = self.sandbox.with_timeout(secs);
        self
    }

    /// Cap the interpreter's virtual memory (megabytes).
    pub fn with_memory_cap_mb(mut self, megabytes: u64) -> Self {
        self.sandbox = self.sandbox.with_memory_cap_mb(megabytes);
        self
    }

    /// The workspace scripts run in.
    pub fn workspace(&self) -> &PathBuf {
        self.sandbox.workspace()
    }

    /// Execute a script and report its outcome plus newly created files.
    ///
    /// Markdown code fences around the script are stripped, since models
    /// habitually wrap code in them. Timeout is reported inside the output
    /// record, not raised.
    pub async fn run(&self, code: &str) -> Result<CodeRunOutput, SandboxError> {
        let code = strip_code_fence(code);

        let before = self.list_workspace_files();

        // Write the script into the workspace, then run it there.
        let script_name = format!("script_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        let script_path = self.sandbox.workspace().join(&script_name);
        std::fs::write(&script_path, code).map_err(SandboxError::Io)?;

        let output = self
            .sandbox
            .execute(&format!("{} {}", self.interpreter, script_name))
            .await?;

        let after = self.list_workspace_files();
        let created_files = after
            .difference(&before)
            .filter(|name| **name != script_name)
            .cloned()
            .collect();

        let _ = std::fs::remove_file(&script_path);

        Ok(CodeRunOutput {
            output,
            created_files,
        })
    }

    fn list_workspace_files(&self) -> HashSet<String> {
        std::fs::read_dir(self.sandbox.workspace())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fence(code: &str) -> String {
    let trimmed = code.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the language hint line, keep everything up to the closing fence.
        let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
        return body
            .rsplit_once("```")
            .map(|(b, _)| b)
            .unwrap_or(body)
            .trim()
            .to_string();
    }
    trimmed.to_string()
}

/// Tool adapter exposing [`CodeSandbox`] to executors.
pub struct CodeTool {
    sandbox: Arc<CodeSandbox>,
}

impl CodeTool {
    pub fn new(sandbox: Arc<CodeSandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl ToolAdapter for CodeTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            "execute_code",
            "Execute a script in a sandboxed workspace and return its output",
        )
        .with_parameter(
            ToolParameter::new("code", ToolParameterType::String)
                .with_description("The code to execute")
                .required(),
        )
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolResult {
        let code = match args.get("code").and_then(|v| v.as_str()) {
            Some(code) => code,
            None => return ToolResult::failure("missing required parameter: code".into()),
        };
        match self.sandbox.run(code).await {
            Ok(run) => {
                let payload = serde_json::json!({
                    "success": run.output.success,
                    "stdout": run.output.stdout.trim(),
                    "stderr": run.output.stderr.trim(),
                    "timed_out": run.output.timed_out,
                    "files": run.created_files,
                });
                if run.output.success {
                    ToolResult::success(payload)
                        .with_metadata("duration_ms", run.output.duration_ms.into())
                } else {
                    let mut result = ToolResult::failure(if run.output.timed_out {
                        "code execution timed out".to_string()
                    } else {
                        format!("code exited with {}", run.output.exit_code)
                    });
                    result.output = payload;
                    result
                }
            }
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::strip_code_fence;

    #[test]
    fn strips_python_fence() {
        let fenced = "```python\nprint('hi')\n```";
        assert_eq!(strip_code_fence(fenced), "print('hi')");
    }

    #[test]
    fn leaves_bare_code_alone() {
        assert_eq!(strip_code_fence("print('hi')"), "print('hi')");
    }
}
