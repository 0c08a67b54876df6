//! Sandboxed shell execution.
//!
//! [`BashSandbox`] runs shell commands for executors under the safety rails
//! the engine promises: the command is confined to the run's workspace
//! directory, a minimal PATH, a wallclock timeout, an optional memory cap, a
//! banned-substring filter for write-sensitive commands, and ANSI-escape
//! scrubbing of everything captured from the terminal.
//!
//! Expiry of the timeout does NOT raise: it comes back as a structured
//! [`SandboxOutput`] with `timed_out` set, so the executor conversation sees
//! what happened and can react. Only spawn-level refusals (banned command,
//! I/O failure) are errors, and the [`BashTool`] adapter folds those into a
//! failed [`ToolResult`] anyway.
//!
//! # Example
//!
//! ```rust,no_run
//! use taskforce::tools::bash::BashSandbox;
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sandbox = BashSandbox::new(PathBuf::from("/tmp/run_ws"))?.with_timeout(30);
//! let out = sandbox.execute("ls -la").await?;
//! println!("{}", out.stdout);
//! # Ok(())
//! # }
//! ```

use crate::taskforce::tool_protocol::{
    ToolAdapter, ToolMetadata, ToolParameter, ToolParameterType, ToolResult,
};
use crate::taskforce::tools::strip_ansi;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;

const SHELL_PATH: &str = "/bin/bash";
const MINIMAL_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Maximum bytes collected per stream (stdout/stderr).
const DEFAULT_MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Command strings refused outright. These guard against write-sensitive
/// operations a task-solving agent has no business running.
const DEFAULT_BANNED_SUBSTRINGS: &[&str] = &[
    "git init",
    "git add",
    "git commit",
    "git push",
    "sudo ",
    "mkfs",
    "shutdown",
    "reboot",
];

/// Structured record of one sandboxed command execution.
#[derive(Debug, Clone)]
pub struct SandboxOutput {
    /// Whether the command exited with status 0 (always false on timeout).
    pub success: bool,
    /// Captured standard output, ANSI-scrubbed.
    pub stdout: String,
    /// Captured standard error, ANSI-scrubbed.
    pub stderr: String,
    /// Exit code, or -1 when unavailable (killed / timed out).
    pub exit_code: i32,
    /// Wallclock duration in milliseconds.
    pub duration_ms: u64,
    /// Set when the wallclock timeout expired and the process was killed.
    pub timed_out: bool,
}

/// Absolute-path prefixes commands may reference, besides the workspace.
/// Mirrors the read-only system view a minimal jail would bind in.
const DEFAULT_ALLOWED_PATH_ROOTS: &[&str] = &[
    "/bin",
    "/usr",
    "/lib",
    "/lib64",
    "/sbin",
    "/dev/null",
    "/dev/urandom",
    "/etc/alternatives",
];

/// Errors from the sandbox boundary itself (not from the command).
#[derive(Debug)]
pub enum SandboxError {
    /// The command matched a banned substring.
    CommandBanned(String),
    /// The command referenced an absolute path outside the allow-list.
    PathNotAllowed(String),
    /// A captured stream exceeded the output cap.
    OutputTooLarge(String),
    /// The process could not be spawned or waited on.
    Io(std::io::Error),
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::CommandBanned(msg) => write!(f, "Command banned: {}", msg),
            SandboxError::PathNotAllowed(msg) => write!(f, "Path not allowed: {}", msg),
            SandboxError::OutputTooLarge(msg) => write!(f, "Output too large: {}", msg),
            SandboxError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl Error for SandboxError {}

/// Read from `reader` into a byte buffer, erroring past `max_bytes`.
async fn read_limited<R: AsyncReadExt + Unpin>(
    mut reader: R,
    max_bytes: usize,
    stream_name: &'static str,
) -> Result<Vec<u8>, SandboxError> {
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => return Ok(buf),
            Ok(n) => {
                if buf.len() + n > max_bytes {
                    return Err(SandboxError::OutputTooLarge(format!(
                        "{} exceeded the {} byte limit",
                        stream_name, max_bytes
                    )));
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) => return Err(SandboxError::Io(e)),
        }
    }
}

/// Sandboxed bash runner confined to one workspace directory.
#[derive(Clone)]
pub struct BashSandbox {
    /// Working directory every command runs in. Created on construction.
    workspace: PathBuf,
    /// Wallclock timeout in seconds.
    timeout_secs: u64,
    /// Substrings that disqualify a command outright.
    banned_substrings: Vec<String>,
    /// Absolute-path prefixes the command may reference (the workspace is
    /// always allowed).
    allowed_path_roots: Vec<PathBuf>,
    /// Environment passed to the shell; starts from a minimal PATH.
    env_vars: HashMap<String, String>,
    /// Optional virtual-memory cap in megabytes, applied via `ulimit -v`.
    memory_cap_mb: Option<u64>,
    /// Maximum bytes collected per stream.
    max_output_size: usize,
}

impl BashSandbox {
    /// Create a sandbox rooted at `workspace`, creating the directory if
    /// needed.
    pub fn new(workspace: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&workspace)?;
        let mut env_vars = HashMap::new();
        env_vars.insert("PATH".to_string(), MINIMAL_PATH.to_string());
        Ok(Self {
            workspace,
            timeout_secs: 60,
            banned_substrings: DEFAULT_BANNED_SUBSTRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_path_roots: DEFAULT_ALLOWED_PATH_ROOTS
                .iter()
                .map(PathBuf::from)
                .collect(),
            env_vars,
            memory_cap_mb: None,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
        })
    }

    /// Override the wallclock timeout (seconds, default 60).
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Replace the banned-substring list.
    pub fn with_banned_substrings(mut self, banned: Vec<String>) -> Self {
        self.banned_substrings = banned;
        self
    }

    /// Replace the allow-list of absolute-path prefixes.
    pub fn with_allowed_path_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.allowed_path_roots = roots;
        self
    }

    /// Add or override an environment variable for command execution.
    pub fn with_env_var(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }

    /// Cap the command's virtual memory (megabytes).
    pub fn with_memory_cap_mb(mut self, megabytes: u64) -> Self {
        self.memory_cap_mb = Some(megabytes);
        self
    }

    /// Override the per-stream output cap in bytes (default 1 MiB).
    pub fn with_max_output_size(mut self, bytes: usize) -> Self {
        self.max_output_size = bytes;
        self
    }

    /// The workspace directory commands run in.
    pub fn workspace(&self) -> &PathBuf {
        &self.workspace
    }

    fn check_banned(&self, cmd: &str) -> Result<(), SandboxError> {
        for banned in &self.banned_substrings {
            if cmd.contains(banned.as_str()) {
                return Err(SandboxError::CommandBanned(format!(
                    "'{}' found in command",
                    banned
                )));
            }
        }
        Ok(())
    }

    /// Refuse commands that reference absolute paths outside the allow-list.
    ///
    /// This inspects whitespace-separated tokens only; a command can still
    /// compute a path at runtime. Use OS-level jails for stronger isolation —
    /// this filter catches the direct `cat /etc/passwd` shape, same as the
    /// banned-substring check catches direct invocations.
    fn check_paths_allowed(&self, cmd: &str) -> Result<(), SandboxError> {
        for token in cmd.split_whitespace() {
            // Strip quoting and redirection prefixes (`>/dev/null`, `2>/x`).
            let token = token
                .trim_matches(|c| c == '"' || c == '\'')
                .trim_start_matches(|c: char| c == '>' || c == '<' || c == '&' || c.is_ascii_digit());
            if !token.starts_with('/') {
                continue;
            }
            let path = PathBuf::from(token);
            let allowed = path.starts_with(&self.workspace)
                || self.allowed_path_roots.iter().any(|root| path.starts_with(root));
            if !allowed {
                return Err(SandboxError::PathNotAllowed(token.to_string()));
            }
        }
        Ok(())
    }

    /// Execute a command inside the sandbox.
    ///
    /// Returns the structured output record; a timeout is reported inside the
    /// record, not as an error. Only banned commands and process-level I/O
    /// failures surface as [`SandboxError`].
    pub async fn execute(&self, cmd: &str) -> Result<SandboxOutput, SandboxError> {
        self.check_banned(cmd)?;
        self.check_paths_allowed(cmd)?;

        let start_time = Instant::now();
        let timeout = std::time::Duration::from_secs(self.timeout_secs);

        // The memory cap rides inside the shell invocation so it binds the
        // command's whole process group.
        let shell_line = match self.memory_cap_mb {
            Some(mb) => format!("ulimit -v {}; {}", mb * 1024, cmd),
            None => cmd.to_string(),
        };

        let max_output = self.max_output_size;
        let workspace = self.workspace.clone();
        let env_vars = self.env_vars.clone();

        let run = async move {
            let mut command = TokioCommand::new(SHELL_PATH);
            command
                .arg("-c")
                .arg(&shell_line)
                .env_clear()
                .envs(env_vars)
                .current_dir(&workspace)
                .kill_on_drop(true)
                .stdin(std::process::Stdio::null())
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped());

            let mut child = command.spawn().map_err(SandboxError::Io)?;
            let stdout_pipe = child.stdout.take().expect("stdout was piped");
            let stderr_pipe = child.stderr.take().expect("stderr was piped");

            // Read both streams concurrently to avoid pipe-buffer deadlocks.
            let (stdout_result, stderr_result) = tokio::join!(
                read_limited(stdout_pipe, max_output, "stdout"),
                read_limited(stderr_pipe, max_output, "stderr"),
            );

            let (stdout_bytes, stderr_bytes) = match (stdout_result, stderr_result) {
                (Err(e), _) | (_, Err(e)) => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    return Err(e);
                }
                (Ok(out), Ok(err)) => (out, err),
            };

            let status = child.wait().await.map_err(SandboxError::Io)?;
            let stdout = strip_ansi(&String::from_utf8_lossy(&stdout_bytes));
            let stderr = strip_ansi(&String::from_utf8_lossy(&stderr_bytes));

            Ok(SandboxOutput {
                success: status.success(),
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(-1),
                duration_ms: 0, // filled in below
                timed_out: false,
            })
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(result) => result.map(|mut out| {
                out.duration_ms = start_time.elapsed().as_millis() as u64;
                out
            }),
            // Timeout is a structured outcome, not an error. The child is
            // reaped by tokio's kill-on-drop once the future is cancelled.
            Err(_) => Ok(SandboxOutput {
                success: false,
                stdout: String::new(),
                stderr: format!("Command exceeded {} second timeout", self.timeout_secs),
                exit_code: -1,
                duration_ms: start_time.elapsed().as_millis() as u64,
                timed_out: true,
            }),
        }
    }
}

/// Tool adapter exposing [`BashSandbox`] to executors.
pub struct BashTool {
    sandbox: Arc<BashSandbox>,
}

impl BashTool {
    pub fn new(sandbox: Arc<BashSandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl ToolAdapter for BashTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            "run_bash",
            "Execute a bash command in your workspace and return its output",
        )
        .with_parameter(
            ToolParameter::new("command", ToolParameterType::String)
                .with_description("The command to execute")
                .required(),
        )
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolResult {
        let command = match args.get("command").and_then(|v| v.as_str()) {
            Some(cmd) => cmd,
            None => return ToolResult::failure("missing required parameter: command".into()),
        };
        match self.sandbox.execute(command).await {
            Ok(out) => {
                let payload = serde_json::json!({
                    "workdir": self.sandbox.workspace().display().to_string(),
                    "success": out.success,
                    "exit_code": out.exit_code,
                    "stdout": out.stdout.trim(),
                    "stderr": out.stderr.trim(),
                    "timed_out": out.timed_out,
                });
                if out.success {
                    ToolResult::success(payload)
                        .with_metadata("duration_ms", out.duration_ms.into())
                } else {
                    let mut result = ToolResult::failure(if out.timed_out {
                        format!("command timed out: {}", out.stderr.trim())
                    } else {
                        format!("command exited with {}", out.exit_code)
                    });
                    result.output = payload;
                    result
                }
            }
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }
}
