//! Tests for the bash sandbox: output capture, exit codes, confinement,
//! banned commands, timeout-as-structured-result, and ANSI scrubbing.

use std::sync::Arc;
use std::time::Instant;
use taskforce::tool_protocol::ToolAdapter;
use taskforce::tools::bash::{BashSandbox, BashTool, SandboxError};
use taskforce::tools::create_run_workspace;

fn sandbox() -> (tempfile::TempDir, BashSandbox) {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = BashSandbox::new(dir.path().join("ws")).unwrap();
    (dir, sandbox)
}

// ─── output & exit codes ──────────────────────────────────────────────────────

#[tokio::test]
async fn stdout_is_captured() {
    let (_dir, bash) = sandbox();
    let r = bash.execute("echo hello").await.unwrap();
    assert!(r.success);
    assert_eq!(r.stdout.trim(), "hello");
    assert_eq!(r.exit_code, 0);
}

#[tokio::test]
async fn stderr_is_captured_separately() {
    let (_dir, bash) = sandbox();
    let r = bash.execute("echo error_text >&2").await.unwrap();
    assert!(r.success);
    assert!(r.stdout.trim().is_empty());
    assert!(r.stderr.contains("error_text"));
}

#[tokio::test]
async fn nonzero_exit_code_is_reported() {
    let (_dir, bash) = sandbox();
    let r = bash.execute("exit 3").await.unwrap();
    assert!(!r.success);
    assert_eq!(r.exit_code, 3);
    assert!(!r.timed_out);
}

// ─── confinement ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn commands_run_inside_the_workspace() {
    let (_dir, bash) = sandbox();
    let r = bash.execute("pwd").await.unwrap();
    let reported = std::path::PathBuf::from(r.stdout.trim());
    // Canonicalize both sides: the workspace may sit behind a symlink (e.g.
    // /tmp on macOS).
    assert_eq!(
        reported.canonicalize().unwrap(),
        bash.workspace().canonicalize().unwrap()
    );
}

#[tokio::test]
async fn environment_is_minimal() {
    let (_dir, bash) = sandbox();
    let r = bash.execute("echo \"$PATH\"").await.unwrap();
    assert_eq!(r.stdout.trim(), "/usr/local/bin:/usr/bin:/bin");
}

#[tokio::test]
async fn files_created_land_in_the_workspace() {
    let (_dir, bash) = sandbox();
    bash.execute("echo data > artifact.txt").await.unwrap();
    assert!(bash.workspace().join("artifact.txt").exists());
}

// ─── banned commands ──────────────────────────────────────────────────────────

#[tokio::test]
async fn banned_substring_is_refused() {
    let (_dir, bash) = sandbox();
    let err = bash.execute("git init repo").await.unwrap_err();
    assert!(matches!(err, SandboxError::CommandBanned(_)));
}

#[tokio::test]
async fn banned_substring_anywhere_in_command_is_refused() {
    let (_dir, bash) = sandbox();
    let err = bash.execute("cd x && sudo rm file").await.unwrap_err();
    assert!(matches!(err, SandboxError::CommandBanned(_)));
}

#[tokio::test]
async fn custom_banned_list_replaces_default() {
    let (_dir, bash) = sandbox();
    let bash = bash.with_banned_substrings(vec!["curl".to_string()]);
    assert!(bash.execute("echo git init").await.is_ok());
    assert!(matches!(
        bash.execute("curl http://example.com").await,
        Err(SandboxError::CommandBanned(_))
    ));
}

// ─── filesystem allow-list ────────────────────────────────────────────────────

#[tokio::test]
async fn absolute_paths_outside_the_allow_list_are_refused() {
    let (_dir, bash) = sandbox();
    let err = bash.execute("cat /etc/passwd").await.unwrap_err();
    assert!(matches!(err, SandboxError::PathNotAllowed(_)));
}

#[tokio::test]
async fn allow_listed_system_paths_are_usable() {
    let (_dir, bash) = sandbox();
    let r = bash.execute("/bin/echo system_ok").await.unwrap();
    assert!(r.success);
    assert_eq!(r.stdout.trim(), "system_ok");
}

#[tokio::test]
async fn workspace_paths_are_always_allowed() {
    let (_dir, bash) = sandbox();
    let path = bash.workspace().join("note.txt");
    let r = bash
        .execute(&format!("echo noted > {}", path.display()))
        .await
        .unwrap();
    assert!(r.success);
    assert!(path.exists());
}

#[tokio::test]
async fn redirects_to_dev_null_pass_the_path_check() {
    let (_dir, bash) = sandbox();
    let r = bash.execute("echo quiet >/dev/null").await.unwrap();
    assert!(r.success);
    assert!(r.stdout.is_empty());
}

// ─── timeout ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn timeout_returns_structured_output_not_error() {
    let (_dir, bash) = sandbox();
    let bash = bash.with_timeout(1);
    let start = Instant::now();
    let r = bash.execute("sleep 5").await.unwrap();
    assert!(r.timed_out);
    assert!(!r.success);
    assert!(r.stderr.contains("timeout"));
    // The deadline was actually enforced, not just recorded.
    assert!(start.elapsed().as_secs() < 5);
}

// ─── output hygiene ───────────────────────────────────────────────────────────

#[tokio::test]
async fn ansi_escapes_are_scrubbed() {
    let (_dir, bash) = sandbox();
    let r = bash
        .execute("printf '\\033[31mred\\033[0m plain\\n'")
        .await
        .unwrap();
    assert_eq!(r.stdout.trim(), "red plain");
}

#[tokio::test]
async fn oversized_output_is_rejected() {
    let (_dir, bash) = sandbox();
    let bash = bash.with_max_output_size(1024);
    let result = bash.execute("yes | head -c 10000").await;
    assert!(matches!(result, Err(SandboxError::OutputTooLarge(_))));
}

// ─── workspace helper ─────────────────────────────────────────────────────────

#[test]
fn run_workspaces_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let a = create_run_workspace(dir.path()).unwrap();
    let b = create_run_workspace(dir.path()).unwrap();
    assert_ne!(a, b);
    assert!(a.is_dir());
    assert!(b.is_dir());
}

// ─── tool adapter ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn bash_tool_adapter_reports_structured_payload() {
    let (_dir, bash) = sandbox();
    let tool = BashTool::new(Arc::new(bash));

    let ok = tool
        .invoke(serde_json::json!({"command": "echo from_tool"}))
        .await;
    assert!(ok.success);
    assert_eq!(ok.output["stdout"], "from_tool");

    let missing = tool.invoke(serde_json::json!({})).await;
    assert!(!missing.success);

    let banned = tool
        .invoke(serde_json::json!({"command": "git init x"}))
        .await;
    assert!(!banned.success);
    assert!(banned.error.unwrap().contains("banned"));
}
