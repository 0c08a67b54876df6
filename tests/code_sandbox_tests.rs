//! Tests for the code sandbox. The interpreter is overridden to `bash` so the
//! tests stay hermetic on machines without a Python installation.

use std::sync::Arc;
use taskforce::tool_protocol::ToolAdapter;
use taskforce::tools::code::{CodeSandbox, CodeTool};

fn sandbox() -> (tempfile::TempDir, CodeSandbox) {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = CodeSandbox::new(dir.path().join("ws"))
        .unwrap()
        .with_interpreter("bash");
    (dir, sandbox)
}

#[tokio::test]
async fn runs_a_script_and_captures_output() {
    let (_dir, code) = sandbox();
    let run = code.run("echo hello from script").await.unwrap();
    assert!(run.output.success);
    assert_eq!(run.output.stdout.trim(), "hello from script");
}

#[tokio::test]
async fn reports_files_created_by_the_script() {
    let (_dir, code) = sandbox();
    let run = code.run("echo data > generated.txt").await.unwrap();
    assert!(run.output.success);
    assert_eq!(run.created_files, vec!["generated.txt".to_string()]);
    // The temporary script file itself is not reported.
    assert!(!run.created_files.iter().any(|f| f.starts_with("script_")));
}

#[tokio::test]
async fn strips_markdown_fences_before_running() {
    let (_dir, code) = sandbox();
    let run = code.run("```bash\necho fenced\n```").await.unwrap();
    assert!(run.output.success);
    assert_eq!(run.output.stdout.trim(), "fenced");
}

#[tokio::test]
async fn timeout_is_a_structured_result() {
    let (_dir, code) = sandbox();
    let code = code.with_timeout(1);
    let run = code.run("sleep 5").await.unwrap();
    assert!(run.output.timed_out);
    assert!(!run.output.success);
}

#[tokio::test]
async fn script_failure_is_reported() {
    let (_dir, code) = sandbox();
    let run = code.run("exit 7").await.unwrap();
    assert!(!run.output.success);
    assert_eq!(run.output.exit_code, 7);
}

#[tokio::test]
async fn code_tool_adapter_round_trip() {
    let (_dir, code) = sandbox();
    let tool = CodeTool::new(Arc::new(code));

    let ok = tool
        .invoke(serde_json::json!({"code": "echo tool_output"}))
        .await;
    assert!(ok.success);
    assert_eq!(ok.output["stdout"], "tool_output");
    assert_eq!(ok.output["files"], serde_json::json!([]));

    let missing = tool.invoke(serde_json::json!({"wrong": 1})).await;
    assert!(!missing.success);
}
