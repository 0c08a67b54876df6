//! Hermetic tests for the web fetch tool: URL validation and the domain
//! allow-list. No network traffic is generated — both checks run before any
//! request is sent.

use taskforce::tool_protocol::ToolAdapter;
use taskforce::tools::web::{WebFetch, WebTool};

#[tokio::test]
async fn invalid_url_is_rejected() {
    let fetcher = WebFetch::new();
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert!(err.contains("invalid url"));
}

#[tokio::test]
async fn disallowed_domain_is_rejected() {
    let fetcher = WebFetch::new().with_allowed_domains(vec!["example.org".to_string()]);
    let err = fetcher.fetch("http://evil.test/page").await.unwrap_err();
    assert!(err.contains("domain not allowed"));
}

#[tokio::test]
async fn subdomains_of_allowed_domains_pass_the_check() {
    // data.example.org is allowed; a lookalike suffix is not.
    let fetcher = WebFetch::new().with_allowed_domains(vec!["example.org".to_string()]);
    let err = fetcher
        .fetch("http://notexample.org/page")
        .await
        .unwrap_err();
    assert!(err.contains("domain not allowed"));
}

#[tokio::test]
async fn adapter_requires_url_parameter() {
    let tool = WebTool::new(WebFetch::new().with_allowed_domains(vec!["example.org".into()]));
    let missing = tool.invoke(serde_json::json!({})).await;
    assert!(!missing.success);
    assert!(missing.error.unwrap().contains("url"));

    let blocked = tool
        .invoke(serde_json::json!({"url": "http://blocked.test/"}))
        .await;
    assert!(!blocked.success);
}
