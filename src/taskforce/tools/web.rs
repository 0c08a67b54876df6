//! Web fetch tool.
//!
//! A deliberately small network adapter: HTTP GET with a domain allow-list, a
//! response-size cap, and a timeout. It exists to give research executors a
//! way to pull a page's raw content; full browser automation is out of scope
//! and would plug in as another [`ToolAdapter`].

use crate::taskforce::tool_protocol::{
    ToolAdapter, ToolMetadata, ToolParameter, ToolParameterType, ToolResult,
};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_MAX_BODY_BYTES: usize = 512 * 1024;

/// HTTP fetcher with basic guard rails.
pub struct WebFetch {
    http: reqwest::Client,
    /// When non-empty, only hosts equal to (or subdomains of) an entry may be
    /// fetched.
    allowed_domains: Vec<String>,
    max_body_bytes: usize,
}

impl WebFetch {
    /// Create a fetcher with a 30 second request timeout and no domain
    /// restriction.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            allowed_domains: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Restrict fetching to the listed domains and their subdomains.
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    /// Override the response-size cap in bytes (default 512 KiB).
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    fn host_allowed(&self, host: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        self.allowed_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)))
    }

    /// Fetch a URL, returning `(status, truncated_body)`.
    pub async fn fetch(&self, url: &str) -> Result<(u16, String), String> {
        let parsed = reqwest::Url::parse(url).map_err(|e| format!("invalid url: {}", e))?;
        let host = parsed.host_str().ok_or("url has no host")?;
        if !self.host_allowed(host) {
            return Err(format!("domain not allowed: {}", host));
        }

        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read body: {}", e))?;

        let truncated = if body.len() > self.max_body_bytes {
            let mut end = self.max_body_bytes;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}\n[truncated at {} bytes]", &body[..end], self.max_body_bytes)
        } else {
            body
        };
        Ok((status, truncated))
    }
}

impl Default for WebFetch {
    fn default() -> Self {
        Self::new()
    }
}

/// Tool adapter exposing [`WebFetch`] to executors.
pub struct WebTool {
    fetcher: WebFetch,
}

impl WebTool {
    pub fn new(fetcher: WebFetch) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ToolAdapter for WebTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("web_fetch", "Fetch a web page and return its raw content")
            .with_parameter(
                ToolParameter::new("url", ToolParameterType::String)
                    .with_description("The URL to fetch")
                    .required(),
            )
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolResult {
        let url = match args.get("url").and_then(|v| v.as_str()) {
            Some(url) => url,
            None => return ToolResult::failure("missing required parameter: url".into()),
        };
        match self.fetcher.fetch(url).await {
            Ok((status, body)) => ToolResult::success(serde_json::json!({
                "status": status,
                "body": body,
            })),
            Err(e) => ToolResult::failure(e),
        }
    }
}
