//! Tool adapter abstraction.
//!
//! An executor's capabilities are a set of named tools. Each tool advertises
//! its identity, description, and parameter schema through [`ToolMetadata`]
//! and executes through the [`ToolAdapter`] trait. A [`ToolRegistry`] holds
//! the adapters for one executor and routes invocations by name.
//!
//! Tool failures never cross the registry boundary as errors: every outcome,
//! including "no such tool", comes back as a [`ToolResult`] that the executor
//! feeds into the model's conversation. Sandboxed tools additionally promise
//! that timeouts and resource-cap hits are reported the same way.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::json;
//! use taskforce::tool_protocol::{
//!     ToolAdapter, ToolMetadata, ToolParameter, ToolParameterType, ToolRegistry, ToolResult,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ToolAdapter for Echo {
//!     fn metadata(&self) -> ToolMetadata {
//!         ToolMetadata::new("echo", "Echoes its input back").with_parameter(
//!             ToolParameter::new("text", ToolParameterType::String).required(),
//!         )
//!     }
//!
//!     async fn invoke(&self, args: serde_json::Value) -> ToolResult {
//!         ToolResult::success(json!({ "echo": args["text"] }))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut registry = ToolRegistry::new();
//!     registry.register(Arc::new(Echo));
//!     let result = registry.invoke("echo", json!({"text": "hi"})).await;
//!     assert!(result.success);
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Represents the result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool execution was successful.
    pub success: bool,
    /// The output data from the tool.
    pub output: serde_json::Value,
    /// Optional error message if execution failed.
    pub error: Option<String>,
    /// Metadata about the execution (timing, etc.).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ToolResult {
    /// Convenience constructor for successful tool execution.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Convenience constructor for failed tool execution.
    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error),
            metadata: HashMap::new(),
        }
    }

    /// Attach application specific metadata to the result.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Render the result as the JSON object fed back into the executor's
    /// conversation: the output on success, `{"error": ...}` otherwise.
    pub fn to_conversation_payload(&self) -> serde_json::Value {
        if self.success {
            self.output.clone()
        } else {
            serde_json::json!({
                "error": self.error.clone().unwrap_or_else(|| "unknown error".to_string())
            })
        }
    }
}

/// Defines the type of a tool parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// Defines a parameter for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ToolParameterType,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<serde_json::Value>,
}

impl ToolParameter {
    /// Define a new tool parameter with the provided name and type.
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
            default: None,
        }
    }

    /// Add a human readable description that will surface in generated schemas.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the argument as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Provide a default value used when the model omits the parameter.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Metadata about a tool: its name, description, and accepted parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// Create metadata with the supplied identifier and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter definition.
    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Render the accepted parameters as a JSON-Schema style object.
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            let type_name = match param.param_type {
                ToolParameterType::String => "string",
                ToolParameterType::Number => "number",
                ToolParameterType::Integer => "integer",
                ToolParameterType::Boolean => "boolean",
                ToolParameterType::Array => "array",
                ToolParameterType::Object => "object",
            };
            let mut schema = serde_json::Map::new();
            schema.insert("type".into(), type_name.into());
            if let Some(desc) = &param.description {
                schema.insert("description".into(), desc.clone().into());
            }
            if let Some(default) = &param.default {
                schema.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), serde_json::Value::Object(schema));
            if param.required {
                required.push(serde_json::Value::String(param.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Trait implemented by every tool an executor can call.
///
/// Invocation is async and infallible at the type level: failures are encoded
/// in the returned [`ToolResult`], never thrown, so a broken tool degrades
/// into a message the model can react to.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Static metadata describing the tool interface.
    fn metadata(&self) -> ToolMetadata;

    /// Execute the tool with the given JSON arguments.
    async fn invoke(&self, args: serde_json::Value) -> ToolResult;
}

/// Registry of the tools available to one executor.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolAdapter>>,
    /// Registration order, used for stable prompt rendering.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool adapter under its metadata name.
    ///
    /// Re-registering a name replaces the previous adapter.
    pub fn register(&mut self, adapter: Arc<dyn ToolAdapter>) {
        let name = adapter.metadata().name;
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, adapter);
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Metadata for every registered tool, in registration order.
    pub fn list(&self) -> Vec<ToolMetadata> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.metadata())
            .collect()
    }

    /// Render the tool roster for an executor prompt.
    pub fn describe_for_prompt(&self) -> String {
        let mut out = String::new();
        for metadata in self.list() {
            out.push_str(&format!("- {}: {}\n", metadata.name, metadata.description));
            if !metadata.parameters.is_empty() {
                out.push_str("  Parameters:\n");
                for param in &metadata.parameters {
                    out.push_str(&format!(
                        "    - {} ({:?}{}): {}\n",
                        param.name,
                        param.param_type,
                        if param.required { ", required" } else { "" },
                        param.description.as_deref().unwrap_or("no description"),
                    ));
                }
            }
        }
        out
    }

    /// Execute a tool by name.
    ///
    /// An unknown name comes back as a failed [`ToolResult`], not an error,
    /// so the model sees what went wrong and can pick another tool.
    pub async fn invoke(&self, name: &str, args: serde_json::Value) -> ToolResult {
        match self.tools.get(name) {
            Some(tool) => tool.invoke(args).await,
            None => ToolResult::failure(format!("Tool not found: {}", name)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
