//! Tool trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool execution.
///
/// Each variant's `Display` is the exact string handed back to the model,
/// since tool failures are reported as results rather than propagated.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Error: missing '{0}' parameter")]
    MissingParameter(&'static str),

    #[error("Error calculating expression: {0}")]
    Evaluation(String),

    #[error("Error: File '{0}' does not exist")]
    FileNotFound(String),

    #[error("Error: '{0}' is not a directory")]
    NotADirectory(String),

    #[error("Error: Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Error performing file operation: {0}")]
    FileOperation(String),

    #[error("Extraction type '{0}' not supported")]
    UnsupportedExtraction(String),

    #[error("Error fetching URL: {0}")]
    Fetch(String),

    #[error("Analysis type '{0}' not supported")]
    UnsupportedAnalysis(String),

    #[error("Error: {0}")]
    ExecutionFailed(String),
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::FileOperation(err.to_string())
    }
}

/// Definition of a tool's parameters using JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Trait for tools that the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get a description of what the tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError>;

    /// Get the tool schema for LLM function calling.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Read a required string parameter.
pub(crate) fn require_str<'a>(
    params: &'a serde_json::Value,
    key: &'static str,
) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or(ToolError::MissingParameter(key))
}

/// Read an optional string parameter, falling back to `default`.
pub(crate) fn optional_str<'a>(
    params: &'a serde_json::Value,
    key: &str,
    default: &'a str,
) -> &'a str {
    params.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}
