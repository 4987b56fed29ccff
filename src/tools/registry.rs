//! Tagged tool registry.
//!
//! The set of tools is fixed at compile time: [`ToolId`] names every tool and
//! [`ToolRegistry`] maps each id to its handler, whose schema and description
//! come from the [`Tool`] implementation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llm::ToolDefinition;
use crate::tools::builtin::{
    CalculatorTool, FileTool, TextAnalyzerTool, TimeTool, WeatherTool, WebScraperTool,
};
use crate::tools::tool::Tool;

/// Stable identifiers for the built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Calculator,
    GetCurrentDatetime,
    GetWeather,
    FileOperations,
    WebScraper,
    TextAnalyzer,
}

impl ToolId {
    /// All tools, in registration order.
    pub const ALL: [ToolId; 6] = [
        ToolId::Calculator,
        ToolId::GetCurrentDatetime,
        ToolId::GetWeather,
        ToolId::FileOperations,
        ToolId::WebScraper,
        ToolId::TextAnalyzer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolId::Calculator => "calculator",
            ToolId::GetCurrentDatetime => "get_current_datetime",
            ToolId::GetWeather => "get_weather",
            ToolId::FileOperations => "file_operations",
            ToolId::WebScraper => "web_scraper",
            ToolId::TextAnalyzer => "text_analyzer",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

struct Entry {
    id: ToolId,
    tool: Arc<dyn Tool>,
}

/// Registry of the built-in tools.
pub struct ToolRegistry {
    entries: Vec<Entry>,
}

impl ToolRegistry {
    /// Build the registry with every built-in tool.
    pub fn builtin() -> Self {
        let entries = ToolId::ALL
            .into_iter()
            .map(|id| {
                let tool: Arc<dyn Tool> = match id {
                    ToolId::Calculator => Arc::new(CalculatorTool),
                    ToolId::GetCurrentDatetime => Arc::new(TimeTool),
                    ToolId::GetWeather => Arc::new(WeatherTool),
                    ToolId::FileOperations => Arc::new(FileTool),
                    ToolId::WebScraper => Arc::new(WebScraperTool::new()),
                    ToolId::TextAnalyzer => Arc::new(TextAnalyzerTool),
                };
                debug_assert_eq!(tool.name(), id.as_str());
                Entry { id, tool }
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tool names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn get(&self, id: ToolId) -> Option<&Arc<dyn Tool>> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.tool)
    }

    /// Function declarations for the generation model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries
            .iter()
            .map(|e| {
                let schema = e.tool.schema();
                ToolDefinition {
                    name: schema.name,
                    description: schema.description,
                    parameters: schema.parameters,
                }
            })
            .collect()
    }

    /// One line per tool: `- name: first line of description`.
    pub fn descriptions(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                let first = e.tool.description().lines().next().unwrap_or_default();
                format!("- {}: {}", e.id, first)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a tool. Failures come back as the tool's error string.
    pub async fn invoke(&self, id: ToolId, params: serde_json::Value) -> String {
        let Some(tool) = self.get(id) else {
            return format!("Unknown tool: {}", id);
        };

        let start = std::time::Instant::now();
        match tool.execute(params).await {
            Ok(output) => {
                tracing::debug!(tool = %id, elapsed = ?start.elapsed(), "tool succeeded");
                output
            }
            Err(e) => {
                tracing::warn!(tool = %id, error = %e, "tool failed");
                e.to_string()
            }
        }
    }

    /// Run a tool requested by name, as the model does.
    pub async fn invoke_by_name(&self, name: &str, params: serde_json::Value) -> String {
        match name.parse::<ToolId>() {
            Ok(id) => self.invoke(id, params).await,
            Err(message) => message,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
