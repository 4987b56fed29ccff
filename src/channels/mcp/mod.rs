//! Tool-call adapter exposing the agent and a subset of tools to other
//! assistants, over HTTP (`POST /mcp`) or newline-delimited JSON-RPC on stdio.

pub mod http;
pub mod stdio;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::agent::FinalResult;
use crate::channels::AppState;
use crate::error::AgentError;
use crate::tools::ToolId;

/// Tools offered by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpTool {
    ProcessQuery,
    Calculate,
    GetWeather,
    GetDatetime,
    AnalyzeText,
}

impl McpTool {
    pub const ALL: [McpTool; 5] = [
        McpTool::ProcessQuery,
        McpTool::Calculate,
        McpTool::GetWeather,
        McpTool::GetDatetime,
        McpTool::AnalyzeText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            McpTool::ProcessQuery => "process_query",
            McpTool::Calculate => "calculate",
            McpTool::GetWeather => "get_weather",
            McpTool::GetDatetime => "get_datetime",
            McpTool::AnalyzeText => "analyze_text",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            McpTool::ProcessQuery => {
                "Process a query using the grounding agent with multiple tools (calculator, \
                 weather, datetime, file ops, web scraper, text analyzer) and optional Google \
                 Search grounding. Returns a refined, factually accurate response."
            }
            McpTool::Calculate => {
                "Evaluate a mathematical expression. Supports basic math, trigonometry, \
                 logarithms, square roots, etc."
            }
            McpTool::GetWeather => "Get weather information for a specified location",
            McpTool::GetDatetime => "Get current date and time information",
            McpTool::AnalyzeText => "Analyze text content for word count, sentiment, or summary",
        }
    }

    pub fn input_schema(self) -> Value {
        match self {
            McpTool::ProcessQuery => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The query to process"
                    },
                    "use_search_grounding": {
                        "type": "boolean",
                        "description": "Whether to use Google Search for grounding (default: true)",
                        "default": true
                    },
                    "skip_refinement": {
                        "type": "boolean",
                        "description": "Skip the refinement stage (default: false)",
                        "default": false
                    }
                },
                "required": ["query"]
            }),
            McpTool::Calculate => json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Mathematical expression to evaluate (e.g., 'sqrt(144)', '2 + 2', 'sin(45)')"
                    }
                },
                "required": ["expression"]
            }),
            McpTool::GetWeather => json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City name or location (e.g., 'San Francisco', 'London')"
                    },
                    "unit": {
                        "type": "string",
                        "description": "Temperature unit: 'celsius' or 'fahrenheit'",
                        "default": "celsius"
                    }
                },
                "required": ["location"]
            }),
            McpTool::GetDatetime => json!({
                "type": "object",
                "properties": {
                    "timezone": {
                        "type": "string",
                        "description": "Timezone (default: UTC)",
                        "default": "UTC"
                    }
                },
                "required": []
            }),
            McpTool::AnalyzeText => json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "The text to analyze"
                    },
                    "analysis_type": {
                        "type": "string",
                        "description": "Type of analysis: 'word_count', 'sentiment', or 'summary'",
                        "default": "sentiment"
                    }
                },
                "required": ["text"]
            }),
        }
    }

    pub fn info(self) -> McpToolInfo {
        McpToolInfo {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for McpTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for McpTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        McpTool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

/// Catalog entry, as listed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct McpToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Every tool the adapter offers.
pub fn catalog() -> Vec<McpToolInfo> {
    McpTool::ALL.into_iter().map(McpTool::info).collect()
}

/// Result of a tool call.
#[derive(Debug, Clone)]
pub enum McpOutput {
    /// Full pipeline result from `process_query`.
    Query(Box<FinalResult>),
    /// Display string from a direct tool.
    Text(String),
}

fn str_arg<'a>(args: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn bool_arg(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Run one adapter tool. Only `process_query` needs the agent; the other
/// tools go straight to the registry.
pub async fn call_tool(
    state: &AppState,
    tool: McpTool,
    args: &Map<String, Value>,
) -> Result<McpOutput, AgentError> {
    tracing::info!(tool = %tool, "Tool call");

    let text = match tool {
        McpTool::ProcessQuery => {
            let result = state
                .agent
                .process_query(
                    str_arg(args, "query", ""),
                    bool_arg(args, "use_search_grounding", true),
                    bool_arg(args, "skip_refinement", false),
                )
                .await?;
            return Ok(McpOutput::Query(Box::new(result)));
        }
        McpTool::Calculate => {
            state
                .tools
                .invoke(
                    ToolId::Calculator,
                    json!({ "expression": str_arg(args, "expression", "") }),
                )
                .await
        }
        McpTool::GetWeather => {
            state
                .tools
                .invoke(
                    ToolId::GetWeather,
                    json!({
                        "location": str_arg(args, "location", ""),
                        "unit": str_arg(args, "unit", "celsius"),
                    }),
                )
                .await
        }
        McpTool::GetDatetime => {
            state
                .tools
                .invoke(
                    ToolId::GetCurrentDatetime,
                    json!({ "timezone": str_arg(args, "timezone", "UTC") }),
                )
                .await
        }
        McpTool::AnalyzeText => {
            state
                .tools
                .invoke(
                    ToolId::TextAnalyzer,
                    json!({
                        "text": str_arg(args, "text", ""),
                        "analysis_type": str_arg(args, "analysis_type", "sentiment"),
                    }),
                )
                .await
        }
    };

    Ok(McpOutput::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::test_support::{scripted_state, unconfigured_state};
    use crate::llm::CompletionResponse;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn text(output: McpOutput) -> String {
        match output {
            McpOutput::Text(t) => t,
            McpOutput::Query(r) => panic!("expected text, got {:?}", r),
        }
    }

    #[test]
    fn test_catalog() {
        let names: Vec<_> = catalog().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["process_query", "calculate", "get_weather", "get_datetime", "analyze_text"]
        );
        let json = serde_json::to_value(McpTool::Calculate.info()).unwrap();
        assert_eq!(json["inputSchema"]["required"], json!(["expression"]));
        assert_eq!("nope".parse::<McpTool>(), Err("Unknown tool: nope".to_string()));
    }

    #[tokio::test]
    async fn test_direct_tools_need_no_agent() {
        let state = unconfigured_state();

        let out = call_tool(&state, McpTool::Calculate, &args(json!({"expression": "2 ** 10"})))
            .await
            .unwrap();
        assert_eq!(text(out), "Result: 1024");

        let out = call_tool(
            &state,
            McpTool::GetWeather,
            &args(json!({"location": "London", "unit": "fahrenheit"})),
        )
        .await
        .unwrap();
        assert!(text(out).contains("\"temperature\": \"53.6°F\""));

        let out = call_tool(&state, McpTool::GetDatetime, &Map::new())
            .await
            .unwrap();
        assert!(text(out).contains("\"timezone\": \"UTC\""));
    }

    #[tokio::test]
    async fn test_analyze_text_defaults_to_sentiment() {
        let out = call_tool(
            &unconfigured_state(),
            McpTool::AnalyzeText,
            &args(json!({"text": "I love this! It's wonderful!"})),
        )
        .await
        .unwrap();
        assert!(text(out).contains("\"sentiment\": \"Positive\""));
    }

    #[tokio::test]
    async fn test_process_query_defaults() {
        let (state, llm) = scripted_state(vec![
            Ok(CompletionResponse::text("grounded")),
            Ok(CompletionResponse::text("refined")),
        ]);
        let out = call_tool(&state, McpTool::ProcessQuery, &args(json!({"query": "q"})))
            .await
            .unwrap();

        match out {
            McpOutput::Query(result) => assert_eq!(result.final_answer, "refined"),
            McpOutput::Text(t) => panic!("expected query result, got {}", t),
        }
        assert!(llm.requests()[0].search_grounding);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_process_query_without_key_fails() {
        let err = call_tool(
            &unconfigured_state(),
            McpTool::ProcessQuery,
            &args(json!({"query": "q"})),
        )
        .await
        .unwrap_err();
        assert!(!err.is_validation());
    }
}
