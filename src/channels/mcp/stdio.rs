//! Newline-delimited JSON-RPC 2.0 server on stdin/stdout.
//!
//! Implements the subset of the Model Context Protocol needed to list and
//! call tools: `initialize`, `notifications/initialized`, `ping`,
//! `tools/list` and `tools/call`. Logs go to stderr; stdout carries only
//! protocol messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::channels::AppState;
use crate::channels::mcp::{McpOutput, McpTool, call_tool, catalog};
use crate::error::ChannelError;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "grounding-agent";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC 2.0 request. Requests without an id are notifications.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Serve on the process's stdin and stdout until stdin closes.
pub async fn run(state: AppState) -> Result<(), ChannelError> {
    tracing::info!("MCP server ready on stdio");
    serve(
        state,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serve requests read line by line from `reader`, writing one response line
/// per request to `writer`.
pub async fn serve<R, W>(state: AppState, mut reader: R, mut writer: W) -> Result<(), ChannelError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                let line = line.trim_end();
                tracing::debug!("Received JSON-RPC message: {}", line);
                handle_line(&state, line).await
            }
            Err(e) => {
                tracing::warn!("Discarding non UTF-8 JSON-RPC message: {}", e);
                Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        };
        let Some(response) = response else {
            continue;
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    tracing::info!("stdin closed, MCP server exiting");
    Ok(())
}

async fn handle_line(state: &AppState, line: &str) -> Option<JsonRpcResponse> {
    let req: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("Failed to parse JSON-RPC request: {}", e);
            return Some(JsonRpcResponse::error(
                Value::Null,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            ));
        }
    };

    // Notifications never get a response.
    let Some(id) = req.id else {
        tracing::debug!(method = %req.method, "notification");
        return None;
    };

    if req.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::error(
            id,
            INVALID_REQUEST,
            "Invalid JSON-RPC version, expected 2.0",
        ));
    }

    let response = match req.method.as_str() {
        "initialize" => {
            let version = req
                .params
                .as_ref()
                .and_then(|p| p.get("protocolVersion"))
                .and_then(Value::as_str)
                .unwrap_or(PROTOCOL_VERSION)
                .to_string();
            JsonRpcResponse::result(
                id,
                json!({
                    "protocolVersion": version,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
        }
        "ping" => JsonRpcResponse::result(id, json!({})),
        "tools/list" => JsonRpcResponse::result(id, json!({ "tools": catalog() })),
        "tools/call" => {
            let params = match req.params.map(serde_json::from_value::<CallParams>).transpose() {
                Ok(Some(params)) => params,
                Ok(None) => {
                    return Some(JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        "Missing params for tools/call",
                    ));
                }
                Err(e) => {
                    return Some(JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    ));
                }
            };
            let text = call_text(state, &params).await;
            JsonRpcResponse::result(
                id,
                json!({
                    "content": [{ "type": "text", "text": text }],
                }),
            )
        }
        other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
    };

    Some(response)
}

/// Text content for a tool call. Failures are reported in the text.
async fn call_text(state: &AppState, params: &CallParams) -> String {
    let tool = match params.name.parse::<McpTool>() {
        Ok(tool) => tool,
        Err(message) => return message,
    };
    let arguments = params.arguments.clone().unwrap_or_default();

    match call_tool(state, tool, &arguments).await {
        Ok(McpOutput::Query(result)) => result.render_summary(),
        Ok(McpOutput::Text(text)) => text,
        Err(e) => format!("Error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::test_support::{scripted_state, unconfigured_state};
    use crate::llm::CompletionResponse;

    async fn exchange(state: AppState, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        serve(state, input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_handshake_and_list() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#,
            "\n",
        );
        let responses = exchange(unconfigured_state(), input).await;

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "grounding-agent");
        assert_eq!(
            responses[1]["result"]["tools"][0]["inputSchema"]["required"],
            json!(["query"])
        );
        assert_eq!(responses[2]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_call_text() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"calculate","arguments":{"expression":"max(3, 9) - 1"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"b","method":"tools/call","params":{"name":"shell","arguments":{}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"c","method":"tools/call","params":{"name":"process_query","arguments":{"query":"hi"}}}"#,
            "\n",
        );
        let responses = exchange(unconfigured_state(), input).await;

        let text = |i: usize| responses[i]["result"]["content"][0]["text"].clone();
        assert_eq!(text(0), "Result: 8");
        assert_eq!(text(1), "Unknown tool: shell");
        assert_eq!(
            text(2),
            "Error: GEMINI_API_KEY not found in environment variables"
        );
    }

    #[tokio::test]
    async fn test_process_query_summary() {
        let (state, _) = scripted_state(vec![Ok(CompletionResponse::text("Paris."))]);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"process_query","arguments":{"query":"capital?","skip_refinement":true}}}"#,
            "\n",
        );
        let responses = exchange(state, input).await;
        assert_eq!(responses[0]["result"]["content"][0]["text"], "Paris.");
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_keeps_session_alive() {
        let mut input = vec![0xff, 0xfe, b'\n'];
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        serve(unconfigured_state(), input.as_slice(), &mut output)
            .await
            .unwrap();
        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let responses = exchange(
            unconfigured_state(),
            r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#,
        )
        .await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 9);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = concat!(
            "{oops\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call"}"#,
            "\n",
            r#"{"jsonrpc":"1.0","id":3,"method":"ping"}"#,
            "\n",
        );
        let responses = exchange(unconfigured_state(), input).await;

        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[2]["error"]["code"], INVALID_PARAMS);
        assert_eq!(responses[3]["error"]["code"], INVALID_REQUEST);
    }
}
