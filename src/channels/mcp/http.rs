//! Tool-call adapter over HTTP.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::channels::AppState;
use crate::channels::api::error_response;
use crate::channels::mcp::{McpOutput, McpTool, call_tool, catalog};

/// Maximum JSON body size for tool calls (64 KB).
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct McpRequest {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Routes for the adapter with state applied.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/tools", get(tools_handler))
        .route("/mcp", post(mcp_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn index_handler() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "Grounding Agent MCP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": McpTool::ALL.iter().map(|t| t.name()).collect::<Vec<_>>(),
    }))
}

async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn tools_handler() -> Json<Value> {
    Json(serde_json::json!({ "tools": catalog() }))
}

async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let req: McpRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e));
        }
    };

    let name = req.tool.unwrap_or_default();
    let tool = match name.parse::<McpTool>() {
        Ok(tool) => tool,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let arguments = req.arguments.unwrap_or_default();

    match call_tool(&state, tool, &arguments).await {
        Ok(McpOutput::Query(result)) => Json(serde_json::json!({
            "success": true,
            "result": result,
        }))
        .into_response(),
        Ok(McpOutput::Text(text)) => Json(serde_json::json!({
            "success": true,
            "result": text,
        }))
        .into_response(),
        Err(e) if e.is_validation() => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(tool = %tool, error = %e, "Tool call failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::channels::test_support::{body_json, scripted_state, unconfigured_state};
    use crate::llm::CompletionResponse;

    fn post_mcp(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_calculate() {
        let resp = routes(unconfigured_state())
            .oneshot(post_mcp(
                r#"{"tool": "calculate", "arguments": {"expression": "sqrt(144)"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"success": true, "result": "Result: 12"})
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let resp = routes(unconfigured_state())
            .oneshot(post_mcp(r#"{"tool": "rm_rf", "arguments": {}}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"success": false, "error": "Unknown tool: rm_rf"})
        );
    }

    #[tokio::test]
    async fn test_process_query_returns_full_result() {
        let (state, _) = scripted_state(vec![
            Ok(CompletionResponse::text("grounded")),
            Ok(CompletionResponse::text("refined")),
        ]);
        let resp = routes(state)
            .oneshot(post_mcp(
                r#"{"tool": "process_query", "arguments": {"query": "q"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["result"]["final_answer"], "refined");
        assert_eq!(json["result"]["grounded_response"], "grounded");
    }

    #[tokio::test]
    async fn test_process_query_without_key_is_server_error() {
        let resp = routes(unconfigured_state())
            .oneshot(post_mcp(
                r#"{"tool": "process_query", "arguments": {"query": "q"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["success"], false);
    }

    #[tokio::test]
    async fn test_catalog_routes() {
        let router = routes(unconfigured_state());

        let resp = router
            .clone()
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["tools"].as_array().unwrap().len(), 5);

        let resp = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["service"], "Grounding Agent MCP Server");
        assert_eq!(json["tools"][0], "process_query");
    }
}
