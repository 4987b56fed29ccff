//! The `/api/agent` endpoint shared by the local and serverless front ends.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::agent::FinalResult;
use crate::channels::AppState;

/// Maximum JSON body size for agent requests (64 KB).
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Per-front-end behavior of the endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ApiProfile {
    pub name: &'static str,
    /// Search grounding when the request does not say.
    pub default_search: bool,
    /// Document returned by `GET /api/agent`.
    pub usage: fn() -> serde_json::Value,
}

#[derive(Clone)]
struct ApiState {
    app: AppState,
    profile: ApiProfile,
}

/// Body of `POST /api/agent`.
#[derive(Debug, Default, Deserialize)]
pub struct AgentRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub use_search_grounding: Option<bool>,
    #[serde(default)]
    pub skip_refinement: Option<bool>,
}

/// Successful answer to `POST /api/agent`.
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub success: bool,
    pub query: String,
    pub answer: String,
    pub grounded_response: String,
    pub refined_response: Option<String>,
    pub tools_used: Vec<String>,
    pub sources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<FinalResult> for AgentResponse {
    fn from(result: FinalResult) -> Self {
        Self {
            success: result.is_success(),
            tools_used: result.tools_used(),
            sources: result.source_count(),
            query: result.query,
            answer: result.final_answer,
            grounded_response: result.grounded_response,
            refined_response: result.refined_response,
            error: result.error,
        }
    }
}

/// Routes for `/api/agent` with state and CORS applied.
pub fn routes(app: AppState, profile: ApiProfile) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/api/agent",
            get(usage_handler)
                .post(query_handler)
                .options(preflight_handler),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(ApiState { app, profile })
}

async fn usage_handler(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json((state.profile.usage)())
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn query_handler(State(state): State<ApiState>, body: Bytes) -> Response {
    let req: AgentRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e));
        }
    };

    let query = req.query.unwrap_or_default();
    let use_search = req
        .use_search_grounding
        .unwrap_or(state.profile.default_search);
    let skip_refinement = req.skip_refinement.unwrap_or(false);

    match state
        .app
        .agent
        .process_query(&query, use_search, skip_refinement)
        .await
    {
        Ok(result) => Json(AgentResponse::from(result)).into_response(),
        Err(e) if e.is_validation() => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(front_end = state.profile.name, error = %e, "Agent request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `{success: false, error}` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::channels::test_support::{body_json, scripted_state, unconfigured_state};
    use crate::llm::CompletionResponse;

    const PROFILE: ApiProfile = ApiProfile {
        name: "test",
        default_search: true,
        usage: || serde_json::json!({"status": "ok"}),
    };

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/agent")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_runs_pipeline() {
        let (state, llm) = scripted_state(vec![
            Ok(CompletionResponse::text("grounded")),
            Ok(CompletionResponse::text("refined")),
        ]);
        let router = routes(state, PROFILE);

        let resp = router
            .oneshot(post(r#"{"query": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["query"], "hello");
        assert_eq!(json["answer"], "refined");
        assert_eq!(json["grounded_response"], "grounded");
        assert_eq!(json["tools_used"], serde_json::json!([]));
        assert_eq!(json["sources"], 0);
        assert!(llm.requests()[0].search_grounding);
    }

    #[tokio::test]
    async fn test_request_flags_override_profile() {
        let (state, llm) = scripted_state(vec![Ok(CompletionResponse::text("only"))]);
        let router = routes(state, PROFILE);

        let resp = router
            .oneshot(post(
                r#"{"query": "hi", "use_search_grounding": false, "skip_refinement": true}"#,
            ))
            .await
            .unwrap();
        let json = body_json(resp).await;

        assert_eq!(json["answer"], "only");
        assert_eq!(json["refined_response"], serde_json::Value::Null);
        assert_eq!(llm.call_count(), 1);
        assert!(!llm.requests()[0].search_grounding);
    }

    #[tokio::test]
    async fn test_stage_failure_reports_unsuccessful() {
        let (state, _) = scripted_state(vec![Err(crate::error::LlmError::AuthFailed {
            provider: "google".to_string(),
        })]);
        let resp = routes(state, PROFILE)
            .oneshot(post(r#"{"query": "hi"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["answer"], "Error: Authentication failed for google");
    }

    #[tokio::test]
    async fn test_missing_query_is_bad_request() {
        let (state, llm) = scripted_state(vec![]);
        let router = routes(state, PROFILE);

        for body in [r#"{}"#, r#"{"query": "  "}"#] {
            let resp = router.clone().oneshot(post(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let json = body_json(resp).await;
            assert_eq!(json["success"], false);
            assert_eq!(json["error"], "Missing 'query' parameter");
        }
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (state, _) = scripted_state(vec![]);
        let resp = routes(state, PROFILE)
            .oneshot(post("{not json"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_server_error() {
        let resp = routes(unconfigured_state(), PROFILE)
            .oneshot(post(r#"{"query": "hi"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(
            json["error"],
            "GEMINI_API_KEY not found in environment variables"
        );
    }

    #[tokio::test]
    async fn test_get_and_preflight() {
        let router = routes(unconfigured_state(), PROFILE);

        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/agent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");

        let resp = router
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/agent")
                    .header("origin", "https://example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"));
    }
}
