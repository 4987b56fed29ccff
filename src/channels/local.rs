//! Local development web server: index, health check and `/api/agent`.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::channels::AppState;
use crate::channels::api::{self, ApiProfile};

/// Search grounding is off unless the request turns it on.
pub const PROFILE: ApiProfile = ApiProfile {
    name: "local",
    default_search: false,
    usage,
};

fn usage() -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "message": "Grounding Agent API is running",
        "usage": {
            "method": "POST",
            "endpoint": "/api/agent",
            "body": {
                "query": "Your question here",
                "use_search_grounding": false,
                "skip_refinement": false
            }
        },
        "example": {
            "query": "Calculate sqrt(144) and weather in Tokyo",
            "use_search_grounding": false
        }
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    api_key_configured: bool,
}

/// Routes for the local server with state applied.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .merge(api::routes(state, PROFILE))
}

async fn index_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Grounding Agent API - Local Server",
        "endpoints": {
            "GET /": "This help message",
            "GET /health": "Health check",
            "POST /api/agent": "Process a query"
        }
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        api_key_configured: state.agent.is_ready(),
    })
}
