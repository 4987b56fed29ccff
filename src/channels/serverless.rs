//! Serverless-style function handler: `/api/agent` only.

use axum::Router;

use crate::channels::AppState;
use crate::channels::api::{self, ApiProfile};

/// Search grounding is on unless the request turns it off.
pub const PROFILE: ApiProfile = ApiProfile {
    name: "serverless",
    default_search: true,
    usage,
};

fn usage() -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "message": "Grounding Agent API is running",
        "endpoints": {
            "POST /api/agent": "Process a query with the grounding agent"
        },
        "example_request": {
            "query": "What is the weather in London?",
            "use_search_grounding": false
        }
    })
}

/// Routes for the function handler with state applied.
pub fn routes(state: AppState) -> Router {
    api::routes(state, PROFILE)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::channels::test_support::{body_json, scripted_state};
    use crate::llm::CompletionResponse;

    #[tokio::test]
    async fn test_get_is_health_document() {
        let (state, _) = scripted_state(vec![]);
        let resp = routes(state)
            .oneshot(
                Request::builder()
                    .uri("/api/agent")
                    .header("origin", "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .map(|v| v.to_str().unwrap()),
            Some("*")
        );
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["example_request"].is_object());
    }

    #[tokio::test]
    async fn test_search_defaults_on() {
        let (state, llm) = scripted_state(vec![Ok(CompletionResponse::text("a"))]);
        let resp = routes(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/agent")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "q", "skip_refinement": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(llm.requests()[0].search_grounding);
    }

    #[tokio::test]
    async fn test_no_other_routes() {
        let (state, _) = scripted_state(vec![]);
        let resp = routes(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
