//! Request handlers for the sync endpoint.
//!
//! Response bodies follow the shape the browser client expects:
//! `{success: bool, ...data, error?: string}`.

use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use strudel_sync_core::SyncOutcome;
use tracing::{debug, error, warn};

/// Message returned when the payload carries no snapshot.
pub const NO_PATTERNS_MESSAGE: &str = "No patterns found";

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Persist the patterns carried by a `localStorage` dump (or an explicit
/// `userPatterns` envelope).
pub async fn handle_sync(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!("Rejected sync request: {}", rejection.body_text());
            return failure(rejection.status(), rejection.body_text());
        }
    };

    match state.engine.apply_payload(&payload).await {
        Ok(SyncOutcome::Applied(result)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "count": result.count,
                "written": result.written,
            })),
        )
            .into_response(),
        Ok(SyncOutcome::NothingToSync) => {
            debug!("Sync request carried no patterns");
            (
                StatusCode::OK,
                Json(json!({
                    "success": false,
                    "message": NO_PATTERNS_MESSAGE,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Sync error: {}", e);
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            failure(status, e.to_string())
        }
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use strudel_sync_core::{MemoryPatternStore, PersistenceEngine};
    use tower::ServiceExt;

    fn test_router(max_payload_bytes: usize) -> (Arc<MemoryPatternStore>, Router) {
        let store = Arc::new(MemoryPatternStore::new());
        let state = Arc::new(AppState {
            engine: PersistenceEngine::new(store.clone()),
        });
        (store, build_router(state, max_payload_bytes))
    }

    async fn post_sync(router: Router, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/sync")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_sync_success_shape() {
        let (store, router) = test_router(1024);
        let payload = json!({ "userPatterns": { "a": { "code": "s(\"bd\")" } } });

        let (status, body) = post_sync(router.clone(), payload.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "count": 1, "written": 1 }));
        assert_eq!(store.get("a").as_deref(), Some("s(\"bd\")"));

        let (_, body) = post_sync(router, payload.to_string()).await;
        assert_eq!(body["written"], 0);
    }

    #[tokio::test]
    async fn test_sync_without_patterns() {
        let (_, router) = test_router(1024);
        let (status, body) = post_sync(router, json!({ "theme": "dark" }).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": false, "message": "No patterns found" })
        );
    }

    #[tokio::test]
    async fn test_sync_rejects_traversal() {
        let (store, router) = test_router(1024);
        let payload = json!({ "userPatterns": { "../../etc/passwd": { "code": "x" } } });

        let (status, body) = post_sync(router, payload.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Invalid pattern identifier"));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_sync_rejects_malformed_snapshot() {
        let (_, router) = test_router(1024);
        let payload = json!({ "userPatterns": "{not json" });
        let (status, body) = post_sync(router, payload.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Malformed"));
    }

    #[tokio::test]
    async fn test_sync_rejects_invalid_json() {
        let (_, router) = test_router(1024);
        let (status, body) = post_sync(router, "{\"userPatterns\":").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_sync_rejects_oversized_body() {
        let (store, router) = test_router(64);
        let payload = json!({ "userPatterns": { "a": { "code": "x".repeat(256) } } });

        let (status, body) = post_sync(router, payload.to_string()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_health() {
        let (_, router) = test_router(1024);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
