//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_sync};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use strudel_sync_core::{PersistenceEngine, SyncConfig};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Engine owning the baseline cache for the process lifetime
    pub engine: PersistenceEngine,
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: SyncConfig::DEFAULT_HOST.to_string(),
            port: SyncConfig::DEFAULT_PORT,
            max_payload_bytes: SyncConfig::MAX_PAYLOAD_BYTES,
        }
    }
}

/// Build the router serving `/sync` and `/health`.
///
/// No CORS headers are sent. The userscript posts through the userscript
/// manager, which is not bound by CORS, so ordinary web pages stay unable to
/// reach `/sync` past the browser's preflight.
pub fn build_router(state: Arc<AppState>, max_payload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/sync", post(handle_sync))
        .layer(DefaultBodyLimit::max(max_payload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the sync HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    engine: PersistenceEngine,
    config: &ServerConfig,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState { engine });
    let app = build_router(state, config.max_payload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use strudel_sync_core::{EngineConfig, MemoryPatternStore};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const FOREIGN_ORIGIN: &str = "https://elsewhere.example";

    fn memory_router() -> (Arc<MemoryPatternStore>, Router) {
        let store = Arc::new(MemoryPatternStore::new());
        let state = Arc::new(AppState {
            engine: PersistenceEngine::new(store.clone()),
        });
        (store, build_router(state, SyncConfig::MAX_PAYLOAD_BYTES))
    }

    #[tokio::test]
    async fn test_server_starts() {
        let temp_dir = TempDir::new().unwrap();
        let engine = PersistenceEngine::from_config(&EngineConfig::new(temp_dir.path()));
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };

        let addr = start_server(engine, &config).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 13121);
        assert_eq!(config.max_payload_bytes, 50 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_preflight_from_foreign_origin_is_not_allowed() {
        let (_, router) = memory_router();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/sync")
            .header(header::ORIGIN, FOREIGN_ORIGIN)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert!(!response.status().is_success());
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_simple_cross_origin_post_writes_nothing() {
        let (store, router) = memory_router();
        // A page can send text/plain without a preflight; it must not land.
        let request = Request::builder()
            .method("POST")
            .uri("/sync")
            .header(header::ORIGIN, FOREIGN_ORIGIN)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"userPatterns":{"a":{"code":"x"}}}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
        assert_eq!(store.write_count(), 0);
    }
}
