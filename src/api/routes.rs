//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    get_handler, health_handler, invalidate_all_handler, invalidate_handler, purge_handler,
    put_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /entries/:key` - Store the request body (optional `?ttl=` seconds)
/// - `GET /entries/:key` - Retrieve a payload
/// - `DELETE /entries/:key` - Invalidate one key
/// - `DELETE /entries` - Invalidate everything
/// - `POST /purge` - Sweep expired entries
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/entries/:key",
            get(get_handler).put(put_handler).delete(invalidate_handler),
        )
        .route("/entries", axum::routing::delete(invalidate_all_handler))
        .route("/purge", post(purge_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use crate::cache::TieredCache;
    use crate::config::CacheConfig;

    async fn create_test_app(root: &std::path::Path) -> Router {
        let config = CacheConfig {
            memory_capacity_bytes: 1024,
            disk_capacity_bytes: 4096,
            disk_storage_root: root.to_path_buf(),
            ..CacheConfig::default()
        };
        let cache = TieredCache::open(config).await.unwrap();
        create_router(AppState::new(Arc::new(cache)))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_test_app(dir.path()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_put_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_test_app(dir.path()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/entries/test?ttl=60")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_test_app(dir.path()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/entries/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_purge_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_test_app(dir.path()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/purge")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
