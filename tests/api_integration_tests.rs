//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a cache rooted
//! in a temporary directory.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tiered_cache::{api::create_router, AppState, CacheConfig, TieredCache};
use tower::ServiceExt;

// == Helper Functions ==

async fn create_test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig {
        memory_capacity_bytes: 1024,
        disk_capacity_bytes: 8192,
        disk_storage_root: dir.path().to_path_buf(),
        ..CacheConfig::default()
    };
    let cache = TieredCache::open(config).await.unwrap();
    (create_router(AppState::new(Arc::new(cache))), dir)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn put_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == PUT Endpoint Tests ==

#[tokio::test]
async fn test_put_endpoint_success() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .oneshot(put_request("/entries/test_key", "test_value"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "test_key");
    assert_eq!(json["size_bytes"], 10);
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_put_endpoint_rejects_zero_ttl() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .oneshot(put_request("/entries/k?ttl=0", "v"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_put_endpoint_rejects_overlong_key() {
    let (app, _dir) = create_test_app().await;
    let key = "k".repeat(300);

    let response = app
        .oneshot(put_request(&format!("/entries/{}", key), "v"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_put_endpoint_payload_too_large() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .oneshot(put_request("/entries/huge", vec![0u8; 10_000]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let (app, _dir) = create_test_app().await;
    let payload: Vec<u8> = (0u8..=255).collect();

    let response = app
        .clone()
        .oneshot(put_request("/entries/binary", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", "/entries/binary"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(body_to_bytes(response.into_body()).await, payload);
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .oneshot(empty_request("GET", "/entries/nonexistent"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_put_overwrites_value() {
    let (app, _dir) = create_test_app().await;

    for value in ["first", "second"] {
        let response = app
            .clone()
            .oneshot(put_request("/entries/k", value))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(empty_request("GET", "/entries/k"))
        .await
        .unwrap();
    assert_eq!(body_to_bytes(response.into_body()).await, b"second");
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_endpoint_success() {
    let (app, _dir) = create_test_app().await;

    app.clone()
        .oneshot(put_request("/entries/to_delete", "v"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/entries/to_delete"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", "/entries/to_delete"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalidate_endpoint_absent_key_is_ok() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .oneshot(empty_request("DELETE", "/entries/never_stored"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalidate_all_endpoint() {
    let (app, _dir) = create_test_app().await;

    for key in ["a", "b", "c"] {
        app.clone()
            .oneshot(put_request(&format!("/entries/{}", key), "v"))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/entries"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for key in ["a", "b", "c"] {
        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/entries/{}", key)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

// == Stats Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (app, _dir) = create_test_app().await;

    app.clone()
        .oneshot(put_request("/entries/s", "value"))
        .await
        .unwrap();
    app.clone()
        .oneshot(empty_request("GET", "/entries/s"))
        .await
        .unwrap();
    app.clone()
        .oneshot(empty_request("GET", "/entries/missing"))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("GET", "/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["memory_hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["memory_entries"], 1);
    assert_eq!(json["disk_entries"], 1);
    assert_eq!(json["disk_enabled"], true);
    assert_eq!(json["hit_rate"], 0.5);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Expiry Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(put_request("/entries/short?ttl=1", "v"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app
        .oneshot(empty_request("GET", "/entries/short"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_endpoint_accepts_huge_ttl() {
    let (app, _dir) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(put_request("/entries/forever?ttl=18446744073709552", "v"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(600)).await;

    let response = app
        .oneshot(empty_request("GET", "/entries/forever"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_purge_endpoint_counts_expired() {
    let (app, _dir) = create_test_app().await;

    app.clone()
        .oneshot(put_request("/entries/gone?ttl=1", "v"))
        .await
        .unwrap();
    app.clone()
        .oneshot(put_request("/entries/kept?ttl=60", "v"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app
        .oneshot(empty_request("POST", "/purge"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 1);
}
