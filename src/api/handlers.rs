//! API Handlers
//!
//! HTTP request handlers, each a thin adapter over one `TieredCache` operation.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::TieredCache;
use crate::error::{CacheError, Result};
use crate::models::{
    HealthResponse, InvalidateAllResponse, InvalidateResponse, PurgeResponse, PutParams,
    PutResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The cache engine; internally synchronized
    pub cache: Arc<TieredCache>,
}

impl AppState {
    pub fn new(cache: Arc<TieredCache>) -> Self {
        Self { cache }
    }
}

/// Handler for PUT /entries/:key
///
/// Stores the raw request body under `key`, with an optional `?ttl=` in seconds.
pub async fn put_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<PutParams>,
    body: Bytes,
) -> Result<Json<PutResponse>> {
    let ttl = params.ttl()?;
    let size_bytes = body.len() as u64;
    state.cache.put(&key, body, ttl).await?;

    Ok(Json(PutResponse::new(key, size_bytes)))
}

/// Handler for GET /entries/:key
///
/// Returns the payload as `application/octet-stream`, or 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    match state.cache.get(&key).await? {
        Some(payload) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            payload,
        )
            .into_response()),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /entries/:key
///
/// Idempotent: invalidating an absent key still succeeds.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    state.cache.invalidate(&key).await?;
    Ok(Json(InvalidateResponse::new(key)))
}

/// Handler for DELETE /entries
pub async fn invalidate_all_handler(
    State(state): State<AppState>,
) -> Result<Json<InvalidateAllResponse>> {
    state.cache.invalidate_all().await?;
    Ok(Json(InvalidateAllResponse::new()))
}

/// Handler for POST /purge
pub async fn purge_handler(State(state): State<AppState>) -> Result<Json<PurgeResponse>> {
    let removed = state.cache.purge_expired().await?;
    Ok(Json(PurgeResponse { removed }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
///
/// Reports "degraded" when the disk tier is unavailable.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.cache.disk_tier().is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    async fn test_state(root: &std::path::Path) -> AppState {
        let config = CacheConfig {
            memory_capacity_bytes: 1024,
            disk_capacity_bytes: 4096,
            disk_storage_root: root.to_path_buf(),
            ..CacheConfig::default()
        };
        AppState::new(Arc::new(TieredCache::open(config).await.unwrap()))
    }

    #[tokio::test]
    async fn test_put_and_get_handler() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let result = put_handler(
            State(state.clone()),
            Path("test_key".to_string()),
            Query(PutParams::default()),
            Bytes::from_static(b"test_value"),
        )
        .await;
        assert_eq!(result.unwrap().size_bytes, 10);

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        state.cache.put("to_drop", &b"v"[..], None).await.unwrap();
        invalidate_handler(State(state.clone()), Path("to_drop".to_string()))
            .await
            .unwrap();

        let result = get_handler(State(state), Path("to_drop".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_put_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let result = put_handler(
            State(state),
            Path("huge".to_string()),
            Query(PutParams::default()),
            Bytes::from(vec![0u8; 5000]),
        )
        .await;
        assert!(matches!(result, Err(CacheError::CapacityExceeded { .. })));
    }

    #[tokio::test]
    async fn test_stats_and_health_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let stats = stats_handler(State(state.clone())).await;
        assert_eq!(stats.stats.misses, 0);
        assert_eq!(stats.hit_rate, 0.0);

        let health = health_handler(State(state)).await;
        assert_eq!(health.status, "healthy");
    }
}
