//! Response DTOs for the cache HTTP surface
//!
//! Defines the structure of outgoing JSON bodies. Payload reads return raw
//! bytes and have no DTO.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for `PUT /entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct PutResponse {
    /// Success message
    pub message: String,
    /// The key that was stored
    pub key: String,
    /// Stored payload length
    pub size_bytes: u64,
}

impl PutResponse {
    pub fn new(key: impl Into<String>, size_bytes: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' stored successfully", key),
            key,
            size_bytes,
        }
    }
}

/// Response body for `DELETE /entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The key that was invalidated
    pub key: String,
}

impl InvalidateResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' invalidated", key),
            key,
        }
    }
}

/// Response body for `DELETE /entries`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateAllResponse {
    pub message: String,
}

impl InvalidateAllResponse {
    pub fn new() -> Self {
        Self {
            message: "All entries invalidated".to_string(),
        }
    }
}

impl Default for InvalidateAllResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for `POST /purge`
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    /// Number of expired keys removed
    pub removed: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self { stats, hit_rate }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when running without the disk tier
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(disk_enabled: bool) -> Self {
        Self {
            status: if disk_enabled { "healthy" } else { "degraded" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
