//! Tiered Cache - a two-tier binary asset cache
//!
//! A bounded in-memory tier backed by a bounded, persistent on-disk tier, with
//! TTL expiration, capacity eviction, read-through promotion and write-through
//! persistence. Disk failures degrade the cache to memory-only operation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::TieredCache;
pub use config::CacheConfig;
pub use error::CacheError;
pub use tasks::spawn_purge_task;
