//! Expiry Purge Task
//!
//! Background task that periodically sweeps expired entries out of both tiers,
//! so entries nobody reads again don't hold space forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TieredCache;

/// Spawns a background task that calls `purge_expired` every
/// `interval_secs` seconds.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(TieredCache::open(CacheConfig::default()).await?);
/// let purge_handle = spawn_purge_task(cache.clone(), 30);
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task(cache: Arc<TieredCache>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting expiry purge task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            match cache.purge_expired().await {
                Ok(0) => debug!("Expiry purge: no expired entries found"),
                Ok(removed) => info!("Expiry purge: removed {} expired entries", removed),
                Err(e) => warn!(error = %e, "Expiry purge failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    async fn test_cache(root: &std::path::Path) -> Arc<TieredCache> {
        let config = CacheConfig {
            memory_capacity_bytes: 1024,
            disk_capacity_bytes: 4096,
            disk_storage_root: root.to_path_buf(),
            ..CacheConfig::default()
        };
        Arc::new(TieredCache::open(config).await.unwrap())
    }

    #[tokio::test]
    async fn test_purge_task_removes_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path()).await;

        cache
            .put("expire_soon", &b"value"[..], Some(Duration::from_secs(1)))
            .await
            .unwrap();

        let handle = spawn_purge_task(cache.clone(), 1);

        // Wait for entry to expire and the sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Removed without anyone reading it
        let stats = cache.stats();
        assert_eq!(stats.memory_entries, 0);
        assert_eq!(stats.disk_entries, 0);
        assert_eq!(stats.expirations, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_preserves_valid_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path()).await;

        cache
            .put("long_lived", &b"value"[..], Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        let handle = spawn_purge_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let value = cache.get("long_lived").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"value"[..]));

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_can_be_aborted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path()).await;

        let handle = spawn_purge_task(cache, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
