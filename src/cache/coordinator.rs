//! Tiered Cache Coordinator
//!
//! Front door of the engine. Reads consult memory, then disk, promoting disk
//! hits; writes go through to both tiers; invalidation and purging reach both.
//!
//! Concurrency model:
//! - Operations on one key are serialized by a striped key lock, so a reader
//!   never sees a half-applied put or a promotion racing an invalidation.
//! - Each tier serializes its own size accounting.
//! - `invalidate_all` takes the gate exclusively; everything else shares it,
//!   so no caller observes a partially cleared cache.
//! - The disk tier is optional at runtime: any disk failure is logged and the
//!   cache keeps serving from memory.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::expiration::is_expired;
use crate::cache::{
    current_timestamp_ms, duration_ms, CacheCounters, CacheEntry, CacheKey, CacheStats, DiskTier,
    KeyLocks, MemoryTier, Tier,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Tiered Cache ==
#[derive(Debug)]
pub struct TieredCache {
    config: CacheConfig,
    memory: Arc<dyn Tier>,
    disk: Option<Arc<dyn Tier>>,
    locks: KeyLocks,
    gate: RwLock<()>,
    counters: CacheCounters,
}

impl TieredCache {
    // == Open ==
    /// Builds the memory tier and opens the disk tier at
    /// `config.disk_storage_root`. A disk tier that fails to open leaves the
    /// cache running memory-only.
    pub async fn open(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let memory: Arc<dyn Tier> = Arc::new(MemoryTier::new(
            config.memory_capacity_bytes,
            config.eviction_policy,
        ));

        let disk = match DiskTier::open(
            &config.disk_storage_root,
            config.disk_capacity_bytes,
            config.eviction_policy,
        )
        .await
        {
            Ok(disk) => Some(Arc::new(disk) as Arc<dyn Tier>),
            Err(e) => {
                warn!(
                    root = %config.disk_storage_root.display(),
                    error = %e,
                    "disk tier unavailable, running memory-only"
                );
                None
            }
        };

        Ok(Self::with_tiers(config, memory, disk))
    }

    /// Assembles a cache from arbitrary tiers.
    pub fn with_tiers(
        config: CacheConfig,
        memory: Arc<dyn Tier>,
        disk: Option<Arc<dyn Tier>>,
    ) -> Self {
        info!(
            memory_capacity = memory.capacity_bytes(),
            disk_capacity = disk.as_ref().map(|d| d.capacity_bytes()),
            policy = %config.eviction_policy,
            "tiered cache ready"
        );
        Self {
            config,
            memory,
            disk,
            locks: KeyLocks::default(),
            gate: RwLock::new(()),
            counters: CacheCounters::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn memory_tier(&self) -> &Arc<dyn Tier> {
        &self.memory
    }

    pub fn disk_tier(&self) -> Option<&Arc<dyn Tier>> {
        self.disk.as_ref()
    }

    // == Get ==
    /// Looks up a payload, using the configured disk deadline.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.get_with_timeout(key, self.config.disk_timeout).await
    }

    /// Looks up a payload. A disk lookup that fails or exceeds `timeout` is
    /// reported as a miss.
    pub async fn get_with_timeout(&self, key: &str, timeout: Duration) -> Result<Option<Bytes>> {
        let key = CacheKey::new(key)?;
        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;
        let now = current_timestamp_ms();

        if let Some(entry) = self.memory.get(&key).await? {
            if is_expired(&entry, now) {
                self.memory.remove(&key).await?;
                self.counters.record_expirations(1);
                self.counters.record_miss();
                debug!(key = %key, "expired in memory tier");
                return Ok(None);
            }
            self.memory.record_access(&key).await;
            self.counters.record_memory_hit();
            return Ok(Some(entry.into_payload()));
        }

        let Some(disk) = &self.disk else {
            self.counters.record_miss();
            return Ok(None);
        };

        let entry = match with_deadline("disk get", timeout, disk.get(&key)).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.counters.record_miss();
                return Ok(None);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "disk lookup failed, treating as miss");
                self.counters.record_disk_error();
                self.counters.record_miss();
                return Ok(None);
            }
        };

        if is_expired(&entry, now) {
            if let Err(e) = disk.remove(&key).await {
                warn!(key = %key, error = %e, "failed to remove expired disk entry");
            }
            self.counters.record_expirations(1);
            self.counters.record_miss();
            debug!(key = %key, "expired in disk tier");
            return Ok(None);
        }

        disk.record_access(&key).await;
        self.counters.record_disk_hit();
        let payload = entry.payload().clone();
        self.promote(entry).await;
        Ok(Some(payload))
    }

    async fn promote(&self, entry: CacheEntry) {
        let key = entry.key().clone();
        match self.memory.put(entry).await {
            Ok(evicted) => {
                self.counters.record_promotion();
                self.counters.record_evictions(evicted.len());
                debug!(key = %key, evicted = evicted.len(), "promoted disk hit to memory");
            }
            Err(e) => debug!(key = %key, error = %e, "disk hit not promoted"),
        }
    }

    /// True if a live entry exists in either tier. Does not promote, touch
    /// eviction order, or count as a hit.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let key = CacheKey::new(key)?;
        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;
        let now = current_timestamp_ms();

        if let Some(entry) = self.memory.get(&key).await? {
            return Ok(!is_expired(&entry, now));
        }
        match &self.disk {
            Some(disk) => Ok(
                match with_deadline("disk get", self.config.disk_timeout, disk.get(&key)).await {
                    Ok(Some(entry)) => !is_expired(&entry, now),
                    _ => false,
                },
            ),
            None => Ok(false),
        }
    }

    // == Put ==
    /// Stores a payload in both tiers, using the configured disk deadline.
    ///
    /// `ttl` of None falls back to `config.default_ttl`.
    pub async fn put(&self, key: &str, payload: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        self.put_with_timeout(key, payload, ttl, self.config.disk_timeout)
            .await
    }

    /// Stores a payload in both tiers.
    ///
    /// Memory is authoritative: if persisting fails or exceeds `timeout`, the
    /// put still succeeds and any older disk copy of the key is dropped so it
    /// can never resurface. Payloads too large for memory but small enough for
    /// disk are written to disk only.
    pub async fn put_with_timeout(
        &self,
        key: &str,
        payload: impl Into<Bytes>,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Result<()> {
        let key = CacheKey::new(key)?;
        let entry = CacheEntry::new(key.clone(), payload, ttl.or(self.config.default_ttl));
        let size = entry.size_bytes();

        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;

        let fits_memory = size <= self.memory.capacity_bytes();
        let disk = self
            .disk
            .as_ref()
            .filter(|disk| size <= disk.capacity_bytes());

        match (fits_memory, disk) {
            (false, None) => {
                let (tier, capacity_bytes) = match &self.disk {
                    Some(disk) => (disk.name(), disk.capacity_bytes()),
                    None => (self.memory.name(), self.memory.capacity_bytes()),
                };
                Err(CacheError::CapacityExceeded {
                    tier,
                    size_bytes: size,
                    capacity_bytes,
                })
            }
            (false, Some(disk)) => {
                // The older, smaller value must not outlive this write in memory
                self.memory.remove(&key).await?;
                match with_deadline("disk put", timeout, disk.put(entry)).await {
                    Ok(evicted) => {
                        self.counters.record_evictions(evicted.len());
                        debug!(key = %key, size, "stored on disk only");
                        Ok(())
                    }
                    Err(e) => {
                        // A publish already under way still lands; the caller was told it failed
                        self.discard_disk_copy(disk, &key).await;
                        Err(e)
                    }
                }
            }
            (true, disk) => {
                let evicted = self.memory.put(entry.clone()).await?;
                self.counters.record_evictions(evicted.len());

                match disk {
                    Some(disk) => match with_deadline("disk put", timeout, disk.put(entry)).await {
                        Ok(evicted) => self.counters.record_evictions(evicted.len()),
                        Err(e) => {
                            warn!(key = %key, error = %e, "persist failed, memory copy is authoritative");
                            self.counters.record_persist_failure();
                            self.discard_disk_copy(disk, &key).await;
                        }
                    },
                    None => {
                        if let Some(disk) = &self.disk {
                            self.discard_disk_copy(disk, &key).await;
                        }
                    }
                }

                debug!(key = %key, size, "stored");
                Ok(())
            }
        }
    }

    /// Drops the persisted copy of a key whose newest value is not on disk.
    ///
    /// Not bounded by a deadline: abandoning it could let a stale value win.
    /// The disk tier finishes any in-flight publish of the key first.
    async fn discard_disk_copy(&self, disk: &Arc<dyn Tier>, key: &CacheKey) {
        if let Err(e) = disk.remove(key).await {
            warn!(key = %key, error = %e, "failed to drop stale disk copy");
        }
    }

    // == Invalidate ==
    /// Removes a key from both tiers. Absent keys are not an error.
    ///
    /// Fails with `StorageUnavailable` when the disk tier could not make the
    /// removal durable. The key is still gone for this process.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        let key = CacheKey::new(key)?;
        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;

        self.memory.remove(&key).await?;
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(&key).await {
                warn!(key = %key, error = %e, "disk invalidation incomplete");
                return Err(e);
            }
        }

        debug!(key = %key, "invalidated");
        Ok(())
    }

    // == Invalidate All ==
    /// Clears both tiers while holding every other operation off.
    ///
    /// Fails with `StorageUnavailable` when some disk removals could not be
    /// made durable.
    pub async fn invalidate_all(&self) -> Result<()> {
        let _gate = self.gate.write().await;

        let memory_cleared = self.memory.clear().await?;
        let disk_cleared = match &self.disk {
            Some(disk) => match disk.clear().await {
                Ok(count) => count,
                Err(e) => {
                    warn!(error = %e, "disk clear incomplete");
                    return Err(e);
                }
            },
            None => 0,
        };

        info!(memory_cleared, disk_cleared, "cache invalidated");
        Ok(())
    }

    // == Purge Expired ==
    /// Removes every expired entry from both tiers without reading them.
    ///
    /// Returns the number of distinct keys removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let _gate = self.gate.read().await;
        let now = current_timestamp_ms();

        let mut removed: HashSet<CacheKey> =
            self.memory.remove_expired(now).await?.into_iter().collect();

        if let Some(disk) = &self.disk {
            match disk.remove_expired(now).await {
                Ok(keys) => removed.extend(keys),
                Err(e) => warn!(error = %e, "disk purge failed"),
            }
        }

        self.counters.record_expirations(removed.len());
        Ok(removed.len())
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.counters.snapshot();
        stats.memory_entries = self.memory.len();
        stats.memory_bytes = self.memory.current_size_bytes();
        if let Some(disk) = &self.disk {
            stats.disk_enabled = true;
            stats.disk_entries = disk.len();
            stats.disk_bytes = disk.current_size_bytes();
        }
        stats
    }

    // == Flush ==
    /// Persists disk-tier bookkeeping; call before shutdown.
    pub async fn flush(&self) -> Result<()> {
        match &self.disk {
            Some(disk) => disk.flush().await,
            None => Ok(()),
        }
    }
}

/// Runs a disk operation under a deadline.
async fn with_deadline<T>(
    operation: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout {
            operation,
            after_ms: duration_ms(timeout),
        }),
    }
}
