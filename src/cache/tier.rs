//! Tier Abstraction
//!
//! The storage interface shared by the memory and disk tiers.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::cache::{CacheEntry, CacheKey, EntryMeta};
use crate::error::Result;

/// One storage layer of the cache with its own byte budget and eviction
/// accounting.
///
/// Every mutating call leaves `current_size_bytes() <= capacity_bytes()`.
#[async_trait]
pub trait Tier: Send + Sync + Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    fn capacity_bytes(&self) -> u64;

    /// Running total of live payload bytes.
    fn current_size_bytes(&self) -> u64;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up an entry. Does not touch eviction ordering.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Inserts or atomically replaces an entry, evicting other entries until it
    /// fits. Returns the evicted keys.
    ///
    /// Fails with `CapacityExceeded` when the entry alone is larger than the
    /// tier, without evicting anything.
    async fn put(&self, entry: CacheEntry) -> Result<Vec<CacheKey>>;

    /// Removes an entry and returns its metadata if it was present.
    async fn remove(&self, key: &CacheKey) -> Result<Option<EntryMeta>>;

    /// Feeds a read into the eviction policy.
    async fn record_access(&self, key: &CacheKey);

    /// Removes every entry expired at `now` and returns their keys.
    async fn remove_expired(&self, now: u64) -> Result<Vec<CacheKey>>;

    /// Removes every entry and returns how many were dropped.
    async fn clear(&self) -> Result<usize>;

    /// Persists whatever bookkeeping the tier keeps outside its entries.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
