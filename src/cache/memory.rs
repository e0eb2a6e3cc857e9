//! Memory Tier Module
//!
//! Volatile, byte-bounded entry store. Entries live in a sharded map so reads
//! of different keys never contend; size accounting and victim ordering sit
//! behind one short-held mutex so concurrent inserts cannot both claim the same
//! headroom.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::expiration::is_expired;
use crate::cache::{CacheEntry, CacheKey, EntryMeta, EvictionPolicy, EvictionTracker, Tier};
use crate::error::{CacheError, Result};

// == Memory Tier ==
/// In-process tier. Everything is lost when the process exits.
#[derive(Debug)]
pub struct MemoryTier {
    /// Key-value storage
    entries: DashMap<CacheKey, CacheEntry>,
    /// Victim ordering; also serializes every change to `used_bytes`
    tracker: Mutex<EvictionTracker>,
    /// Live payload bytes, readable without the lock
    used_bytes: AtomicU64,
    capacity_bytes: u64,
}

impl MemoryTier {
    // == Constructor ==
    pub fn new(capacity_bytes: u64, policy: EvictionPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            tracker: Mutex::new(EvictionTracker::new(policy)),
            used_bytes: AtomicU64::new(0),
            capacity_bytes,
        }
    }

    // == Insert ==
    fn insert(&self, entry: CacheEntry) -> Result<Vec<CacheKey>> {
        let size = entry.size_bytes();
        if size > self.capacity_bytes {
            return Err(CacheError::CapacityExceeded {
                tier: self.name(),
                size_bytes: size,
                capacity_bytes: self.capacity_bytes,
            });
        }

        let key = entry.key().clone();
        let mut tracker = self.tracker.lock();
        let mut used = self.used_bytes.load(Ordering::Acquire);

        // The old value stays readable until the map insert swaps it out
        let replaced = self.entries.get(&key).map(|old| old.size_bytes());
        if let Some(old_size) = replaced {
            tracker.remove(&key);
            used = used.saturating_sub(old_size);
        }

        let mut evicted = Vec::new();
        while used + size > self.capacity_bytes {
            let Some(victim) = tracker.pop_victim() else {
                break;
            };
            if let Some((_, old)) = self.entries.remove(&victim) {
                used = used.saturating_sub(old.size_bytes());
            }
            debug!(key = %victim, "memory tier evicted entry");
            evicted.push(victim);
        }

        tracker.insert(&key, entry.created_at());
        self.entries.insert(key, entry);
        self.used_bytes.store(used + size, Ordering::Release);

        Ok(evicted)
    }

    // == Take ==
    /// Removes an entry and hands back the whole entry, payload included.
    pub fn take(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut tracker = self.tracker.lock();
        let (_, entry) = self.entries.remove(key)?;
        tracker.remove(key);
        self.used_bytes
            .fetch_sub(entry.size_bytes(), Ordering::AcqRel);
        Some(entry)
    }
}

#[async_trait]
impl Tier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    fn current_size_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Acquire)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    async fn put(&self, entry: CacheEntry) -> Result<Vec<CacheKey>> {
        self.insert(entry)
    }

    async fn remove(&self, key: &CacheKey) -> Result<Option<EntryMeta>> {
        Ok(self.take(key).map(|entry| entry.meta()))
    }

    async fn record_access(&self, key: &CacheKey) {
        self.tracker.lock().touch(key);
    }

    async fn remove_expired(&self, now: u64) -> Result<Vec<CacheKey>> {
        // Collect first: holding shard guards while taking the tracker lock
        // would invert the lock order used by insert
        let candidates: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|item| is_expired(item.value(), now))
            .map(|item| item.key().clone())
            .collect();

        let mut removed = Vec::with_capacity(candidates.len());
        for key in candidates {
            let mut tracker = self.tracker.lock();
            if let Some((_, entry)) = self.entries.remove_if(&key, |_, e| is_expired(e, now)) {
                tracker.remove(&key);
                self.used_bytes
                    .fetch_sub(entry.size_bytes(), Ordering::AcqRel);
                removed.push(key);
            }
        }

        Ok(removed)
    }

    async fn clear(&self) -> Result<usize> {
        let mut tracker = self.tracker.lock();
        let count = self.entries.len();
        self.entries.clear();
        tracker.clear();
        self.used_bytes.store(0, Ordering::Release);
        Ok(count)
    }
}
