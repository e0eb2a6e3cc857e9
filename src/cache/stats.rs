//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits per tier, misses,
//! promotions, evictions and disk degradation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups served by the memory tier
    pub memory_hits: u64,
    /// Lookups served by the disk tier
    pub disk_hits: u64,
    /// Lookups that found nothing live
    pub misses: u64,
    /// Disk hits copied into memory
    pub promotions: u64,
    /// Entries removed to satisfy a capacity bound, across both tiers
    pub evictions: u64,
    /// Entries removed because their TTL had passed, lazily or by purge
    pub expirations: u64,
    /// Writes that reached memory but not disk
    pub persist_failures: u64,
    /// Disk reads that failed or timed out and were served as misses
    pub disk_errors: u64,
    pub memory_entries: usize,
    pub memory_bytes: u64,
    pub disk_entries: usize,
    pub disk_bytes: u64,
    /// False when the cache is running memory-only
    pub disk_enabled: bool,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.memory_hits + self.disk_hits
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

// == Counters ==
/// Lock-free counters updated from concurrent operations.
#[derive(Debug, Default)]
pub struct CacheCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    promotions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    persist_failures: AtomicU64,
    disk_errors: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_expirations(&self, count: usize) {
        self.expirations.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disk_error(&self) {
        self.disk_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters into a snapshot; tier sizes are left for the caller.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            disk_errors: self.disk_errors.load(Ordering::Relaxed),
            ..CacheStats::default()
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let stats = CacheCounters::new().snapshot();
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_both_tiers() {
        let counters = CacheCounters::new();
        counters.record_memory_hit();
        counters.record_disk_hit();
        counters.record_miss();
        counters.record_miss();

        let stats = counters.snapshot();
        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_record_evictions_and_expirations() {
        let counters = CacheCounters::new();
        counters.record_evictions(3);
        counters.record_evictions(0);
        counters.record_expirations(2);
        counters.record_persist_failure();

        let stats = counters.snapshot();
        assert_eq!(stats.evictions, 3);
        assert_eq!(stats.expirations, 2);
        assert_eq!(stats.persist_failures, 1);
    }
}
