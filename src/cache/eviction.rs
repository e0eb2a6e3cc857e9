//! Eviction Policy Module
//!
//! Victim ordering for capacity-driven eviction.
//!
//! Two policies are supported and they retain materially different sets under
//! read-heavy workloads:
//! - `OldestCreated`: smallest creation time first, ties broken by key order.
//!   Reads never change the order.
//! - `LeastRecentlyUsed`: least recently inserted-or-read first. Every recorded
//!   access moves the key to the back of the queue.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::error::CacheError;

// == Eviction Policy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    #[default]
    OldestCreated,
    LeastRecentlyUsed,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::OldestCreated => f.write_str("oldest-created"),
            EvictionPolicy::LeastRecentlyUsed => f.write_str("least-recently-used"),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oldest-created" | "oldest_created" | "fifo" => Ok(EvictionPolicy::OldestCreated),
            "least-recently-used" | "least_recently_used" | "lru" => {
                Ok(EvictionPolicy::LeastRecentlyUsed)
            }
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown eviction policy: {other}"
            ))),
        }
    }
}

// == Eviction Tracker ==
/// Orders a tier's keys by eviction priority.
///
/// Each key has a rank; the victim is the smallest `(rank, key)` pair. Under
/// `OldestCreated` the rank is the creation timestamp, so equal timestamps fall
/// back to key ordering. Under `LeastRecentlyUsed` the rank is a monotonic
/// access counter.
#[derive(Debug, Default)]
pub struct EvictionTracker {
    policy: EvictionPolicy,
    ranks: HashMap<CacheKey, u64>,
    order: BTreeSet<(u64, CacheKey)>,
    tick: u64,
}

impl EvictionTracker {
    // == Constructor ==
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    // == Insert ==
    /// Registers a newly stored (or replaced) key.
    pub fn insert(&mut self, key: &CacheKey, created_at: u64) {
        let rank = match self.policy {
            EvictionPolicy::OldestCreated => created_at,
            EvictionPolicy::LeastRecentlyUsed => self.next_tick(),
        };
        self.set_rank(key, rank);
    }

    // == Touch ==
    /// Records a read. Only affects ordering under `LeastRecentlyUsed`.
    pub fn touch(&mut self, key: &CacheKey) {
        if self.policy == EvictionPolicy::LeastRecentlyUsed && self.ranks.contains_key(key) {
            let rank = self.next_tick();
            self.set_rank(key, rank);
        }
    }

    // == Remove ==
    pub fn remove(&mut self, key: &CacheKey) {
        if let Some(rank) = self.ranks.remove(key) {
            self.order.remove(&(rank, key.clone()));
        }
    }

    // == Pop Victim ==
    /// Removes and returns the next key to evict.
    pub fn pop_victim(&mut self) -> Option<CacheKey> {
        let (_, key) = self.order.pop_first()?;
        self.ranks.remove(&key);
        Some(key)
    }

    /// Returns the next key to evict without removing it.
    pub fn peek_victim(&self) -> Option<&CacheKey> {
        self.order.first().map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.ranks.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.ranks.clear();
        self.order.clear();
    }

    fn set_rank(&mut self, key: &CacheKey, rank: u64) {
        if let Some(old) = self.ranks.insert(key.clone(), rank) {
            self.order.remove(&(old, key.clone()));
        }
        self.order.insert((rank, key.clone()));
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
