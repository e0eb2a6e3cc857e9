//! Cache Module
//!
//! Tiered binary cache: a bounded memory tier in front of a bounded,
//! persistent disk tier, with TTL expiration and capacity eviction.

mod coordinator;
mod disk;
mod entry;
pub mod eviction;
pub mod expiration;
mod key;
mod locks;
mod memory;
mod stats;
mod tier;


// Re-export public types
pub use coordinator::TieredCache;
pub use disk::DiskTier;
pub use entry::{current_timestamp_ms, duration_ms, CacheEntry, EntryMeta};
pub use eviction::{EvictionPolicy, EvictionTracker};
pub use key::CacheKey;
pub use locks::KeyLocks;
pub use memory::MemoryTier;
pub use stats::{CacheCounters, CacheStats};
pub use tier::Tier;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
