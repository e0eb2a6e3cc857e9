//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::cache::expiration::{self, Expiring};
use crate::cache::CacheKey;

// == Cache Entry ==
/// A binary payload plus the metadata every tier tracks for it.
///
/// The payload is immutable; replacing a key always means building a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    key: CacheKey,
    payload: Bytes,
    /// Creation timestamp (Unix milliseconds)
    created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    expires_at: Option<u64>,
    size_bytes: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time and an optional TTL.
    pub fn new(key: CacheKey, payload: impl Into<Bytes>, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| now.saturating_add(duration_ms(ttl)));
        Self::with_timestamps(key, payload, now, expires_at)
    }

    /// Creates an entry with explicit timestamps, as read back from storage.
    pub fn with_timestamps(
        key: CacheKey,
        payload: impl Into<Bytes>,
        created_at: u64,
        expires_at: Option<u64>,
    ) -> Self {
        let payload = payload.into();
        let size_bytes = payload.len() as u64;
        Self {
            key,
            payload,
            created_at,
            expires_at,
            size_bytes,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Metadata view of this entry, without the payload.
    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            key: self.key.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            size_bytes: self.size_bytes,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Convenience check against the current wall clock.
    pub fn is_expired(&self) -> bool {
        expiration::is_expired(self, current_timestamp_ms())
    }
}

impl Expiring for CacheEntry {
    fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }
}

// == Entry Metadata ==
/// Everything about an entry except its payload.
///
/// This is what the disk tier persists in object headers and in its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub key: CacheKey,
    pub created_at: u64,
    pub expires_at: Option<u64>,
    pub size_bytes: u64,
}

impl Expiring for EntryMeta {
    fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or(0)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name).unwrap()
    }

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(key("k"), &b"test_value"[..], None);

        assert_eq!(entry.payload().as_ref(), b"test_value");
        assert_eq!(entry.size_bytes(), 10);
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(key("k"), vec![0u8; 4], Some(Duration::from_secs(60)));

        assert_eq!(entry.expires_at(), Some(entry.created_at() + 60_000));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(key("k"), vec![1u8], Some(Duration::from_secs(1)));

        assert!(!entry.is_expired());

        // Wait for expiration
        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new(key("k"), vec![1u8], Some(Duration::from_secs(10)));

        let remaining_ms = entry.ttl_remaining_ms().unwrap();
        assert!(remaining_ms <= 10_000);
        assert!(remaining_ms >= 9_000);
    }

    #[test]
    fn test_ttl_remaining_no_expiration() {
        let entry = CacheEntry::new(key("k"), vec![1u8], None);
        assert!(entry.ttl_remaining_ms().is_none());
    }

    #[test]
    fn test_ttl_remaining_saturates_at_zero() {
        let now = current_timestamp_ms();
        let entry = CacheEntry::with_timestamps(key("k"), vec![1u8], now - 5000, Some(now - 10));
        assert_eq!(entry.ttl_remaining_ms(), Some(0));
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_wrapping() {
        let ttl = Duration::from_secs(18_446_744_073_709_552);
        let entry = CacheEntry::new(key("k"), vec![1u8], Some(ttl));

        assert_eq!(entry.expires_at(), Some(u64::MAX));
        assert!(!entry.is_expired());
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
    }

    #[test]
    fn test_meta_matches_entry() {
        let entry = CacheEntry::with_timestamps(key("k"), vec![7u8; 3], 100, Some(200));
        let meta = entry.meta();

        assert_eq!(meta.key, key("k"));
        assert_eq!(meta.created_at, 100);
        assert_eq!(meta.expires_at, Some(200));
        assert_eq!(meta.size_bytes, 3);
    }
}
