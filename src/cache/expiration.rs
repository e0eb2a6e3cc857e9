//! Expiration Policy
//!
//! Time-to-live checks, independent of capacity eviction.

/// Anything carrying an optional expiry timestamp (Unix milliseconds).
pub trait Expiring {
    fn expires_at(&self) -> Option<u64>;
}

/// True iff an expiry is set and `now` is strictly past it.
pub fn is_expired(entry: &impl Expiring, now: u64) -> bool {
    matches!(entry.expires_at(), Some(expires) if now > expires)
}
