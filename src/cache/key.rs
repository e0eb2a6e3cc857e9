//! Cache Key Module
//!
//! Validated key type shared by every tier.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

// == Cache Key ==
/// Opaque identifier of one logical asset across all tiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key, rejecting empty keys and keys over `MAX_KEY_LENGTH` bytes.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidKey(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // == File Stem ==
    /// Deterministic on-disk name: lowercase hex SHA-256 of the key bytes.
    ///
    /// Persisted headers carry the full key, so a digest collision reads back
    /// as a mismatch rather than as another key's payload.
    pub fn file_stem(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = CacheError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(CacheKey::new("asset/logo.png").is_ok());
        assert!(matches!(CacheKey::new(""), Err(CacheError::InvalidKey(_))));
        assert!(CacheKey::new("x".repeat(MAX_KEY_LENGTH)).is_ok());
        assert!(matches!(
            CacheKey::new("x".repeat(MAX_KEY_LENGTH + 1)),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_file_stem_is_deterministic_and_path_safe() {
        let a = CacheKey::new("../../etc/passwd").unwrap();
        let stem = a.file_stem();

        assert_eq!(stem, a.file_stem());
        assert_eq!(stem.len(), 64);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(stem, CacheKey::new("other").unwrap().file_stem());
    }

    #[test]
    fn test_keys_order_lexicographically() {
        let a = CacheKey::new("a").unwrap();
        let b = CacheKey::new("b").unwrap();
        assert!(a < b);
    }
}
