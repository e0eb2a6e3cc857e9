//! Request DTOs for the cache HTTP surface
//!
//! Payloads travel as raw request bodies; only the metadata is structured.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Query parameters for `PUT /entries/:key`
///
/// # Fields
/// - `ttl`: Optional TTL in seconds (uses the configured default if absent)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PutParams {
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl PutParams {
    /// Converts the TTL to a duration, rejecting a zero TTL.
    pub fn ttl(&self) -> Result<Option<Duration>> {
        match self.ttl {
            Some(0) => Err(CacheError::InvalidRequest(
                "ttl must be at least 1 second".to_string(),
            )),
            Some(secs) => Ok(Some(Duration::from_secs(secs))),
            None => Ok(None),
        }
    }
}
