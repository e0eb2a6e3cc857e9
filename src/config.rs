//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Byte budget of the memory tier
    pub memory_capacity_bytes: u64,
    /// Byte budget of the disk tier
    pub disk_capacity_bytes: u64,
    /// TTL applied to puts that don't carry one, None = never expires
    pub default_ttl: Option<Duration>,
    /// Victim selection for both tiers
    pub eviction_policy: EvictionPolicy,
    /// Directory holding the disk tier
    pub disk_storage_root: PathBuf,
    /// Deadline for a single disk operation
    pub disk_timeout: Duration,
    /// Background purge interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_CAPACITY_BYTES` - Memory tier budget (default: 64 MiB)
    /// - `DISK_CAPACITY_BYTES` - Disk tier budget (default: 1 GiB)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 or unset = none
    /// - `EVICTION_POLICY` - `oldest-created` or `lru` (default: oldest-created)
    /// - `DISK_STORAGE_ROOT` - Disk tier directory (default: ./cache-data)
    /// - `DISK_TIMEOUT_MS` - Disk operation deadline (default: 2000)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            memory_capacity_bytes: parse_var("MEMORY_CAPACITY_BYTES")
                .unwrap_or(defaults.memory_capacity_bytes),
            disk_capacity_bytes: parse_var("DISK_CAPACITY_BYTES")
                .unwrap_or(defaults.disk_capacity_bytes),
            default_ttl: parse_var::<u64>("DEFAULT_TTL")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            eviction_policy: parse_var("EVICTION_POLICY").unwrap_or(defaults.eviction_policy),
            disk_storage_root: env::var("DISK_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.disk_storage_root),
            disk_timeout: parse_var("DISK_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.disk_timeout),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.memory_capacity_bytes == 0 {
            return Err(CacheError::InvalidRequest(
                "memory_capacity_bytes must be greater than zero".to_string(),
            ));
        }
        if self.disk_capacity_bytes == 0 {
            return Err(CacheError::InvalidRequest(
                "disk_capacity_bytes must be greater than zero".to_string(),
            ));
        }
        if self.disk_timeout.is_zero() {
            return Err(CacheError::InvalidRequest(
                "disk_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity_bytes: 64 * 1024 * 1024,
            disk_capacity_bytes: 1024 * 1024 * 1024,
            default_ttl: None,
            eviction_policy: EvictionPolicy::OldestCreated,
            disk_storage_root: PathBuf::from("./cache-data"),
            disk_timeout: Duration::from_millis(2000),
            cleanup_interval: 30,
            server_port: 3000,
        }
    }
}
