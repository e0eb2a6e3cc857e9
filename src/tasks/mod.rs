//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is live.
//!
//! # Tasks
//! - Expiry purge: removes expired entries from both tiers at a fixed interval

mod cleanup;

pub use cleanup::spawn_purge_task;
