//! Per-key Locking
//!
//! Serializes operations on the same key while letting unrelated keys proceed
//! in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::cache::CacheKey;

/// Default number of lock stripes.
pub const DEFAULT_STRIPES: usize = 64;

/// A fixed array of async mutexes; a key always maps to the same stripe.
///
/// Guards may be held across disk I/O, hence tokio's mutex.
#[derive(Debug)]
pub struct KeyLocks {
    stripes: Box<[Arc<Mutex<()>>]>,
}

impl KeyLocks {
    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| Arc::new(Mutex::new(()))).collect(),
        }
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &CacheKey) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(key)].lock().await
    }

    /// Like `lock`, but the guard can move into a spawned task.
    pub async fn lock_owned(&self, key: &CacheKey) -> OwnedMutexGuard<()> {
        Arc::clone(&self.stripes[self.stripe_of(key)])
            .lock_owned()
            .await
    }

    /// Waits until no key is held, and holds every stripe until the guards
    /// drop. Stripes are taken in index order.
    pub async fn lock_all(&self) -> Vec<MutexGuard<'_, ()>> {
        let mut guards = Vec::with_capacity(self.stripes.len());
        for stripe in self.stripes.iter() {
            guards.push(stripe.lock().await);
        }
        guards
    }

    fn stripe_of(&self, key: &CacheKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}
