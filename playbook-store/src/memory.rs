//! In-memory store and cache backends.
//!
//! Used by tests and development builds. Both are safe to share across
//! threads behind an `Arc`; the cache's [`MemoryCache::advance`] shifts its
//! notion of "now" forward so TTL expiry is testable without sleeping.

use crate::error::{StoreError, StoreResult};
use crate::{KeyValueStore, TtlCache};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

fn locked<T>(mutex: &Mutex<T>) -> StoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend("memory backend lock poisoned".to_string()))
}

/// A durable-in-spirit key-value store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(locked(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        locked(&self.entries)?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        locked(&self.entries)?.remove(key);
        Ok(())
    }
}

#[derive(Debug)]
struct CacheSlot {
    value: Vec<u8>,
    expires_at: Instant,
}

/// A TTL cache backed by a `HashMap`, with a shiftable clock for tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheSlot>>,
    skew: Mutex<Duration>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts this cache's notion of "now" forward by `delta`.
    ///
    /// Entries whose TTL falls inside the shifted window behave as expired
    /// on the next read.
    pub fn advance(&self, delta: Duration) {
        if let Ok(mut skew) = self.skew.lock() {
            *skew += delta;
        }
    }

    fn now(&self) -> StoreResult<Instant> {
        Ok(Instant::now() + *locked(&self.skew)?)
    }
}

impl TtlCache for MemoryCache {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = self.now()?;
        let mut entries = locked(&self.entries)?;
        match entries.get(key) {
            Some(slot) if slot.expires_at > now => Ok(Some(slot.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let expires_at = self.now()? + ttl;
        locked(&self.entries)?.insert(
            key.to_string(),
            CacheSlot {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    fn add(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool> {
        let now = self.now()?;
        let mut entries = locked(&self.entries)?;
        if let Some(slot) = entries.get(key) {
            if slot.expires_at > now {
                return Ok(false);
            }
        }
        entries.insert(
            key.to_string(),
            CacheSlot {
                value: value.to_vec(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        locked(&self.entries)?.remove(key);
        Ok(())
    }
}
