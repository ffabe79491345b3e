//! Storage collaborator seams for Recruiting Playbook licensing.
//!
//! The licensing subsystem never talks to a concrete database or cache
//! backend directly. Everything goes through two narrow traits:
//!
//! - [`KeyValueStore`]: durable byte storage, holding the license record and
//!   its integrity signature under distinct keys
//! - [`TtlCache`]: ephemeral TTL-bound storage, holding check verdicts and
//!   the cross-process check lock
//!
//! Callers may be separate processes sharing the same backing store, so the
//! lock primitive is an atomic "set if not already set, with TTL"
//! ([`TtlCache::add`]) rather than an in-memory mutex.
//!
//! [`MemoryStore`] and [`MemoryCache`] are the built-in backends used by
//! tests and development builds.

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryCache, MemoryStore};

use std::sync::Arc;
use std::time::Duration;

/// Durable key-value storage.
///
/// Values are opaque bytes; serialization is the caller's concern.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Removes the value under `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Ephemeral storage with per-entry time-to-live.
///
/// Expired entries behave as absent. An entry disappearing is an expected
/// event, never an error.
pub trait TtlCache: Send + Sync {
    /// Reads the unexpired value stored under `key`, if any.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` under `key` with the given TTL, replacing any
    /// previous value.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Writes `value` under `key` only if no unexpired value is present.
    ///
    /// Returns `true` if the write happened. This must be atomic with
    /// respect to concurrent `add` calls on the same key; it is the
    /// primitive the licensing check lock is built on.
    fn add(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool>;

    /// Removes the value under `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }
}

impl<T: TtlCache + ?Sized> TtlCache for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        (**self).set(key, value, ttl)
    }

    fn add(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool> {
        (**self).add(key, value, ttl)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }
}
