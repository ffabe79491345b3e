//! Check-verdict caching and the cross-process check lock.
//!
//! Remote verification is expensive and bursty: every request handler asks
//! "is the license valid?" and a cold cache would send them all to the
//! authority at once. The gate serves a TTL-bound verdict when one exists
//! and otherwise serializes refreshes behind a short-TTL lock held in the
//! shared cache, so concurrent callers converge instead of stampeding.
//!
//! A caller that loses the lock race waits one bounded backoff, re-reads
//! the cache, and — if the refresh owner still hasn't published — returns a
//! conservative assume-valid verdict rather than blocking. This favors
//! availability over strictness for the narrow race window; integrators who
//! need stricter guarantees can shrink the window via
//! [`crate::LicenseConfig::lock_backoff`].

use crate::config::LicenseConfig;
use crate::error::LicenseResult;
use crate::grace::GracePolicy;
use crate::remote::{RemoteError, RemoteValidation};
use chrono::{DateTime, Utc};
use playbook_store::TtlCache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache key for check verdicts.
pub const CACHE_KEY: &str = "rp_license_cache";

/// Cache key for the check lock.
pub const LOCK_KEY: &str = "rp_license_check_lock";

/// A cached validity verdict.
///
/// Never the source of truth — absence means "re-verify", not "invalid".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached verdict.
    pub valid: bool,
    /// True when the verdict was reached while the authority was
    /// unreachable.
    #[serde(default)]
    pub offline: bool,
    /// When the verdict was reached.
    pub checked_at: DateTime<Utc>,
}

/// The verdict produced by [`CacheGate::get_or_refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the license is currently usable.
    pub valid: bool,
    /// True when the verdict rests on the offline grace policy.
    pub offline: bool,
}

impl From<&CacheEntry> for Verdict {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            valid: entry.valid,
            offline: entry.offline,
        }
    }
}

/// TTL cache plus mutual exclusion around the remote verification path.
#[derive(Debug)]
pub struct CacheGate<C> {
    cache: C,
    cache_ttl: Duration,
    offline_ttl: Duration,
    lock_ttl: Duration,
    backoff: Duration,
}

impl<C: TtlCache> CacheGate<C> {
    /// A gate over `cache`, with TTLs taken from `config`.
    pub fn new(cache: C, config: &LicenseConfig) -> Self {
        Self {
            cache,
            cache_ttl: config.cache_ttl,
            offline_ttl: config.offline_cache_ttl,
            lock_ttl: config.lock_ttl,
            backoff: config.lock_backoff,
        }
    }

    /// The cached verdict, if one is present and unexpired.
    pub fn cached(&self) -> LicenseResult<Option<CacheEntry>> {
        match self.cache.get(CACHE_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Drops the cached verdict. Called after any license mutation.
    pub fn invalidate(&self) -> LicenseResult<()> {
        self.cache.delete(CACHE_KEY)?;
        Ok(())
    }

    /// Serves the cached verdict or refreshes it through `refresh`.
    ///
    /// `refresh` performs the remote round-trip (and any record bookkeeping
    /// on confirmation) and is called at most once, only while this caller
    /// holds the check lock. On an unreachable authority the grace policy
    /// decides the verdict from `last_check`; on an explicit rejection the
    /// invalid verdict is cached at full TTL.
    pub fn get_or_refresh<F>(
        &self,
        grace: &GracePolicy,
        last_check: DateTime<Utc>,
        refresh: F,
    ) -> LicenseResult<Verdict>
    where
        F: FnOnce() -> Result<RemoteValidation, RemoteError>,
    {
        if let Some(entry) = self.cached()? {
            return Ok(Verdict::from(&entry));
        }

        if !self.cache.add(LOCK_KEY, b"1", self.lock_ttl)? {
            // Another caller is already refreshing. Wait one bounded backoff
            // for it to publish a verdict.
            std::thread::sleep(self.backoff);
            if let Some(entry) = self.cached()? {
                return Ok(Verdict::from(&entry));
            }
            // Still refreshing: assume valid for this request instead of
            // blocking; the lock holder publishes the real verdict shortly.
            debug!("license check lock contended; assuming valid for this request");
            return Ok(Verdict {
                valid: true,
                offline: false,
            });
        }

        let result = self.refresh_locked(grace, last_check, refresh);
        // The lock TTL is only a backstop; release explicitly on every path.
        self.cache.delete(LOCK_KEY)?;
        result
    }

    fn refresh_locked<F>(
        &self,
        grace: &GracePolicy,
        last_check: DateTime<Utc>,
        refresh: F,
    ) -> LicenseResult<Verdict>
    where
        F: FnOnce() -> Result<RemoteValidation, RemoteError>,
    {
        match refresh() {
            Ok(_confirmed) => {
                self.write_entry(
                    CacheEntry {
                        valid: true,
                        offline: false,
                        checked_at: Utc::now(),
                    },
                    self.cache_ttl,
                )?;
                Ok(Verdict {
                    valid: true,
                    offline: false,
                })
            }
            Err(RemoteError::Unreachable(reason)) => {
                let valid = grace.usable(last_check, Utc::now());
                if valid {
                    info!("license authority unreachable ({reason}); inside offline grace window");
                } else {
                    warn!("license authority unreachable ({reason}); offline grace window elapsed");
                }
                self.write_entry(
                    CacheEntry {
                        valid,
                        offline: true,
                        checked_at: Utc::now(),
                    },
                    self.offline_ttl,
                )?;
                Ok(Verdict {
                    valid,
                    offline: true,
                })
            }
            Err(RemoteError::Rejected(reason)) => {
                warn!("license rejected by authority: {reason}");
                self.write_entry(
                    CacheEntry {
                        valid: false,
                        offline: false,
                        checked_at: Utc::now(),
                    },
                    self.cache_ttl,
                )?;
                Ok(Verdict {
                    valid: false,
                    offline: false,
                })
            }
        }
    }

    fn write_entry(&self, entry: CacheEntry, ttl: Duration) -> LicenseResult<()> {
        self.cache.set(CACHE_KEY, &serde_json::to_vec(&entry)?, ttl)?;
        Ok(())
    }
}
