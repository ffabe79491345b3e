//! The remote license authority seam.
//!
//! The actual network round-trip is pluggable. [`OfflineAuthority`] is the
//! built-in no-network implementation for deployments where no authority
//! endpoint is wired in yet; [`mock::MockAuthority`] scripts outcomes for
//! tests.

use crate::key::{ChecksumEngine, LicenseTier, ParsedKey};
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

/// A confirmed validation from the license authority.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteValidation {
    /// The granted tier. The authority's answer is the source of truth; the
    /// tag parsed from the key is only a pre-network sanity filter.
    pub tier: LicenseTier,
    /// Entitlement expiry for time-bounded tiers.
    pub expires_at: Option<DateTime<Utc>>,
}

/// How an authority validation can fail.
///
/// The distinction matters: `Unreachable` triggers the offline grace
/// policy, while `Rejected` is terminal until a new key is activated.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network failure or timeout.
    #[error("license authority unreachable: {0}")]
    Unreachable(String),

    /// The authority actively denied the key (invalid, revoked).
    #[error("license rejected: {0}")]
    Rejected(String),
}

/// A client for the remote license authority.
///
/// Implementations perform the actual round-trip. They must carry a short
/// network timeout of their own and report its expiry as
/// [`RemoteError::Unreachable`].
pub trait RemoteAuthority: Send + Sync {
    /// Validates a key for a domain.
    fn validate(&self, key: &ParsedKey, domain: &str) -> Result<RemoteValidation, RemoteError>;

    /// Notifies the authority of a deactivation. Fire-and-forget:
    /// implementations log failures instead of surfacing them.
    fn deactivate(&self, key: &ParsedKey, domain: &str);
}

impl<T: RemoteAuthority + ?Sized> RemoteAuthority for std::sync::Arc<T> {
    fn validate(&self, key: &ParsedKey, domain: &str) -> Result<RemoteValidation, RemoteError> {
        (**self).validate(key, domain)
    }

    fn deactivate(&self, key: &ParsedKey, domain: &str) {
        (**self).deactivate(key, domain);
    }
}

/// Offline validation: checksum plus tier tag, no network.
///
/// A key that passes the checksum is accepted and the tier is read from its
/// tag. AI-addon subscriptions get a one-year entitlement stamped at
/// validation time.
#[derive(Debug, Clone)]
pub struct OfflineAuthority {
    checksum: ChecksumEngine,
}

impl OfflineAuthority {
    /// An offline authority sharing the given checksum engine.
    #[must_use]
    pub fn new(checksum: ChecksumEngine) -> Self {
        Self { checksum }
    }
}

impl RemoteAuthority for OfflineAuthority {
    fn validate(&self, key: &ParsedKey, _domain: &str) -> Result<RemoteValidation, RemoteError> {
        if !self.checksum.verify(key) {
            return Err(RemoteError::Rejected("checksum mismatch".to_string()));
        }

        let tier = key.tier();
        let expires_at = matches!(tier, LicenseTier::AiAddon).then(|| Utc::now() + TimeDelta::days(365));

        Ok(RemoteValidation { tier, expires_at })
    }

    fn deactivate(&self, _key: &ParsedKey, _domain: &str) {}
}

/// A scriptable authority for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// What the mock authority should answer.
    #[derive(Debug, Clone)]
    pub enum MockOutcome {
        /// Confirm the key with a tier and optional expiry.
        Valid {
            /// Granted tier.
            tier: LicenseTier,
            /// Entitlement expiry.
            expires_at: Option<DateTime<Utc>>,
        },
        /// Simulate a network failure.
        Unreachable,
        /// Actively deny the key.
        Rejected(String),
    }

    /// A [`RemoteAuthority`] with a scriptable outcome, an optional
    /// round-trip delay, and call counters.
    #[derive(Debug)]
    pub struct MockAuthority {
        outcome: Mutex<MockOutcome>,
        delay: Mutex<Option<Duration>>,
        validate_calls: AtomicUsize,
        deactivate_calls: AtomicUsize,
    }

    impl MockAuthority {
        /// A mock answering with `outcome`.
        #[must_use]
        pub fn new(outcome: MockOutcome) -> Self {
            Self {
                outcome: Mutex::new(outcome),
                delay: Mutex::new(None),
                validate_calls: AtomicUsize::new(0),
                deactivate_calls: AtomicUsize::new(0),
            }
        }

        /// A mock confirming every key at `tier` with no expiry.
        #[must_use]
        pub fn valid(tier: LicenseTier) -> Self {
            Self::new(MockOutcome::Valid {
                tier,
                expires_at: None,
            })
        }

        /// A mock simulating an unreachable authority.
        #[must_use]
        pub fn unreachable() -> Self {
            Self::new(MockOutcome::Unreachable)
        }

        /// A mock denying every key.
        #[must_use]
        pub fn rejected(reason: impl Into<String>) -> Self {
            Self::new(MockOutcome::Rejected(reason.into()))
        }

        /// Replaces the scripted outcome.
        pub fn set_outcome(&self, outcome: MockOutcome) {
            *self.outcome.lock().unwrap() = outcome;
        }

        /// Makes every `validate` call sleep for `delay` first, simulating
        /// a slow round-trip.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        /// How many times `validate` was called.
        pub fn validate_calls(&self) -> usize {
            self.validate_calls.load(Ordering::SeqCst)
        }

        /// How many times `deactivate` was called.
        pub fn deactivate_calls(&self) -> usize {
            self.deactivate_calls.load(Ordering::SeqCst)
        }
    }

    impl RemoteAuthority for MockAuthority {
        fn validate(
            &self,
            _key: &ParsedKey,
            _domain: &str,
        ) -> Result<RemoteValidation, RemoteError> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
            match self.outcome.lock().unwrap().clone() {
                MockOutcome::Valid { tier, expires_at } => {
                    Ok(RemoteValidation { tier, expires_at })
                }
                MockOutcome::Unreachable => {
                    Err(RemoteError::Unreachable("connection refused".to_string()))
                }
                MockOutcome::Rejected(reason) => Err(RemoteError::Rejected(reason)),
            }
        }

        fn deactivate(&self, _key: &ParsedKey, _domain: &str) {
            self.deactivate_calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}
