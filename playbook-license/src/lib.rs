//! License activation, validation, and integrity checking for Recruiting
//! Playbook installs.
//!
//! This crate handles:
//! - License key syntax and HMAC checksum verification (offline)
//! - One-shot activation against a pluggable license authority
//! - Continuous re-verification with TTL caching and a cross-process check
//!   lock
//! - Tamper detection over locally persisted license state
//! - A bounded offline grace window when the authority is unreachable
//!
//! # Design Principles
//!
//! - **Offline line of defense**: format and checksum checks reject forged
//!   keys before any network call
//! - **Never trust local state blind**: the persisted record is re-verified
//!   against its integrity signature on every load, and a tampered record
//!   is erased rather than partially trusted
//! - **Availability under outage**: an unreachable authority degrades to a
//!   grace window instead of locking paying users out
//! - **No singletons**: [`LicenseManager`] is an explicit handle over
//!   injected store, cache, and authority collaborators
//!
//! # License Key Format
//!
//! `RP-{TIER}-{XXXX}-{XXXX}-{XXXX}-{XXXX}-{XXXX}` — the product prefix, a
//! tier tag (`PRO`, `AI`, `BUNDLE`), four payload groups, and a final group
//! carrying an HMAC-SHA256-derived checksum over everything before it.

mod cache;
mod config;
mod error;
mod grace;
mod integrity;
mod key;
mod manager;
mod record;
mod remote;

pub use cache::{CACHE_KEY, CacheEntry, CacheGate, LOCK_KEY, Verdict};
pub use config::{
    DEV_CHECKSUM_SECRET, DEV_INSTALL_ID, DEV_INTEGRITY_AUTH_KEY, IntegrityMaterial, LicenseConfig,
    Profile,
};
pub use error::{LicenseError, LicenseResult};
pub use grace::{DEFAULT_GRACE_WINDOW_SECS, GracePolicy};
pub use integrity::IntegritySigner;
pub use key::{CHECKSUM_LEN, ChecksumEngine, KEY_PREFIX, LicenseTier, ParsedKey};
pub use manager::{
    Activation, INTEGRITY_KEY, LicenseManager, LicenseState, LicenseStatus, RECORD_KEY,
};
pub use record::LicenseRecord;
pub use remote::{OfflineAuthority, RemoteAuthority, RemoteError, RemoteValidation, mock};
