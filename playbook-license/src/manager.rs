//! The license manager: the subsystem's only public entry point.
//!
//! An explicit handle over injected store, cache, and authority
//! collaborators — there is no process-wide singleton. Collaborators are
//! shared across threads or request handlers by constructing managers over
//! `Arc`s of the same backends.

use crate::cache::CacheGate;
use crate::config::LicenseConfig;
use crate::error::{LicenseError, LicenseResult};
use crate::grace::GracePolicy;
use crate::integrity::IntegritySigner;
use crate::key::{ChecksumEngine, LicenseTier, ParsedKey};
use crate::record::LicenseRecord;
use crate::remote::{RemoteAuthority, RemoteError};
use chrono::{DateTime, Utc};
use playbook_store::{KeyValueStore, TtlCache};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Store key for the license record.
pub const RECORD_KEY: &str = "rp_license";

/// Store key for the record's integrity signature. Deliberately distinct
/// from [`RECORD_KEY`].
pub const INTEGRITY_KEY: &str = "rp_license_integrity";

/// High-level license state for status displays.
///
/// Distinguishable enough that a support channel can tell "no license" from
/// "invalid" from "temporarily offline" from "tampering detected".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseState {
    /// No license activated; the install runs the free tier.
    NoLicense,
    /// Authority-confirmed within the cache TTL.
    Valid,
    /// Authority unreachable, inside the grace window.
    OfflineGrace,
    /// Entitlement lapsed.
    Expired,
    /// Rejected by the authority, bound to another domain, or the grace
    /// window elapsed while offline.
    Invalid,
    /// Persisted state failed its integrity check.
    Tampered,
}

/// Read-only status projection for admin and UI surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseStatus {
    /// Tier recorded for this install.
    pub tier: LicenseTier,
    /// High-level state.
    pub state: LicenseState,
    /// Whether a license is activated at all.
    pub is_active: bool,
    /// Whether the install is currently entitled to its tier.
    pub is_valid: bool,
    /// True when running on an offline-grace verdict.
    pub offline: bool,
    /// When the license was activated.
    pub activated_at: Option<DateTime<Utc>>,
    /// Entitlement expiry, if time-bounded.
    pub expires_at: Option<DateTime<Utc>>,
    /// Domain the license is bound to.
    pub domain: Option<String>,
    /// Human-readable summary.
    pub message: String,
    /// Upgrade affordance for the UI.
    pub upgrade_url: String,
}

/// Successful activation summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// The tier granted by the authority.
    pub tier: LicenseTier,
}

/// Orchestrates key validation, activation, caching, integrity checking,
/// and the offline grace policy.
pub struct LicenseManager<S, C, R> {
    store: S,
    gate: CacheGate<C>,
    remote: R,
    config: LicenseConfig,
    checksum: ChecksumEngine,
    signer: IntegritySigner,
    grace: GracePolicy,
    // Record copy held for one verification cycle; invalidated on mutation.
    record_memo: Mutex<Option<LicenseRecord>>,
}

impl<S, C, R> LicenseManager<S, C, R>
where
    S: KeyValueStore,
    C: TtlCache,
    R: RemoteAuthority,
{
    /// Builds a manager over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] when the configuration is invalid,
    /// including a production profile still carrying development-default
    /// secrets.
    pub fn new(store: S, cache: C, remote: R, config: LicenseConfig) -> LicenseResult<Self> {
        config.validate()?;
        let checksum = ChecksumEngine::new(config.checksum_secret.clone());
        let signer = IntegritySigner::new(&config.integrity_material, &config.domain);
        let grace = GracePolicy::new(config.grace_window);
        let gate = CacheGate::new(cache, &config);
        Ok(Self {
            store,
            gate,
            remote,
            config,
            checksum,
            signer,
            grace,
            record_memo: Mutex::new(None),
        })
    }

    /// Activates a license key on this install.
    ///
    /// Format and checksum are settled locally before the authority is
    /// consulted, so forged keys never generate network traffic. The
    /// persisted record is re-loaded and re-verified before success is
    /// declared; on mismatch everything is rolled back and no partial state
    /// survives. Re-activating the same key is idempotent.
    ///
    /// # Errors
    ///
    /// [`LicenseError::InvalidFormat`], [`LicenseError::InvalidChecksum`],
    /// [`LicenseError::Unreachable`], [`LicenseError::Rejected`], or
    /// [`LicenseError::IntegrityCheckFailed`].
    pub fn activate(&self, raw_key: &str) -> LicenseResult<Activation> {
        let key = ParsedKey::parse(raw_key)?;
        if !self.checksum.verify(&key) {
            return Err(LicenseError::InvalidChecksum);
        }

        // One-shot, uncached validation against the authority.
        let validation = self
            .remote
            .validate(&key, &self.config.domain)
            .map_err(|e| match e {
                RemoteError::Unreachable(reason) => LicenseError::Unreachable(reason),
                RemoteError::Rejected(reason) => LicenseError::Rejected(reason),
            })?;

        let now = Utc::now();
        let record = LicenseRecord {
            key: key.as_str().to_string(),
            tier: validation.tier,
            domain: self.config.domain.clone(),
            activated_at: now,
            expires_at: validation.expires_at,
            last_check: now,
        };

        self.persist_record(&record)?;
        let signature = self.signer.sign(&record);
        self.store.set(INTEGRITY_KEY, signature.as_bytes())?;

        // Re-load and re-verify before declaring success, so persistence
        // corruption cannot leave a half-written, unverifiable state.
        if !self.reload_and_verify()? {
            self.erase_local_state()?;
            return Err(LicenseError::IntegrityCheckFailed);
        }

        self.gate.invalidate()?;
        self.memoize(Some(record.clone()));
        info!(
            "license activated: {} tier bound to {}",
            record.tier.label(),
            record.domain
        );
        Ok(Activation { tier: record.tier })
    }

    /// Deactivates the current license.
    ///
    /// The authority is notified best-effort; local erasure of record,
    /// signature, and cache happens unconditionally.
    ///
    /// # Errors
    ///
    /// [`LicenseError::NoLicense`] when nothing is active.
    pub fn deactivate(&self) -> LicenseResult<()> {
        let Some(record) = self.load_record()? else {
            return Err(LicenseError::NoLicense);
        };

        match ParsedKey::parse(&record.key) {
            Ok(key) => self.remote.deactivate(&key, &record.domain),
            Err(e) => warn!("skipping remote deactivation for unparseable stored key: {e}"),
        }

        self.erase_local_state()?;
        info!("license deactivated");
        Ok(())
    }

    /// Whether the active license is currently valid.
    ///
    /// Domain binding and integrity are settled locally before any network
    /// is consulted. A record that fails its integrity check is erased on
    /// the spot — a tampered record is never partially trusted.
    pub fn is_valid(&self) -> bool {
        match self.check_validity() {
            Ok(valid) => valid,
            Err(e) => {
                warn!("license validity check failed: {e}");
                false
            }
        }
    }

    /// The tier granted by the active license, or [`LicenseTier::Free`].
    pub fn get_tier(&self) -> LicenseTier {
        if !self.is_valid() {
            return LicenseTier::Free;
        }
        match self.load_record() {
            Ok(Some(record)) => record.tier,
            _ => LicenseTier::Free,
        }
    }

    /// The current license record, if any.
    pub fn license(&self) -> LicenseResult<Option<LicenseRecord>> {
        self.load_record()
    }

    /// Read-only status projection for admin surfaces.
    ///
    /// Never mutates state and never triggers a remote check: tampering is
    /// reported here but only the next [`Self::is_valid`] erases it.
    pub fn get_status(&self) -> LicenseStatus {
        match self.project_status() {
            Ok(status) => status,
            Err(e) => {
                warn!("license status projection failed: {e}");
                LicenseStatus {
                    tier: LicenseTier::Free,
                    state: LicenseState::NoLicense,
                    is_active: false,
                    is_valid: true,
                    offline: false,
                    activated_at: None,
                    expires_at: None,
                    domain: None,
                    message: "Free version".to_string(),
                    upgrade_url: self.config.upgrade_url_for(None),
                }
            }
        }
    }

    fn check_validity(&self) -> LicenseResult<bool> {
        let Some(record) = self.load_record()? else {
            return Ok(false);
        };

        if record.domain != self.config.domain {
            debug!(
                "license bound to {} but install domain is {}",
                record.domain, self.config.domain
            );
            return Ok(false);
        }

        if !self.verify_integrity(&record)? {
            warn!("license tampering detected; erasing local license state");
            self.erase_local_state()?;
            return Ok(false);
        }

        if record.is_expired(Utc::now()) {
            return Ok(false);
        }

        let verdict = self
            .gate
            .get_or_refresh(&self.grace, record.last_check, || {
                let key = ParsedKey::parse(&record.key)
                    .map_err(|e| RemoteError::Rejected(format!("stored key unparseable: {e}")))?;
                let validation = self.remote.validate(&key, &record.domain)?;
                self.touch_last_check(&record);
                Ok(validation)
            })?;

        Ok(verdict.valid)
    }

    fn project_status(&self) -> LicenseResult<LicenseStatus> {
        let Some(record) = self.load_record()? else {
            return Ok(LicenseStatus {
                tier: LicenseTier::Free,
                state: LicenseState::NoLicense,
                is_active: false,
                is_valid: true,
                offline: false,
                activated_at: None,
                expires_at: None,
                domain: None,
                message: "Free version".to_string(),
                upgrade_url: self.config.upgrade_url_for(None),
            });
        };

        let cache = self.gate.cached()?;
        let offline = cache.as_ref().is_some_and(|entry| entry.offline);

        let (state, is_valid) = if record.domain != self.config.domain {
            (LicenseState::Invalid, false)
        } else if !self.verify_integrity(&record)? {
            (LicenseState::Tampered, false)
        } else if record.is_expired(Utc::now()) {
            (LicenseState::Expired, false)
        } else {
            match &cache {
                Some(entry) if entry.valid && entry.offline => (LicenseState::OfflineGrace, true),
                Some(entry) if entry.valid => (LicenseState::Valid, true),
                Some(_) => (LicenseState::Invalid, false),
                // No verdict on file; the next is_valid() re-verifies.
                None => (LicenseState::Valid, true),
            }
        };

        let message = match state {
            LicenseState::NoLicense => "Free version".to_string(),
            LicenseState::Valid => format!("{} license active", record.tier.label()),
            LicenseState::OfflineGrace => {
                "Offline mode (license authority unreachable)".to_string()
            }
            LicenseState::Expired => "License expired".to_string(),
            LicenseState::Invalid => "License invalid or expired".to_string(),
            LicenseState::Tampered => "License failed its integrity check".to_string(),
        };

        Ok(LicenseStatus {
            tier: record.tier,
            state,
            is_active: true,
            is_valid,
            offline,
            activated_at: Some(record.activated_at),
            expires_at: record.expires_at,
            domain: Some(record.domain.clone()),
            message,
            upgrade_url: self.config.upgrade_url_for(Some(record.tier)),
        })
    }

    // Best-effort last_check bump after a confirmed remote check. Runs
    // while the check lock is still held.
    fn touch_last_check(&self, record: &LicenseRecord) {
        let mut updated = record.clone();
        updated.last_check = Utc::now();
        match self.persist_record(&updated) {
            Ok(()) => self.memoize(Some(updated)),
            Err(e) => warn!("failed to persist last_check update: {e}"),
        }
    }

    fn verify_integrity(&self, record: &LicenseRecord) -> LicenseResult<bool> {
        let Some(signature) = self.store.get(INTEGRITY_KEY)? else {
            return Ok(false);
        };
        let signature = String::from_utf8_lossy(&signature);
        Ok(self.signer.verify(record, &signature))
    }

    fn reload_and_verify(&self) -> LicenseResult<bool> {
        let Some(bytes) = self.store.get(RECORD_KEY)? else {
            return Ok(false);
        };
        let Ok(record) = serde_json::from_slice::<LicenseRecord>(&bytes) else {
            return Ok(false);
        };
        self.verify_integrity(&record)
    }

    fn load_record(&self) -> LicenseResult<Option<LicenseRecord>> {
        if let Some(record) = self.memo().clone() {
            return Ok(Some(record));
        }
        let Some(bytes) = self.store.get(RECORD_KEY)? else {
            return Ok(None);
        };
        let record = match serde_json::from_slice::<LicenseRecord>(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!("stored license record unreadable: {e}");
                return Ok(None);
            }
        };
        self.memoize(Some(record.clone()));
        Ok(Some(record))
    }

    fn persist_record(&self, record: &LicenseRecord) -> LicenseResult<()> {
        self.store.set(RECORD_KEY, &serde_json::to_vec(record)?)?;
        Ok(())
    }

    fn erase_local_state(&self) -> LicenseResult<()> {
        self.store.delete(RECORD_KEY)?;
        self.store.delete(INTEGRITY_KEY)?;
        self.gate.invalidate()?;
        self.memoize(None);
        Ok(())
    }

    fn memoize(&self, record: Option<LicenseRecord>) {
        *self.memo() = record;
    }

    fn memo(&self) -> MutexGuard<'_, Option<LicenseRecord>> {
        self.record_memo
            .lock()
            .expect("license record memo lock poisoned")
    }
}
