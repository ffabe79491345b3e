//! Configuration for the licensing subsystem.
//!
//! Two independent secrets must be configurable: the checksum secret shared
//! with the key issuer, and the node-local material the integrity-signature
//! secret is derived from. Both fall back to development defaults that are
//! deliberately public; [`Profile::Production`] refuses to run with them.

use crate::error::{LicenseError, LicenseResult};
use crate::grace::DEFAULT_GRACE_WINDOW_SECS;
use crate::key::LicenseTier;
use std::time::Duration;

/// Development-only checksum secret. Public by definition — production
/// deployments must override it.
pub const DEV_CHECKSUM_SECRET: &str = "rp-default-license-secret-change-in-production";

/// Development-only integrity auth key. Public by definition.
pub const DEV_INTEGRITY_AUTH_KEY: &str = "rp-dev-auth-key";

/// Development-only install identity. Public by definition.
pub const DEV_INSTALL_ID: &str = "rp-dev-install";

const DEFAULT_UPGRADE_URL: &str = "https://recruiting-playbook.com/pricing/";

/// Deployment profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development defaults allowed.
    #[default]
    Development,
    /// Default secrets are refused at construction time.
    Production,
}

/// Node-local material the integrity-signature secret is derived from.
///
/// These values must not be visible or editable through the same surface
/// used to edit persisted license state, or the signature is worthless.
#[derive(Clone)]
pub struct IntegrityMaterial {
    /// The hosting environment's own authentication secret.
    pub auth_key: String,
    /// Stable identity of this install.
    pub install_id: String,
}

impl IntegrityMaterial {
    /// True while any field still holds a development default.
    #[must_use]
    pub fn is_development_default(&self) -> bool {
        self.auth_key == DEV_INTEGRITY_AUTH_KEY || self.install_id == DEV_INSTALL_ID
    }
}

impl Default for IntegrityMaterial {
    fn default() -> Self {
        Self {
            auth_key: DEV_INTEGRITY_AUTH_KEY.to_string(),
            install_id: DEV_INSTALL_ID.to_string(),
        }
    }
}

impl std::fmt::Debug for IntegrityMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityMaterial")
            .field("auth_key", &"[REDACTED]")
            .field("install_id", &self.install_id)
            .finish()
    }
}

/// Configuration handed to [`crate::LicenseManager`] at construction.
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    /// Domain this install is bound to (host only, no scheme).
    pub domain: String,
    /// Shared secret keying the key checksum HMAC.
    pub checksum_secret: String,
    /// Material the integrity-signature secret is derived from.
    pub integrity_material: IntegrityMaterial,
    /// Deployment profile.
    pub profile: Profile,
    /// TTL for authority-confirmed verdicts.
    pub cache_ttl: Duration,
    /// TTL for verdicts reached while the authority was unreachable.
    pub offline_cache_ttl: Duration,
    /// TTL of the cross-process check lock. A backstop only — every code
    /// path releases the lock explicitly.
    pub lock_ttl: Duration,
    /// The single bounded wait when another caller holds the check lock.
    pub lock_backoff: Duration,
    /// How long a license stays usable after its last confirmed check while
    /// the authority is unreachable.
    pub grace_window: Duration,
    /// Pricing page for status displays.
    pub upgrade_url: String,
}

impl LicenseConfig {
    /// Development configuration bound to `domain`.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            checksum_secret: DEV_CHECKSUM_SECRET.to_string(),
            integrity_material: IntegrityMaterial::default(),
            profile: Profile::Development,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            offline_cache_ttl: Duration::from_secs(60 * 60),
            lock_ttl: Duration::from_secs(30),
            lock_backoff: Duration::from_millis(500),
            grace_window: Duration::from_secs(DEFAULT_GRACE_WINDOW_SECS),
            upgrade_url: DEFAULT_UPGRADE_URL.to_string(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the bound domain is empty, or if
    /// the profile is [`Profile::Production`] while either secret still
    /// holds a development default.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.domain.is_empty() {
            return Err(LicenseError::Config(
                "bound domain must not be empty".to_string(),
            ));
        }
        if self.profile == Profile::Production {
            if self.checksum_secret == DEV_CHECKSUM_SECRET {
                return Err(LicenseError::Config(
                    "checksum secret still set to the development default".to_string(),
                ));
            }
            if self.integrity_material.is_development_default() {
                return Err(LicenseError::Config(
                    "integrity material still set to the development default".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The pricing page, optionally deep-linked to a tier.
    #[must_use]
    pub fn upgrade_url_for(&self, tier: Option<LicenseTier>) -> String {
        match tier.and_then(|t| t.tag()) {
            Some(tag) => format!("{}?tier={}", self.upgrade_url, tag.to_ascii_lowercase()),
            None => self.upgrade_url.clone(),
        }
    }
}
