//! The persisted license record.

use crate::key::LicenseTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single long-lived entity of the licensing subsystem.
///
/// Created by activation, refreshed (`last_check`) by successful remote
/// re-checks, destroyed by deactivation or tamper detection. The persistent
/// store owns it; any in-memory copy lives for at most one verification
/// cycle and is invalidated by every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Canonical license key.
    pub key: String,
    /// Entitlement tier confirmed at activation.
    pub tier: LicenseTier,
    /// Domain this license is bound to.
    pub domain: String,
    /// When the license was activated on this install.
    pub activated_at: DateTime<Utc>,
    /// Entitlement expiry, for time-bounded tiers.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last successful confirmation from the license authority.
    pub last_check: DateTime<Utc>,
}

impl LicenseRecord {
    /// True once the entitlement itself has lapsed.
    ///
    /// Checked independently of authority reachability: the offline grace
    /// window exists for connectivity failures, not entitlement expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}
