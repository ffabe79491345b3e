//! Tamper detection for persisted license state.
//!
//! The license record lives in storage an administrator can edit directly;
//! editing `tier` there must not mint a higher entitlement. Every record is
//! therefore signed with HMAC-SHA256 over a canonical serialization of its
//! `{key, tier, domain}` fields, keyed by a secret derived from node-local
//! values that are not reachable through the record-editing surface.
//!
//! The signature is persisted under its own storage key, separate from the
//! record, and verification re-runs on every load — a cached verdict would
//! let an attacker who can edit persisted state swap both record and
//! signature between checks.

use crate::config::IntegrityMaterial;
use crate::key::LicenseTier;
use crate::record::LicenseRecord;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The record fields covered by the integrity signature.
#[derive(Serialize)]
struct SignedFields<'a> {
    key: &'a str,
    tier: LicenseTier,
    domain: &'a str,
}

/// Signs and verifies persisted license records.
#[derive(Clone)]
pub struct IntegritySigner {
    secret: [u8; 32],
}

impl IntegritySigner {
    /// Derives the signing secret from node-local material and the bound
    /// domain.
    ///
    /// The secret itself is never persisted; it is re-derived on every
    /// construction from values the record-editing surface cannot reach.
    #[must_use]
    pub fn new(material: &IntegrityMaterial, domain: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(material.auth_key.as_bytes());
        hasher.update(b"|");
        hasher.update(material.install_id.as_bytes());
        hasher.update(b"|");
        hasher.update(domain.as_bytes());
        Self {
            secret: hasher.finalize().into(),
        }
    }

    /// Hex HMAC signature over the record's signed fields.
    #[must_use]
    pub fn sign(&self, record: &LicenseRecord) -> String {
        let payload = serde_json::to_string(&SignedFields {
            key: &record.key,
            tier: record.tier,
            domain: &record.domain,
        })
        .expect("signed fields serialize infallibly");

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time verification. Fails whenever any signed field was
    /// altered without going through activation.
    #[must_use]
    pub fn verify(&self, record: &LicenseRecord, signature: &str) -> bool {
        self.sign(record)
            .as_bytes()
            .ct_eq(signature.as_bytes())
            .into()
    }
}

impl std::fmt::Debug for IntegritySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegritySigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
