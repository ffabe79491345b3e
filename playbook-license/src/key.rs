//! License key parsing and checksum verification.
//!
//! Keys use the format `RP-{TIER}-{XXXX}-{XXXX}-{XXXX}-{XXXX}-{XXXX}`:
//! the product prefix, a tier tag, four payload groups, and a final group
//! carrying a checksum derived from everything before it. Input is
//! case-insensitive and canonicalized to uppercase.
//!
//! The checksum is the first [`CHECKSUM_LEN`] hex characters of an
//! HMAC-SHA256 over the key payload, keyed by a deployment-specific secret.
//! It proves the key came from the holder of that secret without any network
//! round-trip, so forged keys are rejected before the license authority is
//! ever contacted.

use crate::error::{LicenseError, LicenseResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Product prefix every license key starts with.
pub const KEY_PREFIX: &str = "RP";

/// Number of hex characters in the embedded checksum.
pub const CHECKSUM_LEN: usize = 4;

const GROUP_LEN: usize = 4;
const GROUP_COUNT: usize = 5;

/// The entitlement tier associated with a license.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseTier {
    /// No paid license; the default.
    #[default]
    Free,
    /// Pro feature set.
    Pro,
    /// AI assistance add-on (subscription).
    AiAddon,
    /// Pro and AI combined.
    Bundle,
}

impl LicenseTier {
    /// Parses a tier tag as embedded in license keys.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PRO" => Some(Self::Pro),
            "AI" => Some(Self::AiAddon),
            "BUNDLE" => Some(Self::Bundle),
            _ => None,
        }
    }

    /// The tag embedded in keys of this tier. `Free` has no keys.
    #[must_use]
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Free => None,
            Self::Pro => Some("PRO"),
            Self::AiAddon => Some("AI"),
            Self::Bundle => Some("BUNDLE"),
        }
    }

    /// Human-readable label for status displays.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
            Self::AiAddon => "AI Addon",
            Self::Bundle => "Pro + AI Bundle",
        }
    }

    /// True for tiers carrying the full applicant-management feature set.
    #[must_use]
    pub fn is_pro(&self) -> bool {
        matches!(self, Self::Pro | Self::Bundle)
    }

    /// True for tiers carrying AI assistance.
    #[must_use]
    pub fn has_ai(&self) -> bool {
        matches!(self, Self::AiAddon | Self::Bundle)
    }
}

/// A syntactically valid license key, canonicalized to uppercase.
///
/// Parsing is pure syntax: it establishes the template and extracts the tier
/// tag, nothing more. Run it before any cryptographic work so malformed
/// input is rejected cheaply. The tag is only a pre-network sanity filter;
/// the authority's response is the source of truth for the granted tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    canonical: String,
    tier: LicenseTier,
}

impl ParsedKey {
    /// Parses and canonicalizes a raw key string.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] on any deviation from the
    /// template: wrong prefix, unknown tier tag, wrong group count or
    /// length, or disallowed characters.
    pub fn parse(raw: &str) -> LicenseResult<Self> {
        let canonical = raw.trim().to_ascii_uppercase();
        let mut parts = canonical.split('-');

        if parts.next() != Some(KEY_PREFIX) {
            return Err(LicenseError::InvalidFormat(format!(
                "key must start with the {KEY_PREFIX} prefix"
            )));
        }

        let tag = parts.next().unwrap_or_default();
        let Some(tier) = LicenseTier::from_tag(tag) else {
            return Err(LicenseError::InvalidFormat(format!(
                "unknown tier tag: {tag:?}"
            )));
        };

        let groups: Vec<&str> = parts.collect();
        if groups.len() != GROUP_COUNT {
            return Err(LicenseError::InvalidFormat(format!(
                "expected {GROUP_COUNT} key groups, found {}",
                groups.len()
            )));
        }
        for group in groups {
            if group.len() != GROUP_LEN || !group.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(LicenseError::InvalidFormat(format!(
                    "malformed key group: {group:?}"
                )));
            }
        }

        Ok(Self { canonical, tier })
    }

    /// The canonical (uppercase) key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The tier tag embedded in the key.
    #[must_use]
    pub fn tier(&self) -> LicenseTier {
        self.tier
    }

    /// Everything before the final checksum group.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.canonical[..self.canonical.len() - CHECKSUM_LEN - 1]
    }

    /// The final group: the embedded checksum.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.canonical[self.canonical.len() - CHECKSUM_LEN..]
    }
}

impl std::fmt::Display for ParsedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Computes and verifies the checksum embedded in license keys.
#[derive(Clone)]
pub struct ChecksumEngine {
    secret: Vec<u8>,
}

impl ChecksumEngine {
    /// Creates an engine keyed by the given shared secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The expected checksum for a key payload: the first [`CHECKSUM_LEN`]
    /// uppercase hex characters of HMAC-SHA256 over the payload.
    #[must_use]
    pub fn compute(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        let digest = mac.finalize().into_bytes();
        hex::encode(digest)[..CHECKSUM_LEN].to_ascii_uppercase()
    }

    /// Verifies a key's embedded checksum in constant time.
    #[must_use]
    pub fn verify(&self, key: &ParsedKey) -> bool {
        let expected = self.compute(key.payload());
        expected.as_bytes().ct_eq(key.checksum().as_bytes()).into()
    }
}

impl std::fmt::Debug for ChecksumEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumEngine")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
