//! Error types for the licensing subsystem.

use thiserror::Error;

/// Licensing-specific errors.
///
/// Format and checksum failures are resolved locally and cheaply, before any
/// network traffic. `TamperingDetected` is the one variant whose detection
/// also destroys local license state.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Key does not match the `RP-{TIER}-XXXX-...` template.
    #[error("invalid license key format: {0}")]
    InvalidFormat(String),

    /// Embedded checksum does not match the key payload.
    #[error("license key checksum invalid")]
    InvalidChecksum,

    /// License authority could not be reached.
    #[error("license authority unreachable: {0}")]
    Unreachable(String),

    /// License authority actively denied the key.
    #[error("license rejected by authority: {0}")]
    Rejected(String),

    /// License entitlement has lapsed.
    #[error("license expired on {0}")]
    Expired(String),

    /// Persisted license state failed its integrity check.
    #[error("license tampering detected")]
    TamperingDetected,

    /// Activation-time self-check failed; all partial state was rolled back.
    #[error("license could not be stored verifiably")]
    IntegrityCheckFailed,

    /// No license is currently active.
    #[error("no active license found")]
    NoLicense,

    /// Configuration rejected (e.g. production profile with default secrets).
    #[error("license configuration invalid: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] playbook_store::StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
