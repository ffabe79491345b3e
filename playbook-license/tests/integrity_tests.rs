mod common;

use chrono::Utc;
use common::pro_key;
use playbook_license::{IntegrityMaterial, IntegritySigner, LicenseRecord, LicenseTier};

fn record() -> LicenseRecord {
    let now = Utc::now();
    LicenseRecord {
        key: pro_key(),
        tier: LicenseTier::Pro,
        domain: "example.com".to_string(),
        activated_at: now,
        expires_at: None,
        last_check: now,
    }
}

fn signer() -> IntegritySigner {
    IntegritySigner::new(&IntegrityMaterial::default(), "example.com")
}

// ── Sign / verify ────────────────────────────────────────────────

#[test]
fn sign_verify_roundtrip() {
    let signer = signer();
    let record = record();
    let signature = signer.sign(&record);
    assert!(signer.verify(&record, &signature));
}

#[test]
fn signature_is_deterministic() {
    let signer = signer();
    let record = record();
    assert_eq!(signer.sign(&record), signer.sign(&record));
}

#[test]
fn signature_is_hex() {
    let signature = signer().sign(&record());
    assert_eq!(signature.len(), 64);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
}

// ── Tamper detection ─────────────────────────────────────────────

#[test]
fn altered_tier_fails_verification() {
    let signer = signer();
    let mut record = record();
    let signature = signer.sign(&record);

    record.tier = LicenseTier::Bundle;
    assert!(!signer.verify(&record, &signature));
}

#[test]
fn altered_domain_fails_verification() {
    let signer = signer();
    let mut record = record();
    let signature = signer.sign(&record);

    record.domain = "evil.example".to_string();
    assert!(!signer.verify(&record, &signature));
}

#[test]
fn altered_key_fails_verification() {
    let signer = signer();
    let mut record = record();
    let signature = signer.sign(&record);

    record.key = common::make_key("BUNDLE");
    assert!(!signer.verify(&record, &signature));
}

#[test]
fn unsigned_fields_do_not_affect_signature() {
    let signer = signer();
    let mut record = record();
    let signature = signer.sign(&record);

    // Timestamps are outside the signed subset; refreshing last_check must
    // not require re-signing.
    record.last_check = Utc::now();
    record.expires_at = Some(Utc::now());
    assert!(signer.verify(&record, &signature));
}

#[test]
fn truncated_signature_fails() {
    let signer = signer();
    let record = record();
    let signature = signer.sign(&record);
    assert!(!signer.verify(&record, &signature[..32]));
    assert!(!signer.verify(&record, ""));
}

// ── Secret derivation ────────────────────────────────────────────

#[test]
fn different_material_yields_different_signature() {
    let record = record();
    let a = signer().sign(&record);
    let b = IntegritySigner::new(
        &IntegrityMaterial {
            auth_key: "another-auth-key".to_string(),
            install_id: "another-install".to_string(),
        },
        "example.com",
    )
    .sign(&record);
    assert_ne!(a, b);
}

#[test]
fn different_domain_yields_different_signature() {
    let record = record();
    let a = signer().sign(&record);
    let b = IntegritySigner::new(&IntegrityMaterial::default(), "other.example").sign(&record);
    assert_ne!(a, b);
}

#[test]
fn cross_install_signatures_do_not_verify() {
    let record = record();
    let signature = signer().sign(&record);
    let other = IntegritySigner::new(
        &IntegrityMaterial {
            auth_key: "another-auth-key".to_string(),
            install_id: "another-install".to_string(),
        },
        "example.com",
    );
    assert!(!other.verify(&record, &signature));
}

#[test]
fn signer_debug_redacts_secret() {
    let debug = format!("{:?}", signer());
    assert!(debug.contains("REDACTED"));
}
