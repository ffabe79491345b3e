mod common;

use chrono::{TimeDelta, Utc};
use common::{dev_engine, make_key, pro_key, test_config};
use playbook_license::mock::{MockAuthority, MockOutcome};
use playbook_license::{
    LicenseManager, LicenseTier, OfflineAuthority, ParsedKey, RemoteAuthority, RemoteError,
};
use playbook_store::{MemoryCache, MemoryStore};
use std::sync::Arc;

// ── OfflineAuthority ─────────────────────────────────────────────

#[test]
fn offline_authority_accepts_checksum_valid_key() {
    let authority = OfflineAuthority::new(dev_engine());
    let key = ParsedKey::parse(&pro_key()).unwrap();

    let validation = authority.validate(&key, "example.com").unwrap();
    assert_eq!(validation.tier, LicenseTier::Pro);
    assert!(validation.expires_at.is_none());
}

#[test]
fn offline_authority_rejects_bad_checksum() {
    let authority = OfflineAuthority::new(dev_engine());
    let key = ParsedKey::parse("RP-PRO-AB12-CD34-EF56-GH78-0000").unwrap();

    let err = authority.validate(&key, "example.com").unwrap_err();
    assert!(matches!(err, RemoteError::Rejected(_)));
}

#[test]
fn offline_authority_stamps_ai_subscription_expiry() {
    let authority = OfflineAuthority::new(dev_engine());
    let key = ParsedKey::parse(&make_key("AI")).unwrap();

    let validation = authority.validate(&key, "example.com").unwrap();
    assert_eq!(validation.tier, LicenseTier::AiAddon);

    let expires_at = validation.expires_at.unwrap();
    let days = (expires_at - Utc::now()).num_days();
    assert!((364..=365).contains(&days));
}

#[test]
fn offline_authority_reads_tier_from_tag() {
    let authority = OfflineAuthority::new(dev_engine());
    for tag in ["PRO", "AI", "BUNDLE"] {
        let key = ParsedKey::parse(&make_key(tag)).unwrap();
        let validation = authority.validate(&key, "example.com").unwrap();
        assert_eq!(validation.tier.tag(), Some(tag));
    }
}

#[test]
fn manager_works_end_to_end_with_offline_authority() {
    let manager = LicenseManager::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryCache::new()),
        OfflineAuthority::new(dev_engine()),
        test_config("example.com"),
    )
    .unwrap();

    let activation = manager.activate(&make_key("BUNDLE")).unwrap();
    assert_eq!(activation.tier, LicenseTier::Bundle);
    assert!(manager.is_valid());
    assert_eq!(manager.get_tier(), LicenseTier::Bundle);

    manager.deactivate().unwrap();
    assert_eq!(manager.get_tier(), LicenseTier::Free);
}

// ── MockAuthority ────────────────────────────────────────────────

#[test]
fn mock_counts_calls() {
    let authority = MockAuthority::valid(LicenseTier::Pro);
    let key = ParsedKey::parse(&pro_key()).unwrap();

    assert_eq!(authority.validate_calls(), 0);
    authority.validate(&key, "example.com").unwrap();
    authority.validate(&key, "example.com").unwrap();
    assert_eq!(authority.validate_calls(), 2);

    authority.deactivate(&key, "example.com");
    assert_eq!(authority.deactivate_calls(), 1);
}

#[test]
fn mock_outcome_can_change_between_calls() {
    let authority = MockAuthority::valid(LicenseTier::Pro);
    let key = ParsedKey::parse(&pro_key()).unwrap();

    assert!(authority.validate(&key, "example.com").is_ok());

    authority.set_outcome(MockOutcome::Unreachable);
    assert!(matches!(
        authority.validate(&key, "example.com"),
        Err(RemoteError::Unreachable(_))
    ));

    authority.set_outcome(MockOutcome::Valid {
        tier: LicenseTier::Bundle,
        expires_at: Some(Utc::now() + TimeDelta::days(30)),
    });
    let validation = authority.validate(&key, "example.com").unwrap();
    assert_eq!(validation.tier, LicenseTier::Bundle);
    assert!(validation.expires_at.is_some());
}
