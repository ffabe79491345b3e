//! Shared test helpers for license tests.

#![allow(dead_code)]

use playbook_license::mock::MockAuthority;
use playbook_license::{ChecksumEngine, DEV_CHECKSUM_SECRET, LicenseConfig, LicenseManager};
use playbook_store::{MemoryCache, MemoryStore};
use std::sync::Arc;
use std::time::Duration;

pub type TestManager = LicenseManager<Arc<MemoryStore>, Arc<MemoryCache>, Arc<MockAuthority>>;

/// Collaborators shared by every manager built in a test.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub remote: Arc<MockAuthority>,
}

impl TestEnv {
    pub fn new(remote: MockAuthority) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            cache: Arc::new(MemoryCache::new()),
            remote: Arc::new(remote),
        }
    }

    /// A manager bound to `example.com` with the development secrets.
    pub fn manager(&self) -> TestManager {
        self.manager_with(test_config("example.com"))
    }

    pub fn manager_with(&self, config: LicenseConfig) -> TestManager {
        LicenseManager::new(
            self.store.clone(),
            self.cache.clone(),
            self.remote.clone(),
            config,
        )
        .unwrap()
    }
}

/// Development config with a short lock backoff to keep tests fast.
pub fn test_config(domain: &str) -> LicenseConfig {
    let mut config = LicenseConfig::new(domain);
    config.lock_backoff = Duration::from_millis(100);
    config
}

/// The checksum engine matching the development secret.
pub fn dev_engine() -> ChecksumEngine {
    ChecksumEngine::new(DEV_CHECKSUM_SECRET)
}

/// Mints a key with a correct checksum for the given engine.
pub fn make_key_with(engine: &ChecksumEngine, tag: &str) -> String {
    let payload = format!("RP-{tag}-AB12-CD34-EF56-GH78");
    let checksum = engine.compute(&payload);
    format!("{payload}-{checksum}")
}

/// Mints a key with a correct checksum for the development secret.
pub fn make_key(tag: &str) -> String {
    make_key_with(&dev_engine(), tag)
}

pub fn pro_key() -> String {
    make_key("PRO")
}
