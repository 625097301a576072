//! Per-install device identity.
//!
//! The identifier is derived once from device facts plus a random salt,
//! persisted under [`StorageKeys::DEVICE_ID`], and memoized for the life of
//! the process. Regenerating it breaks the gateway's token-device binding,
//! so only [`DeviceIdentityProvider::reset`] does so.

mod facts;

pub use facts::{DeviceFacts, Platform};

use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use token_storage::{StorageKeys, TokenStore};
use tracing::{debug, info, warn};

const SALT_LEN: usize = 12;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Device description reported alongside the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    pub platform: String,
    pub brand: String,
    pub model: String,
    pub os_version: String,
    pub app_version: String,
}

/// Supplies the device identifier to the gateway client and the engine.
pub struct DeviceIdentityProvider {
    store: Arc<dyn TokenStore>,
    facts: DeviceFacts,
    cached: Mutex<Option<String>>,
}

impl DeviceIdentityProvider {
    pub fn new(store: Arc<dyn TokenStore>, facts: DeviceFacts) -> Self {
        Self {
            store,
            facts,
            cached: Mutex::new(None),
        }
    }

    pub fn platform(&self) -> Platform {
        self.facts.platform
    }

    /// The device identifier, generated and persisted on first use.
    ///
    /// A failed persist is logged and the generated id is still used for
    /// this process, so callers always get a value.
    pub fn device_id(&self) -> String {
        let mut cached = self.cached.lock();
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        if let Some(saved) = self.store.get(StorageKeys::DEVICE_ID) {
            debug!("Loaded persisted device id");
            *cached = Some(saved.clone());
            return saved;
        }

        let id = derive_device_id(&self.facts, &random_salt());
        if let Err(e) = self.store.set(StorageKeys::DEVICE_ID, &id) {
            warn!(error = %e, "Failed to persist device id, using it for this process only");
        }
        info!(
            platform = self.facts.platform.as_str(),
            device_id_len = id.len(),
            "Generated new device id"
        );
        *cached = Some(id.clone());
        id
    }

    /// Forget the identifier; the next [`device_id`](Self::device_id) call generates a new one.
    pub fn reset(&self) {
        let mut cached = self.cached.lock();
        self.store.delete(StorageKeys::DEVICE_ID);
        *cached = None;
        info!("Device id reset");
    }

    pub fn device_info(&self, app_version: &str) -> DeviceInfo {
        DeviceInfo {
            device_id: self.device_id(),
            platform: self.facts.platform.as_str().to_string(),
            brand: self.facts.brand_or_unknown().to_string(),
            model: self.facts.model_or_unknown().to_string(),
            os_version: self.facts.os_version_or_unknown().to_string(),
            app_version: app_version.to_string(),
        }
    }
}

/// `platform-unique-brand-model`, lower-cased and reduced to `[a-z0-9._-]`.
///
/// `unique` is the install id when the platform provides one, else `salt`.
pub fn derive_device_id(facts: &DeviceFacts, salt: &str) -> String {
    let unique = facts
        .install_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(salt);
    let raw = format!(
        "{}-{}-{}-{}",
        facts.platform.as_str(),
        unique,
        facts.brand_or_unknown(),
        facts.model_or_unknown()
    );
    sanitize(&raw)
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars().flat_map(char::to_lowercase) {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' {
            ch
        } else {
            '-'
        };
        if mapped == '-' && out.ends_with('-') {
            continue;
        }
        out.push(mapped);
    }
    out.trim_matches('-').to_string()
}

fn random_salt() -> String {
    let mut rng = rand::thread_rng();
    (0..SALT_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use token_storage::{MemoryStorage, SecureTokenStore};

    fn facts() -> DeviceFacts {
        DeviceFacts {
            platform: Platform::Ios,
            brand: Some("Apple".to_string()),
            model: Some("iPhone 15 Pro".to_string()),
            os_version: Some("17.4".to_string()),
            install_id: None,
        }
    }

    fn provider_with(backend: Arc<MemoryStorage>, facts: DeviceFacts) -> DeviceIdentityProvider {
        let store = Arc::new(SecureTokenStore::new(Box::new(backend)));
        DeviceIdentityProvider::new(store, facts)
    }

    #[test]
    fn test_derivation_is_deterministic_with_install_id() {
        let facts = DeviceFacts {
            install_id: Some("ABC 123".to_string()),
            ..facts()
        };
        let a = derive_device_id(&facts, "salt-one");
        let b = derive_device_id(&facts, "salt-two");
        assert_eq!(a, b);
        assert_eq!(a, "ios-abc-123-apple-iphone-15-pro");
    }

    #[test]
    fn test_derivation_uses_salt_without_install_id() {
        assert_eq!(
            derive_device_id(&facts(), "k3j9x0"),
            "ios-k3j9x0-apple-iphone-15-pro"
        );
    }

    #[test]
    fn test_sanitize_is_url_safe() {
        let id = sanitize("Android--Ünïcode  Brand/Model?x=1");
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c)));
        assert!(!id.contains("--"));
        assert!(!id.starts_with('-') && !id.ends_with('-'));
    }

    #[test]
    fn test_random_salt_shape() {
        let salt = random_salt();
        assert_eq!(salt.len(), SALT_LEN);
        assert!(salt.bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn test_device_id_is_memoized_and_persisted() {
        let backend = Arc::new(MemoryStorage::new());
        let provider = provider_with(backend.clone(), facts());

        let first = provider.device_id();
        assert_eq!(provider.device_id(), first);
        assert_eq!(backend.len(), 1);

        let restarted = provider_with(backend, facts());
        assert_eq!(restarted.device_id(), first);
    }

    #[test]
    fn test_reset_generates_new_id() {
        let backend = Arc::new(MemoryStorage::new());
        let provider = provider_with(backend, facts());

        let first = provider.device_id();
        provider.reset();
        let second = provider.device_id();
        assert_ne!(first, second);
        assert!(second.starts_with("ios-"));
    }

    #[test]
    fn test_persist_failure_still_returns_stable_id() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set_fail_writes(true);
        let provider = provider_with(backend, facts());

        let id = provider.device_id();
        assert_eq!(provider.device_id(), id);
    }

    #[test]
    fn test_device_info_fills_unknowns() {
        let backend = Arc::new(MemoryStorage::new());
        let provider = provider_with(
            backend,
            DeviceFacts {
                platform: Platform::Android,
                brand: None,
                model: None,
                os_version: None,
                install_id: Some("droid".to_string()),
            },
        );

        let info = provider.device_info("2.1.0");
        assert_eq!(info.device_id, "android-droid-unknown-unknown");
        assert_eq!(info.platform, "android");
        assert_eq!(info.brand, "Unknown");
        assert_eq!(info.app_version, "2.1.0");

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["osVersion"], "Unknown");
    }
}
