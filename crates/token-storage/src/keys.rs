//! Storage key constants.

/// Keys shared by the secure store and the cookie store.
pub struct StorageKeys;

impl StorageKeys {
    pub const ACCESS_TOKEN: &'static str = "access_token";

    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Serialized user profile, opaque to the bridge.
    pub const USER_INFO: &'static str = "user_info";

    /// Optional access token expiry (RFC 3339).
    pub const EXPIRES_AT: &'static str = "expires_at";

    /// Per-install device identifier. Survives session invalidation.
    pub const DEVICE_ID: &'static str = "device_id";

    /// Keys removed by `clear_all`.
    pub const SESSION_KEYS: &'static [&'static str] = &[
        Self::ACCESS_TOKEN,
        Self::REFRESH_TOKEN,
        Self::USER_INFO,
        Self::EXPIRES_AT,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_storage_keys_are_unique() {
        let mut keys: Vec<&str> = StorageKeys::SESSION_KEYS.to_vec();
        keys.push(StorageKeys::DEVICE_ID);
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }

    #[test]
    fn test_device_id_is_not_a_session_key() {
        assert!(!StorageKeys::SESSION_KEYS.contains(&StorageKeys::DEVICE_ID));
    }
}
