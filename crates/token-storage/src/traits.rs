//! Storage trait definitions.

use crate::StorageResult;

/// Raw key-value backend for the secure store.
pub trait SecureStorage: Send + Sync {
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Keys starting with `prefix`. Backends that cannot enumerate return an empty list.
    fn list_keys_with_prefix(&self, _prefix: &str) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Credential store contract shared by the native and web sides.
///
/// Reads never fail: a missing key or an unreadable backend both yield
/// `None`. Writes report failure so callers can refuse to treat an
/// unpersisted session as established. Deletes never fail observably.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn delete(&self, key: &str);

    /// Remove every session entry. Calling it on an empty store is a no-op.
    fn clear_all(&self);
}

impl<T: SecureStorage + ?Sized> SecureStorage for std::sync::Arc<T> {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).list_keys_with_prefix(prefix)
    }
}
