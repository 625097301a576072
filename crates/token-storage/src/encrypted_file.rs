//! Encrypted on-disk backend.
//!
//! The whole key-value map is serialized to JSON and sealed with
//! ChaCha20-Poly1305. The cipher key is derived with HKDF-SHA256 from a
//! random 32-byte store key kept base64-encoded in a sibling file.
//!
//! File layout: `nonce(12) || ciphertext || tag(16)`.

use crate::{SecureStorage, StorageError, StorageResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const HKDF_INFO: &[u8] = b"storefront-secure-store-v1";
const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

pub struct EncryptedFileStorage {
    path: PathBuf,
    cipher_key: [u8; KEY_SIZE],
    entries: Mutex<BTreeMap<String, String>>,
}

impl EncryptedFileStorage {
    /// Open (or create) the store at `path`, sealed with the key in `key_path`.
    pub fn open(path: impl Into<PathBuf>, key_path: &Path) -> StorageResult<Self> {
        let path = path.into();
        let store_key = load_or_create_store_key(key_path)?;
        let cipher_key = derive_cipher_key(&store_key)?;

        let entries = if path.exists() {
            let sealed = std::fs::read(&path)?;
            open_entries(&cipher_key, &sealed)?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened encrypted store");
        Ok(Self {
            path,
            cipher_key,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let plaintext = serde_json::to_vec(entries)?;
        let sealed = seal(&self.cipher_key, &plaintext)?;
        write_atomic(&self.path, &sealed)
    }

    /// Apply `change` and persist; the in-memory map is restored if the write fails.
    fn mutate<F>(&self, change: F) -> StorageResult<bool>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut entries = self.entries.lock();
        let previous = entries.clone();
        if !change(&mut entries) {
            return Ok(false);
        }
        if let Err(e) = self.persist(&entries) {
            *entries = previous;
            return Err(e);
        }
        Ok(true)
    }
}

impl SecureStorage for EncryptedFileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
        .map(|_| ())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        self.mutate(|entries| entries.remove(key).is_some())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

fn load_or_create_store_key(key_path: &Path) -> StorageResult<[u8; KEY_SIZE]> {
    if key_path.exists() {
        let encoded = std::fs::read_to_string(key_path)?;
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| StorageError::Encoding(format!("store key is not base64: {}", e)))?;
        return bytes.try_into().map_err(|b: Vec<u8>| {
            StorageError::Encoding(format!("store key must be {} bytes, got {}", KEY_SIZE, b.len()))
        });
    }

    let mut key = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    write_atomic(key_path, BASE64.encode(key).as_bytes())?;
    restrict_permissions(key_path)?;
    info!(path = %key_path.display(), "Generated new secure store key");
    Ok(key)
}

fn derive_cipher_key(store_key: &[u8]) -> StorageResult<[u8; KEY_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(None, store_key);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(HKDF_INFO, &mut okm)
        .map_err(|e| StorageError::Crypto(format!("HKDF expand failed: {:?}", e)))?;
    Ok(okm)
}

fn seal(cipher_key: &[u8; KEY_SIZE], plaintext: &[u8]) -> StorageResult<Vec<u8>> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(cipher_key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| StorageError::Crypto(format!("encryption failed: {:?}", e)))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open_entries(
    cipher_key: &[u8; KEY_SIZE],
    sealed: &[u8],
) -> StorageResult<BTreeMap<String, String>> {
    if sealed.len() < NONCE_SIZE {
        return Err(StorageError::Crypto("sealed store is truncated".to_string()));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(cipher_key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| StorageError::Crypto("store authentication failed".to_string()))?;

    Ok(serde_json::from_slice(&plaintext)?)
}

fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> StorageResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_in(dir: &Path) -> EncryptedFileStorage {
        EncryptedFileStorage::open(dir.join("secure-store.bin"), &dir.join("secure-store.key"))
            .unwrap()
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = open_in(dir.path());
            store.set("access_token", "tok-1").unwrap();
            store.set("user_info", r#"{"name":"Lee"}"#).unwrap();
        }

        let store = open_in(dir.path());
        assert_eq!(store.get("access_token").unwrap(), Some("tok-1".to_string()));
        assert_eq!(
            store.get("user_info").unwrap(),
            Some(r#"{"name":"Lee"}"#.to_string())
        );
    }

    #[test]
    fn test_file_does_not_contain_plaintext() {
        let dir = tempdir().unwrap();
        let store = open_in(dir.path());
        store.set("access_token", "very-recognizable-token").unwrap();

        let raw = std::fs::read(dir.path().join("secure-store.bin")).unwrap();
        let needle = b"very-recognizable-token";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let store = open_in(dir.path());
        store.set("refresh_token", "r").unwrap();
        assert!(store.delete("refresh_token").unwrap());
        assert!(!store.delete("refresh_token").unwrap());

        let reopened = open_in(dir.path());
        assert_eq!(reopened.get("refresh_token").unwrap(), None);
    }

    #[test]
    fn test_wrong_key_fails_to_open() {
        let dir = tempdir().unwrap();
        open_in(dir.path()).set("k", "v").unwrap();

        std::fs::write(
            dir.path().join("secure-store.key"),
            BASE64.encode([7u8; KEY_SIZE]),
        )
        .unwrap();

        let result = EncryptedFileStorage::open(
            dir.path().join("secure-store.bin"),
            &dir.path().join("secure-store.key"),
        );
        assert!(matches!(result, Err(StorageError::Crypto(_))));
    }

    #[test]
    fn test_malformed_key_file_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("secure-store.key"), "c2hvcnQ=").unwrap();

        let result = EncryptedFileStorage::open(
            dir.path().join("secure-store.bin"),
            &dir.path().join("secure-store.key"),
        );
        assert!(matches!(result, Err(StorageError::Encoding(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        open_in(dir.path());

        let mode = std::fs::metadata(dir.path().join("secure-store.key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
