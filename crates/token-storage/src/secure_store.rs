//! Native-side token store.

use crate::{CredentialPair, SecureStorage, StorageKeys, StorageResult, TokenStore};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Typed access to session credentials over a [`SecureStorage`] backend.
pub struct SecureTokenStore {
    backend: Box<dyn SecureStorage>,
}

impl SecureTokenStore {
    pub fn new(backend: Box<dyn SecureStorage>) -> Self {
        Self { backend }
    }

    pub fn access_token(&self) -> Option<String> {
        self.get(StorageKeys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(StorageKeys::REFRESH_TOKEN)
    }

    /// Serialized user profile exactly as it was stored.
    pub fn user_info(&self) -> Option<String> {
        self.get(StorageKeys::USER_INFO)
    }

    pub fn set_user_info(&self, user_info: &str) -> StorageResult<()> {
        self.set(StorageKeys::USER_INFO, user_info)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.get(StorageKeys::EXPIRES_AT)?;
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                warn!(error = %e, "Ignoring unparseable token expiry");
                None
            }
        }
    }

    /// Both tokens present.
    pub fn has_tokens(&self) -> bool {
        self.access_token().is_some() && self.refresh_token().is_some()
    }

    /// The stored pair, or `None` unless both tokens are present.
    pub fn read_credentials(&self) -> Option<CredentialPair> {
        let access_token = self.access_token()?;
        let refresh_token = self.refresh_token()?;
        Some(CredentialPair {
            access_token,
            refresh_token,
            expires_at: self.expires_at(),
        })
    }

    /// Persist both tokens. If any write fails the entries already written
    /// are removed so a half pair never survives.
    pub fn write_credentials(&self, pair: &CredentialPair) -> StorageResult<()> {
        let result = self
            .set(StorageKeys::ACCESS_TOKEN, &pair.access_token)
            .and_then(|_| self.set(StorageKeys::REFRESH_TOKEN, &pair.refresh_token))
            .and_then(|_| match pair.expires_at {
                Some(at) => self.set(StorageKeys::EXPIRES_AT, &at.to_rfc3339()),
                None => {
                    self.delete(StorageKeys::EXPIRES_AT);
                    Ok(())
                }
            });

        if let Err(e) = result {
            warn!(error = %e, "Credential write failed, rolling back");
            self.delete(StorageKeys::ACCESS_TOKEN);
            self.delete(StorageKeys::REFRESH_TOKEN);
            self.delete(StorageKeys::EXPIRES_AT);
            return Err(e);
        }

        debug!(has_expiry = pair.expires_at.is_some(), "Stored credential pair");
        Ok(())
    }
}

impl TokenStore for SecureTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Secure store read failed, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.backend.set(key, value)
    }

    fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key) {
            warn!(key, error = %e, "Secure store delete failed");
        }
    }

    fn clear_all(&self) {
        for key in StorageKeys::SESSION_KEYS {
            self.delete(key);
        }
        debug!("Cleared secure store session entries");
    }
}
