//! Session credential storage for both sides of the bridge.
//!
//! - [`SecureTokenStore`]: native store over a [`SecureStorage`] backend
//!   ([`EncryptedFileStorage`] on disk, [`MemoryStorage`] in tests).
//! - [`CookieTokenStore`]: the web origin's cookie jar, with the expiry and
//!   same-site policy the embedded page needs.
//!
//! Both implement [`TokenStore`], the contract the bridge engine consumes.

mod cookie_store;
mod credentials;
mod encrypted_file;
mod keys;
mod memory;
mod secure_store;
mod traits;

pub use cookie_store::{CookiePolicy, CookieTokenStore, SameSiteMode, DEFAULT_COOKIE_PREFIX};
pub use credentials::CredentialPair;
pub use encrypted_file::EncryptedFileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use secure_store::SecureTokenStore;
pub use traits::{SecureStorage, TokenStore};

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend refused or failed the operation.
    #[error("Platform storage error: {0}")]
    Platform(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Sealing or opening the encrypted store failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
