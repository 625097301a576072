//! File system locations for the shell.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Resolves every on-disk location under one base directory (`~/.storefront`).
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self {
            base_dir: home.join(".storefront"),
        })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// `~/.storefront/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Encrypted secure token store.
    pub fn secure_store_file(&self) -> PathBuf {
        self.base_dir.join("secure-store.bin")
    }

    /// Key material sealing [`Paths::secure_store_file`].
    pub fn secure_store_key_file(&self) -> PathBuf {
        self.base_dir.join("secure-store.key")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Central JSONL log written by the observability layer.
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("dev.jsonl")
    }

    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
