//! Shell configuration: defaults, then `config.json`, then environment.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// SSO gateway base URL (compile-time override via `STOREFRONT_SSO_URL`).
pub const DEFAULT_SSO_BASE_URL: &str = match option_env!("STOREFRONT_SSO_URL") {
    Some(url) => url,
    None => "http://localhost:8080",
};

/// Origin serving the embedded storefront pages (compile-time override via `STOREFRONT_WEB_URL`).
pub const DEFAULT_WEB_BASE_URL: &str = match option_env!("STOREFRONT_WEB_URL") {
    Some(url) => url,
    None => "http://localhost:3000",
};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Main shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    pub sso_base_url: String,
    pub web_base_url: String,
    /// Route the page shows when a session is missing.
    pub login_route: String,
    /// Route used when nothing else was requested.
    pub home_route: String,
    /// Upper bound for every gateway call.
    pub network_timeout_ms: u64,
    /// Delay before the single retry of an undelivered cookie clear.
    pub cookie_clear_retry_ms: u64,
    pub cookie_max_age_days: i64,
    pub location_timeout_ms: u64,
    /// Reported to the gateway on login.
    pub app_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            sso_base_url: DEFAULT_SSO_BASE_URL.to_string(),
            web_base_url: DEFAULT_WEB_BASE_URL.to_string(),
            login_route: "/login".to_string(),
            home_route: "/home".to_string(),
            network_timeout_ms: 10_000,
            cookie_clear_retry_ms: 100,
            cookie_max_age_days: 7,
            location_timeout_ms: 10_000,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden from the process environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load `config.json` if present, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Apply `STOREFRONT_*` overrides; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(level) = non_empty("STOREFRONT_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = non_empty("STOREFRONT_SSO_URL") {
            self.sso_base_url = url;
        }
        if let Some(url) = non_empty("STOREFRONT_WEB_URL") {
            self.web_base_url = url;
        }
    }

    /// Reject routes the page could not be navigated to.
    pub fn validate(&self) -> CoreResult<()> {
        for (name, route) in [
            ("login_route", &self.login_route),
            ("home_route", &self.home_route),
        ] {
            if !route.starts_with('/') {
                return Err(CoreError::Config(format!(
                    "{} must start with '/': {:?}",
                    name, route
                )));
            }
        }
        if self.network_timeout_ms == 0 {
            return Err(CoreError::Config(
                "network_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sso_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.sso_base_url).map_err(CoreError::from)
    }

    pub fn web_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.web_base_url).map_err(CoreError::from)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn cookie_clear_retry_delay(&self) -> Duration {
        Duration::from_millis(self.cookie_clear_retry_ms)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }
}
