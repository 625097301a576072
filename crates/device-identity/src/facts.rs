//! Device facts feeding the identifier.

use serde::{Deserialize, Serialize};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Macos,
    Linux,
    Windows,
}

impl Platform {
    /// Platform of the running build.
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "android") {
            Self::Android
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Lower-case name used inside the device id.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }

    /// Label the SSO gateway expects in login requests.
    pub fn gateway_label(&self) -> &'static str {
        match self {
            Self::Ios => "iOS",
            Self::Android => "Android",
            Self::Macos => "macOS",
            Self::Linux => "Linux",
            Self::Windows => "Windows",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFacts {
    pub platform: Platform,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub os_version: Option<String>,
    /// Platform-provided install identifier, when one exists.
    pub install_id: Option<String>,
}

impl DeviceFacts {
    /// Facts for a desktop build: OS family as brand, host name as model.
    pub fn detect() -> Self {
        let model = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().to_string())
            .filter(|h| !h.is_empty());
        Self {
            platform: Platform::current(),
            brand: Some(std::env::consts::OS.to_string()),
            model,
            os_version: None,
            install_id: None,
        }
    }

    pub fn brand_or_unknown(&self) -> &str {
        self.brand.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn model_or_unknown(&self) -> &str {
        self.model.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn os_version_or_unknown(&self) -> &str {
        self.os_version.as_deref().unwrap_or(UNKNOWN)
    }
}
