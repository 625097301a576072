//! Gateway results and wire bodies.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use token_storage::CredentialPair;

/// Outcome of `/auth/check`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenCheck {
    pub valid: bool,
    pub user_email: Option<String>,
    pub token_device_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Session minted by refresh or login.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedSession {
    pub credentials: CredentialPair,
    /// User profile exactly as the gateway sent it.
    pub user: Option<serde_json::Value>,
    pub biometric_eligible: bool,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
    pub device_id: String,
    pub app_version: String,
    /// Gateway platform label (`iOS`, `Android`, ...).
    pub platform: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("id", &self.id)
            .field("device_id", &self.device_id)
            .field("app_version", &self.app_version)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckRequest<'a> {
    pub access_token: &'a str,
    pub device_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
    pub device_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<CheckData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckData {
    #[serde(default)]
    pub valid: bool,
    pub user_email: Option<String>,
    pub token_device_id: Option<String>,
    pub expires_at: Option<serde_json::Value>,
}

impl CheckResponse {
    pub fn into_check(self) -> TokenCheck {
        match self.data {
            Some(data) => TokenCheck {
                valid: self.success && data.valid,
                user_email: data.user_email,
                token_device_id: data.token_device_id,
                expires_at: data.expires_at.as_ref().and_then(parse_expiry),
            },
            None => TokenCheck::default(),
        }
    }
}

/// Body shared by `/auth/refresh` and `/auth/login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionResponse {
    #[serde(default)]
    pub success: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<serde_json::Value>,
    pub expires_at: Option<serde_json::Value>,
    pub biometric_eligible: Option<bool>,
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Expiry sent as epoch milliseconds, epoch seconds or an RFC 3339 string.
pub(crate) fn parse_expiry(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        _ => None,
    }
}
