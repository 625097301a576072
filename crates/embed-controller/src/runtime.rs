//! Client-side runtime injected into every loaded page.

use std::time::Duration;
use token_storage::{CookiePolicy, StorageKeys};

const TEMPLATE: &str = include_str!("runtime.js");

fn js_string(value: &str) -> String {
    // A JSON string literal is a valid JS string literal.
    serde_json::Value::String(value.to_string()).to_string()
}

/// Cookie attributes appended to every `document.cookie` write.
fn cookie_attributes(policy: &CookiePolicy) -> String {
    let mut attrs = format!("; path={}", policy.path);
    match policy.same_site {
        token_storage::SameSiteMode::Lax => attrs.push_str("; SameSite=Lax"),
        token_storage::SameSiteMode::None => attrs.push_str("; SameSite=None"),
    }
    if policy.secure || policy.same_site == token_storage::SameSiteMode::None {
        attrs.push_str("; Secure");
    }
    if let Some(domain) = &policy.domain {
        attrs.push_str("; domain=");
        attrs.push_str(domain);
    }
    attrs
}

/// Render the page runtime for the given cookie policy.
///
/// Cookie names, lifetime and attributes match what the native side writes,
/// so both sides read and clear the same cookies.
pub fn runtime_script(policy: &CookiePolicy, location_timeout: Duration) -> String {
    TEMPLATE
        .replace(
            "__ACCESS_COOKIE__",
            &js_string(&policy.cookie_name(StorageKeys::ACCESS_TOKEN)),
        )
        .replace(
            "__REFRESH_COOKIE__",
            &js_string(&policy.cookie_name(StorageKeys::REFRESH_TOKEN)),
        )
        .replace(
            "__USER_COOKIE__",
            &js_string(&policy.cookie_name(StorageKeys::USER_INFO)),
        )
        .replace("__MAX_AGE_DAYS__", &policy.max_age_days.to_string())
        .replace("__COOKIE_ATTRS__", &js_string(&cookie_attributes(policy)))
        .replace(
            "__LOCATION_TIMEOUT_MS__",
            &location_timeout.as_millis().to_string(),
        )
}
