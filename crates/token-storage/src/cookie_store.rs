//! Web-side token store backed by the origin's cookie jar.
//!
//! The embedded page and any browser tab share this jar. Values are
//! percent-encoded on the wire so a JSON user blob is cookie-safe.

use crate::{StorageKeys, StorageResult, TokenStore};
use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, CookieJar, SameSite};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Cookie name prefix applied to every storage key.
pub const DEFAULT_COOKIE_PREFIX: &str = "storefront_";

/// Same-site policy for session cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSiteMode {
    /// Top-level browser tabs on the web origin.
    Lax,
    /// Embedded web view presenting cookies back across contexts. Forces `Secure`.
    None,
}

/// Attributes stamped on every session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub name_prefix: String,
    pub max_age_days: i64,
    pub path: String,
    pub same_site: SameSiteMode,
    pub secure: bool,
    pub domain: Option<String>,
}

impl CookiePolicy {
    /// Policy for a regular browser tab. `secure` should be set in production.
    pub fn browser(secure: bool) -> Self {
        Self {
            name_prefix: DEFAULT_COOKIE_PREFIX.to_string(),
            max_age_days: 7,
            path: "/".to_string(),
            same_site: SameSiteMode::Lax,
            secure,
            domain: None,
        }
    }

    /// Policy for the embedded web view.
    pub fn embedded() -> Self {
        Self {
            same_site: SameSiteMode::None,
            secure: true,
            ..Self::browser(true)
        }
    }

    pub fn with_max_age_days(mut self, days: i64) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn cookie_name(&self, key: &str) -> String {
        format!("{}{}", self.name_prefix, key)
    }

    fn same_site(&self) -> SameSite {
        match self.same_site {
            SameSiteMode::Lax => SameSite::Lax,
            SameSiteMode::None => SameSite::None,
        }
    }

    fn secure(&self) -> bool {
        self.secure || self.same_site == SameSiteMode::None
    }

    fn session_cookie(&self, key: &str, value: &str, expires: OffsetDateTime) -> Cookie<'static> {
        let mut builder = Cookie::build((self.cookie_name(key), value.to_string()))
            .path(self.path.clone())
            .max_age(Duration::days(self.max_age_days))
            .expires(expires)
            .same_site(self.same_site())
            .secure(self.secure());
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    fn expired_cookie(&self, key: &str) -> Cookie<'static> {
        let mut builder = Cookie::build((self.cookie_name(key), ""))
            .path(self.path.clone())
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .same_site(self.same_site())
            .secure(self.secure());
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::embedded()
    }
}

struct Inner {
    jar: CookieJar,
    /// `Set-Cookie` values not yet handed to the page, at most one per name.
    pending: Vec<Cookie<'static>>,
}

impl Inner {
    fn queue(&mut self, cookie: Cookie<'static>) {
        self.pending.retain(|queued| queued.name() != cookie.name());
        self.pending.push(cookie);
    }
}

/// [`TokenStore`] over a cookie jar scoped to the web origin.
pub struct CookieTokenStore {
    policy: CookiePolicy,
    inner: Mutex<Inner>,
}

impl CookieTokenStore {
    pub fn new(policy: CookiePolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(Inner {
                jar: CookieJar::new(),
                pending: Vec::new(),
            }),
        }
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    /// Replace the jar contents with the cookies of a `Cookie` request header.
    /// Unparseable pairs are skipped.
    pub fn load_cookie_header(&self, header: &str) {
        let mut inner = self.inner.lock();
        inner.jar = CookieJar::new();
        for parsed in Cookie::split_parse_encoded(header.to_string()) {
            match parsed {
                Ok(cookie) => inner.jar.add_original(cookie.into_owned()),
                Err(e) => warn!(error = %e, "Skipping malformed cookie pair"),
            }
        }
    }

    /// `name=value; ...` for the live session cookies, as the page would send them.
    pub fn cookie_header(&self) -> String {
        let now = OffsetDateTime::now_utc();
        let inner = self.inner.lock();
        let mut pairs: Vec<String> = inner
            .jar
            .iter()
            .filter(|c| !is_expired(c, now))
            .map(|c| c.encoded().stripped().to_string())
            .collect();
        pairs.sort();
        pairs.join("; ")
    }

    /// Drain the `Set-Cookie` values produced by writes and deletes since the last call.
    pub fn take_set_cookie_headers(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        inner
            .pending
            .drain(..)
            .map(|c| c.encoded().to_string())
            .collect()
    }

    /// `Set-Cookie` values that expire every session cookie, for the clear-cookies endpoint.
    pub fn clear_cookie_headers(&self) -> Vec<String> {
        StorageKeys::SESSION_KEYS
            .iter()
            .map(|key| self.policy.expired_cookie(key).encoded().to_string())
            .collect()
    }

    fn set_with_expiry(&self, key: &str, value: &str, expires: OffsetDateTime) {
        let cookie = self.policy.session_cookie(key, value, expires);
        let mut inner = self.inner.lock();
        inner.jar.add(cookie.clone());
        inner.queue(cookie);
    }
}

impl Default for CookieTokenStore {
    fn default() -> Self {
        Self::new(CookiePolicy::default())
    }
}

fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    cookie
        .expires_datetime()
        .map(|at| at <= now)
        .unwrap_or(false)
}

impl TokenStore for CookieTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let name = self.policy.cookie_name(key);
        let inner = self.inner.lock();
        let cookie = inner.jar.get(&name)?;
        if is_expired(cookie, OffsetDateTime::now_utc()) {
            debug!(cookie = %name, "Cookie expired, treating as absent");
            return None;
        }
        Some(cookie.value().to_string())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let expires = OffsetDateTime::now_utc() + Duration::days(self.policy.max_age_days);
        self.set_with_expiry(key, value, expires);
        Ok(())
    }

    fn delete(&self, key: &str) {
        let removal = self.policy.expired_cookie(key);
        let mut inner = self.inner.lock();
        if inner.jar.get(removal.name()).is_some() {
            inner.jar.remove(removal.clone());
        }
        inner.queue(removal);
    }

    fn clear_all(&self) {
        for key in StorageKeys::SESSION_KEYS {
            self.delete(key);
        }
        debug!("Cleared session cookies");
    }
}
