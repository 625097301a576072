//! Test harness for engine tests.
//!
//! Provides:
//! - ScriptedGateway: an `AuthGateway` whose answers are set per test
//! - RecordingChannel: a `PageChannel` that records posts and can be held "not ready"
//! - TestHarness: an engine wired to in-memory stores and the two fakes

use crate::{
    BridgeEngine, BridgeEvent, ChannelError, Collaborators, EngineConfig, PageChannel,
};
use async_trait::async_trait;
use auth_gateway::{AuthGateway, GatewayError, GatewayResult, IssuedSession, LoginRequest, TokenCheck};
use bridge_protocol::{BridgeMessage, NavigationTarget};
use device_identity::{DeviceFacts, DeviceIdentityProvider, Platform};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use token_storage::{
    CookiePolicy, CookieTokenStore, CredentialPair, MemoryStorage, SecureTokenStore, StorageKeys,
    TokenStore,
};

/// How the fake gateway answers `verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyScript {
    Valid,
    Invalid,
    /// Transport failure.
    Fail,
    /// Never answers.
    Hang,
}

/// How the fake gateway answers `refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScript {
    Succeed,
    /// `success: false`.
    Reject,
    Fail,
    /// Reports success without a token.
    MissingToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginScript {
    Succeed,
    Reject(String),
    Fail,
}

pub const REFRESHED_ACCESS: &str = "access-refreshed";
pub const REFRESHED_REFRESH: &str = "refresh-refreshed";
pub const LOGIN_ACCESS: &str = "access-login";
pub const LOGIN_REFRESH: &str = "refresh-login";

pub struct ScriptedGateway {
    verify: Mutex<VerifyScript>,
    verify_delay: Mutex<Duration>,
    refresh: Mutex<RefreshScript>,
    login: Mutex<LoginScript>,
    pub verify_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub seen_device_ids: Mutex<Vec<String>>,
    pub last_login: Mutex<Option<LoginRequest>>,
    pub last_logout_token: Mutex<Option<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            verify: Mutex::new(VerifyScript::Valid),
            verify_delay: Mutex::new(Duration::ZERO),
            refresh: Mutex::new(RefreshScript::Succeed),
            login: Mutex::new(LoginScript::Succeed),
            verify_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            seen_device_ids: Mutex::new(Vec::new()),
            last_login: Mutex::new(None),
            last_logout_token: Mutex::new(None),
        }
    }

    pub fn script_verify(&self, script: VerifyScript) {
        *self.verify.lock() = script;
    }

    pub fn delay_verify(&self, delay: Duration) {
        *self.verify_delay.lock() = delay;
    }

    pub fn script_refresh(&self, script: RefreshScript) {
        *self.refresh.lock() = script;
    }

    pub fn script_login(&self, script: LoginScript) {
        *self.login.lock() = script;
    }

    pub fn network_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
            + self.refresh_calls.load(Ordering::SeqCst)
            + self.login_calls.load(Ordering::SeqCst)
            + self.logout_calls.load(Ordering::SeqCst)
    }

    fn issued(access: &str, refresh: &str) -> IssuedSession {
        IssuedSession {
            credentials: CredentialPair::new(access, refresh),
            user: Some(serde_json::json!({"name": "Kim", "email": "kim@example.com", "role": "buyer"})),
            biometric_eligible: false,
        }
    }
}

#[async_trait]
impl AuthGateway for ScriptedGateway {
    async fn verify(&self, _access_token: &str, device_id: &str) -> GatewayResult<TokenCheck> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_device_ids.lock().push(device_id.to_string());
        let script = *self.verify.lock();
        let delay = *self.verify_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match script {
            VerifyScript::Valid => Ok(TokenCheck {
                valid: true,
                ..TokenCheck::default()
            }),
            VerifyScript::Invalid => Ok(TokenCheck::default()),
            VerifyScript::Fail => Err(GatewayError::Rejected {
                status: 502,
                body_summary: "len=0".to_string(),
            }),
            VerifyScript::Hang => std::future::pending().await,
        }
    }

    async fn refresh(&self, _refresh_token: &str, device_id: &str) -> GatewayResult<IssuedSession> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_device_ids.lock().push(device_id.to_string());
        let script = *self.refresh.lock();
        match script {
            RefreshScript::Succeed => Ok(Self::issued(REFRESHED_ACCESS, REFRESHED_REFRESH)),
            RefreshScript::Reject => Err(GatewayError::Unsuccessful("expired".to_string())),
            RefreshScript::Fail => Err(GatewayError::Timeout),
            RefreshScript::MissingToken => Err(GatewayError::MissingToken("accessToken")),
        }
    }

    async fn login(&self, request: &LoginRequest) -> GatewayResult<IssuedSession> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_login.lock() = Some(request.clone());
        let script = self.login.lock().clone();
        match script {
            LoginScript::Succeed => Ok(Self::issued(LOGIN_ACCESS, LOGIN_REFRESH)),
            LoginScript::Reject(message) => Err(GatewayError::Unsuccessful(message)),
            LoginScript::Fail => Err(GatewayError::Timeout),
        }
    }

    async fn logout(&self, access_token: &str) {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_logout_token.lock() = Some(access_token.to_string());
    }
}

/// Page channel that records every accepted post.
pub struct RecordingChannel {
    ready: AtomicBool,
    /// Number of `is_ready` checks after which the channel turns ready.
    ready_after_checks: Mutex<Option<usize>>,
    checks: AtomicUsize,
    posted: Mutex<Vec<BridgeMessage>>,
}

impl RecordingChannel {
    pub fn ready() -> Self {
        Self {
            ready: AtomicBool::new(true),
            ready_after_checks: Mutex::new(None),
            checks: AtomicUsize::new(0),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn not_ready() -> Self {
        let channel = Self::ready();
        channel.ready.store(false, Ordering::SeqCst);
        channel
    }

    pub fn becomes_ready_after(checks: usize) -> Self {
        let channel = Self::not_ready();
        *channel.ready_after_checks.lock() = Some(checks);
        channel
    }

    pub fn readiness_checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn posted(&self) -> Vec<BridgeMessage> {
        self.posted.lock().clone()
    }

    pub fn posted_kinds(&self) -> Vec<&'static str> {
        self.posted.lock().iter().map(|m| m.kind()).collect()
    }
}

impl PageChannel for RecordingChannel {
    fn is_ready(&self) -> bool {
        let checks = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(after) = *self.ready_after_checks.lock() {
            if checks > after {
                self.ready.store(true, Ordering::SeqCst);
            }
        }
        self.ready.load(Ordering::SeqCst)
    }

    fn post_message(&self, message: &BridgeMessage) -> Result<(), ChannelError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(ChannelError::NotReady);
        }
        self.posted.lock().push(message.clone());
        Ok(())
    }
}

pub fn route(path: &str) -> NavigationTarget {
    NavigationTarget::parse(path).unwrap()
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::new(route("/home"));
    config.app_version = "2.3.4".to_string();
    config.network_timeout = Duration::from_millis(200);
    config.cookie_clear_retry = Duration::from_millis(100);
    config.location_timeout = Duration::from_millis(200);
    config
}

pub struct TestHarness {
    pub engine: Arc<BridgeEngine>,
    pub secure: Arc<SecureTokenStore>,
    pub backend: Arc<MemoryStorage>,
    pub cookies: Arc<CookieTokenStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub device: Arc<DeviceIdentityProvider>,
    events: Arc<Mutex<Vec<BridgeEvent>>>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_collaborators(Collaborators::new())
    }

    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        let backend = Arc::new(MemoryStorage::new());
        let secure = Arc::new(SecureTokenStore::new(Box::new(backend.clone())));
        let cookies = Arc::new(CookieTokenStore::new(CookiePolicy::embedded()));
        let gateway = Arc::new(ScriptedGateway::new());
        let device = Arc::new(DeviceIdentityProvider::new(
            secure.clone(),
            DeviceFacts {
                platform: Platform::Ios,
                brand: Some("Apple".to_string()),
                model: Some("iPhone 15".to_string()),
                os_version: Some("17.4".to_string()),
                install_id: Some("install-1".to_string()),
            },
        ));

        let engine = Arc::new(BridgeEngine::new(
            secure.clone(),
            cookies.clone(),
            gateway.clone(),
            device.clone(),
            collaborators,
            test_config(),
        ));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        engine.set_event_callback(Arc::new(move |event: &BridgeEvent| {
            sink.lock().push(event.clone());
        }));

        Self {
            engine,
            secure,
            backend,
            cookies,
            gateway,
            device,
            events,
        }
    }

    /// Attach a channel and return it.
    pub fn attach(&self, channel: RecordingChannel) -> Arc<RecordingChannel> {
        let channel = Arc::new(channel);
        self.engine.attach_channel(channel.clone());
        channel
    }

    /// Seed the secure store directly.
    pub fn seed(&self, access: Option<&str>, refresh: Option<&str>) {
        if let Some(access) = access {
            self.secure.set(StorageKeys::ACCESS_TOKEN, access).unwrap();
        }
        if let Some(refresh) = refresh {
            self.secure.set(StorageKeys::REFRESH_TOKEN, refresh).unwrap();
        }
        self.secure
            .set(StorageKeys::USER_INFO, r#"{"name":"Kim"}"#)
            .unwrap();
    }

    /// Seed the cookie jar as if the page had logged in earlier.
    pub fn seed_cookies(&self) {
        self.cookies.set(StorageKeys::ACCESS_TOKEN, "cookie-access").unwrap();
        self.cookies.set(StorageKeys::REFRESH_TOKEN, "cookie-refresh").unwrap();
    }

    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().clone()
    }

    pub fn session_cleared(&self) -> bool {
        self.secure.access_token().is_none()
            && self.secure.refresh_token().is_none()
            && self.secure.user_info().is_none()
            && self.cookies.get(StorageKeys::ACCESS_TOKEN).is_none()
            && self.cookies.get(StorageKeys::REFRESH_TOKEN).is_none()
    }
}
