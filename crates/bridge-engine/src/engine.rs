//! The bridge engine.

use crate::cycle_fsm::{CycleInput, CycleMachine, CyclePhase};
use crate::events::{BridgeEvent, EventCallback, InvalidationStep};
use crate::{
    ChannelError, Collaborators, Destination, EngineError, EngineResult, LocationProblem,
    PageChannel,
};
use auth_gateway::{AuthGateway, GatewayError, GatewayResult, IssuedSession, LoginRequest};
use bridge_protocol::{BridgeMessage, LocationFailure, NavigationTarget};
use device_identity::DeviceIdentityProvider;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use token_storage::{SecureTokenStore, StorageKeys, TokenStore};
use tracing::{error, info, warn};

/// Cycle id used by [`BridgeEngine::is_logged_in`], which runs the machine
/// without a navigation.
pub const STATUS_CHECK_CYCLE: u64 = 0;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub login_route: String,
    /// Target used when a login arrives with no navigation pending.
    pub home_route: NavigationTarget,
    pub app_version: String,
    /// Upper bound for each gateway call.
    pub network_timeout: Duration,
    /// Delay before the single `CLEAR_WEB_COOKIES` redelivery.
    pub cookie_clear_retry: Duration,
    pub location_timeout: Duration,
}

impl EngineConfig {
    /// Defaults: `/login`, 10s network and location bounds, 100ms cookie
    /// clear retry.
    pub fn new(home_route: NavigationTarget) -> Self {
        Self {
            login_route: "/login".to_string(),
            home_route,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            network_timeout: Duration::from_secs(10),
            cookie_clear_retry: Duration::from_millis(100),
            location_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of one navigation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub cycle_id: u64,
    pub destination: Destination,
    /// Every phase visited, starting with `Init` and ending with `Resolved`.
    pub phases: Vec<CyclePhase>,
}

impl CycleOutcome {
    /// The phase the cycle resolved from.
    pub fn verdict(&self) -> CyclePhase {
        self.phases
            .iter()
            .rev()
            .find(|p| **p != CyclePhase::Resolved)
            .copied()
            .unwrap_or(CyclePhase::Init)
    }
}

/// What the engine did with an inbound page message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Session stored; the page should load this destination.
    Navigate(Destination),
    /// A reply was produced (and posted if a page is attached).
    Replied(BridgeMessage),
    /// Handed to a collaborator.
    Forwarded,
    /// Informational message, logged only.
    Logged,
    Dropped,
}

/// Records phases of a single cycle and reports each transition.
struct CycleTracker<'a> {
    engine: &'a BridgeEngine,
    cycle_id: u64,
    machine: CycleMachine,
    phases: Vec<CyclePhase>,
}

impl<'a> CycleTracker<'a> {
    fn new(engine: &'a BridgeEngine, cycle_id: u64) -> Self {
        Self {
            engine,
            cycle_id,
            machine: CycleMachine::new(),
            phases: vec![CyclePhase::Init],
        }
    }

    fn step(&mut self, input: CycleInput) {
        let from = CyclePhase::from(self.machine.state());
        if self.machine.consume(&input).is_err() {
            error!(
                cycle_id = self.cycle_id,
                input = ?input,
                state = %from,
                "Impossible cycle transition"
            );
            return;
        }
        let to = CyclePhase::from(self.machine.state());
        self.phases.push(to);
        self.engine.emit(BridgeEvent::Transition {
            cycle_id: self.cycle_id,
            from,
            to,
        });
    }

    fn phase(&self) -> CyclePhase {
        CyclePhase::from(self.machine.state())
    }
}

/// Mediates between native storage, the gateway and the embedded page.
pub struct BridgeEngine {
    secure: Arc<SecureTokenStore>,
    cookies: Arc<dyn TokenStore>,
    gateway: Arc<dyn AuthGateway>,
    device: Arc<DeviceIdentityProvider>,
    collaborators: Collaborators,
    config: EngineConfig,
    channel: Mutex<Option<Arc<dyn PageChannel>>>,
    latest_cycle: AtomicU64,
    pending_target: Mutex<Option<NavigationTarget>>,
    event_callback: Mutex<Option<EventCallback>>,
}

impl BridgeEngine {
    pub fn new(
        secure: Arc<SecureTokenStore>,
        cookies: Arc<dyn TokenStore>,
        gateway: Arc<dyn AuthGateway>,
        device: Arc<DeviceIdentityProvider>,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Self {
        Self {
            secure,
            cookies,
            gateway,
            device,
            collaborators,
            config,
            channel: Mutex::new(None),
            latest_cycle: AtomicU64::new(STATUS_CHECK_CYCLE),
            pending_target: Mutex::new(None),
            event_callback: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_event_callback(&self, callback: EventCallback) {
        *self.event_callback.lock() = Some(callback);
    }

    /// Attach the live page. Replaces any previous channel.
    pub fn attach_channel(&self, channel: Arc<dyn PageChannel>) {
        *self.channel.lock() = Some(channel);
    }

    pub fn detach_channel(&self) {
        *self.channel.lock() = None;
    }

    pub(crate) fn emit(&self, event: BridgeEvent) {
        event.log();
        let callback = self.event_callback.lock().clone();
        if let Some(callback) = callback {
            callback(&event);
        }
    }

    // ------------------------------------------------------------------
    // Navigation cycles
    // ------------------------------------------------------------------

    /// Start a cycle id for `target`. Any earlier cycle becomes stale.
    pub fn begin_cycle(&self, target: &NavigationTarget) -> u64 {
        let cycle_id = self.latest_cycle.fetch_add(1, Ordering::SeqCst) + 1;
        *self.pending_target.lock() = Some(target.clone());
        self.emit(BridgeEvent::CycleStarted {
            cycle_id,
            route: target.to_string(),
        });
        cycle_id
    }

    /// Whether `cycle_id` is still the most recent navigation.
    pub fn is_current(&self, cycle_id: u64) -> bool {
        self.latest_cycle.load(Ordering::SeqCst) == cycle_id
    }

    /// Report that a finished cycle lost to a newer navigation.
    pub fn discard_cycle(&self, cycle_id: u64) {
        self.emit(BridgeEvent::CycleDiscarded {
            cycle_id,
            current_cycle_id: self.latest_cycle.load(Ordering::SeqCst),
        });
    }

    /// Run one navigation cycle for `target` to completion.
    ///
    /// Never fails: every error path resolves to the login destination.
    /// Callers that may start overlapping cycles should check
    /// [`is_current`](Self::is_current) before acting on the outcome.
    pub async fn run_cycle(&self, target: NavigationTarget) -> CycleOutcome {
        let cycle_id = self.begin_cycle(&target);
        self.resolve_cycle(cycle_id, target).await
    }

    /// Drive the machine for a cycle started with [`begin_cycle`](Self::begin_cycle).
    pub async fn resolve_cycle(&self, cycle_id: u64, target: NavigationTarget) -> CycleOutcome {
        let mut tracker = CycleTracker::new(self, cycle_id);
        self.evaluate_session(&mut tracker).await;

        let keeps_session = tracker.phase().keeps_session();
        tracker.step(CycleInput::Resolve);

        let destination = if keeps_session {
            Destination::Route(target)
        } else {
            Destination::login(self.config.login_route.clone(), target)
        };
        self.emit(BridgeEvent::CycleResolved {
            cycle_id,
            destination: destination.path(),
            login_detour: destination.is_login(),
        });

        CycleOutcome {
            cycle_id,
            destination,
            phases: tracker.phases,
        }
    }

    /// Walk the machine from `Init` to a terminal phase, applying storage
    /// side effects along the way.
    async fn evaluate_session(&self, tracker: &mut CycleTracker<'_>) {
        let Some(access_token) = self.secure.access_token() else {
            tracker.step(CycleInput::AccessTokenMissing);
            // Nothing to tell the page: it has no session either.
            self.clear_stores();
            return;
        };
        tracker.step(CycleInput::AccessTokenFound);

        let device_id = self.device.device_id();
        let accepted = match self
            .bounded(self.gateway.verify(&access_token, &device_id))
            .await
        {
            Ok(check) => check.valid,
            Err(e) => {
                warn!(cycle_id = tracker.cycle_id, kind = ?e.kind(), error = %e, "Token verification failed");
                false
            }
        };

        if accepted {
            tracker.step(CycleInput::VerifyAccepted);
            self.mirror_session_cookies();
            return;
        }

        let Some(refresh_token) = self.secure.refresh_token() else {
            tracker.step(CycleInput::RefreshTokenMissing);
            if !self.superseded(tracker.cycle_id, "invalidate") {
                self.invalidate().await;
            }
            return;
        };
        tracker.step(CycleInput::RefreshTokenFound);

        let Some(session) = self.refresh_with(&refresh_token, &device_id).await else {
            tracker.step(CycleInput::RefreshRejected);
            if !self.superseded(tracker.cycle_id, "invalidate") {
                self.invalidate().await;
            }
            return;
        };

        // A newer cycle owns the stores now; the rotated pair is not written.
        if self.superseded(tracker.cycle_id, "persist_refresh") {
            tracker.step(CycleInput::RefreshSucceeded);
            return;
        }
        if self.store_refreshed(&session).is_some() {
            tracker.step(CycleInput::RefreshSucceeded);
        } else {
            tracker.step(CycleInput::RefreshRejected);
            self.invalidate().await;
        }
    }

    /// Whether `cycle_id` lost to a newer navigation. A stale cycle reports
    /// the skipped `effect`. The status check cycle is never stale.
    fn superseded(&self, cycle_id: u64, effect: &'static str) -> bool {
        if cycle_id == STATUS_CHECK_CYCLE || self.is_current(cycle_id) {
            return false;
        }
        self.emit(BridgeEvent::StaleEffectSkipped {
            cycle_id,
            current_cycle_id: self.latest_cycle.load(Ordering::SeqCst),
            effect,
        });
        true
    }

    /// Exchange the stored refresh token for a new pair and persist it.
    ///
    /// Returns the new access token, or `None` when there is no refresh
    /// token or the exchange failed. Does not invalidate on failure.
    pub async fn refresh_session(&self) -> Option<String> {
        let refresh_token = self.secure.refresh_token()?;
        let device_id = self.device.device_id();
        let session = self.refresh_with(&refresh_token, &device_id).await?;
        self.store_refreshed(&session)
    }

    async fn refresh_with(&self, refresh_token: &str, device_id: &str) -> Option<IssuedSession> {
        match self
            .bounded(self.gateway.refresh(refresh_token, device_id))
            .await
        {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Token refresh failed");
                None
            }
        }
    }

    fn store_refreshed(&self, session: &IssuedSession) -> Option<String> {
        match self.persist_session(session, "refresh") {
            Ok(()) => Some(session.credentials.access_token.clone()),
            Err(e) => {
                error!(error = %e, "Refreshed session could not be stored");
                None
            }
        }
    }

    /// Run verify then refresh without navigating. Same storage side
    /// effects as a navigation cycle.
    pub async fn is_logged_in(&self) -> bool {
        let mut tracker = CycleTracker::new(self, STATUS_CHECK_CYCLE);
        self.evaluate_session(&mut tracker).await;
        tracker.phase().keeps_session()
    }

    // ------------------------------------------------------------------
    // Session persistence and invalidation
    // ------------------------------------------------------------------

    fn persist_session(&self, session: &IssuedSession, source: &'static str) -> EngineResult<()> {
        self.secure.write_credentials(&session.credentials)?;
        if let Some(user) = &session.user {
            if let Err(e) = self.secure.set_user_info(&user.to_string()) {
                warn!(error = %e, "Failed to store user profile");
            }
        }
        self.mirror_session_cookies();
        self.emit(BridgeEvent::SessionPersisted { source });
        Ok(())
    }

    /// Copy the native session into the cookie store so the page sees it.
    fn mirror_session_cookies(&self) {
        for key in [
            StorageKeys::ACCESS_TOKEN,
            StorageKeys::REFRESH_TOKEN,
            StorageKeys::USER_INFO,
        ] {
            let Some(value) = self.secure.get(key) else {
                continue;
            };
            if let Err(e) = self.cookies.set(key, &value) {
                warn!(key, error = %e, "Failed to mirror session cookie");
            }
        }
    }

    fn clear_stores(&self) {
        self.secure.clear_all();
        self.cookies.clear_all();
        self.emit(BridgeEvent::Invalidation(InvalidationStep::StoresCleared));
    }

    /// Clear both storage domains and tell a live page to drop its cookies.
    ///
    /// Delivery is retried once after the configured delay; if the page is
    /// still not reachable the loss is accepted. Safe to call repeatedly.
    pub async fn invalidate(&self) {
        self.clear_stores();

        let channel = self.channel.lock().clone();
        let Some(channel) = channel else {
            self.emit(BridgeEvent::Invalidation(InvalidationStep::NoChannel));
            return;
        };

        let message = BridgeMessage::ClearWebCookies;
        let first = try_post(channel.as_ref(), &message);
        if first.is_ok() {
            self.emit(BridgeEvent::Invalidation(InvalidationStep::CookieClearSent {
                attempt: 1,
            }));
            return;
        }

        let delay = self.config.cookie_clear_retry;
        self.emit(BridgeEvent::Invalidation(
            InvalidationStep::CookieClearRetryScheduled {
                delay_ms: delay.as_millis() as u64,
            },
        ));
        tokio::time::sleep(delay).await;

        match try_post(channel.as_ref(), &message) {
            Ok(()) => self.emit(BridgeEvent::Invalidation(InvalidationStep::CookieClearSent {
                attempt: 2,
            })),
            Err(e) => self.emit(BridgeEvent::Invalidation(
                InvalidationStep::CookieClearAbandoned {
                    reason: e.to_string(),
                },
            )),
        }
    }

    // ------------------------------------------------------------------
    // Inbound page messages
    // ------------------------------------------------------------------

    /// Handle one raw message posted by the page.
    ///
    /// Only a `LOGIN_SUCCESS` whose tokens cannot be stored returns an
    /// error; everything else, including malformed input, is absorbed.
    pub async fn handle_message(&self, raw: &str) -> EngineResult<MessageOutcome> {
        let message = match BridgeMessage::from_json(raw) {
            Ok(message) => message,
            Err(e) => {
                self.emit(BridgeEvent::MessageDropped {
                    kind: None,
                    reason: e.to_string(),
                });
                return Ok(MessageOutcome::Dropped);
            }
        };
        self.emit(BridgeEvent::MessageReceived {
            kind: message.kind(),
        });

        match message {
            BridgeMessage::LoginSuccess {
                access_token,
                refresh_token,
                user,
            } => self.on_login_success(access_token, refresh_token, user),
            BridgeMessage::TokenRefreshRequest => Ok(self.on_refresh_request().await),
            BridgeMessage::CheckoutRequest { cart_data } => Ok(self.on_checkout(cart_data)),
            BridgeMessage::GetLocationRequest => Ok(self.on_location_request().await),
            BridgeMessage::AddToCartSuccess {
                product_name,
                quantity,
            } => {
                info!(
                    product = product_name.as_deref().unwrap_or("?"),
                    quantity = ?quantity,
                    "Cart item added in page"
                );
                Ok(MessageOutcome::Logged)
            }
            BridgeMessage::SignatureCompleted {
                signature,
                cart_data,
            } => {
                let cart = cart_data.unwrap_or_default();
                info!(
                    has_signature = signature.is_some(),
                    signature_len = signature.as_deref().map(str::len).unwrap_or(0),
                    cart_items = cart.get("totalCount").and_then(|v| v.as_u64()).unwrap_or(0),
                    total_price = cart.get("totalPrice").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    "Signature completed"
                );
                Ok(MessageOutcome::Logged)
            }
            other => {
                self.emit(BridgeEvent::MessageDropped {
                    kind: Some(other.kind()),
                    reason: "not handled from page".to_string(),
                });
                Ok(MessageOutcome::Dropped)
            }
        }
    }

    fn on_login_success(
        &self,
        access_token: String,
        refresh_token: String,
        user: Option<serde_json::Value>,
    ) -> EngineResult<MessageOutcome> {
        if access_token.is_empty() || refresh_token.is_empty() {
            self.emit(BridgeEvent::MessageDropped {
                kind: Some("LOGIN_SUCCESS"),
                reason: "empty token".to_string(),
            });
            return Ok(MessageOutcome::Dropped);
        }
        if user.is_none() {
            warn!("LOGIN_SUCCESS carried no user profile");
        }

        let session = IssuedSession {
            credentials: token_storage::CredentialPair::new(access_token, refresh_token),
            user,
            biometric_eligible: false,
        };
        self.persist_session(&session, "page_login")?;

        let target = self
            .pending_target
            .lock()
            .clone()
            .unwrap_or_else(|| self.config.home_route.clone());
        Ok(MessageOutcome::Navigate(Destination::Route(target)))
    }

    async fn on_refresh_request(&self) -> MessageOutcome {
        let reply = match self.refresh_session().await {
            Some(access_token) => BridgeMessage::TokenRefreshSuccess { access_token },
            None => {
                self.invalidate().await;
                BridgeMessage::TokenRefreshFailed
            }
        };
        self.send_to_page(&reply);
        MessageOutcome::Replied(reply)
    }

    fn on_checkout(&self, cart_data: serde_json::Value) -> MessageOutcome {
        match &self.collaborators.checkout {
            Some(handler) => {
                handler.begin_checkout(cart_data);
                MessageOutcome::Forwarded
            }
            None => {
                self.emit(BridgeEvent::MessageDropped {
                    kind: Some("CHECKOUT_REQUEST"),
                    reason: "no checkout handler".to_string(),
                });
                MessageOutcome::Dropped
            }
        }
    }

    async fn on_location_request(&self) -> MessageOutcome {
        let result = match &self.collaborators.location {
            Some(provider) => {
                match tokio::time::timeout(
                    self.config.location_timeout,
                    provider.current_location(),
                )
                .await
                {
                    Ok(Ok(fix)) => Ok(fix),
                    Ok(Err(LocationProblem::PermissionDenied)) => {
                        Err(LocationFailure::permission_denied())
                    }
                    Ok(Err(LocationProblem::Unavailable(message))) => {
                        Err(LocationFailure::error(message))
                    }
                    Err(_) => Err(LocationFailure::timeout()),
                }
            }
            None => Err(LocationFailure::error("Location is not available on this device.")),
        };

        let reply = match result {
            Ok(location) => BridgeMessage::LocationSuccess { location },
            Err(error) => {
                warn!(code = %error.code, "Location request failed");
                BridgeMessage::LocationError { error }
            }
        };
        self.send_to_page(&reply);
        MessageOutcome::Replied(reply)
    }

    /// Single-attempt delivery; failures are logged.
    fn send_to_page(&self, message: &BridgeMessage) {
        let channel = self.channel.lock().clone();
        let Some(channel) = channel else {
            warn!(kind = message.kind(), "No page attached, reply not delivered");
            return;
        };
        match try_post(channel.as_ref(), message) {
            Ok(()) => self.emit(BridgeEvent::MessageSent {
                kind: message.kind(),
            }),
            Err(e) => warn!(kind = message.kind(), error = %e, "Failed to post message to page"),
        }
    }

    // ------------------------------------------------------------------
    // Native session operations
    // ------------------------------------------------------------------

    /// Password login from a native screen. Unlike page-driven flows,
    /// failures are returned to the caller.
    pub async fn login(&self, id: &str, password: &str) -> EngineResult<Option<serde_json::Value>> {
        let request = LoginRequest {
            id: id.to_string(),
            password: password.to_string(),
            device_id: self.device.device_id(),
            app_version: self.config.app_version.clone(),
            platform: self.device.platform().gateway_label().to_string(),
        };

        let session = match self.bounded(self.gateway.login(&request)).await {
            Ok(session) => session,
            Err(GatewayError::Unsuccessful(message)) => {
                warn!(id = %request.id, "Login rejected by gateway");
                return Err(EngineError::LoginRejected(message));
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                return Err(e.into());
            }
        };

        self.persist_session(&session, "native_login")?;
        info!(id = %request.id, "Logged in");
        Ok(session.user)
    }

    /// Best-effort gateway logout, then full invalidation.
    pub async fn logout(&self) {
        if let Some(access_token) = self.secure.access_token() {
            if self
                .bounded(async {
                    self.gateway.logout(&access_token).await;
                    Ok::<(), GatewayError>(())
                })
                .await
                .is_err()
            {
                warn!("Gateway logout timed out");
            }
        }
        self.invalidate().await;
        info!("Logged out");
    }

    pub fn access_token(&self) -> Option<String> {
        self.secure.access_token()
    }

    /// Stored profile blob, unparsed.
    pub fn current_user(&self) -> Option<String> {
        self.secure.user_info()
    }

    /// `Authorization` header value for calls made on the user's behalf.
    pub fn authorization_header(&self) -> EngineResult<String> {
        self.secure
            .access_token()
            .map(|token| format!("Bearer {token}"))
            .ok_or(EngineError::NoAccessToken)
    }

    async fn bounded<T>(&self, call: impl Future<Output = GatewayResult<T>>) -> GatewayResult<T> {
        match tokio::time::timeout(self.config.network_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}

fn try_post(channel: &dyn PageChannel, message: &BridgeMessage) -> Result<(), ChannelError> {
    if !channel.is_ready() {
        return Err(ChannelError::NotReady);
    }
    channel.post_message(message)
}
