use crate::host::{HostChannel, PageHost};
use crate::runtime::runtime_script;
use crate::{ControllerError, ControllerResult};
use bridge_engine::{BridgeEngine, Destination, MessageOutcome};
use bridge_protocol::NavigationTarget;
use parking_lot::Mutex;
use std::sync::Arc;
use token_storage::CookieTokenStore;
use tracing::{debug, error, info};
use url::Url;

/// What a call to [`EmbeddedPageController::navigate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    Loaded { cycle_id: u64, url: Url },
    /// A newer navigation started before this one resolved; nothing loaded.
    Superseded { cycle_id: u64 },
}

/// Drives one embedded page surface.
pub struct EmbeddedPageController {
    engine: Arc<BridgeEngine>,
    host: Arc<dyn PageHost>,
    cookies: Arc<CookieTokenStore>,
    web_base: Url,
    runtime: String,
    current_url: Mutex<Option<Url>>,
}

impl EmbeddedPageController {
    /// Build a controller and attach `host` to the engine as its page channel.
    ///
    /// `cookies` must be the store the engine mirrors the session into; its
    /// pending writes are handed to the host.
    pub fn new(
        engine: Arc<BridgeEngine>,
        host: Arc<dyn PageHost>,
        web_base: Url,
        cookies: Arc<CookieTokenStore>,
    ) -> Self {
        let runtime = runtime_script(cookies.policy(), engine.config().location_timeout);
        engine.attach_channel(Arc::new(HostChannel::new(host.clone())));
        Self {
            engine,
            host,
            cookies,
            web_base,
            runtime,
            current_url: Mutex::new(None),
        }
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn current_url(&self) -> Option<Url> {
        self.current_url.lock().clone()
    }

    /// Run a fresh cycle for `target` and load its destination.
    ///
    /// Each call supersedes the previous one: if another navigation starts
    /// while this cycle is in flight, its result is discarded.
    pub async fn navigate(&self, target: NavigationTarget) -> ControllerResult<NavigationResult> {
        let cycle_id = self.engine.begin_cycle(&target);
        let outcome = self.engine.resolve_cycle(cycle_id, target).await;

        if !self.engine.is_current(cycle_id) {
            self.engine.discard_cycle(cycle_id);
            return Ok(NavigationResult::Superseded { cycle_id });
        }

        let url = self.load(&outcome.destination)?;
        Ok(NavigationResult::Loaded { cycle_id, url })
    }

    /// Forward a raw page message to the engine. A login handed over by
    /// the page loads the route it was detoured from.
    pub async fn on_message(&self, raw: &str) -> ControllerResult<MessageOutcome> {
        let outcome = match self.engine.handle_message(raw).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Page message could not be applied");
                return Err(ControllerError::Engine(e));
            }
        };

        match &outcome {
            MessageOutcome::Navigate(destination) => {
                self.load(destination)?;
            }
            _ => self.flush_cookies()?,
        }
        Ok(outcome)
    }

    /// Stop routing engine messages to this host.
    pub fn detach(&self) {
        self.engine.detach_channel();
        debug!("Page host detached");
    }

    fn load(&self, destination: &Destination) -> ControllerResult<Url> {
        let url = destination.to_url(&self.web_base)?;
        self.flush_cookies()?;
        self.host.load_url(&url)?;
        self.host.inject_runtime(&self.runtime)?;
        info!(path = %destination, login_detour = destination.is_login(), "Loaded page");
        *self.current_url.lock() = Some(url.clone());
        Ok(url)
    }

    /// Hand cookie writes made since the last flush to the host.
    fn flush_cookies(&self) -> ControllerResult<()> {
        let headers = self.cookies.take_set_cookie_headers();
        if headers.is_empty() {
            return Ok(());
        }
        debug!(count = headers.len(), "Passing session cookies to page host");
        self.host.set_cookies(&headers)
    }
}
