use crate::ControllerResult;
use bridge_engine::{ChannelError, PageChannel};
use bridge_protocol::BridgeMessage;
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// The surface that actually renders the embedded page.
pub trait PageHost: Send + Sync {
    /// Replace the current document with `url`.
    fn load_url(&self, url: &Url) -> ControllerResult<()>;

    /// Install `Set-Cookie` values in the surface's cookie jar for the web origin.
    fn set_cookies(&self, set_cookie_headers: &[String]) -> ControllerResult<()>;

    /// Run `script` in the current document once it has loaded.
    fn inject_runtime(&self, script: &str) -> ControllerResult<()>;

    /// Deliver a serialized bridge message to the page.
    fn post_message(&self, json: &str) -> ControllerResult<()>;

    /// Whether a document with the runtime is live.
    fn is_ready(&self) -> bool;
}

/// Exposes a [`PageHost`] to the engine as its page channel.
pub struct HostChannel {
    host: Arc<dyn PageHost>,
}

impl HostChannel {
    pub fn new(host: Arc<dyn PageHost>) -> Self {
        Self { host }
    }
}

impl PageChannel for HostChannel {
    fn is_ready(&self) -> bool {
        self.host.is_ready()
    }

    fn post_message(&self, message: &BridgeMessage) -> Result<(), ChannelError> {
        let json = message.to_json().map_err(|e| {
            warn!(kind = message.kind(), error = %e, "Failed to encode bridge message");
            ChannelError::Closed(e.to_string())
        })?;
        self.host
            .post_message(&json)
            .map_err(|e| ChannelError::Closed(e.to_string()))
    }
}
