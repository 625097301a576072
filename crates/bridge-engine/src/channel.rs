//! Native-to-page half of the duplex message channel.

use bridge_protocol::BridgeMessage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The page has not finished loading its runtime.
    #[error("Page channel is not ready")]
    NotReady,

    #[error("Page channel closed: {0}")]
    Closed(String),
}

/// Delivers messages into the live embedded page.
///
/// Implementations are fire-and-forget: a successful post means the host
/// accepted the message, not that the page handled it.
pub trait PageChannel: Send + Sync {
    fn is_ready(&self) -> bool;

    fn post_message(&self, message: &BridgeMessage) -> Result<(), ChannelError>;
}
