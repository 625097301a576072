//! Bridge message types shared by the native shell and the embedded page.
//!
//! Pure data and serialization: no I/O, no async. Every message is a flat
//! JSON object discriminated by `type`. Kinds this build does not know
//! decode to [`BridgeMessage::Unknown`] instead of failing.

mod message;
mod route;

pub use message::{BridgeMessage, Direction, LocationFailure, LocationFix};
pub use route::NavigationTarget;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Not JSON, missing `type`, or a known kind with missing fields.
    #[error("Malformed bridge message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid navigation route {0:?}: {1}")]
    InvalidRoute(String, &'static str),
}
