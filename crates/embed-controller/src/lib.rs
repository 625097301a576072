//! Embedded page controller.
//!
//! Owns the page host (a web view or a headless stand-in), feeds it the URL
//! each navigation cycle resolves to, injects the page runtime after every
//! load, and forwards page messages to the [`BridgeEngine`].
//!
//! [`BridgeEngine`]: bridge_engine::BridgeEngine

mod controller;
mod host;
mod runtime;

pub use controller::{EmbeddedPageController, NavigationResult};
pub use host::{HostChannel, PageHost};
pub use runtime::runtime_script;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Page host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Engine(#[from] bridge_engine::EngineError),
}

pub type ControllerResult<T> = Result<T, ControllerError>;
