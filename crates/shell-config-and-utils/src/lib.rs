//! Configuration, paths, errors and logging setup shared by the storefront shell.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_SSO_BASE_URL, DEFAULT_WEB_BASE_URL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
