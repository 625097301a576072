//! # Observability
//!
//! Structured logging for the storefront shell.
//!
//! Binaries call [`init_with_config`] once at startup and every crate logs
//! through plain `tracing` macros. With the `file-sink` feature (default)
//! each event becomes one JSON object per line in
//! `~/.storefront/logs/dev.jsonl`:
//!
//! ```text
//! tail -f ~/.storefront/logs/dev.jsonl | jq
//! ```
//!
//! Fields whose name marks them as a credential (`access_token`,
//! `refresh_token`, `password`, ...) are written as `"[redacted]"`.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "storefront-shell".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! })?;
//! ```

#[cfg(feature = "file-sink")]
mod file_sink;

mod json_layer;

use std::path::PathBuf;

pub use json_layer::{is_secret_field, LogEntry, REDACTED};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service written into every line.
    pub service_name: String,

    /// Default filter directive, overridden by `RUST_LOG`.
    pub default_level: String,

    /// Custom log file path. Defaults to `~/.storefront/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Mirror events to stderr in compact form.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The log file or its directory could not be opened.
    #[error("failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No home directory to derive the default log path from.
    #[error("home directory not found")]
    NoHomeDir,
    /// A global subscriber was already installed.
    #[error("subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) -> Result<(), InitError> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Initialize logging with custom configuration.
pub fn init_with_config(config: LogConfig) -> Result<(), InitError> {
    #[cfg(feature = "file-sink")]
    {
        file_sink::init_file_subscriber(&config)
    }

    #[cfg(not(feature = "file-sink"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level)),
            )
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init()
            .map_err(|e| InitError::AlreadyInitialized(e.to_string()))
    }
}

/// Re-export tracing macros so callers can use `observability::info!()`.
pub use tracing::{debug, error, info, instrument, trace, warn};

pub use tracing::span;

pub use tracing::Level;
