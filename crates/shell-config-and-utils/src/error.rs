//! Core error types for the shell.

use thiserror::Error;

/// Errors raised while loading configuration or resolving paths.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Home directory not found, or a path could not be derived.
    #[error("Path error: {0}")]
    Path(String),

    #[error("Logging error: {0}")]
    Logging(#[from] observability::InitError),
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
