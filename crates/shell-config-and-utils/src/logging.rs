//! Logging initialization for the shell.
//!
//! Events go to the JSONL file managed by the `observability` package.
//! `STOREFRONT_LOG_PATH` redirects the file.

pub use observability::LogConfig;

/// Install the global subscriber for the shell binary.
///
/// `level` is the default filter; `RUST_LOG` still wins when set.
pub fn init_logging(level: &str) -> crate::CoreResult<()> {
    let log_path = std::env::var("STOREFRONT_LOG_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(std::path::PathBuf::from);

    observability::init_with_config(LogConfig {
        service_name: "storefront-shell".into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        log_path,
        also_stderr: std::env::var_os("STOREFRONT_LOG_STDERR").is_some(),
    })?;
    Ok(())
}

/// Parse a log level string into a tracing Level, defaulting to INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
