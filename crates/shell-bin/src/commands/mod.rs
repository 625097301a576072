//! Subcommand handlers.

pub mod bridge;
pub mod device;
pub mod resolve;
pub mod session;
