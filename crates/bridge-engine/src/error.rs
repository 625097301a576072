use auth_gateway::GatewayError;
use thiserror::Error;
use token_storage::StorageError;

/// Errors the engine surfaces to callers. Network trouble during a
/// navigation cycle never ends up here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No access token available")]
    NoAccessToken,

    /// The gateway answered and refused the credentials.
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// The gateway could not be reached or answered garbage.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A session was issued but could not be persisted.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type EngineResult<T> = Result<T, EngineError>;
