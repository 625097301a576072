//! Client for the remote SSO service.
//!
//! [`AuthGateway`] is the seam the bridge engine depends on;
//! [`SsoGatewayClient`] is the HTTPS implementation. Every call is a single
//! attempt bounded by the configured timeout.

mod client;
mod error;
mod types;

pub use client::{GatewayConfig, SsoGatewayClient};
pub use error::{FailureKind, GatewayError, GatewayResult};
pub use types::{IssuedSession, LoginRequest, TokenCheck};

use async_trait::async_trait;

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Ask the gateway whether `access_token` is still valid for this device.
    async fn verify(&self, access_token: &str, device_id: &str) -> GatewayResult<TokenCheck>;

    /// Exchange a refresh token for a new credential pair.
    async fn refresh(&self, refresh_token: &str, device_id: &str) -> GatewayResult<IssuedSession>;

    /// Password login. Side-effecting on the server; never retried.
    async fn login(&self, request: &LoginRequest) -> GatewayResult<IssuedSession>;

    /// Best-effort server-side logout. Failures are logged and swallowed.
    async fn logout(&self, access_token: &str);
}
