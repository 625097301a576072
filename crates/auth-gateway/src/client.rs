//! reqwest implementation of [`AuthGateway`].

use crate::types::{CheckRequest, CheckResponse, RefreshRequest, SessionResponse};
use crate::{AuthGateway, GatewayError, GatewayResult, IssuedSession, LoginRequest, TokenCheck};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use token_storage::CredentialPair;
use tracing::{debug, error, warn};
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: Url,
    /// Bound applied to each call, including body download.
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone)]
pub struct SsoGatewayClient {
    http_client: reqwest::Client,
    config: GatewayConfig,
}

impl SsoGatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/auth/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    async fn bounded<T, F>(&self, fut: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        tokio::time::timeout(self.config.timeout, fut)
            .await
            .map_err(|_| GatewayError::Timeout)?
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> GatewayResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(url = %url, "Gateway request");

        self.bounded(async {
            let response = self.http_client.post(&url).json(body).send().await?;
            let status = response.status();
            let text = response.text().await?;

            if !status.is_success() {
                let body_summary = summarize_response_body(&text);
                error!(status = %status, body_summary = %body_summary, path, "Gateway call failed");
                return Err(GatewayError::Rejected {
                    status: status.as_u16(),
                    body_summary,
                });
            }

            serde_json::from_str(&text).map_err(|e| {
                warn!(
                    path,
                    body_summary = %summarize_response_body(&text),
                    error = %e,
                    "Malformed gateway response"
                );
                GatewayError::from(e)
            })
        })
        .await
    }
}

fn into_session(body: SessionResponse, failure: &str) -> GatewayResult<IssuedSession> {
    if !body.success {
        let message = body
            .error
            .or(body.message)
            .unwrap_or_else(|| failure.to_string());
        return Err(GatewayError::Unsuccessful(message));
    }

    let access_token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(GatewayError::MissingToken("accessToken"))?;
    let refresh_token = body
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or(GatewayError::MissingToken("refreshToken"))?;

    Ok(IssuedSession {
        credentials: CredentialPair::new(access_token, refresh_token)
            .with_expiry(body.expires_at.as_ref().and_then(crate::types::parse_expiry)),
        user: body.user.filter(|u| !u.is_null()),
        biometric_eligible: body.biometric_eligible.unwrap_or(false),
    })
}

#[async_trait]
impl AuthGateway for SsoGatewayClient {
    async fn verify(&self, access_token: &str, device_id: &str) -> GatewayResult<TokenCheck> {
        let body: CheckResponse = self
            .post_json(
                "check",
                &CheckRequest {
                    access_token,
                    device_id,
                },
            )
            .await?;
        let check = body.into_check();
        debug!(valid = check.valid, "Token check complete");
        Ok(check)
    }

    async fn refresh(&self, refresh_token: &str, device_id: &str) -> GatewayResult<IssuedSession> {
        let body: SessionResponse = self
            .post_json(
                "refresh",
                &RefreshRequest {
                    refresh_token,
                    device_id,
                },
            )
            .await?;
        into_session(body, "token refresh refused")
    }

    async fn login(&self, request: &LoginRequest) -> GatewayResult<IssuedSession> {
        let body: SessionResponse = self.post_json("login", request).await?;
        into_session(body, "login failed")
    }

    async fn logout(&self, access_token: &str) {
        let url = self.endpoint("logout");
        let result = self
            .bounded(async {
                self.http_client
                    .post(&url)
                    .bearer_auth(access_token)
                    .header("Content-Type", "application/json")
                    .send()
                    .await
                    .map_err(GatewayError::from)
            })
            .await;

        match result {
            Ok(response) => debug!(status = %response.status(), "Logout acknowledged"),
            Err(e) => warn!(error = %e, "Logout request failed, ignoring"),
        }
    }
}
