//! Gateway error types.

use thiserror::Error;

/// How a failed gateway call affects the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeout, unreachable host, non-2xx or malformed body.
    Network,
    /// The server explicitly rejected the credential.
    Validation,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway call timed out")]
    Timeout,

    /// Non-2xx response.
    #[error("Gateway responded {status} ({body_summary})")]
    Rejected { status: u16, body_summary: String },

    /// 2xx response with `success: false`.
    #[error("Gateway refused the request: {0}")]
    Unsuccessful(String),

    /// Reported success but omitted a token.
    #[error("Gateway response is missing {0}")]
    MissingToken(&'static str),

    #[error("Malformed gateway response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Unsuccessful(_) => FailureKind::Validation,
            GatewayError::Rejected { status, .. } if *status == 401 || *status == 403 => {
                FailureKind::Validation
            }
            _ => FailureKind::Network,
        }
    }

    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout => true,
            GatewayError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            GatewayError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_transient_network() {
        assert!(GatewayError::Timeout.is_transient());
        assert_eq!(GatewayError::Timeout.kind(), FailureKind::Network);
    }

    #[test]
    fn test_unsuccessful_is_validation() {
        let err = GatewayError::Unsuccessful("bad password".to_string());
        assert_eq!(err.kind(), FailureKind::Validation);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_rejected_status_classification() {
        let unauthorized = GatewayError::Rejected {
            status: 401,
            body_summary: String::new(),
        };
        assert_eq!(unauthorized.kind(), FailureKind::Validation);
        assert!(!unauthorized.is_transient());

        let unavailable = GatewayError::Rejected {
            status: 503,
            body_summary: String::new(),
        };
        assert_eq!(unavailable.kind(), FailureKind::Network);
        assert!(unavailable.is_transient());
    }

    #[test]
    fn test_missing_token_is_not_transient() {
        assert!(!GatewayError::MissingToken("refreshToken").is_transient());
    }
}
