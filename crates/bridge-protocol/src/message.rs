use crate::ProtocolError;
use serde::{Deserialize, Serialize};

/// Which side a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Page to native shell.
    ToNative,
    /// Native shell to page.
    ToPage,
}

/// Position fix relayed to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFailure {
    pub message: String,
    pub code: String,
}

impl LocationFailure {
    pub const PERMISSION_DENIED: &'static str = "PERMISSION_DENIED";
    pub const LOCATION_ERROR: &'static str = "LOCATION_ERROR";
    pub const TIMEOUT: &'static str = "TIMEOUT";

    pub fn permission_denied() -> Self {
        Self {
            message: "Location permission was not granted.".to_string(),
            code: Self::PERMISSION_DENIED.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Self::LOCATION_ERROR.to_string(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            message: "Location request timed out.".to_string(),
            code: Self::TIMEOUT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeMessage {
    /// Page finished a web login and hands the session to the shell.
    #[serde(rename_all = "camelCase")]
    LoginSuccess {
        access_token: String,
        refresh_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<serde_json::Value>,
    },
    /// Page lost its access cookie and asks the shell to renew it.
    TokenRefreshRequest,
    #[serde(rename_all = "camelCase")]
    TokenRefreshSuccess { access_token: String },
    TokenRefreshFailed,
    ClearWebCookies,
    /// Cart payload for the native signature/payment screen. Opaque here.
    #[serde(rename_all = "camelCase")]
    CheckoutRequest {
        #[serde(default)]
        cart_data: serde_json::Value,
    },
    GetLocationRequest,
    LocationSuccess { location: LocationFix },
    LocationError { error: LocationFailure },
    #[serde(rename_all = "camelCase")]
    AddToCartSuccess {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    SignatureCompleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cart_data: Option<serde_json::Value>,
    },
    /// Any kind this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl BridgeMessage {
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire discriminator, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoginSuccess { .. } => "LOGIN_SUCCESS",
            Self::TokenRefreshRequest => "TOKEN_REFRESH_REQUEST",
            Self::TokenRefreshSuccess { .. } => "TOKEN_REFRESH_SUCCESS",
            Self::TokenRefreshFailed => "TOKEN_REFRESH_FAILED",
            Self::ClearWebCookies => "CLEAR_WEB_COOKIES",
            Self::CheckoutRequest { .. } => "CHECKOUT_REQUEST",
            Self::GetLocationRequest => "GET_LOCATION_REQUEST",
            Self::LocationSuccess { .. } => "LOCATION_SUCCESS",
            Self::LocationError { .. } => "LOCATION_ERROR",
            Self::AddToCartSuccess { .. } => "ADD_TO_CART_SUCCESS",
            Self::SignatureCompleted { .. } => "SIGNATURE_COMPLETED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// `None` for [`BridgeMessage::Unknown`].
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::LoginSuccess { .. }
            | Self::TokenRefreshRequest
            | Self::CheckoutRequest { .. }
            | Self::GetLocationRequest
            | Self::AddToCartSuccess { .. }
            | Self::SignatureCompleted { .. } => Some(Direction::ToNative),
            Self::TokenRefreshSuccess { .. }
            | Self::TokenRefreshFailed
            | Self::ClearWebCookies
            | Self::LocationSuccess { .. }
            | Self::LocationError { .. } => Some(Direction::ToPage),
            Self::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_success_decodes_camel_case() {
        let msg = BridgeMessage::from_json(
            r#"{"type":"LOGIN_SUCCESS","accessToken":"a","refreshToken":"r","user":{"name":"Kim","email":"k@x.io","role":"buyer"}}"#,
        )
        .unwrap();
        match msg {
            BridgeMessage::LoginSuccess {
                access_token,
                refresh_token,
                user,
            } => {
                assert_eq!(access_token, "a");
                assert_eq!(refresh_token, "r");
                assert_eq!(user.unwrap()["role"], "buyer");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_login_success_without_user() {
        let msg =
            BridgeMessage::from_json(r#"{"type":"LOGIN_SUCCESS","accessToken":"a","refreshToken":"r"}"#)
                .unwrap();
        assert!(matches!(msg, BridgeMessage::LoginSuccess { user: None, .. }));
    }

    #[test]
    fn test_unknown_kind_is_not_fatal() {
        let msg = BridgeMessage::from_json(r#"{"type":"OPEN_MAP","zoom":3}"#).unwrap();
        assert_eq!(msg, BridgeMessage::Unknown);
        assert_eq!(msg.direction(), None);
    }

    #[test]
    fn test_malformed_messages_are_errors() {
        for raw in [
            "not json",
            r#"{"accessToken":"a"}"#,
            r#"{"type":"LOGIN_SUCCESS","accessToken":"a"}"#,
            r#"{"type":"TOKEN_REFRESH_SUCCESS"}"#,
        ] {
            assert!(
                matches!(BridgeMessage::from_json(raw), Err(ProtocolError::Malformed(_))),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn test_outbound_wire_shapes() {
        let success = BridgeMessage::TokenRefreshSuccess {
            access_token: "new".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({"type": "TOKEN_REFRESH_SUCCESS", "accessToken": "new"})
        );

        assert_eq!(
            BridgeMessage::ClearWebCookies.to_json().unwrap(),
            r#"{"type":"CLEAR_WEB_COOKIES"}"#
        );

        let denied = BridgeMessage::LocationError {
            error: LocationFailure::permission_denied(),
        };
        let value = serde_json::to_value(&denied).unwrap();
        assert_eq!(value["type"], "LOCATION_ERROR");
        assert_eq!(value["error"]["code"], "PERMISSION_DENIED");
    }

    #[test]
    fn test_location_success_shape() {
        let msg = BridgeMessage::LocationSuccess {
            location: LocationFix {
                latitude: 37.5665,
                longitude: 126.978,
                accuracy: Some(5.0),
                timestamp: Some(1_700_000_000_000),
                source: None,
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["location"]["latitude"], 37.5665);
        assert!(value["location"].get("source").is_none());
    }

    #[test]
    fn test_checkout_payload_is_opaque() {
        let msg = BridgeMessage::from_json(
            r#"{"type":"CHECKOUT_REQUEST","cartData":{"items":[{"sku":"A1","qty":2}],"totalPrice":3000}}"#,
        )
        .unwrap();
        match msg {
            BridgeMessage::CheckoutRequest { cart_data } => {
                assert_eq!(cart_data["items"][0]["sku"], "A1");
                assert_eq!(cart_data["totalPrice"], 3000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_kind_matches_wire_tag() {
        let samples = vec![
            BridgeMessage::TokenRefreshRequest,
            BridgeMessage::TokenRefreshFailed,
            BridgeMessage::ClearWebCookies,
            BridgeMessage::GetLocationRequest,
            BridgeMessage::AddToCartSuccess {
                product_name: Some("Tea".to_string()),
                quantity: Some(2),
            },
            BridgeMessage::SignatureCompleted {
                signature: None,
                cart_data: None,
            },
        ];
        for msg in samples {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["type"], msg.kind());
        }
    }

    #[test]
    fn test_directions() {
        assert_eq!(
            BridgeMessage::TokenRefreshRequest.direction(),
            Some(Direction::ToNative)
        );
        assert_eq!(
            BridgeMessage::ClearWebCookies.direction(),
            Some(Direction::ToPage)
        );
    }
}
