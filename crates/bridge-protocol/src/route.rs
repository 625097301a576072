use crate::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Route requested by the hosting screen, e.g. `/home` or `/cart?tab=1`.
///
/// Always a same-origin absolute path: it starts with a single `/` and
/// contains no whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NavigationTarget(String);

impl NavigationTarget {
    pub fn parse(route: &str) -> Result<Self, ProtocolError> {
        if !route.starts_with('/') {
            return Err(ProtocolError::InvalidRoute(
                route.to_string(),
                "must start with '/'",
            ));
        }
        if route.starts_with("//") {
            return Err(ProtocolError::InvalidRoute(
                route.to_string(),
                "must not name another host",
            ));
        }
        if route.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ProtocolError::InvalidRoute(
                route.to_string(),
                "must not contain whitespace",
            ));
        }
        Ok(Self(route.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NavigationTarget {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NavigationTarget> for String {
    fn from(target: NavigationTarget) -> Self {
        target.0
    }
}

impl std::str::FromStr for NavigationTarget {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
