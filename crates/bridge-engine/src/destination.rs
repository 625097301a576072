use bridge_protocol::NavigationTarget;
use std::fmt;
use url::Url;

/// Where a resolved cycle sends the embedded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The requested route. The session travels in the shared cookie, never
    /// in the URL.
    Route(NavigationTarget),
    /// The login page with `clearCookies=true` and the requested route as
    /// `redirect`.
    Login {
        login_route: String,
        redirect: NavigationTarget,
    },
}

impl Destination {
    pub fn login(login_route: impl Into<String>, redirect: NavigationTarget) -> Self {
        Destination::Login {
            login_route: login_route.into(),
            redirect,
        }
    }

    pub fn is_login(&self) -> bool {
        matches!(self, Destination::Login { .. })
    }

    /// Path and query relative to the web origin.
    pub fn path(&self) -> String {
        match self {
            Destination::Route(target) => target.as_str().to_string(),
            Destination::Login {
                login_route,
                redirect,
            } => format!(
                "{}?clearCookies=true&redirect={}",
                login_route,
                urlencoding::encode(redirect.as_str())
            ),
        }
    }

    pub fn to_url(&self, web_base: &Url) -> Result<Url, url::ParseError> {
        web_base.join(&self.path())
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
