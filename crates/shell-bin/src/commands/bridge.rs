//! Interactive bridge session over stdin/stdout.
//!
//! Every line on stdin is either a route (`/cart`) to navigate to or a raw
//! page message (`{"type":"TOKEN_REFRESH_REQUEST"}`). What the page host
//! would do (cookie installs, loads, injections, posts) is printed to stdout
//! as JSON lines; engine events go to stderr.

use crate::app::ShellState;
use async_trait::async_trait;
use bridge_engine::{
    BridgeEvent, CheckoutHandler, Collaborators, LocationProblem, LocationProvider, MessageOutcome,
};
use bridge_protocol::{LocationFix, NavigationTarget};
use embed_controller::{ControllerResult, EmbeddedPageController, NavigationResult, PageHost};
use serde_json::json;
use shell_config_and_utils::{Config, Paths};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use url::Url;

pub async fn run(
    config: &Config,
    paths: &Paths,
    route: &str,
    location: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = NavigationTarget::parse(route)?;

    let mut collaborators = Collaborators::new().with_checkout(Arc::new(PrintCheckout));
    if let Some(raw) = location {
        collaborators = collaborators.with_location(Arc::new(FixedLocation::parse(raw)?));
    }

    let state = ShellState::build(config, paths, collaborators)?;
    state.engine.set_event_callback(Arc::new(|event: &BridgeEvent| {
        if let Ok(line) = serde_json::to_string(event) {
            eprintln!("{}", line);
        }
    }));

    let controller = EmbeddedPageController::new(
        state.engine.clone(),
        Arc::new(StdioHost::default()),
        state.web_base.clone(),
        state.cookies.clone(),
    );

    report_navigation(controller.navigate(target).await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            match NavigationTarget::parse(line) {
                Ok(target) => report_navigation(controller.navigate(target).await?),
                Err(e) => warn!(error = %e, "Ignoring route"),
            }
            continue;
        }

        match controller.on_message(line).await {
            Ok(outcome) => print_line(describe_outcome(&outcome)),
            Err(e) => print_line(json!({ "op": "error", "error": e.to_string() })),
        }
    }

    controller.detach();
    info!("Bridge session finished");
    Ok(())
}

fn report_navigation(result: NavigationResult) {
    match result {
        NavigationResult::Loaded { cycle_id, url } => {
            print_line(json!({ "op": "navigated", "cycle": cycle_id, "url": url.as_str() }))
        }
        NavigationResult::Superseded { cycle_id } => {
            print_line(json!({ "op": "superseded", "cycle": cycle_id }))
        }
    }
}

fn describe_outcome(outcome: &MessageOutcome) -> serde_json::Value {
    match outcome {
        MessageOutcome::Navigate(destination) => {
            json!({ "op": "outcome", "result": "navigate", "path": destination.to_string() })
        }
        MessageOutcome::Replied(message) => {
            json!({ "op": "outcome", "result": "replied", "kind": message.kind() })
        }
        MessageOutcome::Forwarded => json!({ "op": "outcome", "result": "forwarded" }),
        MessageOutcome::Logged => json!({ "op": "outcome", "result": "logged" }),
        MessageOutcome::Dropped => json!({ "op": "outcome", "result": "dropped" }),
    }
}

fn print_line(value: serde_json::Value) {
    println!("{}", value);
}

/// Page host that prints what a real surface would do.
#[derive(Default)]
struct StdioHost {
    loaded: AtomicBool,
}

impl PageHost for StdioHost {
    fn load_url(&self, url: &Url) -> ControllerResult<()> {
        print_line(json!({ "op": "load", "url": url.as_str() }));
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_cookies(&self, set_cookie_headers: &[String]) -> ControllerResult<()> {
        print_line(json!({ "op": "cookies", "set_cookie": set_cookie_headers }));
        Ok(())
    }

    fn inject_runtime(&self, script: &str) -> ControllerResult<()> {
        print_line(json!({ "op": "inject", "bytes": script.len() }));
        Ok(())
    }

    fn post_message(&self, json: &str) -> ControllerResult<()> {
        let message = serde_json::from_str::<serde_json::Value>(json)
            .unwrap_or_else(|_| serde_json::Value::String(json.to_string()));
        print_line(json!({ "op": "post", "message": message }));
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

struct PrintCheckout;

impl CheckoutHandler for PrintCheckout {
    fn begin_checkout(&self, cart_data: serde_json::Value) {
        print_line(json!({ "op": "checkout", "cart": cart_data }));
    }
}

/// Location provider pinned to one position.
#[derive(Debug, Clone, PartialEq)]
struct FixedLocation {
    latitude: f64,
    longitude: f64,
}

impl FixedLocation {
    /// Parse `"lat,lon"`.
    fn parse(raw: &str) -> Result<Self, String> {
        let (lat, lon) = raw
            .split_once(',')
            .ok_or_else(|| format!("expected \"lat,lon\", got {:?}", raw))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude {:?}: {}", lat, e))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude {:?}: {}", lon, e))?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("coordinates out of range: {}", raw));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<LocationFix, LocationProblem> {
        Ok(LocationFix {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: Some(0.0),
            timestamp: None,
            source: Some("fixed".to_string()),
        })
    }
}
