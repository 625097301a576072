//! Screens and device services the engine hands work to.

use async_trait::async_trait;
use bridge_protocol::LocationFix;
use std::sync::Arc;

/// Receives the cart payload of a `CHECKOUT_REQUEST` (the native
/// signature/payment screen). The payload is passed through untouched.
pub trait CheckoutHandler: Send + Sync {
    fn begin_checkout(&self, cart_data: serde_json::Value);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationProblem {
    PermissionDenied,
    Unavailable(String),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<LocationFix, LocationProblem>;
}

/// Optional collaborators. A missing one turns its requests into a logged
/// drop (checkout) or a `LOCATION_ERROR` reply (location).
#[derive(Clone, Default)]
pub struct Collaborators {
    pub checkout: Option<Arc<dyn CheckoutHandler>>,
    pub location: Option<Arc<dyn LocationProvider>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkout(mut self, handler: Arc<dyn CheckoutHandler>) -> Self {
        self.checkout = Some(handler);
        self
    }

    pub fn with_location(mut self, provider: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(provider);
        self
    }
}
