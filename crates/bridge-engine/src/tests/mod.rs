//! Engine tests.
//!
//! - `harness.rs`      - scripted gateway, recording page channel, wiring
//! - `cycle.rs`        - navigation cycle table and scenarios A-D
//! - `messages.rs`     - inbound page messages, scenario E
//! - `invalidation.rs` - clear-all protocol, scenario F
//! - `session.rs`      - native login/logout/status and header building
//! - `overlap.rs`      - last-navigation-wins between concurrent cycles

pub(crate) mod harness;
mod overlap;
