//! Structured engine events.

use crate::CyclePhase;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One step of the invalidation protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum InvalidationStep {
    /// Secure store and cookie store session entries removed.
    StoresCleared,
    /// No page is attached; nothing to notify.
    NoChannel,
    CookieClearSent { attempt: u8 },
    CookieClearRetryScheduled { delay_ms: u64 },
    /// Both attempts failed. The page re-derives "no session" on its next check.
    CookieClearAbandoned { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    CycleStarted {
        cycle_id: u64,
        route: String,
    },
    Transition {
        cycle_id: u64,
        from: CyclePhase,
        to: CyclePhase,
    },
    CycleResolved {
        cycle_id: u64,
        destination: String,
        login_detour: bool,
    },
    /// A cycle finished after a newer navigation started; its result is ignored.
    CycleDiscarded {
        cycle_id: u64,
        current_cycle_id: u64,
    },
    /// A superseded cycle reached a storage side effect and skipped it.
    StaleEffectSkipped {
        cycle_id: u64,
        current_cycle_id: u64,
        effect: &'static str,
    },
    Invalidation(InvalidationStep),
    SessionPersisted {
        source: &'static str,
    },
    MessageReceived {
        kind: &'static str,
    },
    MessageSent {
        kind: &'static str,
    },
    MessageDropped {
        kind: Option<&'static str>,
        reason: String,
    },
}

/// Receives every [`BridgeEvent`] after it has been logged.
pub type EventCallback = Arc<dyn Fn(&BridgeEvent) + Send + Sync>;

impl BridgeEvent {
    pub(crate) fn log(&self) {
        match self {
            BridgeEvent::CycleStarted { cycle_id, route } => {
                info!(cycle_id, route = %route, "Navigation cycle started");
            }
            BridgeEvent::Transition { cycle_id, from, to } => {
                debug!(cycle_id, from = %from, to = %to, "Cycle transition");
            }
            BridgeEvent::CycleResolved {
                cycle_id,
                destination,
                login_detour,
            } => {
                info!(cycle_id, destination = %destination, login_detour, "Navigation cycle resolved");
            }
            BridgeEvent::CycleDiscarded {
                cycle_id,
                current_cycle_id,
            } => {
                info!(cycle_id, current_cycle_id, "Discarding stale cycle result");
            }
            BridgeEvent::StaleEffectSkipped {
                cycle_id,
                current_cycle_id,
                effect,
            } => {
                info!(cycle_id, current_cycle_id, effect, "Skipping side effect of stale cycle");
            }
            BridgeEvent::Invalidation(step) => match step {
                InvalidationStep::CookieClearAbandoned { reason } => {
                    warn!(reason = %reason, "Cookie clear not delivered");
                }
                other => info!(step = ?other, "Invalidation step"),
            },
            BridgeEvent::SessionPersisted { source } => {
                info!(source, "Session persisted");
            }
            BridgeEvent::MessageReceived { kind } => {
                debug!(kind, "Page message received");
            }
            BridgeEvent::MessageSent { kind } => {
                debug!(kind, "Message sent to page");
            }
            BridgeEvent::MessageDropped { kind, reason } => {
                debug!(kind = kind.unwrap_or("?"), reason = %reason, "Page message dropped");
            }
        }
    }
}
