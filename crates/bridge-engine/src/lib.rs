//! Bridge protocol engine.
//!
//! Owns every token lifecycle decision for an embedded page surface:
//!
//! - [`BridgeEngine::run_cycle`] runs one navigation cycle through the
//!   [`cycle_fsm`] machine and resolves the URL the page should load.
//! - [`BridgeEngine::handle_message`] reacts to messages posted by the page.
//! - [`BridgeEngine::invalidate`] clears both storage domains and tells a
//!   live page to drop its cookies.
//!
//! Network failures never escape the engine. They become state machine
//! inputs and end in a login redirect. Every transition and invalidation
//! step is reported as a [`BridgeEvent`].

mod channel;
mod collaborators;
pub mod cycle_fsm;
mod destination;
mod engine;
mod error;
mod events;

pub use channel::{ChannelError, PageChannel};
pub use collaborators::{CheckoutHandler, Collaborators, LocationProblem, LocationProvider};
pub use cycle_fsm::CyclePhase;
pub use destination::Destination;
pub use engine::{BridgeEngine, CycleOutcome, EngineConfig, MessageOutcome, STATUS_CHECK_CYCLE};
pub use error::{EngineError, EngineResult};
pub use events::{BridgeEvent, EventCallback, InvalidationStep};

#[cfg(test)]
mod tests;
