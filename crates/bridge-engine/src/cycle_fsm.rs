//! Per-navigation token lifecycle machine.
//!
//! ```text
//! Init ──AccessTokenMissing──────────────────────────► NoToken ───────┐
//!  │ AccessTokenFound                                     ▲           │
//!  ▼                                                      │           │
//! CheckingToken ──RefreshTokenMissing─────────────────────┘           │
//!  │ VerifyAccepted          │ RefreshTokenFound                      │
//!  ▼                         ▼                                        │
//! TokenValid             Refreshing ──RefreshRejected──► RefreshFailed┤
//!  │                         │ RefreshSucceeded                       │
//!  │                         ▼                                        │
//!  │                     RefreshOk                                    │
//!  └──────────── Resolve ────┴────────────────────────────► Resolved ◄┘
//! ```
//!
//! A failed or timed-out verify is fed as "not accepted", so the machine
//! never waits on an outcome that did not arrive.

use rust_fsm::*;
use serde::Serialize;
use std::fmt;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub cycle_machine(Init)

    Init => {
        AccessTokenFound => CheckingToken,
        AccessTokenMissing => NoToken
    },
    CheckingToken => {
        VerifyAccepted => TokenValid,
        RefreshTokenFound => Refreshing,
        RefreshTokenMissing => NoToken
    },
    Refreshing => {
        RefreshSucceeded => RefreshOk,
        RefreshRejected => RefreshFailed
    },
    TokenValid => {
        Resolve => Resolved
    },
    RefreshOk => {
        Resolve => Resolved
    },
    NoToken => {
        Resolve => Resolved
    },
    RefreshFailed => {
        Resolve => Resolved
    }
}

pub use cycle_machine::Input as CycleInput;
pub use cycle_machine::State as CycleState;
pub use cycle_machine::StateMachine as CycleMachine;

/// Public view of a [`CycleState`], used in events and outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    Init,
    CheckingToken,
    TokenValid,
    Refreshing,
    RefreshOk,
    RefreshFailed,
    NoToken,
    Resolved,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Init => "INIT",
            CyclePhase::CheckingToken => "CHECKING_TOKEN",
            CyclePhase::TokenValid => "TOKEN_VALID",
            CyclePhase::Refreshing => "REFRESHING",
            CyclePhase::RefreshOk => "REFRESH_OK",
            CyclePhase::RefreshFailed => "REFRESH_FAILED",
            CyclePhase::NoToken => "NO_TOKEN",
            CyclePhase::Resolved => "RESOLVED",
        }
    }

    /// Phases that resolve to the requested route rather than the login page.
    pub fn keeps_session(&self) -> bool {
        matches!(self, CyclePhase::TokenValid | CyclePhase::RefreshOk)
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&CycleState> for CyclePhase {
    fn from(state: &CycleState) -> Self {
        match state {
            CycleState::Init => CyclePhase::Init,
            CycleState::CheckingToken => CyclePhase::CheckingToken,
            CycleState::TokenValid => CyclePhase::TokenValid,
            CycleState::Refreshing => CyclePhase::Refreshing,
            CycleState::RefreshOk => CyclePhase::RefreshOk,
            CycleState::RefreshFailed => CyclePhase::RefreshFailed,
            CycleState::NoToken => CyclePhase::NoToken,
            CycleState::Resolved => CyclePhase::Resolved,
        }
    }
}
