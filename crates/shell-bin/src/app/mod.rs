//! Shell wiring.

mod state;

pub use state::ShellState;
