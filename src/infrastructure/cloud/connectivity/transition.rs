//! Transition table for the connectivity state machine.

use std::fmt;

/// Gateway-wide link health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    Connected,
    /// A call timed out while connected; one more timeout means disconnected.
    Trying,
    Disconnected,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Trying => "trying",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Outcome of a remote call, as observed by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    CallSucceeded,
    CallTimedOut,
}

/// Next state for `from` on `trigger`.
#[must_use]
pub const fn next_state(from: ConnectivityState, trigger: Trigger) -> ConnectivityState {
    use ConnectivityState::{Connected, Disconnected, Trying};

    match (from, trigger) {
        (Connected | Trying | Disconnected, Trigger::CallSucceeded) => Connected,
        (Connected, Trigger::CallTimedOut) => Trying,
        (Trying | Disconnected, Trigger::CallTimedOut) => Disconnected,
    }
}

/// State after applying `triggers` in order, starting from `from`.
#[must_use]
pub fn fold(from: ConnectivityState, triggers: &[Trigger]) -> ConnectivityState {
    triggers.iter().fold(from, |state, t| next_state(state, *t))
}
