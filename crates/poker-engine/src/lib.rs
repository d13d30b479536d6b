//! Session state transitions.
//!
//! Every operation takes exclusive access to one [`Session`] and returns the
//! notifications the caller should fan out once the result is persisted.
//! Nothing here touches storage or subscribers.

pub mod error;
pub mod roster;
pub mod rounds;
pub mod stories;

pub use error::EngineError;

use poker_core::SessionEvent;

/// Result of applying one operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    /// Events to broadcast, in order.
    pub events: Vec<SessionEvent>,
    /// False when the session was left untouched and need not be saved.
    pub mutated: bool,
}

impl Transition {
    pub fn mutated(events: Vec<SessionEvent>) -> Self {
        Self {
            events,
            mutated: true,
        }
    }

    pub fn notify_only(events: Vec<SessionEvent>) -> Self {
        Self {
            events,
            mutated: false,
        }
    }
}

#[cfg(test)]
pub(crate) fn session_with(players: &[&str]) -> poker_core::Session {
    let mut session = roster::create("test");
    for p in players {
        roster::join(&mut session, p);
    }
    session
}
