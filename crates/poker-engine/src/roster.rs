use poker_core::{Session, SessionEvent, SessionId};

use crate::{EngineError, Transition};

/// Create a session with a fresh id, no players and no round.
pub fn create(name: &str) -> Session {
    Session::new(SessionId::new(), name)
}

/// Append a player. Names are not deduplicated.
pub fn join(session: &mut Session, player: &str) -> Transition {
    session.players.push(player.to_owned());
    Transition::mutated(vec![SessionEvent::PlayerJoined])
}

/// Remove every entry matching `player`. Votes already cast are kept.
pub fn remove_player(session: &mut Session, player: &str) -> Result<Transition, EngineError> {
    if !session.has_player(player) {
        return Err(EngineError::NotFound(format!("player {player}")));
    }
    session.players.retain(|p| p != player);
    Ok(Transition::mutated(vec![SessionEvent::PlayerLeft]))
}
