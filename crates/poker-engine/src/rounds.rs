use poker_core::{Round, RoundNumber, Session, SessionEvent};
use tracing::debug;

use crate::{EngineError, Transition};

/// Archive the current round (if any) and install a fresh one.
pub fn start_round(session: &mut Session) -> Transition {
    let number = session.next_round_number();
    if let Some(previous) = session.current_round.take() {
        session.round_history.push(previous);
    }
    session.current_round = Some(Round::new(number));
    session.last_round = number.get();
    debug!(session_id = %session.id, round = %number, "round started");
    Transition::mutated(vec![SessionEvent::RoundStarting])
}

/// Move the current round into history without starting a successor.
pub fn archive_round(session: &mut Session) -> Result<Transition, EngineError> {
    let round = session
        .current_round
        .take()
        .ok_or_else(EngineError::round_not_started)?;
    session.last_round = session.last_round.max(round.id.get());
    session.round_history.push(round);
    Ok(Transition::mutated(Vec::new()))
}

/// Record or overwrite `player`'s vote in the current round.
///
/// Emits `all-voted` when the vote count equals the player count after the
/// write. Stale votes from removed players count toward that total.
pub fn vote(session: &mut Session, player: &str, value: i64) -> Result<Transition, EngineError> {
    let round = session
        .current_round
        .as_mut()
        .ok_or_else(EngineError::round_not_started)?;
    round.votes.insert(player.to_owned(), value);

    let mut events = vec![SessionEvent::PlayerVoted {
        player: player.to_owned(),
    }];
    if round.votes.len() == session.players.len() {
        events.push(SessionEvent::AllVoted);
    }
    Ok(Transition::mutated(events))
}

pub fn rollback_vote(session: &mut Session, player: &str) -> Result<Transition, EngineError> {
    let round = session
        .current_round
        .as_mut()
        .ok_or_else(EngineError::round_not_started)?;
    if round.votes.remove(player).is_none() {
        return Err(EngineError::NotFound(format!("vote of {player}")));
    }
    Ok(Transition::mutated(Vec::new()))
}

/// Signal clients to show votes. Stored data is untouched.
pub fn reveal(session: &Session) -> Result<Transition, EngineError> {
    if session.current_round.is_none() {
        return Err(EngineError::round_not_started());
    }
    Ok(Transition::notify_only(vec![SessionEvent::Reveal]))
}

/// Look up a round by its `round-<N>` label, current round first.
pub fn find_round<'a>(session: &'a Session, round_id: &str) -> Result<&'a Round, EngineError> {
    let not_found = || EngineError::NotFound(format!("round {round_id}"));
    let number = RoundNumber::parse(round_id).ok_or_else(not_found)?;

    session
        .current_round
        .iter()
        .chain(session.round_history.iter())
        .find(|r| r.id == number)
        .ok_or_else(not_found)
}

pub fn results(session: &Session) -> Result<&Round, EngineError> {
    session
        .current_round
        .as_ref()
        .ok_or_else(EngineError::round_not_started)
}

pub fn is_started(session: &Session) -> bool {
    session.current_round.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster;
    use crate::session_with;
    use std::collections::BTreeMap;

    #[test]
    fn first_round_is_round_one() {
        let mut session = session_with(&["a"]);
        let t = start_round(&mut session);
        assert_eq!(t.events, vec![SessionEvent::RoundStarting]);
        assert_eq!(session.current_round.as_ref().unwrap().id.to_string(), "round-1");
        assert!(session.round_history.is_empty());
    }

    #[test]
    fn second_start_archives_first_unmutated() {
        let mut session = session_with(&["a", "b"]);
        start_round(&mut session);
        vote(&mut session, "a", 3).unwrap();
        let first = session.current_round.clone().unwrap();

        start_round(&mut session);
        let second = session.current_round.as_ref().unwrap();
        assert_eq!(second.id.get(), first.id.get() + 1);
        assert!(second.votes.is_empty());
        assert_eq!(session.round_history, vec![first]);
    }

    #[test]
    fn round_ids_strictly_increase_across_archive() {
        let mut session = session_with(&["a"]);
        start_round(&mut session);
        start_round(&mut session);
        archive_round(&mut session).unwrap();
        assert!(session.current_round.is_none());

        start_round(&mut session);
        assert_eq!(session.current_round.as_ref().unwrap().id.get(), 3);
        let ids: Vec<u32> = session.round_history.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn archive_without_round_is_invalid_state() {
        let mut session = session_with(&[]);
        assert!(matches!(
            archive_round(&mut session),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[test]
    fn vote_requires_round() {
        let mut session = session_with(&["a"]);
        let before = session.clone();
        let err = vote(&mut session, "a", 1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(session, before);
    }

    #[test]
    fn revote_keeps_latest_value() {
        let mut session = session_with(&["a", "b"]);
        start_round(&mut session);
        vote(&mut session, "a", 3).unwrap();
        vote(&mut session, "a", 13).unwrap();

        let votes = &session.current_round.as_ref().unwrap().votes;
        assert_eq!(votes.len(), 1);
        assert_eq!(votes["a"], 13);
    }

    #[test]
    fn all_voted_only_when_counts_match() {
        let mut session = session_with(&["a", "b"]);
        start_round(&mut session);

        let t = vote(&mut session, "a", 3).unwrap();
        assert_eq!(
            t.events,
            vec![SessionEvent::PlayerVoted { player: "a".into() }]
        );

        let t = vote(&mut session, "b", 5).unwrap();
        let all_voted = t.events.iter().filter(|e| **e == SessionEvent::AllVoted).count();
        assert_eq!(all_voted, 1);
        assert_eq!(t.events[0], SessionEvent::PlayerVoted { player: "b".into() });
    }

    #[test]
    fn all_voted_fires_again_on_revote_at_full_count() {
        let mut session = session_with(&["a"]);
        start_round(&mut session);
        assert!(vote(&mut session, "a", 1).unwrap().events.contains(&SessionEvent::AllVoted));
        assert!(vote(&mut session, "a", 2).unwrap().events.contains(&SessionEvent::AllVoted));
    }

    #[test]
    fn all_voted_never_fires_with_duplicate_player_names() {
        let mut session = session_with(&["a", "a"]);
        start_round(&mut session);
        let t = vote(&mut session, "a", 1).unwrap();
        assert!(!t.events.contains(&SessionEvent::AllVoted));
    }

    #[test]
    fn vote_for_absent_player_is_recorded() {
        let mut session = session_with(&["a"]);
        start_round(&mut session);
        vote(&mut session, "ghost", 2).unwrap();
        assert_eq!(session.current_round.as_ref().unwrap().votes["ghost"], 2);
    }

    #[test]
    fn rollback_restores_pre_vote_state() {
        let mut session = session_with(&["a", "b"]);
        start_round(&mut session);
        vote(&mut session, "b", 8).unwrap();
        let before = session.current_round.clone().unwrap();

        vote(&mut session, "a", 3).unwrap();
        let t = rollback_vote(&mut session, "a").unwrap();
        assert!(t.events.is_empty());
        assert_eq!(session.current_round.as_ref().unwrap(), &before);
    }

    #[test]
    fn rollback_errors() {
        let mut session = session_with(&["a"]);
        assert!(matches!(
            rollback_vote(&mut session, "a"),
            Err(EngineError::InvalidState(_))
        ));

        start_round(&mut session);
        assert!(matches!(
            rollback_vote(&mut session, "a"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn reveal_is_notification_only() {
        let mut session = session_with(&["a"]);
        assert!(matches!(reveal(&session), Err(EngineError::InvalidState(_))));

        start_round(&mut session);
        vote(&mut session, "a", 5).unwrap();
        let before = session.clone();
        let t = reveal(&session).unwrap();
        assert_eq!(t.events, vec![SessionEvent::Reveal]);
        assert!(!t.mutated);
        assert_eq!(session, before);
    }

    #[test]
    fn find_round_searches_current_then_history() {
        let mut session = session_with(&["a"]);
        start_round(&mut session);
        vote(&mut session, "a", 1).unwrap();
        start_round(&mut session);

        assert_eq!(find_round(&session, "round-2").unwrap().id.get(), 2);
        assert_eq!(find_round(&session, "round-1").unwrap().votes["a"], 1);
        assert!(matches!(find_round(&session, "round-3"), Err(EngineError::NotFound(_))));
        assert!(matches!(find_round(&session, "bogus"), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn results_and_is_started() {
        let mut session = session_with(&["a"]);
        assert!(!is_started(&session));
        assert!(matches!(results(&session), Err(EngineError::InvalidState(_))));

        start_round(&mut session);
        assert!(is_started(&session));
        assert!(results(&session).unwrap().votes.is_empty());
    }

    #[test]
    fn two_player_scenario() {
        let mut session = roster::create("S");
        roster::join(&mut session, "A");
        roster::join(&mut session, "B");
        start_round(&mut session);

        let t = vote(&mut session, "A", 3).unwrap();
        assert!(!t.events.contains(&SessionEvent::AllVoted));
        let t = vote(&mut session, "B", 5).unwrap();
        assert!(t.events.contains(&SessionEvent::AllVoted));

        let expected: BTreeMap<String, i64> = [("A".to_string(), 3), ("B".to_string(), 5)].into();
        assert_eq!(results(&session).unwrap().votes, expected);
    }

    #[test]
    fn rollback_scenario_leaves_round_empty() {
        let mut session = session_with(&["A"]);
        start_round(&mut session);
        vote(&mut session, "A", 3).unwrap();
        rollback_vote(&mut session, "A").unwrap();

        let current = session.current_round.as_ref().unwrap().id.to_string();
        assert!(find_round(&session, &current).unwrap().votes.is_empty());
    }
}
