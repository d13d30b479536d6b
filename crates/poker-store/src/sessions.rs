use chrono::Utc;
use tracing::instrument;

use poker_core::{Session, SessionId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Durable keyed storage for session aggregates.
pub trait SessionStore: Send + Sync {
    fn load(&self, id: &SessionId) -> Result<Session, StoreError>;

    /// Upsert `session` keyed by id.
    ///
    /// Succeeds only if the stored version still equals `session.version`
    /// (or nothing is stored yet); on success the version is bumped in place.
    fn save(&self, session: &mut Session) -> Result<(), StoreError>;
}

/// SQLite-backed [`SessionStore`]. Each session is one JSON document row.
#[derive(Clone)]
pub struct SessionRepo {
    db: Database,
}

impl SessionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of stored sessions.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }
}

impl SessionStore for SessionRepo {
    #[instrument(skip(self), fields(session_id = %id))]
    fn load(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT version, document FROM sessions WHERE id = ?1")?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_session(row),
                None => Err(StoreError::NotFound(format!("session {id}"))),
            }
        })
    }

    #[instrument(skip(self, session), fields(session_id = %session.id, version = session.version))]
    fn save(&self, session: &mut Session) -> Result<(), StoreError> {
        let expected = session.version;
        let mut next = session.clone();
        next.version = expected + 1;
        next.updated_at = Utc::now().to_rfc3339();
        let document = serde_json::to_string(&next)?;

        let changed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "INSERT INTO sessions (id, name, version, document, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    version = excluded.version,
                    document = excluded.document,
                    updated_at = excluded.updated_at
                 WHERE sessions.version = ?7",
                rusqlite::params![
                    next.id.as_str(),
                    next.name,
                    next.version as i64,
                    document,
                    next.created_at,
                    next.updated_at,
                    expected as i64,
                ],
            )?)
        })?;

        if changed == 0 {
            return Err(StoreError::Conflict(format!(
                "session {} changed since version {expected}",
                session.id
            )));
        }

        *session = next;
        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Session, StoreError> {
    let version: i64 = row_helpers::get(row, 0, "sessions", "version")?;
    let document: String = row_helpers::get(row, 1, "sessions", "document")?;

    let mut session: Session = row_helpers::parse_document(&document, "sessions", "document")?;
    session.version = version as u64;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poker_core::{Round, RoundNumber};

    fn repo() -> SessionRepo {
        SessionRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn save_new_then_load() {
        let repo = repo();
        let mut session = Session::new(SessionId::new(), "Sprint 3");
        session.players.push("alice".into());
        repo.save(&mut session).unwrap();
        assert_eq!(session.version, 1);

        let loaded = repo.load(&session.id).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn load_unknown_is_not_found() {
        let result = repo().load(&SessionId::from_raw("sess_missing"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn save_overwrites_whole_aggregate() {
        let repo = repo();
        let mut session = Session::new(SessionId::new(), "s");
        repo.save(&mut session).unwrap();

        let mut round = Round::new(RoundNumber::FIRST);
        round.votes.insert("bob".into(), 5);
        session.current_round = Some(round);
        session.user_stories.push("story".into());
        session.tasks.insert(0, "task".into());
        repo.save(&mut session).unwrap();
        assert_eq!(session.version, 2);

        let loaded = repo.load(&session.id).unwrap();
        assert_eq!(loaded.current_round.unwrap().votes["bob"], 5);
        assert_eq!(loaded.tasks[&0], "task");
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn stale_save_is_conflict() {
        let repo = repo();
        let mut session = Session::new(SessionId::new(), "s");
        repo.save(&mut session).unwrap();

        let mut first = repo.load(&session.id).unwrap();
        let mut second = repo.load(&session.id).unwrap();

        first.players.push("a".into());
        repo.save(&mut first).unwrap();

        second.players.push("b".into());
        let err = repo.save(&mut second).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(second.version, 1, "failed save must not bump version");

        let stored = repo.load(&session.id).unwrap();
        assert_eq!(stored.players, vec!["a"]);
    }

    #[test]
    fn creating_twice_with_same_id_conflicts() {
        let repo = repo();
        let id = SessionId::new();
        repo.save(&mut Session::new(id.clone(), "one")).unwrap();
        let err = repo.save(&mut Session::new(id, "two")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn upsert_inserts_unknown_id_at_any_version() {
        let repo = repo();
        let mut session = Session::new(SessionId::new(), "imported");
        session.version = 7;
        repo.save(&mut session).unwrap();
        assert_eq!(repo.load(&session.id).unwrap().version, 8);
    }

    #[test]
    fn corrupt_document_is_reported() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, name, version, document, created_at, updated_at)
                 VALUES ('sess_bad', 'bad', 1, '{not json', 'now', 'now')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let result = SessionRepo::new(db).load(&SessionId::from_raw("sess_bad"));
        assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
    }
}
