//! Sequences engine, store and hub for one request.
//!
//! Every mutating call runs load → apply → save → notify while holding a
//! per-session async mutex, so concurrent requests on the same session are
//! applied one after another and broadcasts leave in persistence order.
//! Different sessions never contend. The store's version check still rejects
//! writers that bypass this service (e.g. another process).

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use poker_core::{Round, Session, SessionId};
use poker_engine::{roster, rounds, stories, EngineError, Transition};
use poker_store::SessionStore;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ServiceError;
use crate::hub::BroadcastHub;

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    hub: Arc<BroadcastHub>,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            store,
            hub,
            locks: DashMap::new(),
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn create(&self, name: &str) -> Result<Session, ServiceError> {
        let mut session = roster::create(name);
        self.store.save(&mut session)?;
        info!(session_id = %session.id, "session created");
        Ok(session)
    }

    pub fn get(&self, id: &SessionId) -> Result<Session, ServiceError> {
        Ok(self.store.load(id)?)
    }

    pub async fn join(&self, id: &SessionId, player: &str) -> Result<Session, ServiceError> {
        self.apply(id, |s| Ok(roster::join(s, player))).await
    }

    pub async fn remove_player(&self, id: &SessionId, player: &str) -> Result<Session, ServiceError> {
        self.apply(id, |s| roster::remove_player(s, player)).await
    }

    pub async fn start_round(&self, id: &SessionId) -> Result<Round, ServiceError> {
        let session = self.apply(id, |s| Ok(rounds::start_round(s))).await?;
        current_round(session)
    }

    pub async fn archive_round(&self, id: &SessionId) -> Result<Session, ServiceError> {
        self.apply(id, rounds::archive_round).await
    }

    pub async fn vote(&self, id: &SessionId, player: &str, value: i64) -> Result<Round, ServiceError> {
        let session = self.apply(id, |s| rounds::vote(s, player, value)).await?;
        current_round(session)
    }

    pub async fn rollback_vote(&self, id: &SessionId, player: &str) -> Result<Round, ServiceError> {
        let session = self.apply(id, |s| rounds::rollback_vote(s, player)).await?;
        current_round(session)
    }

    pub async fn reveal(&self, id: &SessionId) -> Result<Round, ServiceError> {
        let session = self.apply(id, |s| rounds::reveal(s)).await?;
        current_round(session)
    }

    pub fn results(&self, id: &SessionId) -> Result<Round, ServiceError> {
        let session = self.store.load(id)?;
        Ok(rounds::results(&session)?.clone())
    }

    pub fn round_started(&self, id: &SessionId) -> Result<bool, ServiceError> {
        Ok(rounds::is_started(&self.store.load(id)?))
    }

    pub fn round(&self, id: &SessionId, round_id: &str) -> Result<Round, ServiceError> {
        let session = self.store.load(id)?;
        Ok(rounds::find_round(&session, round_id)?.clone())
    }

    pub async fn add_story(&self, id: &SessionId, story: &str) -> Result<Session, ServiceError> {
        self.apply(id, |s| Ok(stories::add_story(s, story))).await
    }

    pub async fn remove_story(&self, id: &SessionId, index: usize) -> Result<Session, ServiceError> {
        self.apply(id, |s| stories::remove_story(s, index)).await
    }

    pub async fn add_task(
        &self,
        id: &SessionId,
        index: usize,
        task: &str,
    ) -> Result<BTreeMap<usize, String>, ServiceError> {
        let session = self.apply(id, |s| stories::add_task(s, index, task)).await?;
        Ok(session.tasks)
    }

    async fn apply<F>(&self, id: &SessionId, op: F) -> Result<Session, ServiceError>
    where
        F: FnOnce(&mut Session) -> Result<Transition, EngineError>,
    {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.apply_locked(id, op)
        };
        drop(lock);
        self.locks.remove_if(id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    fn apply_locked<F>(&self, id: &SessionId, op: F) -> Result<Session, ServiceError>
    where
        F: FnOnce(&mut Session) -> Result<Transition, EngineError>,
    {
        let mut session = self.store.load(id)?;
        let transition = op(&mut session).inspect_err(|e| {
            debug!(session_id = %id, kind = e.error_kind(), error = %e, "operation rejected");
        })?;

        if transition.mutated {
            self.store.save(&mut session)?;
        }
        for event in &transition.events {
            self.hub.notify(id, &event.to_string());
        }
        Ok(session)
    }

    fn lock_for(&self, id: &SessionId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(id.clone()).or_default().value())
    }
}

fn current_round(session: Session) -> Result<Round, ServiceError> {
    session
        .current_round
        .ok_or_else(|| EngineError::InvalidState("round has not been started".into()).into())
}
