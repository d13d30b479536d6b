//! Per-session fan-out of event notifications.
//!
//! Each subscriber is a bounded queue drained by its connection's writer
//! task. `notify` never awaits: it snapshots the session's senders under the
//! shard lock, releases it, then `try_send`s to each. A closed or full queue
//! counts as a failed delivery and the subscriber is pruned.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use poker_core::ids::{SessionId, SubscriberId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

type SubscriberSet = HashMap<SubscriberId, mpsc::Sender<String>>;

/// Outcome of a single `notify` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub pruned: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HubStats {
    pub sessions: usize,
    pub subscribers: usize,
}

/// Registry of live notification channels, keyed by session.
pub struct BroadcastHub {
    sessions: DashMap<SessionId, SubscriberSet>,
    queue_capacity: usize,
}

impl BroadcastHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Add `tx` to the session's subscriber set.
    pub fn register(&self, session_id: &SessionId, tx: mpsc::Sender<String>) -> SubscriberId {
        let id = SubscriberId::new();
        self.sessions
            .entry(session_id.clone())
            .or_default()
            .insert(id.clone(), tx);
        debug!(session_id = %session_id, subscriber_id = %id, "subscriber registered");
        id
    }

    /// Create a queue, register it, and hand back a guard that unregisters on drop.
    pub fn subscribe(self: &Arc<Self>, session_id: &SessionId) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.register(session_id, tx);
        Subscription {
            hub: Arc::clone(self),
            session_id: session_id.clone(),
            id,
            rx,
        }
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unregister(&self, session_id: &SessionId, subscriber: &SubscriberId) -> bool {
        let removed = self
            .sessions
            .get_mut(session_id)
            .is_some_and(|mut set| set.remove(subscriber).is_some());
        self.drop_if_empty(session_id);
        if removed {
            debug!(session_id = %session_id, subscriber_id = %subscriber, "subscriber unregistered");
        }
        removed
    }

    /// Deliver `message` to every subscriber of the session, pruning dead ones.
    pub fn notify(&self, session_id: &SessionId, message: &str) -> Delivery {
        let targets: Vec<(SubscriberId, mpsc::Sender<String>)> = match self.sessions.get(session_id) {
            Some(set) => set.iter().map(|(id, tx)| (id.clone(), tx.clone())).collect(),
            None => return Delivery::default(),
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(message.to_owned()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session_id = %session_id,
                        subscriber_id = %id,
                        "send queue full, dropping subscriber"
                    );
                    dead.push(id);
                }
                Err(TrySendError::Closed(_)) => dead.push(id),
            }
        }

        if !dead.is_empty() {
            if let Some(mut set) = self.sessions.get_mut(session_id) {
                for id in &dead {
                    set.remove(id);
                }
            }
            self.drop_if_empty(session_id);
        }

        debug!(
            session_id = %session_id,
            event = message,
            delivered,
            pruned = dead.len(),
            "notified subscribers"
        );
        Delivery {
            delivered,
            pruned: dead.len(),
        }
    }

    pub fn subscriber_count(&self, session_id: &SessionId) -> usize {
        self.sessions.get(session_id).map_or(0, |set| set.len())
    }

    pub fn stats(&self) -> HubStats {
        self.sessions.iter().fold(HubStats::default(), |acc, entry| HubStats {
            sessions: acc.sessions + 1,
            subscribers: acc.subscribers + entry.value().len(),
        })
    }

    fn drop_if_empty(&self, session_id: &SessionId) {
        self.sessions.remove_if(session_id, |_, set| set.is_empty());
    }
}

/// A registered subscriber's receiving end. Dropping it unregisters.
pub struct Subscription {
    hub: Arc<BroadcastHub>,
    session_id: SessionId,
    id: SubscriberId,
    rx: mpsc::Receiver<String>,
}

impl Subscription {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Next message, or `None` once the hub has pruned this subscriber.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(&self.session_id, &self.id);
    }
}
