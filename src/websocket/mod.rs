use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

pub mod message_types;

/// Unique identifier for one registered delivery channel.
///
/// Reconnecting silently replaces the registry entry for an identity,
/// so a session that was replaced must not evict its replacement when
/// it finally shuts down. Cleanup is keyed on this id to stay precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Connection {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// Process-wide map from identity to its live delivery channel.
///
/// At most one channel per identity at any instant. The lock is
/// synchronous: every critical section is an O(1) map operation with
/// no I/O, so registry calls work from async tasks and from actor
/// lifecycle hooks alike, and disconnect cleanup completes before the
/// session finishes stopping.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<i64, Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<i64, Connection>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<i64, Connection>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a delivery channel for an identity, replacing any
    /// previous entry. The replaced channel is not closed explicitly;
    /// its receiver just stops getting frames.
    pub fn register(&self, user_id: i64) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let id = ConnectionId::new();

        if self
            .write()
            .insert(user_id, Connection { id, sender: tx })
            .is_some()
        {
            tracing::debug!(user_id, "replaced existing delivery channel");
        }

        (id, rx)
    }

    /// Remove the entry for an identity, but only if it still belongs
    /// to the given connection. Stale or unknown connections are a
    /// no-op.
    pub fn unregister(&self, user_id: i64, connection_id: ConnectionId) {
        let mut guard = self.write();
        if guard.get(&user_id).is_some_and(|c| c.id == connection_id) {
            guard.remove(&user_id);
            tracing::debug!(user_id, "delivery channel unregistered");
        }
    }

    /// Current live channel for an identity, if any.
    pub fn lookup(&self, user_id: i64) -> Option<UnboundedSender<String>> {
        self.read().get(&user_id).map(|c| c.sender.clone())
    }

    /// Best-effort push. Returns true when the frame was handed to a
    /// live channel; a missing or closed channel is not an error.
    pub fn push(&self, user_id: i64, frame: String) -> bool {
        match self.lookup(user_id) {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// Number of currently connected identities (for debugging/logs).
    pub fn connected_count(&self) -> usize {
        self.read().len()
    }
}
