// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Realtime session registry.
//!
//! Keeps the process-local map of user id to live realtime connection
//! and enforces at-most-one connection per user. All inserts and
//! removals go through this one object; nothing else touches the map.
use dashmap::DashMap;
use metrics::{counter, gauge};
use savour_common::{ConnectionId, ServerToClient, UserId};
use tokio::sync::mpsc;

use crate::metrics as keys;

/// Handle for one live connection: its id plus the channel that feeds
/// frames to the socket.
#[derive(Clone)]
pub struct SessionHandle {
    pub connection_id: ConnectionId,
    pub sender: mpsc::Sender<ServerToClient>,
}

impl SessionHandle {
    pub fn new(sender: mpsc::Sender<ServerToClient>) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            sender,
        }
    }
}

/// Registry of live realtime sessions, one per user at most.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<UserId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for this user. Any previous connection
    /// is told it was evicted and dropped from the map before the new
    /// handle goes in, so there is no window with two live handles.
    pub async fn register(&self, user_id: UserId, handle: SessionHandle) {
        if let Some((_, prev)) = self.sessions.remove(&user_id) {
            // The receiving task closes the socket when it sees this
            let _ = prev
                .sender
                .send(ServerToClient::Evicted {
                    reason: "session replaced by a newer connection".to_string(),
                })
                .await;
            counter!(keys::SESSION_EVICTED).increment(1);
            tracing::info!(user_id, "evicted previous realtime session");
        }

        self.sessions.insert(user_id, handle);
        gauge!(keys::SESSION_ACTIVE).set(self.sessions.len() as f64);
    }

    /// Remove the entry for this user, but only if it still refers to
    /// the disconnecting connection. A late disconnect from an already
    /// replaced handle must not tear down the newer session.
    pub fn unregister(&self, user_id: UserId, connection_id: ConnectionId) {
        self.sessions
            .remove_if(&user_id, |_, handle| handle.connection_id == connection_id);
        gauge!(keys::SESSION_ACTIVE).set(self.sessions.len() as f64);
    }

    /// Current handle for a user, if any.
    pub fn get(&self, user_id: UserId) -> Option<SessionHandle> {
        self.sessions.get(&user_id).map(|h| h.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
