//! Live WebSocket connections and session broadcast groups.
//!
//! The registry is what session actors talk to: it implements
//! [`SessionNotifier`] and [`PresenceNotifier`] by serialising events and
//! queueing them on the matching connection's outbound channel.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use pasur::{
    game::{SessionId, UserId},
    net::ServerMessage,
    session::{PresenceNotifier, SessionEvent, SessionNotifier, UserStatus},
};
use tokio::sync::mpsc;

use crate::metrics;

/// Identifies one socket, so a stale socket cannot unregister its replacement
pub type ConnectionId = u64;

struct Connection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
}

/// Registry of connected users
#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: RwLock<HashMap<UserId, Connection>>,
    groups: RwLock<HashMap<SessionId, HashSet<UserId>>>,
    statuses: RwLock<HashMap<UserId, UserStatus>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a user's outbound channel, replacing any older connection.
    pub fn register(&self, user_id: UserId, outbound: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut connections = self
                .connections
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if connections.insert(user_id, Connection { id, outbound }).is_some() {
                log::info!("User {} reconnected; previous connection replaced", user_id);
            }
            connections.len()
        };

        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        let status = statuses.entry(user_id).or_insert(UserStatus::Online);
        if *status == UserStatus::Offline {
            *status = UserStatus::Online;
        }

        metrics::websocket_connections_active(count);
        metrics::websocket_connections_total();
        id
    }

    /// Detach a connection.
    ///
    /// Returns `false` when `connection_id` is no longer the user's current
    /// connection, in which case nothing changes.
    pub fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let count = {
            let mut connections = self
                .connections
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match connections.get(&user_id) {
                Some(current) if current.id == connection_id => {
                    connections.remove(&user_id);
                }
                _ => return false,
            }
            connections.len()
        };
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, UserStatus::Offline);
        metrics::websocket_connections_active(count);
        true
    }

    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Last known presence; never-seen users are offline
    pub fn status(&self, user_id: UserId) -> UserStatus {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .copied()
            .unwrap_or(UserStatus::Offline)
    }

    /// Members of a session's broadcast group
    pub fn group_members(&self, session_id: SessionId) -> Vec<UserId> {
        let mut members: Vec<UserId> = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// Queue raw text for one user. Returns whether a connection took it.
    pub fn send_text(&self, user_id: UserId, text: String) -> bool {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        match connections.get(&user_id) {
            Some(connection) => connection.outbound.send(text).is_ok(),
            None => false,
        }
    }

    fn send_event(&self, user_id: UserId, event: &SessionEvent) {
        match ServerMessage::Event(event.clone()).to_json() {
            Ok(json) => {
                if !self.send_text(user_id, json) {
                    log::debug!("User {} not connected; dropped {}", user_id, event.kind());
                }
            }
            Err(e) => log::error!("Failed to serialize {} event: {}", event.kind(), e),
        }
    }
}

impl SessionNotifier for ConnectionRegistry {
    fn send_to(&self, user_id: UserId, event: &SessionEvent) {
        self.send_event(user_id, event);
    }

    fn broadcast(&self, session_id: SessionId, event: &SessionEvent) {
        metrics::record_event(event);
        for user_id in self.group_members(session_id) {
            self.send_event(user_id, event);
        }
    }

    fn join_group(&self, session_id: SessionId, user_id: UserId) {
        self.groups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session_id)
            .or_default()
            .insert(user_id);
    }

    fn leave_group(&self, session_id: SessionId, user_id: UserId) {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(members) = groups.get_mut(&session_id) {
            members.remove(&user_id);
            if members.is_empty() {
                groups.remove(&session_id);
            }
        }
    }
}

impl PresenceNotifier for ConnectionRegistry {
    fn set_status(&self, user_id: UserId, status: UserStatus) {
        log::debug!("User {} is now {}", user_id, status);
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, status);
    }
}
