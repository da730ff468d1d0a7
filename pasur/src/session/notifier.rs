//! Outbound interfaces a session uses to reach its players.
//!
//! The transport owns the connections; a session only knows user ids and
//! its own broadcast group. Both traits are synchronous so the actor never
//! waits on a slow socket.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use super::events::SessionEvent;
use crate::game::{SessionId, UserId};

/// Delivery of session events.
pub trait SessionNotifier: Send + Sync {
    /// Sends to one user's connection, if any.
    fn send_to(&self, user_id: UserId, event: &SessionEvent);

    /// Sends to every member of the session's group.
    fn broadcast(&self, session_id: SessionId, event: &SessionEvent);

    fn join_group(&self, session_id: SessionId, user_id: UserId);

    fn leave_group(&self, session_id: SessionId, user_id: UserId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Online,
    Offline,
    InGame,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Online => write!(f, "online"),
            UserStatus::Offline => write!(f, "offline"),
            UserStatus::InGame => write!(f, "in_game"),
        }
    }
}

/// Presence fan-out.
pub trait PresenceNotifier: Send + Sync {
    fn set_status(&self, user_id: UserId, status: UserStatus);
}

/// Everything a [`ChannelNotifier`] was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Direct {
        user_id: UserId,
        event: SessionEvent,
    },
    Broadcast {
        session_id: SessionId,
        event: SessionEvent,
    },
    Joined {
        session_id: SessionId,
        user_id: UserId,
    },
    Left {
        session_id: SessionId,
        user_id: UserId,
    },
    Status {
        user_id: UserId,
        status: UserStatus,
    },
}

/// Forwards every notification into a channel.
///
/// Handy for bridging a session to another task, and for observing a
/// session from tests.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            log::debug!("Notification receiver dropped");
        }
    }
}

impl SessionNotifier for ChannelNotifier {
    fn send_to(&self, user_id: UserId, event: &SessionEvent) {
        self.forward(Notification::Direct {
            user_id,
            event: event.clone(),
        });
    }

    fn broadcast(&self, session_id: SessionId, event: &SessionEvent) {
        self.forward(Notification::Broadcast {
            session_id,
            event: event.clone(),
        });
    }

    fn join_group(&self, session_id: SessionId, user_id: UserId) {
        self.forward(Notification::Joined {
            session_id,
            user_id,
        });
    }

    fn leave_group(&self, session_id: SessionId, user_id: UserId) {
        self.forward(Notification::Left {
            session_id,
            user_id,
        });
    }
}

impl PresenceNotifier for ChannelNotifier {
    fn set_status(&self, user_id: UserId, status: UserStatus) {
        self.forward(Notification::Status { user_id, status });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_channel_notifier_forwards_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let session_id = Uuid::new_v4();
        notifier.join_group(session_id, 1);
        notifier.set_status(1, UserStatus::InGame);
        notifier.leave_group(session_id, 1);

        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::Joined {
                session_id,
                user_id: 1
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::Status {
                user_id: 1,
                status: UserStatus::InGame
            }
        );
        assert!(matches!(rx.try_recv().unwrap(), Notification::Left { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_harmless() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.set_status(2, UserStatus::Offline);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(UserStatus::InGame.to_string(), "in_game");
        assert_eq!(
            serde_json::to_string(&UserStatus::Online).unwrap(),
            "\"online\""
        );
    }
}
