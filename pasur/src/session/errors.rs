//! Session engine error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::game::{GameError, SessionId};

/// Errors returned by [`super::SessionManager`] and [`super::SessionHandle`]
#[derive(Debug, Error)]
pub enum SessionError {
    /// No live session with this id
    #[error("Session {0} not found")]
    NotFound(SessionId),

    /// A live session already uses this id
    #[error("Session {0} already exists")]
    AlreadyExists(SessionId),

    /// The session actor stopped before answering
    #[error("Session is closed")]
    Closed,

    /// The game rejected the request
    #[error(transparent)]
    Game(GameError),

    /// The deal broke a card invariant; the session was not created
    #[error("Integrity failure: {0}")]
    Integrity(String),

    /// The session could not be persisted
    #[error(transparent)]
    Storage(#[from] RepositoryError),

    /// Bad session configuration
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
}

impl From<GameError> for SessionError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::IntegrityFailure(details) => SessionError::Integrity(details),
            other => SessionError::Game(other),
        }
    }
}

impl SessionError {
    /// Get a client-safe error message
    ///
    /// Storage and integrity details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            SessionError::NotFound(_) => "Game not found".to_string(),
            SessionError::AlreadyExists(_) => "Game already exists".to_string(),
            SessionError::Closed => "Game is over".to_string(),
            SessionError::Game(err) => err.client_message(),
            SessionError::Integrity(_) => "Game could not be created".to_string(),
            SessionError::Storage(err) => err.client_message(),
            SessionError::InvalidConfig(_) => "Internal server error".to_string(),
        }
    }

    /// Whether the session is gone, either finished or never existed.
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            SessionError::NotFound(_)
                | SessionError::Closed
                | SessionError::Game(GameError::SessionTerminal)
        )
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_integrity_failure_is_lifted() {
        let err: SessionError = GameError::IntegrityFailure("dup".to_string()).into();
        assert!(matches!(err, SessionError::Integrity(_)));
        assert_eq!(err.client_message(), "Game could not be created");
    }

    #[test]
    fn test_game_errors_pass_through() {
        let err: SessionError = GameError::NotYourTurn.into();
        assert_eq!(err.to_string(), "not your turn");
        assert_eq!(err.client_message(), "not your turn");
    }

    #[test]
    fn test_not_found_hides_id() {
        let id = Uuid::new_v4();
        let err = SessionError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
        assert!(!err.client_message().contains(&id.to_string()));
        assert!(err.is_gone());
        assert!(SessionError::Game(GameError::SessionTerminal).is_gone());
        assert!(!SessionError::Game(GameError::NotYourTurn).is_gone());
    }
}
