//! Game rule error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{CardId, UserId};
use super::state_machine::Phase;

/// Errors raised by the session state machine.
///
/// Every variant except [`GameError::IntegrityFailure`] is reported to the
/// requesting player only and leaves the session untouched.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    /// The user is not one of the two players of this session
    #[error("user {0} is not part of this game")]
    PlayerNotFound(UserId),

    /// Another player holds the turn
    #[error("not your turn")]
    NotYourTurn,

    /// The named card is not in the acting player's hand
    #[error("card {0} is not in your hand")]
    CardNotInHand(CardId),

    /// The supplied selection matches none of the enumerated captures
    #[error("selected cards do not form a valid capture")]
    InvalidSelection,

    /// The session already finished
    #[error("game is over")]
    SessionTerminal,

    /// The operation does not apply to the current phase
    #[error("expected phase {expected}, game is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// Deal-time invariant violated; the session must not be created
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),
}

impl GameError {
    /// Message safe to hand to a client. Integrity details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            GameError::IntegrityFailure(_) => "Game could not be created".to_string(),
            GameError::PlayerNotFound(_) => "You are not in this game".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(GameError::NotYourTurn.to_string(), "not your turn");
        assert_eq!(GameError::SessionTerminal.to_string(), "game is over");
        let err = GameError::WrongPhase {
            expected: Phase::TurnActive,
            actual: Phase::AwaitingContinuation,
        };
        assert_eq!(
            err.to_string(),
            "expected phase turn_active, game is in awaiting_continuation"
        );
    }

    #[test]
    fn test_client_message_hides_integrity_details() {
        let err = GameError::IntegrityFailure("duplicate card id 1234".to_string());
        assert!(!err.client_message().contains("1234"));
        assert_eq!(
            GameError::PlayerNotFound(77).client_message(),
            "You are not in this game"
        );
        assert_eq!(
            GameError::InvalidSelection.client_message(),
            GameError::InvalidSelection.to_string()
        );
    }
}
