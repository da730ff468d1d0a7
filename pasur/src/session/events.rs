//! Events pushed from a session to its participants.

use serde::{Deserialize, Serialize};

use crate::game::{
    Card, Forfeit, PlayResolution, PlayerSummary, RoundScore, SessionId, SessionView,
    TerminationReason, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The recipient's own hand plus the public table
    PlayerCards {
        session_id: SessionId,
        user_id: UserId,
        cards: Vec<Card>,
        table: Vec<Card>,
    },

    /// Redacted state for one recipient
    GameStateUpdate(SessionView),

    /// Remaining seconds of the current turn
    TurnTimerUpdate {
        session_id: SessionId,
        user_id: UserId,
        remaining_secs: u64,
    },

    /// A play was applied
    PlayedCard {
        session_id: SessionId,
        user_id: UserId,
        card: Card,
        captured: Vec<Card>,
        is_collected: bool,
        sur_event: bool,
        automatic: bool,
    },

    /// Scored end of the round
    GameOver {
        session_id: SessionId,
        room_number: i64,
        players: Vec<PlayerSummary>,
        score: RoundScore,
        /// Always `true`; the final state of the game
        game_over: bool,
    },

    /// A player left the game early
    PlayerDisconnected {
        session_id: SessionId,
        user_id: UserId,
        reason: TerminationReason,
        message: String,
    },

    /// Unscored end after a forfeit
    GameTerminated {
        session_id: SessionId,
        room_number: i64,
        players: Vec<PlayerSummary>,
        winner: UserId,
        reason: TerminationReason,
        message: String,
        /// Always `true`; the final state of the game
        game_over: bool,
    },
}

impl SessionEvent {
    pub fn played(session_id: SessionId, resolution: &PlayResolution) -> Self {
        Self::PlayedCard {
            session_id,
            user_id: resolution.user_id,
            card: resolution.card,
            captured: resolution.captured.clone(),
            is_collected: resolution.is_capture(),
            sur_event: resolution.sur,
            automatic: resolution.automatic,
        }
    }

    pub fn disconnected(session_id: SessionId, forfeit: &Forfeit) -> Self {
        Self::PlayerDisconnected {
            session_id,
            user_id: forfeit.departing,
            reason: forfeit.reason,
            message: format!("Player {} left the game: {}", forfeit.departing, forfeit.reason),
        }
    }

    pub fn terminated(
        session_id: SessionId,
        room_number: i64,
        players: Vec<PlayerSummary>,
        forfeit: &Forfeit,
    ) -> Self {
        Self::GameTerminated {
            session_id,
            room_number,
            players,
            winner: forfeit.winner,
            reason: forfeit.reason,
            message: format!(
                "Game stopped after player {} left. Player {} wins.",
                forfeit.departing, forfeit.winner
            ),
            game_over: true,
        }
    }

    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerCards { .. } => "player_cards",
            Self::GameStateUpdate(_) => "game_state_update",
            Self::TurnTimerUpdate { .. } => "turn_timer_update",
            Self::PlayedCard { .. } => "played_card",
            Self::GameOver { .. } => "game_over",
            Self::PlayerDisconnected { .. } => "player_disconnected",
            Self::GameTerminated { .. } => "game_terminated",
        }
    }
}
