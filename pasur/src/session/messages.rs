//! Session actor message types.

use tokio::sync::oneshot;

use super::errors::SessionResult;
use crate::game::{
    Card, CardId, Forfeit, PlayOutcome, PlayResolution, PlayerSummary, RoundScore, SessionView,
    UserId,
};

/// Messages that can be sent to a SessionActor
#[derive(Debug)]
pub enum SessionMessage {
    /// Manual play, optionally with the capture already chosen
    PlayCard {
        user_id: UserId,
        card_id: CardId,
        selection: Option<Vec<CardId>>,
        response: oneshot::Sender<SessionResult<PlayOutcome>>,
    },

    /// Choice for a pending ambiguous play
    SelectCombination {
        user_id: UserId,
        card_id: CardId,
        chosen: Vec<CardId>,
        response: oneshot::Sender<SessionResult<PlayResolution>>,
    },

    /// Client finished showing the last play
    ContinueGame {
        user_id: UserId,
        response: oneshot::Sender<SessionResult<ContinueOutcome>>,
    },

    /// Client finished the opening animation
    InitialAnimationComplete {
        user_id: UserId,
        response: oneshot::Sender<SessionResult<bool>>,
    },

    /// Hand snapshot; also re-sends the `player_cards` event
    GetPlayerCards {
        user_id: UserId,
        response: oneshot::Sender<SessionResult<Vec<Card>>>,
    },

    /// Public roster data
    GetPlayersInfo {
        response: oneshot::Sender<Vec<PlayerSummary>>,
    },

    /// Redacted state for one participant
    GetView {
        user_id: UserId,
        response: oneshot::Sender<SessionResult<SessionView>>,
    },

    /// Transport lost the user's connection
    Disconnect {
        user_id: UserId,
        response: oneshot::Sender<SessionResult<Forfeit>>,
    },
}

/// Result of a continuation acknowledgment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// This acknowledgment advanced the turn
    Continued { current: UserId, redealt: bool },
    /// This acknowledgment ended the round
    GameOver(RoundScore),
    /// Nothing was waiting; the fallback or the other player got there first
    AlreadyContinued,
}
