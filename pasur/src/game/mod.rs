//! Pasur rules engine.
//!
//! This module holds everything that is pure game logic:
//! - Cards, deck and players
//! - The capture solver (sums to eleven, jack sweeps, court pairs)
//! - End-of-round scoring
//! - The two-player session state machine
//!
//! Nothing here knows about time, tasks or transports.

pub mod entities;
pub mod errors;
pub mod scoring;
pub mod solver;
pub mod state_machine;

pub use entities::{Card, CardId, DECK_SIZE, Deck, Player, Rank, SessionId, Suit, UserId};
pub use errors::{GameError, GameResult};
pub use scoring::{PlayerScore, RoundScore, RoundWinner, ScoringRules, score_round};
pub use solver::{Resolution, SelectionKind, find_captures};
pub use state_machine::{
    Continuation, Forfeit, GameSettings, PendingSelection, Phase, PlayMode, PlayOutcome,
    PlayResolution, PlayerSummary, Session, SessionView, TerminationReason, TimeoutOutcome,
};
