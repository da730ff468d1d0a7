//! Two-player session state machine.
//!
//! A [`Session`] owns every card of one game and is the only thing allowed
//! to move them. It is a plain synchronous value: serialising access to it
//! (one mutation at a time, timers included) is the job of the session actor
//! that wraps it.
//!
//! Phases:
//!
//! ```text
//! deal -> AwaitingReady -> TurnActive <-> AwaitingSelection
//!                              |                 |
//!                              v                 v
//!                        AwaitingContinuation <--+
//!                              |
//!                 TurnActive (next player, maybe redealt) | Finished
//! ```
//!
//! Forfeits jump from any live phase straight to `Finished`.

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

use super::entities::{
    Card, CardId, DECK_SIZE, Deck, Player, Rank, SessionId, UserId, first_duplicate,
};
use super::errors::{GameError, GameResult};
use super::scoring::{RoundScore, ScoringRules, score_round};
use super::solver::{self, Resolution, SelectionKind};

/// Cards dealt to each player per round.
pub const HAND_SIZE: usize = 4;
/// Face-up cards placed on the table at the deal.
pub const TABLE_SIZE: usize = 4;
/// Players per session. Fixed.
pub const PLAYER_COUNT: usize = 2;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Dealt, waiting for both clients to report ready
    AwaitingReady,
    /// The current player may play a card
    TurnActive,
    /// An ambiguous manual play waits for the player's choice
    AwaitingSelection,
    /// A play resolved; the turn advances on acknowledgment or fallback
    AwaitingContinuation,
    /// Scored or forfeited. Nothing is accepted anymore.
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::AwaitingReady => "awaiting_ready",
            Self::TurnActive => "turn_active",
            Self::AwaitingSelection => "awaiting_selection",
            Self::AwaitingContinuation => "awaiting_continuation",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// Rule knobs a session is dealt with.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSettings {
    /// Minimum deck size for a redeal and for a sur to count
    pub redeal_threshold: usize,
    /// Expired turns in a row that forfeit the game
    pub max_consecutive_timeouts: u32,
    pub scoring: ScoringRules,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            redeal_threshold: 8,
            max_consecutive_timeouts: 3,
            scoring: ScoringRules::default(),
        }
    }
}

/// Who is behind a play.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayMode {
    /// The player chose the card; ambiguity is handed back to them
    Manual,
    /// The turn timer chose the card; ambiguity is resolved at random
    Automatic,
}

/// An ambiguous manual play that has not touched the hand or table yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingSelection {
    pub player_index: usize,
    pub card_id: CardId,
    pub kind: SelectionKind,
    pub candidates: Vec<Vec<Card>>,
}

/// An applied play.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayResolution {
    pub user_id: UserId,
    pub card: Card,
    /// Table cards taken; empty when the card was placed on the table
    pub captured: Vec<Card>,
    pub sur: bool,
    pub automatic: bool,
}

impl PlayResolution {
    pub fn is_capture(&self) -> bool {
        !self.captured.is_empty()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlayOutcome {
    Accepted(PlayResolution),
    AwaitingSelection {
        card: Card,
        kind: SelectionKind,
        candidates: Vec<Vec<Card>>,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Continuation {
    NextTurn { current: UserId, redealt: bool },
    GameOver(RoundScore),
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Inactivity,
    Disconnected,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Inactivity => "repeated inactivity",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{repr}")
    }
}

/// Unscored end of a session.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Forfeit {
    pub departing: UserId,
    pub winner: UserId,
    pub reason: TerminationReason,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TimeoutOutcome {
    /// The player ran out of chances
    Forfeited(Forfeit),
    /// A random card from the player's hand went through the play path
    AutoPlayed(PlayResolution),
    /// The player had nothing to play and the turn moved on
    Skipped { next: UserId },
}

/// Public per-player data.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub user_id: UserId,
    pub card_count: usize,
    pub collected: Vec<Card>,
    pub surs: u32,
}

/// Session state as one participant may see it: their own hand only.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub room_number: i64,
    pub viewer: UserId,
    pub hand: Vec<Card>,
    pub players: Vec<PlayerSummary>,
    pub table: Vec<Card>,
    pub current_turn: UserId,
    pub deck_count: usize,
    pub last_collector: Option<UserId>,
    pub phase: Phase,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Session {
    pub session_id: SessionId,
    pub room_number: i64,
    players: [Player; PLAYER_COUNT],
    deck: Deck,
    table: Vec<Card>,
    current_player_index: usize,
    last_collector: Option<UserId>,
    phase: Phase,
    settings: GameSettings,
    #[serde(skip)]
    ready: BTreeSet<UserId>,
    #[serde(skip)]
    pending_selection: Option<PendingSelection>,
}

impl Session {
    /// Shuffles a fresh deck and deals it to `roster`.
    ///
    /// The roster must name exactly two distinct users. Drawn jacks never
    /// land on the table: they go back into the deck and the deck is
    /// reshuffled. The deal is checked for duplicate card ids before the
    /// session is handed out.
    pub fn deal<R: Rng + ?Sized>(
        session_id: SessionId,
        room_number: i64,
        roster: &[UserId],
        settings: GameSettings,
        rng: &mut R,
    ) -> GameResult<Self> {
        let &[first, second] = roster else {
            return Err(GameError::IntegrityFailure(format!(
                "a session needs exactly {PLAYER_COUNT} players, got {}",
                roster.len()
            )));
        };
        if first == second {
            return Err(GameError::IntegrityFailure(format!(
                "user {first} cannot play against themselves"
            )));
        }

        let mut deck = Deck::new();
        deck.shuffle(rng);

        let mut players = [Player::new(first), Player::new(second)];
        for player in players.iter_mut() {
            player.hand = deck.deal(HAND_SIZE);
        }

        let mut table = Vec::with_capacity(TABLE_SIZE);
        while table.len() < TABLE_SIZE {
            let Some(card) = deck.draw() else {
                return Err(GameError::IntegrityFailure(
                    "deck ran out while setting the table".to_string(),
                ));
            };
            if card.rank == Rank::Jack {
                deck.put_back(card);
                deck.shuffle(rng);
            } else {
                table.push(card);
            }
        }

        let session = Self {
            session_id,
            room_number,
            players,
            deck,
            table,
            current_player_index: 0,
            last_collector: None,
            phase: Phase::AwaitingReady,
            settings,
            ready: BTreeSet::new(),
            pending_selection: None,
        };
        session.verify_integrity()?;
        Ok(session)
    }

    /// Checks that the 52 cards are all accounted for exactly once.
    pub fn verify_integrity(&self) -> GameResult<()> {
        if let Some(id) = first_duplicate(self.all_cards()) {
            return Err(GameError::IntegrityFailure(format!("duplicate card id {id}")));
        }
        let count = self.all_cards().count();
        if count != DECK_SIZE {
            return Err(GameError::IntegrityFailure(format!(
                "expected {DECK_SIZE} cards, found {count}"
            )));
        }
        Ok(())
    }

    fn all_cards(&self) -> impl Iterator<Item = &Card> {
        self.deck
            .cards()
            .iter()
            .chain(self.table.iter())
            .chain(
                self.players
                    .iter()
                    .flat_map(|p| p.hand.iter().chain(p.collected.iter())),
            )
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn players(&self) -> &[Player; PLAYER_COUNT] {
        &self.players
    }

    pub fn user_ids(&self) -> [UserId; PLAYER_COUNT] {
        [self.players[0].user_id, self.players[1].user_id]
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.players.iter().any(|p| p.user_id == user_id)
    }

    pub fn current_user(&self) -> UserId {
        self.players[self.current_player_index].user_id
    }

    pub fn table(&self) -> &[Card] {
        &self.table
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    pub fn last_collector(&self) -> Option<UserId> {
        self.last_collector
    }

    pub fn pending_selection(&self) -> Option<&PendingSelection> {
        self.pending_selection.as_ref()
    }

    pub fn player(&self, user_id: UserId) -> GameResult<&Player> {
        self.players
            .iter()
            .find(|p| p.user_id == user_id)
            .ok_or(GameError::PlayerNotFound(user_id))
    }

    fn index_of(&self, user_id: UserId) -> GameResult<usize> {
        self.players
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or(GameError::PlayerNotFound(user_id))
    }

    fn ensure_live(&self) -> GameResult<()> {
        if self.is_terminal() {
            Err(GameError::SessionTerminal)
        } else {
            Ok(())
        }
    }

    /// Records that `user_id` finished its opening animation.
    ///
    /// Returns `true` when this acknowledgment started the first turn.
    /// Duplicate and late acknowledgments are ignored.
    pub fn acknowledge_ready(&mut self, user_id: UserId) -> GameResult<bool> {
        self.ensure_live()?;
        self.index_of(user_id)?;
        if self.phase != Phase::AwaitingReady {
            return Ok(false);
        }
        self.ready.insert(user_id);
        if self.players.iter().all(|p| self.ready.contains(&p.user_id)) {
            self.phase = Phase::TurnActive;
            return Ok(true);
        }
        Ok(false)
    }

    /// Starts the first turn without waiting for the remaining acknowledgments.
    pub fn force_start(&mut self) -> bool {
        if self.phase == Phase::AwaitingReady {
            self.phase = Phase::TurnActive;
            true
        } else {
            false
        }
    }

    /// Plays `card_id` for `user_id`.
    ///
    /// A manual play with several possible captures and no matching
    /// `selection` is parked as a [`PendingSelection`] and leaves hand and
    /// table untouched. Every rejected play leaves the session untouched.
    pub fn play_card<R: Rng + ?Sized>(
        &mut self,
        user_id: UserId,
        card_id: CardId,
        selection: Option<&[CardId]>,
        mode: PlayMode,
        rng: &mut R,
    ) -> GameResult<PlayOutcome> {
        self.ensure_live()?;
        let index = self.index_of(user_id)?;
        match self.phase {
            Phase::TurnActive | Phase::AwaitingSelection => {}
            actual => {
                return Err(GameError::WrongPhase {
                    expected: Phase::TurnActive,
                    actual,
                });
            }
        }
        if index != self.current_player_index {
            return Err(GameError::NotYourTurn);
        }
        let card = *self.players[index]
            .hand
            .iter()
            .find(|c| c.id == card_id)
            .ok_or(GameError::CardNotInHand(card_id))?;

        let candidates = solver::find_captures(&self.table, card.rank);
        let captured = if card.rank == Rank::Jack {
            candidates.into_iter().next().unwrap_or_default()
        } else {
            match solver::resolve(candidates, selection)? {
                Resolution::Place => Vec::new(),
                Resolution::Capture(cards) => cards,
                Resolution::Ambiguous(candidates) => match mode {
                    PlayMode::Automatic => {
                        solver::choose_random(&candidates, rng).unwrap_or_default()
                    }
                    PlayMode::Manual => {
                        let kind = solver::selection_kind(card.rank)
                            .unwrap_or(SelectionKind::Combination);
                        self.pending_selection = Some(PendingSelection {
                            player_index: index,
                            card_id,
                            kind,
                            candidates: candidates.clone(),
                        });
                        self.phase = Phase::AwaitingSelection;
                        return Ok(PlayOutcome::AwaitingSelection {
                            card,
                            kind,
                            candidates,
                        });
                    }
                },
            }
        };

        Ok(PlayOutcome::Accepted(
            self.apply_play(index, card, captured, mode),
        ))
    }

    /// Settles a pending ambiguous play with the player's choice.
    pub fn select(
        &mut self,
        user_id: UserId,
        card_id: CardId,
        chosen: &[CardId],
    ) -> GameResult<PlayResolution> {
        self.ensure_live()?;
        let index = self.index_of(user_id)?;
        let pending = match (&self.pending_selection, self.phase) {
            (Some(pending), Phase::AwaitingSelection) => pending,
            (_, actual) => {
                return Err(GameError::WrongPhase {
                    expected: Phase::AwaitingSelection,
                    actual,
                });
            }
        };
        if pending.player_index != index {
            return Err(GameError::NotYourTurn);
        }
        if pending.card_id != card_id {
            return Err(GameError::InvalidSelection);
        }
        let captured = match solver::resolve(pending.candidates.clone(), Some(chosen))? {
            Resolution::Capture(cards) => cards,
            Resolution::Place | Resolution::Ambiguous(_) => {
                return Err(GameError::InvalidSelection);
            }
        };
        let card = *self.players[index]
            .hand
            .iter()
            .find(|c| c.id == card_id)
            .ok_or(GameError::CardNotInHand(card_id))?;

        Ok(self.apply_play(index, card, captured, PlayMode::Manual))
    }

    fn apply_play(
        &mut self,
        index: usize,
        card: Card,
        captured: Vec<Card>,
        mode: PlayMode,
    ) -> PlayResolution {
        let player = &mut self.players[index];
        player.hand.retain(|c| c.id != card.id);

        let mut sur = false;
        if captured.is_empty() {
            self.table.push(card);
        } else {
            self.table
                .retain(|t| !captured.iter().any(|c| c.id == t.id));
            sur = card.rank != Rank::Jack
                && self.table.is_empty()
                && self.deck.len() >= self.settings.redeal_threshold;
            if sur {
                player.surs += 1;
            }
            player.collected.extend(captured.iter().copied());
            player.collected.push(card);
            self.last_collector = Some(player.user_id);
        }

        if mode == PlayMode::Manual {
            player.consecutive_timeouts = 0;
        }

        self.pending_selection = None;
        self.phase = Phase::AwaitingContinuation;

        PlayResolution {
            user_id: player.user_id,
            card,
            captured,
            sur,
            automatic: mode == PlayMode::Automatic,
        }
    }

    /// Moves past a resolved play: next turn, redeal, or game over.
    pub fn continue_turn(&mut self) -> GameResult<Continuation> {
        self.ensure_live()?;
        if self.phase != Phase::AwaitingContinuation {
            return Err(GameError::WrongPhase {
                expected: Phase::AwaitingContinuation,
                actual: self.phase,
            });
        }

        let mut redealt = false;
        if self.players.iter().all(|p| p.hand.is_empty()) {
            if self.deck.len() < self.settings.redeal_threshold {
                return Ok(Continuation::GameOver(self.finish_round()));
            }
            for player in self.players.iter_mut() {
                player.hand = self.deck.deal(HAND_SIZE);
                player.consecutive_timeouts = 0;
            }
            redealt = true;
        }

        self.advance_turn();
        Ok(Continuation::NextTurn {
            current: self.current_user(),
            redealt,
        })
    }

    fn advance_turn(&mut self) {
        self.current_player_index = (self.current_player_index + 1) % PLAYER_COUNT;
        self.pending_selection = None;
        self.phase = Phase::TurnActive;
    }

    fn finish_round(&mut self) -> RoundScore {
        if !self.table.is_empty() {
            let index = self
                .last_collector
                .and_then(|id| self.players.iter().position(|p| p.user_id == id))
                .unwrap_or(self.current_player_index);
            let rest: Vec<Card> = self.table.drain(..).collect();
            self.players[index].collected.extend(rest);
        }
        self.phase = Phase::Finished;
        self.pending_selection = None;
        score_round(&self.players, &self.settings.scoring)
    }

    /// Handles the current player's turn timer running out.
    ///
    /// Only the current player's counter moves. Reaching the limit forfeits
    /// the game, otherwise a random card from their hand is played through
    /// [`Session::play_card`] in automatic mode.
    pub fn register_timeout<R: Rng + ?Sized>(&mut self, rng: &mut R) -> GameResult<TimeoutOutcome> {
        self.ensure_live()?;
        match self.phase {
            Phase::TurnActive | Phase::AwaitingSelection => {}
            actual => {
                return Err(GameError::WrongPhase {
                    expected: Phase::TurnActive,
                    actual,
                });
            }
        }

        let index = self.current_player_index;
        let player = &mut self.players[index];
        player.consecutive_timeouts += 1;
        let user_id = player.user_id;

        if player.consecutive_timeouts >= self.settings.max_consecutive_timeouts {
            return self
                .forfeit(user_id, TerminationReason::Inactivity)
                .map(TimeoutOutcome::Forfeited);
        }

        let Some(card_id) = player.hand.choose(rng).map(|c| c.id) else {
            self.advance_turn();
            return Ok(TimeoutOutcome::Skipped {
                next: self.current_user(),
            });
        };

        match self.play_card(user_id, card_id, None, PlayMode::Automatic, rng)? {
            PlayOutcome::Accepted(resolution) => Ok(TimeoutOutcome::AutoPlayed(resolution)),
            PlayOutcome::AwaitingSelection { .. } => Err(GameError::IntegrityFailure(
                "automatic play asked for a selection".to_string(),
            )),
        }
    }

    /// Ends the session in favour of the other player. No scoring.
    pub fn forfeit(&mut self, departing: UserId, reason: TerminationReason) -> GameResult<Forfeit> {
        self.ensure_live()?;
        let index = self.index_of(departing)?;
        let winner = self.players[(index + 1) % PLAYER_COUNT].user_id;
        self.phase = Phase::Finished;
        self.pending_selection = None;
        Ok(Forfeit {
            departing,
            winner,
            reason,
        })
    }

    pub fn hand(&self, user_id: UserId) -> GameResult<&[Card]> {
        self.player(user_id).map(|p| p.hand.as_slice())
    }

    pub fn players_info(&self) -> Vec<PlayerSummary> {
        self.players
            .iter()
            .map(|p| PlayerSummary {
                user_id: p.user_id,
                card_count: p.hand.len(),
                collected: p.collected.clone(),
                surs: p.surs,
            })
            .collect()
    }

    /// State as seen by `viewer`: the opponent's hand is reduced to a count.
    pub fn view_for(&self, viewer: UserId) -> GameResult<SessionView> {
        let hand = self.hand(viewer)?.to_vec();
        Ok(SessionView {
            session_id: self.session_id,
            room_number: self.room_number,
            viewer,
            hand,
            players: self.players_info(),
            table: self.table.clone(),
            current_turn: self.current_user(),
            deck_count: self.deck.len(),
            last_collector: self.last_collector,
            phase: self.phase,
        })
    }
}
