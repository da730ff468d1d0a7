//! Session actor implementation with async message handling.
//!
//! One actor owns one [`Session`]. Player requests arrive through the inbox,
//! and the turn timer, continuation fallback and ready fallback are branches
//! of the same `select!` loop, so only one of them can touch the session at
//! a time.

use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

use super::{
    config::SessionConfig,
    errors::{SessionError, SessionResult},
    events::SessionEvent,
    messages::{ContinueOutcome, SessionMessage},
    notifier::{PresenceNotifier, SessionNotifier, UserStatus},
    timers::{ContinuationGate, ReadyGate, TimerEvent, TurnTimer, sleep_until_opt},
};
use crate::{
    db::SessionRepository,
    game::{
        Card, CardId, Continuation, Forfeit, GameError, Phase, PlayMode, PlayOutcome,
        PlayResolution, PlayerSummary, RoundScore, Session, SessionId, SessionView,
        TerminationReason, TimeoutOutcome, UserId,
    },
};

/// Inbox capacity of each session actor
pub const INBOX_CAPACITY: usize = 100;

/// Collaborators every session actor talks to
#[derive(Clone)]
pub struct SessionServices {
    pub repository: Arc<dyn SessionRepository>,
    pub notifier: Arc<dyn SessionNotifier>,
    pub presence: Arc<dyn PresenceNotifier>,
}

/// Session actor handle for sending messages
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    session_id: SessionId,
}

impl SessionHandle {
    pub fn new(sender: mpsc::Sender<SessionMessage>, session_id: SessionId) -> Self {
        Self { sender, session_id }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the session
    pub async fn send(&self, message: SessionMessage) -> SessionResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> SessionResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn play_card(
        &self,
        user_id: UserId,
        card_id: CardId,
        selection: Option<Vec<CardId>>,
    ) -> SessionResult<PlayOutcome> {
        self.request(|response| SessionMessage::PlayCard {
            user_id,
            card_id,
            selection,
            response,
        })
        .await?
    }

    pub async fn select_combination(
        &self,
        user_id: UserId,
        card_id: CardId,
        chosen: Vec<CardId>,
    ) -> SessionResult<PlayResolution> {
        self.request(|response| SessionMessage::SelectCombination {
            user_id,
            card_id,
            chosen,
            response,
        })
        .await?
    }

    pub async fn continue_game(&self, user_id: UserId) -> SessionResult<ContinueOutcome> {
        self.request(|response| SessionMessage::ContinueGame { user_id, response })
            .await?
    }

    pub async fn initial_animation_complete(&self, user_id: UserId) -> SessionResult<bool> {
        self.request(|response| SessionMessage::InitialAnimationComplete { user_id, response })
            .await?
    }

    pub async fn player_cards(&self, user_id: UserId) -> SessionResult<Vec<Card>> {
        self.request(|response| SessionMessage::GetPlayerCards { user_id, response })
            .await?
    }

    pub async fn players_info(&self) -> SessionResult<Vec<PlayerSummary>> {
        self.request(|response| SessionMessage::GetPlayersInfo { response })
            .await
    }

    pub async fn view(&self, user_id: UserId) -> SessionResult<SessionView> {
        self.request(|response| SessionMessage::GetView { user_id, response })
            .await?
    }

    pub async fn disconnect(&self, user_id: UserId) -> SessionResult<Forfeit> {
        self.request(|response| SessionMessage::Disconnect { user_id, response })
            .await?
    }
}

/// Session actor managing a single game
pub struct SessionActor {
    id: SessionId,
    config: SessionConfig,
    session: Session,
    inbox: mpsc::Receiver<SessionMessage>,
    services: SessionServices,
    rng: StdRng,
    turn_timer: Option<TurnTimer>,
    continuation: ContinuationGate,
    ready_gate: ReadyGate,
    /// Set between a continuation and the next play
    just_continued: bool,
}

impl SessionActor {
    /// Create a new session actor around a freshly dealt session
    pub fn new(
        session: Session,
        config: SessionConfig,
        services: SessionServices,
    ) -> (Self, SessionHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let id = session.session_id;

        let actor = Self {
            id,
            config,
            session,
            inbox,
            services,
            rng: StdRng::from_os_rng(),
            turn_timer: None,
            continuation: ContinuationGate::new(),
            ready_gate: ReadyGate::new(),
            just_continued: false,
        };

        (actor, SessionHandle::new(sender, id))
    }

    /// Replace the random source used for automatic plays
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Run the session actor event loop until the game ends
    pub async fn run(mut self) {
        log::info!(
            "Session {} (room {}) starting with players {:?}",
            self.id,
            self.session.room_number,
            self.session.user_ids()
        );

        self.start().await;

        while !self.session.is_terminal() {
            let turn_wakeup = self.turn_timer.as_ref().map(TurnTimer::next_wakeup);
            let continuation_deadline = self.continuation.deadline();
            let ready_deadline = self.ready_gate.deadline();

            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => {
                        log::warn!("Session {}: every handle dropped, stopping", self.id);
                        break;
                    }
                },

                _ = sleep_until_opt(turn_wakeup) => self.on_turn_timer().await,

                _ = sleep_until_opt(continuation_deadline) => {
                    if self.continuation.take() {
                        log::debug!("Session {}: continuation fallback fired", self.id);
                        if let Err(e) = self.advance().await {
                            log::error!("Session {}: fallback continuation failed: {}", self.id, e);
                        }
                    }
                }

                _ = sleep_until_opt(ready_deadline) => self.on_ready_fallback().await,
            }
        }

        self.cancel_timers();
        log::info!("Session {} closed", self.id);
    }

    /// The dealt session is already stored by [`super::SessionManager`].
    async fn start(&mut self) {
        for user_id in self.session.user_ids() {
            self.services.notifier.join_group(self.id, user_id);
            self.services.presence.set_status(user_id, UserStatus::InGame);
        }
        self.push_state();

        match self.session.phase() {
            Phase::AwaitingReady => self.ready_gate.arm(self.config.ready_timeout()),
            Phase::TurnActive => self.arm_turn_timer(),
            _ => {}
        }
    }

    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::PlayCard {
                user_id,
                card_id,
                selection,
                response,
            } => {
                let result = self.handle_play(user_id, card_id, selection).await;
                let _ = response.send(result);
            }

            SessionMessage::SelectCombination {
                user_id,
                card_id,
                chosen,
                response,
            } => {
                let result = self.handle_selection(user_id, card_id, chosen).await;
                let _ = response.send(result);
            }

            SessionMessage::ContinueGame { user_id, response } => {
                let result = self.handle_continue(user_id).await;
                let _ = response.send(result);
            }

            SessionMessage::InitialAnimationComplete { user_id, response } => {
                let result = self.handle_ready(user_id).await;
                let _ = response.send(result);
            }

            SessionMessage::GetPlayerCards { user_id, response } => {
                let result = self.session.hand(user_id).map(<[Card]>::to_vec);
                if let Ok(cards) = &result {
                    self.services.notifier.send_to(
                        user_id,
                        &SessionEvent::PlayerCards {
                            session_id: self.id,
                            user_id,
                            cards: cards.clone(),
                            table: self.session.table().to_vec(),
                        },
                    );
                }
                let _ = response.send(result.map_err(SessionError::from));
            }

            SessionMessage::GetPlayersInfo { response } => {
                let _ = response.send(self.session.players_info());
            }

            SessionMessage::GetView { user_id, response } => {
                let _ = response.send(self.session.view_for(user_id).map_err(SessionError::from));
            }

            SessionMessage::Disconnect { user_id, response } => {
                let result = self.handle_disconnect(user_id).await;
                let _ = response.send(result);
            }
        }
    }

    async fn handle_play(
        &mut self,
        user_id: UserId,
        card_id: CardId,
        selection: Option<Vec<CardId>>,
    ) -> SessionResult<PlayOutcome> {
        let outcome = self.session.play_card(
            user_id,
            card_id,
            selection.as_deref(),
            PlayMode::Manual,
            &mut self.rng,
        )?;
        self.just_continued = false;

        match &outcome {
            PlayOutcome::Accepted(resolution) => self.after_play(resolution).await,
            PlayOutcome::AwaitingSelection {
                kind, candidates, ..
            } => {
                log::debug!(
                    "Session {}: user {} must pick one of {} {:?} candidates",
                    self.id,
                    user_id,
                    candidates.len(),
                    kind
                );
            }
        }

        Ok(outcome)
    }

    async fn handle_selection(
        &mut self,
        user_id: UserId,
        card_id: CardId,
        chosen: Vec<CardId>,
    ) -> SessionResult<PlayResolution> {
        let resolution = self.session.select(user_id, card_id, &chosen)?;
        self.after_play(&resolution).await;
        Ok(resolution)
    }

    /// Common tail of every applied play, manual or automatic.
    async fn after_play(&mut self, resolution: &PlayResolution) {
        self.turn_timer = None;
        self.just_continued = false;
        log::debug!(
            "Session {}: user {} played {} capturing {} card(s){}{}",
            self.id,
            resolution.user_id,
            resolution.card,
            resolution.captured.len(),
            if resolution.sur { ", sur" } else { "" },
            if resolution.automatic { " (automatic)" } else { "" }
        );
        self.persist().await;
        self.services
            .notifier
            .broadcast(self.id, &SessionEvent::played(self.id, resolution));
        self.continuation.arm(self.config.continuation_timeout());
    }

    async fn handle_continue(&mut self, user_id: UserId) -> SessionResult<ContinueOutcome> {
        self.session.player(user_id)?;
        if self.continuation.take() {
            return self.advance().await;
        }
        match self.session.phase() {
            // late ack for a continuation another ack or the fallback made
            Phase::TurnActive if self.just_continued => Ok(ContinueOutcome::AlreadyContinued),
            actual => Err(GameError::WrongPhase {
                expected: Phase::AwaitingContinuation,
                actual,
            }
            .into()),
        }
    }

    async fn advance(&mut self) -> SessionResult<ContinueOutcome> {
        match self.session.continue_turn()? {
            Continuation::NextTurn { current, redealt } => {
                if redealt {
                    log::info!(
                        "Session {}: redealt, {} cards left in the deck",
                        self.id,
                        self.session.deck_len()
                    );
                }
                self.persist().await;
                self.push_state();
                self.arm_turn_timer();
                self.just_continued = true;
                Ok(ContinueOutcome::Continued { current, redealt })
            }
            Continuation::GameOver(score) => {
                self.finish(&score).await;
                Ok(ContinueOutcome::GameOver(score))
            }
        }
    }

    async fn handle_ready(&mut self, user_id: UserId) -> SessionResult<bool> {
        let started = self.session.acknowledge_ready(user_id)?;
        if started {
            self.ready_gate.take();
            log::info!("Session {}: every player ready", self.id);
            self.persist().await;
            self.arm_turn_timer();
        }
        Ok(started)
    }

    async fn on_ready_fallback(&mut self) {
        if self.ready_gate.take() && self.session.force_start() {
            log::warn!(
                "Session {}: ready acknowledgments missing, starting anyway",
                self.id
            );
            self.persist().await;
            self.arm_turn_timer();
        }
    }

    fn arm_turn_timer(&mut self) {
        let user_id = self.session.current_user();
        let timer = TurnTimer::arm(
            user_id,
            self.config.turn_timeout(),
            self.config.tick_interval(),
        );
        let remaining_secs = timer.remaining_secs(Instant::now());
        self.turn_timer = Some(timer);
        self.broadcast_tick(user_id, remaining_secs);
    }

    fn broadcast_tick(&self, user_id: UserId, remaining_secs: u64) {
        self.services.notifier.broadcast(
            self.id,
            &SessionEvent::TurnTimerUpdate {
                session_id: self.id,
                user_id,
                remaining_secs,
            },
        );
    }

    async fn on_turn_timer(&mut self) {
        let Some(timer) = self.turn_timer.as_mut() else {
            return;
        };
        match timer.poll(Instant::now()) {
            TimerEvent::Tick { remaining_secs } => {
                let user_id = timer.user_id();
                self.broadcast_tick(user_id, remaining_secs);
            }
            TimerEvent::Expired => {
                let user_id = timer.user_id();
                self.turn_timer = None;
                log::info!("Session {}: turn timeout for user {}", self.id, user_id);
                self.handle_turn_expiry().await;
            }
        }
    }

    async fn handle_turn_expiry(&mut self) {
        match self.session.register_timeout(&mut self.rng) {
            Ok(TimeoutOutcome::Forfeited(forfeit)) => self.terminate(forfeit).await,
            Ok(TimeoutOutcome::AutoPlayed(resolution)) => self.after_play(&resolution).await,
            Ok(TimeoutOutcome::Skipped { next }) => {
                log::warn!(
                    "Session {}: current player had no cards, turn passes to {}",
                    self.id,
                    next
                );
                self.just_continued = false;
                self.persist().await;
                self.push_state();
                self.arm_turn_timer();
            }
            Err(e) => {
                log::warn!("Session {}: turn expiry ignored: {}", self.id, e);
            }
        }
    }

    async fn handle_disconnect(&mut self, user_id: UserId) -> SessionResult<Forfeit> {
        let forfeit = self
            .session
            .forfeit(user_id, TerminationReason::Disconnected)?;
        self.terminate(forfeit).await;
        Ok(forfeit)
    }

    /// Scored end of the game.
    async fn finish(&mut self, score: &RoundScore) {
        self.cancel_timers();
        log::info!("Session {}: game over, winner {:?}", self.id, score.winner);

        self.persist().await;
        self.services.notifier.broadcast(
            self.id,
            &SessionEvent::GameOver {
                session_id: self.id,
                room_number: self.session.room_number,
                players: self.session.players_info(),
                score: score.clone(),
                game_over: true,
            },
        );
        self.remove_document().await;

        for user_id in self.session.user_ids() {
            self.services.presence.set_status(user_id, UserStatus::Online);
        }
        self.leave_groups();
    }

    /// Unscored end after a forfeit.
    async fn terminate(&mut self, forfeit: Forfeit) {
        self.cancel_timers();
        log::info!(
            "Session {}: user {} left ({}), user {} wins",
            self.id,
            forfeit.departing,
            forfeit.reason,
            forfeit.winner
        );

        self.services
            .notifier
            .broadcast(self.id, &SessionEvent::disconnected(self.id, &forfeit));
        self.services.notifier.broadcast(
            self.id,
            &SessionEvent::terminated(
                self.id,
                self.session.room_number,
                self.session.players_info(),
                &forfeit,
            ),
        );

        self.persist().await;
        self.remove_document().await;

        self.services
            .presence
            .set_status(forfeit.departing, UserStatus::Offline);
        self.services
            .presence
            .set_status(forfeit.winner, UserStatus::Online);
        self.leave_groups();
    }

    fn cancel_timers(&mut self) {
        self.turn_timer = None;
        self.continuation.take();
        self.ready_gate.take();
    }

    fn leave_groups(&self) {
        for user_id in self.session.user_ids() {
            self.services.notifier.leave_group(self.id, user_id);
        }
    }

    /// Sends each player their own cards and their redacted view.
    fn push_state(&self) {
        for user_id in self.session.user_ids() {
            let Ok(view) = self.session.view_for(user_id) else {
                continue;
            };
            self.services.notifier.send_to(
                user_id,
                &SessionEvent::PlayerCards {
                    session_id: self.id,
                    user_id,
                    cards: view.hand.clone(),
                    table: view.table.clone(),
                },
            );
            self.services
                .notifier
                .send_to(user_id, &SessionEvent::GameStateUpdate(view));
        }
    }

    /// Saves the whole document. In-game state stays authoritative in memory,
    /// so a failed save is logged and the next mutation writes it again.
    async fn persist(&self) {
        if let Err(e) = self.services.repository.save(&self.session).await {
            log::error!("Session {}: failed to save: {}", self.id, e);
        }
    }

    async fn remove_document(&self) {
        match self.services.repository.delete(self.id).await {
            Ok(true) => log::debug!("Session {}: document deleted", self.id),
            Ok(false) => log::warn!("Session {}: no document to delete", self.id),
            Err(e) => log::error!("Session {}: failed to delete: {}", self.id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemorySessionRepository;
    use crate::game::{GameSettings, SelectionKind};
    use crate::session::notifier::{ChannelNotifier, Notification};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use uuid::Uuid;

    const ALICE: UserId = 1;
    const BOB: UserId = 2;

    fn spawn_session(
        config: SessionConfig,
    ) -> (
        SessionHandle,
        InMemorySessionRepository,
        UnboundedReceiver<Notification>,
        tokio::task::JoinHandle<()>,
    ) {
        let repository = InMemorySessionRepository::new();
        let (notifier, rx) = ChannelNotifier::new();
        let notifier = Arc::new(notifier);
        let services = SessionServices {
            repository: Arc::new(repository.clone()),
            notifier: notifier.clone(),
            presence: notifier,
        };
        let session = Session::deal(
            Uuid::new_v4(),
            3,
            &[ALICE, BOB],
            config.game_settings(),
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        let (actor, handle) = SessionActor::new(session, config, services);
        let task = tokio::spawn(actor.with_rng(StdRng::seed_from_u64(9)).run());
        (handle, repository, rx, task)
    }

    fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    fn count_ticks(notifications: &[Notification]) -> usize {
        notifications
            .iter()
            .filter(|n| {
                matches!(
                    n,
                    Notification::Broadcast {
                        event: SessionEvent::TurnTimerUpdate { .. },
                        ..
                    }
                )
            })
            .count()
    }

    async fn start(handle: &SessionHandle) {
        assert!(!handle.initial_animation_complete(ALICE).await.unwrap());
        assert!(handle.initial_animation_complete(BOB).await.unwrap());
    }

    // === Startup Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_start_pushes_cards_and_presence() {
        let (handle, repository, mut rx, _task) = spawn_session(SessionConfig::default());
        // Any round trip guarantees start() ran
        handle.players_info().await.unwrap();
        let notifications = drain(&mut rx);

        assert!(notifications.contains(&Notification::Status {
            user_id: ALICE,
            status: UserStatus::InGame
        }));
        assert!(notifications.contains(&Notification::Joined {
            session_id: handle.session_id(),
            user_id: BOB
        }));
        let cards_for_bob = notifications.iter().any(|n| {
            matches!(n, Notification::Direct { user_id: BOB, event: SessionEvent::PlayerCards { cards, .. } } if cards.len() == 4)
        });
        assert!(cards_for_bob);
        // No timer before both players are ready
        assert_eq!(count_ticks(&notifications), 0);

        // The dealt document belongs to the manager; the actor saves on start of play
        assert!(!repository.contains(handle.session_id()).await);
        start(&handle).await;
        assert!(repository.contains(handle.session_id()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_fallback_arms_turn_timer() {
        let (handle, _repository, mut rx, _task) = spawn_session(SessionConfig::default());
        handle.initial_animation_complete(ALICE).await.unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;
        let view = handle.view(ALICE).await.unwrap();
        assert_eq!(view.phase, Phase::TurnActive);
        assert!(count_ticks(&drain(&mut rx)) > 0);
    }

    // === Timer Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_turn_timer_ticks_once_per_second() {
        let (handle, _repository, mut rx, _task) = spawn_session(SessionConfig::default());
        start(&handle).await;
        drain(&mut rx);

        tokio::time::sleep(Duration::from_millis(5500)).await;
        let notifications = drain(&mut rx);
        let remaining: Vec<u64> = notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Broadcast {
                    event: SessionEvent::TurnTimerUpdate { remaining_secs, .. },
                    ..
                } => Some(*remaining_secs),
                _ => None,
            })
            .collect();
        // The arming tick (15) was drained with the ready acks
        assert_eq!(remaining, vec![14, 13, 12, 11, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_plays_automatically() {
        let (handle, _repository, mut rx, _task) = spawn_session(SessionConfig::default());
        start(&handle).await;
        drain(&mut rx);

        tokio::time::sleep(Duration::from_millis(15_100)).await;
        let notifications = drain(&mut rx);
        let automatic = notifications.iter().any(|n| {
            matches!(
                n,
                Notification::Broadcast {
                    event: SessionEvent::PlayedCard { user_id: ALICE, automatic: true, .. },
                    ..
                }
            )
        });
        assert!(automatic);
        assert_eq!(handle.player_cards(ALICE).await.unwrap().len(), 3);
        let info = handle.players_info().await.unwrap();
        assert_eq!(info[0].card_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_play_cancels_turn_timer() {
        let (handle, _repository, mut rx, _task) = spawn_session(SessionConfig::default());
        start(&handle).await;

        let card = handle.player_cards(ALICE).await.unwrap()[0];
        let outcome = handle.play_card(ALICE, card.id, None).await.unwrap();
        if let PlayOutcome::AwaitingSelection { candidates, kind, .. } = outcome {
            let chosen = candidates[0].iter().map(|c| c.id).collect();
            assert!(matches!(kind, SelectionKind::Combination | SelectionKind::Pair));
            handle.select_combination(ALICE, card.id, chosen).await.unwrap();
        }
        drain(&mut rx);

        // Inside the continuation window nothing ticks
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count_ticks(&drain(&mut rx)), 0);
        assert_eq!(handle.view(ALICE).await.unwrap().phase, Phase::AwaitingContinuation);
    }

    // === Continuation Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_continuation_ack_then_fallback_is_noop() {
        let (handle, _repository, mut rx, _task) = spawn_session(SessionConfig::default());
        start(&handle).await;
        let card = handle.player_cards(ALICE).await.unwrap()[0];
        handle.play_card(ALICE, card.id, None).await.unwrap();
        // Make sure the play did not stop at a selection prompt
        if handle.view(ALICE).await.unwrap().phase == Phase::AwaitingSelection {
            return;
        }

        let outcome = handle.continue_game(BOB).await.unwrap();
        assert_eq!(
            outcome,
            ContinueOutcome::Continued {
                current: BOB,
                redealt: false
            }
        );
        assert_eq!(
            handle.continue_game(ALICE).await.unwrap(),
            ContinueOutcome::AlreadyContinued
        );
        drain(&mut rx);

        // The fallback deadline passes without advancing a second time
        tokio::time::sleep(Duration::from_millis(3500)).await;
        let view = handle.view(ALICE).await.unwrap();
        assert_eq!(view.current_turn, BOB);
        assert_eq!(view.phase, Phase::TurnActive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuation_fallback_advances() {
        let (handle, _repository, _rx, _task) = spawn_session(SessionConfig::default());
        start(&handle).await;
        let card = handle.player_cards(ALICE).await.unwrap()[0];
        if let PlayOutcome::AwaitingSelection { .. } =
            handle.play_card(ALICE, card.id, None).await.unwrap()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(3100)).await;
        let view = handle.view(BOB).await.unwrap();
        assert_eq!(view.current_turn, BOB);
        assert_eq!(view.phase, Phase::TurnActive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_with_nothing_pending_is_wrong_phase() {
        let (handle, _repository, _rx, _task) = spawn_session(SessionConfig::default());

        let err = handle.continue_game(ALICE).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Game(GameError::WrongPhase {
                expected: Phase::AwaitingContinuation,
                actual: Phase::AwaitingReady,
            })
        ));

        // First turn of the game: no play has been made yet
        start(&handle).await;
        let err = handle.continue_game(BOB).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Game(GameError::WrongPhase {
                actual: Phase::TurnActive,
                ..
            })
        ));
        assert_eq!(handle.view(ALICE).await.unwrap().current_turn, ALICE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_from_stranger_is_rejected() {
        let (handle, _repository, _rx, _task) = spawn_session(SessionConfig::default());
        let err = handle.continue_game(77).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Game(GameError::PlayerNotFound(77))
        ));
    }

    // === Termination Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_three_timeouts_forfeit() {
        let config = SessionConfig {
            continuation_timeout_ms: 100,
            ..SessionConfig::default()
        };
        let (handle, repository, mut rx, task) = spawn_session(config);
        start(&handle).await;

        // Bob plays manually every turn; Alice never does
        loop {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let Ok(view) = handle.view(BOB).await else {
                break;
            };
            if view.phase == Phase::TurnActive && view.current_turn == BOB {
                let card = view.hand[0];
                if let Ok(PlayOutcome::AwaitingSelection { candidates, .. }) =
                    handle.play_card(BOB, card.id, None).await
                {
                    let chosen = candidates[0].iter().map(|c| c.id).collect();
                    let _ = handle.select_combination(BOB, card.id, chosen).await;
                }
            }
        }
        task.await.unwrap();

        let notifications = drain(&mut rx);
        assert!(notifications.iter().any(|n| matches!(
            n,
            Notification::Broadcast {
                event: SessionEvent::GameTerminated {
                    winner: BOB,
                    reason: TerminationReason::Inactivity,
                    ..
                },
                ..
            }
        )));
        assert!(notifications.contains(&Notification::Status {
            user_id: ALICE,
            status: UserStatus::Offline
        }));
        assert!(repository.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_terminates_and_closes() {
        let (handle, repository, mut rx, task) = spawn_session(SessionConfig::default());
        start(&handle).await;

        let forfeit = handle.disconnect(BOB).await.unwrap();
        assert_eq!(forfeit.winner, ALICE);
        assert_eq!(forfeit.reason, TerminationReason::Disconnected);
        task.await.unwrap();

        assert!(handle.is_closed());
        let err = handle.play_card(ALICE, Uuid::new_v4(), None).await.unwrap_err();
        assert!(err.is_gone());
        assert!(repository.is_empty().await);

        let notifications = drain(&mut rx);
        assert!(notifications.contains(&Notification::Left {
            session_id: handle.session_id(),
            user_id: ALICE
        }));
        // Nothing ticks after termination
        let after_termination = notifications
            .iter()
            .skip_while(|n| {
                !matches!(
                    n,
                    Notification::Broadcast {
                        event: SessionEvent::GameTerminated { .. },
                        ..
                    }
                )
            })
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(count_ticks(&after_termination), 0);
    }

    #[test]
    fn test_settings_follow_config() {
        let config = SessionConfig {
            redeal_threshold: 10,
            ..SessionConfig::default()
        };
        assert_eq!(config.game_settings().redeal_threshold, 10);
        assert_ne!(config.game_settings(), GameSettings::default());
    }
}
