//! Session manager for spawning and addressing session actors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::RwLock;

use super::{
    actor::{SessionActor, SessionHandle, SessionServices},
    config::SessionConfig,
    errors::{SessionError, SessionResult},
    messages::ContinueOutcome,
};
use crate::game::{
    Card, CardId, Forfeit, PlayOutcome, PlayResolution, PlayerSummary, Session, SessionId,
    SessionView, UserId,
};

/// Session metadata for discovery
#[derive(Debug, Clone, Serialize)]
pub struct SessionMetadata {
    pub session_id: SessionId,
    pub room_number: i64,
    pub players: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

struct SessionEntry {
    handle: SessionHandle,
    metadata: SessionMetadata,
}

/// Session manager for managing every live game of the process
#[derive(Clone)]
pub struct SessionManager {
    config: SessionConfig,
    services: SessionServices,

    /// Live session handles
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,

    /// Live sessions per user, for disconnect fan-out
    user_sessions: Arc<RwLock<HashMap<UserId, HashSet<SessionId>>>>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, services: SessionServices) -> Self {
        Self {
            config,
            services,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            user_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Deal a new game for `roster`, store it and spawn its actor.
    ///
    /// Fails with [`SessionError::Integrity`] when the roster is not two
    /// distinct users or the deal breaks a card invariant, with
    /// [`SessionError::AlreadyExists`] when the id is live here or already
    /// stored, and with [`SessionError::Storage`] when the dealt session
    /// cannot be written. Nothing is spawned in any of those cases.
    pub async fn create_session(
        &self,
        session_id: SessionId,
        room_number: i64,
        roster: &[UserId],
    ) -> SessionResult<SessionHandle> {
        self.config.validate().map_err(SessionError::InvalidConfig)?;

        let session = Session::deal(
            session_id,
            room_number,
            roster,
            self.config.game_settings(),
            &mut rand::rng(),
        )
        .inspect_err(|e| log::error!("Session {}: deal rejected: {}", session_id, e))?;

        if self.sessions.read().await.contains_key(&session_id) {
            return Err(SessionError::AlreadyExists(session_id));
        }
        let stored = self
            .services
            .repository
            .load(session_id)
            .await
            .inspect_err(|e| log::error!("Session {}: storage lookup failed: {}", session_id, e))?;
        if stored.is_some() {
            log::warn!("Session {}: a stored document already uses this id", session_id);
            return Err(SessionError::AlreadyExists(session_id));
        }
        self.services
            .repository
            .save(&session)
            .await
            .inspect_err(|e| log::error!("Session {}: initial save failed: {}", session_id, e))?;

        let players = session.user_ids().to_vec();
        let (actor, handle) = SessionActor::new(session, self.config, self.services.clone());

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session_id) {
                return Err(SessionError::AlreadyExists(session_id));
            }
            sessions.insert(
                session_id,
                SessionEntry {
                    handle: handle.clone(),
                    metadata: SessionMetadata {
                        session_id,
                        room_number,
                        players: players.clone(),
                        created_at: Utc::now(),
                    },
                },
            );
        }
        {
            let mut user_sessions = self.user_sessions.write().await;
            for user_id in &players {
                user_sessions.entry(*user_id).or_default().insert(session_id);
            }
        }

        let sessions = self.sessions.clone();
        let user_sessions = self.user_sessions.clone();
        tokio::spawn(async move {
            actor.run().await;

            sessions.write().await.remove(&session_id);
            let mut user_sessions = user_sessions.write().await;
            for user_id in &players {
                if let Some(ids) = user_sessions.get_mut(user_id) {
                    ids.remove(&session_id);
                    if ids.is_empty() {
                        user_sessions.remove(user_id);
                    }
                }
            }
            log::debug!("Session {} unregistered", session_id);
        });

        log::info!(
            "Created session {} for room {} with players {:?}",
            session_id,
            room_number,
            roster
        );

        Ok(handle)
    }

    /// Handle of a live session
    pub async fn handle(&self, session_id: SessionId) -> SessionResult<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|entry| entry.handle.clone())
            .ok_or(SessionError::NotFound(session_id))
    }

    pub async fn submit_play(
        &self,
        session_id: SessionId,
        user_id: UserId,
        card_id: CardId,
        selection: Option<Vec<CardId>>,
    ) -> SessionResult<PlayOutcome> {
        self.handle(session_id)
            .await?
            .play_card(user_id, card_id, selection)
            .await
    }

    pub async fn submit_selection(
        &self,
        session_id: SessionId,
        user_id: UserId,
        card_id: CardId,
        chosen: Vec<CardId>,
    ) -> SessionResult<PlayResolution> {
        self.handle(session_id)
            .await?
            .select_combination(user_id, card_id, chosen)
            .await
    }

    pub async fn acknowledge_continuation(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> SessionResult<ContinueOutcome> {
        self.handle(session_id).await?.continue_game(user_id).await
    }

    pub async fn acknowledge_ready(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> SessionResult<bool> {
        self.handle(session_id)
            .await?
            .initial_animation_complete(user_id)
            .await
    }

    pub async fn request_hand(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> SessionResult<Vec<Card>> {
        self.handle(session_id).await?.player_cards(user_id).await
    }

    pub async fn players_info(&self, session_id: SessionId) -> SessionResult<Vec<PlayerSummary>> {
        self.handle(session_id).await?.players_info().await
    }

    pub async fn view(&self, session_id: SessionId, user_id: UserId) -> SessionResult<SessionView> {
        self.handle(session_id).await?.view(user_id).await
    }

    /// Forfeits every live session of a user whose connection dropped.
    pub async fn handle_disconnect(&self, user_id: UserId) -> Vec<Forfeit> {
        let session_ids: Vec<SessionId> = self
            .user_sessions
            .read()
            .await
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let mut forfeits = Vec::with_capacity(session_ids.len());
        for session_id in session_ids {
            let result = match self.handle(session_id).await {
                Ok(handle) => handle.disconnect(user_id).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(forfeit) => forfeits.push(forfeit),
                Err(e) if e.is_gone() => {
                    log::debug!("Session {} already over for user {}", session_id, user_id);
                }
                Err(e) => {
                    log::warn!(
                        "Session {}: disconnect of user {} failed: {}",
                        session_id,
                        user_id,
                        e
                    );
                }
            }
        }
        forfeits
    }

    /// Live sessions of a user
    pub async fn sessions_for(&self, user_id: UserId) -> Vec<SessionId> {
        self.user_sessions
            .read()
            .await
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn list_sessions(&self) -> Vec<SessionMetadata> {
        let mut sessions: Vec<SessionMetadata> = self
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.metadata.clone())
            .collect();
        sessions.sort_by_key(|m| m.created_at);
        sessions
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
