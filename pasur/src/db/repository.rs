//! Session document storage.
//!
//! A session is stored as one JSON document keyed by its id. The actor
//! saves after every mutation and deletes the document once the game ends,
//! so the store only ever holds live games.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::RwLock;

use super::timeouts::{SCHEMA_TIMEOUT, with_default_timeout, with_timeout};
use crate::game::{Session, SessionId};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

impl RepositoryError {
    /// Storage details never reach clients.
    pub fn client_message(&self) -> String {
        "Game storage is unavailable".to_string()
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Durable key-value store for session documents
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Load a session document
    async fn load(&self, session_id: SessionId) -> RepositoryResult<Option<Session>>;

    /// Insert or replace a session document
    async fn save(&self, session: &Session) -> RepositoryResult<()>;

    /// Remove a session document. Returns whether one existed.
    async fn delete(&self, session_id: SessionId) -> RepositoryResult<bool>;
}

/// PostgreSQL implementation of `SessionRepository`
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `game_sessions` table if it does not exist yet
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        with_timeout(
            SCHEMA_TIMEOUT,
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS game_sessions (
                    session_id UUID PRIMARY KEY,
                    room_number BIGINT NOT NULL,
                    document TEXT NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn load(&self, session_id: SessionId) -> RepositoryResult<Option<Session>> {
        let row = with_default_timeout(
            sqlx::query("SELECT document FROM game_sessions WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => {
                let document: String = row.try_get("document")?;
                Ok(Some(serde_json::from_str(&document)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> RepositoryResult<()> {
        let document = serde_json::to_string(session)?;
        with_default_timeout(
            sqlx::query(
                "INSERT INTO game_sessions (session_id, room_number, document, updated_at)
                 VALUES ($1, $2, $3, NOW())
                 ON CONFLICT (session_id)
                 DO UPDATE SET document = EXCLUDED.document, updated_at = NOW()",
            )
            .bind(session.session_id)
            .bind(session.room_number)
            .bind(document)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, session_id: SessionId) -> RepositoryResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM game_sessions WHERE session_id = $1")
                .bind(session_id)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Process-local implementation of `SessionRepository`.
///
/// Documents are kept serialised so a load always returns an independent
/// copy, the same as reading back from a database.
#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    documents: Arc<RwLock<HashMap<SessionId, String>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn contains(&self, session_id: SessionId) -> bool {
        self.documents.read().await.contains_key(&session_id)
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, session_id: SessionId) -> RepositoryResult<Option<Session>> {
        let documents = self.documents.read().await;
        match documents.get(&session_id) {
            Some(document) => Ok(Some(serde_json::from_str(document)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> RepositoryResult<()> {
        let document = serde_json::to_string(session)?;
        self.documents
            .write()
            .await
            .insert(session.session_id, document);
        Ok(())
    }

    async fn delete(&self, session_id: SessionId) -> RepositoryResult<bool> {
        Ok(self.documents.write().await.remove(&session_id).is_some())
    }
}
