//! Session management API handlers.
//!
//! Matchmaking creates a session here once it has paired two players;
//! everything after that happens over the players' WebSockets.
//!
//! # Examples
//!
//! Create a session:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/sessions \
//!   -H "Content-Type: application/json" \
//!   -d '{"room_number": 12, "players": [101, 202]}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pasur::{
    game::{SessionId, UserId},
    session::{SessionError, SessionMetadata, UserStatus},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub room_number: i64,
    pub players: Vec<UserId>,
    /// Caller-chosen id; generated when absent
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub user_id: UserId,
    pub status: UserStatus,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::Integrity(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::AlreadyExists(_) => StatusCode::CONFLICT,
        SessionError::NotFound(_) | SessionError::Closed => StatusCode::NOT_FOUND,
        SessionError::Game(_) => StatusCode::BAD_REQUEST,
        SessionError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Deal a new session for two players.
///
/// # Response
///
/// - `201 Created` with `{"session_id": "..."}`
/// - `422 Unprocessable Entity` when the roster is not two distinct players
/// - `409 Conflict` when `session_id` is already live
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);

    match state
        .manager
        .create_session(session_id, request.room_number, &request.players)
        .await
    {
        Ok(_) => {
            metrics::session_started();
            logging::log_session_event(
                "session_created",
                session_id,
                None,
                &format!("room {} players {:?}", request.room_number, request.players),
            );
            Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id })))
        }
        Err(e) => {
            log::warn!("Session creation for room {} failed: {}", request.room_number, e);
            Err((
                status_for(&e),
                Json(ErrorResponse {
                    error: e.client_message(),
                }),
            ))
        }
    }
}

/// List live sessions, oldest first.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionMetadata>> {
    Json(state.manager.list_sessions().await)
}

/// Presence of one user.
pub async fn user_status(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        user_id,
        status: state.connections.status(user_id),
        connected: state.connections.is_connected(user_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasur::{db::RepositoryError, game::GameError};
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&SessionError::Integrity("dup".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&SessionError::AlreadyExists(Uuid::nil())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&SessionError::Game(GameError::NotYourTurn)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&SessionError::Storage(RepositoryError::Timeout(
                Duration::from_secs(5)
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
