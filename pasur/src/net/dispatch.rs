//! Routes parsed client requests to the session manager.

use crate::game::{PlayOutcome, UserId};
use crate::session::{ContinueOutcome, SessionManager, SessionResult};

use super::messages::{ClientRequest, Response, ResponsePayload};

/// Run one request on behalf of `user_id` and build its reply.
///
/// Failures never escape; they become `success: false` responses carrying
/// the client-safe error message.
pub async fn handle_request(
    manager: &SessionManager,
    user_id: UserId,
    request: &ClientRequest,
) -> Response {
    match run(manager, user_id, request).await {
        Ok((message, payload)) => Response::ok(request, message, payload),
        Err(e) => {
            log::debug!(
                "Request {} ({}) from user {} failed: {}",
                request.request_id(),
                request.kind(),
                user_id,
                e
            );
            Response::error(request, e.client_message())
        }
    }
}

/// Parse raw text and run it; unparseable text gets a malformed reply.
pub async fn handle_text(manager: &SessionManager, user_id: UserId, text: &str) -> Response {
    match ClientRequest::parse(text) {
        Ok(request) => handle_request(manager, user_id, &request).await,
        Err(e) => {
            log::debug!("Malformed request from user {}: {}", user_id, e);
            Response::malformed("Malformed request")
        }
    }
}

async fn run(
    manager: &SessionManager,
    user_id: UserId,
    request: &ClientRequest,
) -> SessionResult<(&'static str, ResponsePayload)> {
    let session_id = request.session_id();
    match request {
        ClientRequest::PlayCard {
            card_id,
            selected_cards,
            ..
        } => {
            let outcome = manager
                .submit_play(session_id, user_id, *card_id, selected_cards.clone())
                .await?;
            Ok(match outcome {
                PlayOutcome::Accepted(resolution) => {
                    ("Card played", ResponsePayload::Played(resolution))
                }
                PlayOutcome::AwaitingSelection {
                    card,
                    kind,
                    candidates,
                } => (
                    "Choose the cards to collect",
                    ResponsePayload::SelectionRequired {
                        card,
                        selection: kind,
                        candidates,
                    },
                ),
            })
        }
        ClientRequest::SelectCombination {
            card_id,
            selected_cards,
            ..
        } => {
            let resolution = manager
                .submit_selection(session_id, user_id, *card_id, selected_cards.clone())
                .await?;
            Ok(("Card played", ResponsePayload::Played(resolution)))
        }
        ClientRequest::ContinueGame { .. } => {
            let outcome = manager.acknowledge_continuation(session_id, user_id).await?;
            Ok(match outcome {
                ContinueOutcome::Continued { current, redealt } => (
                    "Game continued",
                    ResponsePayload::Continued {
                        current_turn: current,
                        redealt,
                    },
                ),
                ContinueOutcome::GameOver(score) => ("Game over", ResponsePayload::GameOver(score)),
                ContinueOutcome::AlreadyContinued => {
                    ("Game already continued", ResponsePayload::AlreadyContinued)
                }
            })
        }
        ClientRequest::InitialAnimationComplete { .. } => {
            let started = manager.acknowledge_ready(session_id, user_id).await?;
            Ok((
                "Initial animation completed",
                ResponsePayload::Ready { started },
            ))
        }
        ClientRequest::GetPlayerCards { .. } => {
            let cards = manager.request_hand(session_id, user_id).await?;
            Ok(("Cards sent", ResponsePayload::Cards { cards }))
        }
        ClientRequest::GetGamePlayersInfo { .. } => {
            let view = manager.view(session_id, user_id).await?;
            Ok((
                "Players info sent",
                ResponsePayload::Players {
                    players: view.players,
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemorySessionRepository;
    use crate::session::{ChannelNotifier, SessionConfig, SessionServices};
    use std::sync::Arc;
    use uuid::Uuid;

    fn manager() -> SessionManager {
        let (notifier, _rx) = ChannelNotifier::new();
        let notifier = Arc::new(notifier);
        SessionManager::new(
            SessionConfig::default(),
            SessionServices {
                repository: Arc::new(InMemorySessionRepository::new()),
                notifier: notifier.clone(),
                presence: notifier,
            },
        )
    }

    // === Dispatch Tests ===

    #[tokio::test]
    async fn test_get_player_cards() {
        let manager = manager();
        let session_id = Uuid::new_v4();
        manager.create_session(session_id, 1, &[1, 2]).await.unwrap();

        let request = ClientRequest::GetPlayerCards {
            request_id: "r1".to_string(),
            session_id,
        };
        let response = handle_request(&manager, 1, &request).await;
        assert!(response.success);
        assert_eq!(response.request_id, "r1");
        match response.payload {
            Some(ResponsePayload::Cards { cards }) => assert_eq!(cards.len(), 4),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_players_info_requires_participant() {
        let manager = manager();
        let session_id = Uuid::new_v4();
        manager.create_session(session_id, 1, &[1, 2]).await.unwrap();

        let request = ClientRequest::GetGamePlayersInfo {
            request_id: "r2".to_string(),
            session_id,
        };
        let response = handle_request(&manager, 1, &request).await;
        assert!(response.success);
        assert!(matches!(
            response.payload,
            Some(ResponsePayload::Players { ref players }) if players.len() == 2
        ));

        let response = handle_request(&manager, 99, &request).await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_unknown_session_fails_softly() {
        let manager = manager();
        let request = ClientRequest::ContinueGame {
            request_id: "r3".to_string(),
            session_id: Uuid::new_v4(),
        };
        let response = handle_request(&manager, 1, &request).await;
        assert!(!response.success);
        assert_eq!(response.message, "Game not found");
        assert_eq!(response.kind, "continue_game_response");
    }

    #[tokio::test]
    async fn test_malformed_text() {
        let manager = manager();
        let response = handle_text(&manager, 1, "{not json").await;
        assert!(!response.success);
        assert_eq!(response.kind, "error_response");
    }
}
