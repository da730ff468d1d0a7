//! WebSocket handler for live Pasur sessions.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws?user_id=<id>` (or with an `x-user-id`
//!    header set by the identity proxy in front of this server)
//! 2. The connection is registered so session events can reach it
//! 3. A send task drains the connection's outbound queue into the socket
//!    while the receive loop answers requests one at a time
//! 4. On close the user forfeits every session they are still in
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws?user_id=42');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.request_id !== undefined) {
//!     handleResponse(data);
//!   } else {
//!     handleSessionEvent(data);
//!   }
//! };
//!
//! ws.send(JSON.stringify({
//!   type: "play_card",
//!   request_id: "1",
//!   session_id: "2f6c...",
//!   card_id: "9a1e..."
//! }));
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use pasur::{
    game::UserId,
    net::{self, ClientRequest, ServerMessage},
};
use serde::Deserialize;
use std::time::Instant;
use tokio::sync::mpsc;

use super::{AppState, rate_limiter::RateLimiter};
use crate::{logging, metrics};

/// Header carrying the caller's identity
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    user_id: Option<UserId>,
}

/// Identity from the header, falling back to the query string
fn resolve_user(headers: &HeaderMap, query: &WsQuery) -> Option<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .or(query.user_id)
}

/// Upgrade an HTTP connection to a player's WebSocket.
///
/// Returns `401 Unauthorized` when no user id is supplied.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let Some(user_id) = resolve_user(&headers, &query) else {
        return (StatusCode::UNAUTHORIZED, "Missing user id").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Drive one established connection until it closes.
async fn handle_socket(socket: WebSocket, user_id: UserId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let connection_id = state.connections.register(user_id, outbound_tx.clone());

    info!("WebSocket connected: user={}", user_id);

    let send_task = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
            metrics::websocket_messages_sent();
        }
    });

    let mut burst_limiter = RateLimiter::burst();
    let mut sustained_limiter = RateLimiter::sustained();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if !burst_limiter.check() || !sustained_limiter.check() {
                    warn!("Rate limit exceeded for user {}. Dropping message.", user_id);
                    reply(
                        &outbound_tx,
                        net::Response::malformed("Rate limit exceeded. Please slow down."),
                    );
                    continue;
                }

                let response = match ClientRequest::parse(&text) {
                    Ok(request) => {
                        let started = Instant::now();
                        let response = net::handle_request(&state.manager, user_id, &request).await;
                        let elapsed = started.elapsed();
                        metrics::request_duration_ms(request.kind(), elapsed.as_secs_f64() * 1000.0);
                        logging::log_performance(
                            request.kind(),
                            elapsed.as_millis() as u64,
                            Some(user_id),
                        );
                        response
                    }
                    Err(e) => {
                        warn!("Failed to parse message from user {}: {}", user_id, e);
                        net::Response::malformed("Invalid message format")
                    }
                };

                if !reply(&outbound_tx, response) {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: user={}", user_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error for user {}: {}", user_id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    if state.connections.unregister(user_id, connection_id) {
        for forfeit in state.manager.handle_disconnect(user_id).await {
            info!(
                "User {} forfeited to user {} on disconnect",
                forfeit.departing, forfeit.winner
            );
        }
    }

    info!("WebSocket disconnected: user={}", user_id);
}

/// Queue a response on this connection; `false` once it is gone.
fn reply(outbound: &mpsc::UnboundedSender<String>, response: net::Response) -> bool {
    match ServerMessage::Response(response).to_json() {
        Ok(json) => outbound.send(json).is_ok(),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolve_user_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("7"));
        let query = WsQuery { user_id: Some(9) };
        assert_eq!(resolve_user(&headers, &query), Some(7));
    }

    #[test]
    fn test_resolve_user_falls_back_to_query() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-number"));
        let query = WsQuery { user_id: Some(9) };
        assert_eq!(resolve_user(&headers, &query), Some(9));

        let query = WsQuery { user_id: None };
        assert_eq!(resolve_user(&HeaderMap::new(), &query), None);
    }
}
