//! JSON message protocol spoken over a player's connection.
//!
//! Every client message names its `type`, a caller-chosen `request_id` and
//! the session it targets. Every request gets exactly one [`Response`]
//! carrying the same `request_id`; session events are pushed separately
//! and carry their own `type`.

use serde::{Deserialize, Serialize};

use crate::game::{
    Card, CardId, PlayResolution, PlayerSummary, RoundScore, SelectionKind, SessionId, UserId,
};
use crate::session::SessionEvent;

/// A message from a client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Play a card, optionally naming the capture up front
    PlayCard {
        request_id: String,
        session_id: SessionId,
        card_id: CardId,
        #[serde(default)]
        selected_cards: Option<Vec<CardId>>,
    },
    /// Answer a combination or pair prompt
    SelectCombination {
        request_id: String,
        session_id: SessionId,
        card_id: CardId,
        selected_cards: Vec<CardId>,
    },
    /// Done animating the last play
    ContinueGame {
        request_id: String,
        session_id: SessionId,
    },
    /// Done animating the deal
    InitialAnimationComplete {
        request_id: String,
        session_id: SessionId,
    },
    GetPlayerCards {
        request_id: String,
        session_id: SessionId,
    },
    GetGamePlayersInfo {
        request_id: String,
        session_id: SessionId,
    },
}

impl ClientRequest {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::PlayCard { request_id, .. }
            | Self::SelectCombination { request_id, .. }
            | Self::ContinueGame { request_id, .. }
            | Self::InitialAnimationComplete { request_id, .. }
            | Self::GetPlayerCards { request_id, .. }
            | Self::GetGamePlayersInfo { request_id, .. } => request_id,
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Self::PlayCard { session_id, .. }
            | Self::SelectCombination { session_id, .. }
            | Self::ContinueGame { session_id, .. }
            | Self::InitialAnimationComplete { session_id, .. }
            | Self::GetPlayerCards { session_id, .. }
            | Self::GetGamePlayersInfo { session_id, .. } => *session_id,
        }
    }

    /// Wire name of the request
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayCard { .. } => "play_card",
            Self::SelectCombination { .. } => "select_combination",
            Self::ContinueGame { .. } => "continue_game",
            Self::InitialAnimationComplete { .. } => "initial_animation_complete",
            Self::GetPlayerCards { .. } => "get_player_cards",
            Self::GetGamePlayersInfo { .. } => "get_game_players_info",
        }
    }
}

/// Data attached to a successful response.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponsePayload {
    Played(PlayResolution),
    SelectionRequired {
        card: Card,
        selection: SelectionKind,
        candidates: Vec<Vec<Card>>,
    },
    Continued {
        current_turn: UserId,
        redealt: bool,
    },
    GameOver(RoundScore),
    AlreadyContinued,
    Ready {
        started: bool,
    },
    Cards {
        cards: Vec<Card>,
    },
    Players {
        players: Vec<PlayerSummary>,
    },
}

/// The single reply to a [`ClientRequest`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Response {
    /// `<request type>_response`
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponsePayload>,
}

impl Response {
    pub fn ok(request: &ClientRequest, message: impl Into<String>, payload: ResponsePayload) -> Self {
        Self {
            kind: format!("{}_response", request.kind()),
            request_id: request.request_id().to_string(),
            success: true,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn error(request: &ClientRequest, message: impl Into<String>) -> Self {
        Self {
            kind: format!("{}_response", request.kind()),
            request_id: request.request_id().to_string(),
            success: false,
            message: message.into(),
            payload: None,
        }
    }

    /// Reply to text that did not parse as any request
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: "error_response".to_string(),
            request_id: String::new(),
            success: false,
            message: message.into(),
            payload: None,
        }
    }
}

/// Anything the server writes to a connection.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Response(Response),
    Event(SessionEvent),
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_play_card() {
        let session_id = Uuid::new_v4();
        let card_id = Uuid::new_v4();
        let text = format!(
            r#"{{"type":"play_card","request_id":"r1","session_id":"{session_id}","card_id":"{card_id}"}}"#
        );
        let request = ClientRequest::parse(&text).unwrap();
        assert_eq!(
            request,
            ClientRequest::PlayCard {
                request_id: "r1".to_string(),
                session_id,
                card_id,
                selected_cards: None,
            }
        );
        assert_eq!(request.kind(), "play_card");
        assert_eq!(request.request_id(), "r1");
        assert_eq!(request.session_id(), session_id);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let text = r#"{"type":"chat","request_id":"r1"}"#;
        assert!(ClientRequest::parse(text).is_err());
    }

    #[test]
    fn test_response_shape() {
        let request = ClientRequest::ContinueGame {
            request_id: "abc".to_string(),
            session_id: Uuid::nil(),
        };
        let response = Response::ok(&request, "Game continued", ResponsePayload::AlreadyContinued);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "continue_game_response");
        assert_eq!(json["request_id"], "abc");
        assert_eq!(json["success"], true);
        assert_eq!(json["payload"]["kind"], "already_continued");

        let error = Response::error(&request, "Game not found");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_server_message_round_trip() {
        let event = SessionEvent::TurnTimerUpdate {
            session_id: Uuid::nil(),
            user_id: 1,
            remaining_secs: 9,
        };
        let text = ServerMessage::Event(event.clone()).to_json().unwrap();
        let back: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ServerMessage::Event(event));

        let response = Response::malformed("bad json");
        let text = ServerMessage::Response(response.clone()).to_json().unwrap();
        let back: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ServerMessage::Response(response));
    }
}
