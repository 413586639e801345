//! Protocol envelope, command, and projection types.
//!
//! Ref: spec §6 "External Interfaces" — protocol envelope, command types
//! (client→server), projection types (server→client).

use serde::{Deserialize, Serialize};

use crate::card::Suit;
use crate::game::{Bidding, Phase, RejectCode, Scores, Seat, Trick, Team};
use crate::lobby::LobbyPhase;

/// `{version:1, type, requestId, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEnvelope {
    pub version: u32,
    #[serde(flatten)]
    pub command: Command,
    pub request_id: String,
}

/// `{version:1, type, ordering?, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEnvelope {
    pub version: u32,
    pub ordering: Option<Ordering>,
    #[serde(flatten)]
    pub projection: Projection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ordering {
    pub sequence: u64,
    pub emitted_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Command {
    #[serde(rename = "lobby.create")]
    LobbyCreate { display_name: String },
    #[serde(rename = "lobby.join")]
    LobbyJoin {
        lobby_id: String,
        display_name: String,
        reconnect_token: Option<String>,
    },
    #[serde(rename = "lobby.update_name")]
    LobbyUpdateName {
        lobby_id: String,
        player_id: String,
        display_name: String,
    },
    #[serde(rename = "lobby.start")]
    LobbyStart {
        lobby_id: String,
        actor_player_id: String,
    },
    #[serde(rename = "game.play_card")]
    GamePlayCard {
        game_id: String,
        actor_seat: Seat,
        card_id: String,
    },
    #[serde(rename = "game.pass")]
    GamePass { game_id: String, actor_seat: Seat },
    #[serde(rename = "game.order_up")]
    GameOrderUp {
        game_id: String,
        actor_seat: Seat,
        alone: Option<bool>,
    },
    #[serde(rename = "game.call_trump")]
    GameCallTrump {
        game_id: String,
        actor_seat: Seat,
        trump: Suit,
        alone: Option<bool>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySeatProjection {
    pub seat: Seat,
    pub team: Team,
    pub player_id: Option<String>,
    pub display_name: Option<String>,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Projection {
    #[serde(rename = "lobby.state")]
    LobbyState {
        lobby_id: String,
        host_player_id: String,
        phase: LobbyPhase,
        seats: [LobbySeatProjection; 4],
    },
    #[serde(rename = "game.state")]
    GameState {
        game_id: String,
        hand_number: u32,
        trick_number: u32,
        dealer: Seat,
        turn: Option<Seat>,
        trump: Option<Suit>,
        phase: Phase,
        maker: Option<Seat>,
        alone: bool,
        partner_sits_out: Option<Seat>,
        bidding: Option<Bidding>,
        trick: Option<Trick>,
        scores: Scores,
    },
    #[serde(rename = "game.private_state")]
    GamePrivateState {
        game_id: String,
        seat: Seat,
        phase: Phase,
        hand_card_ids: Vec<String>,
        legal_actions: Vec<String>,
    },
    #[serde(rename = "action.rejected")]
    ActionRejected {
        request_id: Option<String>,
        code: RejectCode,
        message: String,
    },
    #[serde(rename = "system.notice")]
    SystemNotice { severity: Severity, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_envelope_roundtrips_through_json() {
        let envelope = ClientEnvelope {
            version: 1,
            command: Command::LobbyCreate {
                display_name: "Alice".to_string(),
            },
            request_id: "r1".to_string(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: ClientEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_action_rejected_carries_request_id() {
        let projection = Projection::ActionRejected {
            request_id: Some("r1".to_string()),
            code: RejectCode::InvalidAction,
            message: "Duplicate requestId".to_string(),
        };
        let json = serde_json::to_value(&projection).unwrap();
        assert_eq!(json["type"], "action.rejected");
        assert_eq!(json["code"], "INVALID_ACTION");
    }
}
