//! Events exchanged between game clients and the relay.
//!
//! Every frame is a JSON object tagged as `{"type": ..., "payload": ...}`.
//! Event names and payload fields are camelCase so browser clients can keep
//! their existing names.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Identifier the relay assigns to every websocket connection.
pub type ConnectionId = Uuid;

/// One player's session state inside a room.
///
/// On the wire the item count is `leaves` and the death flag is `died`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PlayerState {
    #[serde(deserialize_with = "finite_score")]
    pub score: f64,
    #[serde(rename = "leaves")]
    pub items_collected: u32,
    #[serde(rename = "died")]
    pub is_dead: bool,
    #[serde(default)]
    pub killer: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Host,
    Guest,
    Tie,
}

impl Winner {
    /// Decides the match from collected items alone. Score is tracked and
    /// relayed but never breaks ties.
    pub fn decide(host: &PlayerState, guest: &PlayerState) -> Self {
        use std::cmp::Ordering;

        match host.items_collected.cmp(&guest.items_collected) {
            Ordering::Greater => Winner::Host,
            Ordering::Less => Winner::Guest,
            Ordering::Equal => Winner::Tie,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RoomErrorKind {
    RoomNotFound,
    RoomFull,
}

/// Requests a client may send.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientEvent {
    CreateRoom,
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },
    /// `roomId` and `playerId` are optional: the relay resolves the sender's
    /// room and role from its connection.
    #[serde(rename_all = "camelCase")]
    UpdateScore {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
        #[serde(deserialize_with = "finite_score")]
        score: f64,
        leaves: u32,
    },
    #[serde(rename_all = "camelCase")]
    PlayerDied {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
        #[serde(deserialize_with = "finite_score")]
        score: f64,
        leaves: u32,
        #[serde(default)]
        killer: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    LeaveRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
    },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::CreateRoom => "createRoom",
            ClientEvent::JoinRoom { .. } => "joinRoom",
            ClientEvent::UpdateScore { .. } => "updateScore",
            ClientEvent::PlayerDied { .. } => "playerDied",
            ClientEvent::LeaveRoom { .. } => "leaveRoom",
        }
    }
}

/// Notifications the relay sends.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Connected { player_id: ConnectionId },
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: String },
    #[serde(rename_all = "camelCase")]
    RoomJoined { room_id: String },
    #[serde(rename_all = "camelCase")]
    OpponentJoined { player_id: ConnectionId },
    #[serde(rename_all = "camelCase")]
    GameStart { room_id: String },
    OpponentScore {
        #[serde(deserialize_with = "finite_score")]
        score: f64,
        leaves: u32,
    },
    OpponentDied {
        #[serde(deserialize_with = "finite_score")]
        score: f64,
        leaves: u32,
        killer: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GameResult {
        winner: Winner,
        host_data: PlayerState,
        guest_data: PlayerState,
    },
    OpponentLeft,
    RoomError {
        reason: RoomErrorKind,
        message: String,
    },
    InvalidMessage { message: String },
}

/// Scores accumulate fractionally in the game, but NaN or infinity never
/// describes a real score.
pub fn finite_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let score = f64::deserialize(deserializer)?;
    if score.is_finite() {
        Ok(score)
    } else {
        Err(D::Error::custom("score must be a finite number"))
    }
}
