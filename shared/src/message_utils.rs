use std::collections::{HashMap, HashSet};
use serde::de::DeserializeOwned;
use tokio_tungstenite::tungstenite::{Message as WsMessage, Utf8Bytes};

use crate::protocol::{ClientEvent, ConnectionId, ServerEvent};
use crate::PlayerConnection;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed event: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported frame type, expected a JSON text frame")]
    UnsupportedFrame,
}

/// Anything that can be delivered to a set of connected players.
pub trait CommsMessage {
    fn text(&self) -> &Utf8Bytes;
    fn targets(&self) -> &HashSet<ConnectionId>;
    fn send(&self, senders: &HashMap<ConnectionId, PlayerConnection>) {
        let message = WsMessage::Text(self.text().clone());
        for target in self.targets() {
            if let Some(sender) = senders.get(target) {
                // A closed receiver means the player is mid-disconnect.
                let _ = sender.send(message.clone());
            }
        }
    }
}

/// A serialized server event addressed to one or two players.
pub struct PlayerMessage {
    content: Utf8Bytes,
    target_players: HashSet<ConnectionId>,
}

impl PlayerMessage {
    pub fn new(event: &ServerEvent, to: impl IntoIterator<Item = ConnectionId>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            content: Utf8Bytes::from(serde_json::to_string(event)?),
            target_players: to.into_iter().collect(),
        })
    }

    pub fn direct(event: &ServerEvent, to: ConnectionId) -> Result<Self, serde_json::Error> {
        Self::new(event, [to])
    }
}

impl CommsMessage for PlayerMessage {
    fn text(&self) -> &Utf8Bytes {
        &self.content
    }

    fn targets(&self) -> &HashSet<ConnectionId> {
        &self.target_players
    }
}

/// Converts a protocol event into a websocket text frame.
pub trait IntoWebSocketMessage {
    fn into_ws_message(self) -> Result<WsMessage, serde_json::Error>;
}

impl IntoWebSocketMessage for ClientEvent {
    fn into_ws_message(self) -> Result<WsMessage, serde_json::Error> {
        let json = serde_json::to_string(&self)?;
        Ok(WsMessage::Text(Utf8Bytes::from(json)))
    }
}

fn parse_frame<T: DeserializeOwned>(msg: WsMessage) -> Result<T, ProtocolError> {
    match msg {
        WsMessage::Text(content) => Ok(serde_json::from_str(content.as_str())?),
        _ => Err(ProtocolError::UnsupportedFrame),
    }
}

pub fn parse_client_message(msg: WsMessage) -> Result<ClientEvent, ProtocolError> {
    parse_frame(msg)
}

pub fn parse_server_message(msg: WsMessage) -> Result<ServerEvent, ProtocolError> {
    parse_frame(msg)
}
