use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Outbound half of a player's websocket, drained by that connection's writer task.
pub type PlayerConnection = mpsc::UnboundedSender<WsMessage>;

pub mod message_utils;
pub mod protocol;

pub use protocol::{ClientEvent, ConnectionId, PlayerState, RoomErrorKind, ServerEvent, Winner};
