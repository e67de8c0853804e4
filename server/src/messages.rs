use shared::{ClientEvent, ConnectionId, ServerEvent};
use tracing::{debug, warn};

use crate::room::room_manager::RoomManager;
use crate::room::RoomTicket;

/// Applies one client event to the room table.
///
/// Returns the ticket of a room whose match just ended; the caller owns
/// scheduling its removal.
pub fn handle_incoming_message(
    event: ClientEvent,
    sender_id: ConnectionId,
    room_manager: &mut RoomManager,
) -> Option<RoomTicket> {
    debug!(player = %sender_id, event = event.name(), "received event");

    match event {
        ClientEvent::CreateRoom => {
            room_manager.create_room(sender_id);
            None
        }
        ClientEvent::JoinRoom { room_id } => {
            if let Err(e) = room_manager.join_room(sender_id, &room_id) {
                warn!(player = %sender_id, room = e.room_code(), error = %e, "join rejected");
                room_manager.send(
                    sender_id,
                    &ServerEvent::RoomError {
                        reason: e.kind(),
                        message: e.to_string(),
                    },
                );
            }
            None
        }
        // The claimed playerId is never trusted; the seat comes from the connection.
        ClientEvent::UpdateScore { room_id, score, leaves, .. } => {
            room_manager.update_score(sender_id, room_id.as_deref(), score, leaves);
            None
        }
        ClientEvent::PlayerDied { room_id, score, leaves, killer, .. } => {
            room_manager.report_death(sender_id, room_id.as_deref(), score, leaves, killer)
        }
        ClientEvent::LeaveRoom { room_id } => {
            room_manager.leave_room(sender_id, room_id.as_deref());
            None
        }
    }
}
