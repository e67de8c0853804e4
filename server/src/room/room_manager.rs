use std::collections::HashMap;

use shared::message_utils::{CommsMessage, PlayerMessage};
use shared::{ConnectionId, PlayerConnection, ServerEvent};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::RelayError;
use crate::room::room_code::{generate_unique_room_code, normalize_room_code};
use crate::room::{Role, Room, RoomPhase, RoomTicket};

/// Every live room plus the connections that may be addressed.
///
/// Callers serialize access (the relay keeps it behind a single lock), so each
/// method runs as one atomic step over the whole table.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<String, Room>,
    player_rooms: HashMap<ConnectionId, String>,
    connections: HashMap<ConnectionId, PlayerConnection>,
    next_generation: u64,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_phase(&self, code: &str) -> Option<RoomPhase> {
        self.rooms.get(code).map(Room::phase)
    }

    pub fn room_of(&self, player: &ConnectionId) -> Option<&str> {
        self.player_rooms.get(player).map(String::as_str)
    }

    pub fn add_connection(&mut self, player: ConnectionId, sender: PlayerConnection) {
        self.connections.insert(player, sender);
        self.send(player, &ServerEvent::Connected { player_id: player });
    }

    pub fn send(&self, to: ConnectionId, event: &ServerEvent) {
        match PlayerMessage::direct(event, to) {
            Ok(message) => message.send(&self.connections),
            Err(e) => error!(error = %e, "failed to encode server event"),
        }
    }

    fn send_to(&self, event: &ServerEvent, to: impl IntoIterator<Item = ConnectionId>) {
        match PlayerMessage::new(event, to) {
            Ok(message) => message.send(&self.connections),
            Err(e) => error!(error = %e, "failed to encode server event"),
        }
    }

    pub fn create_room(&mut self, host: ConnectionId) -> String {
        self.leave_current_room(host);

        let code = generate_unique_room_code(&mut rand::thread_rng(), |c| self.rooms.contains_key(c));
        self.insert_room(host, code.clone());
        code
    }

    pub(crate) fn insert_room(&mut self, host: ConnectionId, code: String) {
        self.next_generation += 1;
        let room = Room::new(code.clone(), host, self.next_generation);
        self.rooms.insert(code.clone(), room);
        self.player_rooms.insert(host, code.clone());

        info!(room = %code, %host, "room created");
        self.send(host, &ServerEvent::RoomCreated { room_id: code });
    }

    pub fn join_room(&mut self, guest: ConnectionId, requested: &str) -> Result<(), RelayError> {
        let code = normalize_room_code(requested);
        {
            let room = self
                .rooms
                .get(&code)
                .filter(|room| !room.is_ended())
                .ok_or_else(|| RelayError::RoomNotFound(code.clone()))?;
            if !room.can_accept_guest() || room.host() == guest {
                return Err(RelayError::RoomFull(code));
            }
        }

        self.leave_current_room(guest);

        let Some(room) = self.rooms.get_mut(&code) else {
            return Err(RelayError::RoomNotFound(code));
        };
        room.seat_guest(guest);
        let host = room.host();
        self.player_rooms.insert(guest, code.clone());

        info!(room = %code, %host, %guest, "guest joined, game starting");
        self.send(guest, &ServerEvent::RoomJoined { room_id: code.clone() });
        self.send(host, &ServerEvent::OpponentJoined { player_id: guest });
        self.send_to(&ServerEvent::GameStart { room_id: code }, [host, guest]);
        Ok(())
    }

    /// Resolves the sender's room and seat. `None` means the event is stale:
    /// the sender holds no room, names a room other than its own, or the match
    /// is already decided.
    fn active_seat(&mut self, player: ConnectionId, claimed_room: Option<&str>) -> Option<(&mut Room, Role)> {
        let code = self.player_rooms.get(&player)?;
        if let Some(claimed) = claimed_room {
            if normalize_room_code(claimed) != *code {
                debug!(%player, claimed, actual = %code, "event names a room the sender does not hold");
                return None;
            }
        }
        let room = self.rooms.get_mut(code)?;
        if room.is_ended() {
            return None;
        }
        let role = room.role_of(player)?;
        Some((room, role))
    }

    pub fn update_score(&mut self, player: ConnectionId, claimed_room: Option<&str>, score: f64, leaves: u32) {
        let Some((room, role)) = self.active_seat(player, claimed_room) else {
            debug!(%player, "dropping score update for stale room");
            return;
        };
        room.record_progress(role, score, leaves);
        let opponent = room.opponent_of(role);

        if let Some(opponent) = opponent {
            self.send(opponent, &ServerEvent::OpponentScore { score, leaves });
        }
    }

    /// Records a death and, if this was the second one, broadcasts the result.
    /// Returns the finished room so the caller can schedule its removal.
    pub fn report_death(
        &mut self,
        player: ConnectionId,
        claimed_room: Option<&str>,
        score: f64,
        leaves: u32,
        killer: Option<String>,
    ) -> Option<RoomTicket> {
        let Some((room, role)) = self.active_seat(player, claimed_room) else {
            debug!(%player, "dropping death report for stale room");
            return None;
        };
        info!(room = %room.code(), %player, ?role, score, leaves, ?killer, "player died");

        room.record_death(role, score, leaves, killer.clone());
        let opponent = room.opponent_of(role);
        let result = room.try_finish();
        let occupants: Vec<ConnectionId> = room.occupants().collect();
        let ticket = room.ticket();

        if let Some(opponent) = opponent {
            self.send(opponent, &ServerEvent::OpponentDied { score, leaves, killer });
        }

        let result = result?;
        if let ServerEvent::GameResult { winner, host_data, guest_data } = &result {
            info!(
                room = %ticket.code,
                ?winner,
                host_leaves = host_data.items_collected,
                guest_leaves = guest_data.items_collected,
                "game ended"
            );
        }
        self.send_to(&result, occupants);
        Some(ticket)
    }

    /// Explicit leave. A `claimed_room` other than the sender's own is ignored.
    pub fn leave_room(&mut self, player: ConnectionId, claimed_room: Option<&str>) {
        if let Some(claimed) = claimed_room {
            if self.room_of(&player) != Some(normalize_room_code(claimed).as_str()) {
                debug!(%player, claimed, "leave for a room the sender does not hold");
                return;
            }
        }
        self.leave_current_room(player);
    }

    pub fn handle_disconnect(&mut self, player: &ConnectionId) {
        self.leave_current_room(*player);
        self.connections.remove(player);
        info!(%player, "player disconnected");
    }

    fn leave_current_room(&mut self, player: ConnectionId) {
        let Some(code) = self.player_rooms.remove(&player) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return;
        };

        match room.role_of(player) {
            Some(Role::Host) => {
                let guest = room.guest();
                self.destroy_room(&code);
                if let Some(guest) = guest {
                    self.send(guest, &ServerEvent::OpponentLeft);
                }
                info!(room = %code, %player, "host left, room closed");
            }
            Some(Role::Guest) => {
                room.clear_guest();
                let host = room.host();
                self.send(host, &ServerEvent::OpponentLeft);
                info!(room = %code, %player, "guest left, room open again");
            }
            None => {}
        }
    }

    fn destroy_room(&mut self, code: &str) {
        if let Some(mut room) = self.rooms.remove(code) {
            room.cancel_cleanup();
            for occupant in room.occupants() {
                if self.player_rooms.get(&occupant).map(String::as_str) == Some(code) {
                    self.player_rooms.remove(&occupant);
                }
            }
        }
    }

    /// Hands a pending cleanup timer to the room it belongs to. If that room is
    /// already gone the timer is aborted.
    pub fn attach_cleanup(&mut self, ticket: &RoomTicket, handle: JoinHandle<()>) {
        match self.rooms.get_mut(&ticket.code) {
            Some(room) if room.ticket() == *ticket => room.set_cleanup(handle),
            _ => handle.abort(),
        }
    }

    /// Removes the room the ticket names, unless the code now belongs to a
    /// newer room. Returns whether anything was removed.
    pub fn expire_room(&mut self, ticket: &RoomTicket) -> bool {
        let Some(room) = self.rooms.get_mut(&ticket.code).filter(|room| room.ticket() == *ticket) else {
            return false;
        };
        room.detach_cleanup();
        self.destroy_room(&ticket.code);
        true
    }
}
