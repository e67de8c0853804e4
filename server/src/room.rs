use shared::{ConnectionId, PlayerState, ServerEvent, Winner};
use tokio::task::JoinHandle;

pub mod room_code;
pub mod room_manager;

/// Which seat a connection occupies. The host owns the room; the guest is a visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Host only, waiting for a guest.
    Waiting,
    Active,
    Finished,
}

/// Identifies one specific room instance, even after its code is reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTicket {
    pub code: String,
    pub generation: u64,
}

#[derive(Debug)]
pub struct Room {
    code: String,
    generation: u64,
    host: ConnectionId,
    guest: Option<ConnectionId>,
    host_state: PlayerState,
    guest_state: PlayerState,
    started: bool,
    ended: bool,
    cleanup: Option<JoinHandle<()>>,
}

impl Room {
    pub fn new(code: String, host: ConnectionId, generation: u64) -> Self {
        Self {
            code,
            generation,
            host,
            guest: None,
            host_state: PlayerState::default(),
            guest_state: PlayerState::default(),
            started: false,
            ended: false,
            cleanup: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host(&self) -> ConnectionId {
        self.host
    }

    pub fn guest(&self) -> Option<ConnectionId> {
        self.guest
    }

    pub fn ticket(&self) -> RoomTicket {
        RoomTicket {
            code: self.code.clone(),
            generation: self.generation,
        }
    }

    pub fn phase(&self) -> RoomPhase {
        if self.ended {
            RoomPhase::Finished
        } else if self.started {
            RoomPhase::Active
        } else {
            RoomPhase::Waiting
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn role_of(&self, player: ConnectionId) -> Option<Role> {
        if player == self.host {
            Some(Role::Host)
        } else if self.guest == Some(player) {
            Some(Role::Guest)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Host => self.guest,
            Role::Guest => Some(self.host),
        }
    }

    pub fn occupants(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        std::iter::once(self.host).chain(self.guest)
    }

    pub fn state(&self, role: Role) -> &PlayerState {
        match role {
            Role::Host => &self.host_state,
            Role::Guest => &self.guest_state,
        }
    }

    fn state_mut(&mut self, role: Role) -> &mut PlayerState {
        match role {
            Role::Host => &mut self.host_state,
            Role::Guest => &mut self.guest_state,
        }
    }

    pub fn can_accept_guest(&self) -> bool {
        self.guest.is_none()
    }

    /// Seats the guest and starts a fresh match for both players.
    pub fn seat_guest(&mut self, guest: ConnectionId) {
        self.guest = Some(guest);
        self.host_state = PlayerState::default();
        self.guest_state = PlayerState::default();
        self.started = true;
    }

    /// Empties the guest seat, forgetting everything the guest reported.
    pub fn clear_guest(&mut self) -> Option<ConnectionId> {
        self.guest_state = PlayerState::default();
        self.started = false;
        self.guest.take()
    }

    pub fn record_progress(&mut self, role: Role, score: f64, items_collected: u32) {
        let state = self.state_mut(role);
        state.score = score;
        state.items_collected = items_collected;
    }

    pub fn record_death(&mut self, role: Role, score: f64, items_collected: u32, killer: Option<String>) {
        let state = self.state_mut(role);
        state.score = score;
        state.items_collected = items_collected;
        state.is_dead = true;
        state.killer = killer;
    }

    /// Closes the match once both players are dead. Returns the result event
    /// the first time only.
    pub fn try_finish(&mut self) -> Option<ServerEvent> {
        if self.ended || !(self.host_state.is_dead && self.guest_state.is_dead) {
            return None;
        }
        self.ended = true;

        Some(ServerEvent::GameResult {
            winner: Winner::decide(&self.host_state, &self.guest_state),
            host_data: self.host_state.clone(),
            guest_data: self.guest_state.clone(),
        })
    }

    pub fn set_cleanup(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.cleanup.replace(handle) {
            previous.abort();
        }
    }

    /// Stops a pending cleanup timer, if any.
    pub fn cancel_cleanup(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
        }
    }

    /// Releases the timer handle without aborting it.
    pub(crate) fn detach_cleanup(&mut self) {
        self.cleanup.take();
    }
}
