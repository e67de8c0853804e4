use std::sync::Arc;
use std::time::Duration;

use shared::message_utils::ProtocolError;
use shared::{ClientEvent, ConnectionId, PlayerConnection, ServerEvent};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::messages::handle_incoming_message;
use crate::room::room_manager::RoomManager;
use crate::room::RoomTicket;

/// Handle to the room table, cheap to clone into every connection task.
///
/// Each event takes the write lock for its whole read-modify-write, which
/// keeps room mutations one-at-a-time across all connections.
#[derive(Clone)]
pub struct Relay {
    state: Arc<RwLock<RoomManager>>,
    grace_period: Duration,
}

impl Relay {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(RoomManager::new())),
            grace_period,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.grace_period())
    }

    pub fn state(&self) -> &Arc<RwLock<RoomManager>> {
        &self.state
    }

    /// Registers a new connection and greets it with its id.
    pub async fn connect(&self, sender: PlayerConnection) -> ConnectionId {
        let player_id = Uuid::new_v4();
        self.state.write().await.add_connection(player_id, sender);
        info!(player = %player_id, "player connected");
        player_id
    }

    pub async fn handle_event(&self, player: ConnectionId, event: ClientEvent) {
        let mut manager = self.state.write().await;
        if let Some(ticket) = handle_incoming_message(event, player, &mut manager) {
            let handle = self.schedule_cleanup(ticket.clone());
            manager.attach_cleanup(&ticket, handle);
        }
    }

    pub async fn reject(&self, player: ConnectionId, error: &ProtocolError) {
        debug!(%player, %error, "rejecting frame");
        self.state.read().await.send(
            player,
            &ServerEvent::InvalidMessage {
                message: error.to_string(),
            },
        );
    }

    pub async fn disconnect(&self, player: ConnectionId) {
        self.state.write().await.handle_disconnect(&player);
    }

    fn schedule_cleanup(&self, ticket: RoomTicket) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let grace_period = self.grace_period;
        tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            if state.write().await.expire_room(&ticket) {
                info!(room = %ticket.code, "finished room removed");
            }
        })
    }

    /// Logs room and connection counts every `interval` until aborted.
    pub fn spawn_stats_logger(&self, interval: Duration) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let manager = state.read().await;
                info!(
                    rooms = manager.room_count(),
                    connections = manager.connection_count(),
                    "relay stats"
                );
            }
        })
    }
}
