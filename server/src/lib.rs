//! Two-player room relay.
//!
//! A host creates a room and shares its code; a guest joins with it. The relay
//! forwards each player's score to the other, announces deaths, and once both
//! players are dead declares the one with more collected items the winner.

pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod relay;
pub mod room;

pub use config::RelayConfig;
pub use connection::{handle_connection, serve, serve_incoming};
pub use error::RelayError;
pub use relay::Relay;
