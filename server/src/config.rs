use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

/// Runtime settings for the relay binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "duel-relay", version, about = "Two-player room relay")]
pub struct RelayConfig {
    /// Full address the websocket listener binds to. Takes precedence over `--port`.
    #[arg(long, env = "DUEL_BIND")]
    pub bind: Option<SocketAddr>,

    /// Port to listen on across all interfaces when no bind address is given.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Seconds a finished room is kept before it is discarded.
    #[arg(long, default_value_t = 30)]
    pub grace_period_secs: u64,

    /// Seconds between room/connection count log lines. 0 disables them.
    #[arg(long, default_value_t = 30)]
    pub stats_interval_secs: u64,

    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl RelayConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], self.port)))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: None,
            port: 3001,
            grace_period_secs: 30,
            stats_interval_secs: 30,
            log_level: Level::INFO,
        }
    }
}
