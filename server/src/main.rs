use clap::Parser;
use relay::{serve, Relay, RelayConfig};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let relay = Relay::from_config(&config);
    if let Some(interval) = config.stats_interval() {
        relay.spawn_stats_logger(interval);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        grace_period_secs = config.grace_period_secs,
        "multiplayer relay starting"
    );
    serve(listener, relay).await?;
    Ok(())
}
