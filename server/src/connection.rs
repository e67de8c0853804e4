use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use shared::message_utils::parse_client_message;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::relay::Relay;

/// Pause after a failed accept before polling the listener again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts websocket clients on `listener` for as long as the process runs.
pub async fn serve(listener: TcpListener, relay: Relay) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, "relay listening");

    let incoming = futures::stream::unfold(listener, |listener| async move {
        let accepted = listener.accept().await;
        Some((accepted, listener))
    });
    serve_incoming(incoming, relay).await;
    Ok(())
}

/// Runs the accept loop over already-accepted sockets. A failed accept is
/// logged and retried after [`ACCEPT_BACKOFF`].
pub async fn serve_incoming<I>(incoming: I, relay: Relay)
where
    I: Stream<Item = io::Result<(TcpStream, SocketAddr)>>,
{
    let mut incoming = std::pin::pin!(incoming);

    while let Some(accepted) = incoming.next().await {
        let (stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let relay = relay.clone();
        tokio::spawn(async move {
            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws_stream) => handle_connection(ws_stream, relay).await,
                Err(e) => warn!(%addr, error = %e, "websocket handshake failed"),
            }
        });
    }
}

/// Drives one client until its socket closes, then runs the disconnect path.
pub async fn handle_connection<S>(ws_stream: WebSocketStream<S>, relay: Relay)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (message_tx, mut message_rx) = mpsc::unbounded_channel();
    let player_id = relay.connect(message_tx).await;

    // Room traffic addressed to this player is written out here
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = message_rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(WsMessage::Close(_)) => break,
            Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => continue,
            Ok(msg) => match parse_client_message(msg) {
                Ok(event) => relay.handle_event(player_id, event).await,
                Err(e) => relay.reject(player_id, &e).await,
            },
            Err(e) => {
                debug!(player = %player_id, error = %e, "websocket read failed");
                break;
            }
        }
    }

    relay.disconnect(player_id).await;
    forward_task.abort();
}
