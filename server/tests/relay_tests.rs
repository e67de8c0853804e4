use std::io;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use relay::{serve, serve_incoming, Relay};
use shared::message_utils::{parse_server_message, IntoWebSocketMessage};
use shared::{ClientEvent, ConnectionId, RoomErrorKind, ServerEvent, Winner};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One connected test player with its relay-assigned id.
struct TestClient {
    id: ConnectionId,
    socket: Socket,
}

impl TestClient {
    async fn connect(url: &str) -> Self {
        let (socket, _) = connect_async(url).await.expect("Failed to connect");
        let mut client = TestClient { id: ConnectionId::nil(), socket };
        match client.recv().await {
            ServerEvent::Connected { player_id } => client.id = player_id,
            other => panic!("expected greeting, got {:?}", other),
        }
        client
    }

    async fn send(&mut self, event: ClientEvent) {
        let msg = event.into_ws_message().unwrap();
        self.socket.send(msg).await.expect("Failed to send");
    }

    async fn recv(&mut self) -> ServerEvent {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), self.socket.next())
                .await
                .expect("Timeout waiting for server event")
                .expect("Socket closed")
                .expect("Socket error");
            if msg.is_text() {
                return parse_server_message(msg).unwrap();
            }
        }
    }

    async fn expect_silence(&mut self) {
        let waited = tokio::time::timeout(Duration::from_millis(150), self.socket.next()).await;
        assert!(waited.is_err(), "unexpected message: {:?}", waited);
    }
}

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let relay = Relay::new(Duration::from_secs(30));
    tokio::spawn(serve(listener, relay));
    format!("ws://{}", addr)
}

/// Host creates, guest joins; returns both with the join traffic consumed.
async fn paired(url: &str) -> (TestClient, TestClient, String) {
    let mut host = TestClient::connect(url).await;
    let mut guest = TestClient::connect(url).await;

    host.send(ClientEvent::CreateRoom).await;
    let code = match host.recv().await {
        ServerEvent::RoomCreated { room_id } => room_id,
        other => panic!("expected roomCreated, got {:?}", other),
    };

    guest.send(ClientEvent::JoinRoom { room_id: code.clone() }).await;
    assert_eq!(guest.recv().await, ServerEvent::RoomJoined { room_id: code.clone() });
    assert_eq!(guest.recv().await, ServerEvent::GameStart { room_id: code.clone() });
    assert_eq!(host.recv().await, ServerEvent::OpponentJoined { player_id: guest.id });
    assert_eq!(host.recv().await, ServerEvent::GameStart { room_id: code.clone() });

    (host, guest, code)
}

fn died(code: &str, score: f64, leaves: u32, killer: Option<&str>) -> ClientEvent {
    ClientEvent::PlayerDied {
        room_id: Some(code.to_string()),
        player_id: None,
        score,
        leaves,
        killer: killer.map(str::to_string),
    }
}

#[tokio::test]
async fn test_full_match() {
    let url = start_relay().await;
    let (mut host, mut guest, code) = paired(&url).await;

    host.send(ClientEvent::UpdateScore {
        room_id: Some(code.clone()),
        player_id: Some(host.id.to_string()),
        score: 150.0,
        leaves: 2,
    })
    .await;
    assert_eq!(guest.recv().await, ServerEvent::OpponentScore { score: 150.0, leaves: 2 });
    host.expect_silence().await;

    guest.send(died(&code, 10.0, 7, Some("eagle"))).await;
    assert_eq!(
        host.recv().await,
        ServerEvent::OpponentDied { score: 10.0, leaves: 7, killer: Some("eagle".into()) }
    );

    host.send(died(&code, 1000.0, 2, None)).await;
    assert_eq!(guest.recv().await, ServerEvent::OpponentDied { score: 1000.0, leaves: 2, killer: None });

    for client in [&mut host, &mut guest] {
        match client.recv().await {
            ServerEvent::GameResult { winner, host_data, guest_data } => {
                // Fewer items loses even with the higher score.
                assert_eq!(winner, Winner::Guest);
                assert_eq!(host_data.score, 1000.0);
                assert_eq!(guest_data.killer.as_deref(), Some("eagle"));
            }
            other => panic!("expected gameResult, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_join_errors() {
    let url = start_relay().await;
    let (_host, _guest, code) = paired(&url).await;
    let mut third = TestClient::connect(&url).await;

    third.send(ClientEvent::JoinRoom { room_id: "000000".into() }).await;
    match third.recv().await {
        ServerEvent::RoomError { reason, .. } => assert_eq!(reason, RoomErrorKind::RoomNotFound),
        other => panic!("expected roomError, got {:?}", other),
    }

    third.send(ClientEvent::JoinRoom { room_id: code }).await;
    match third.recv().await {
        ServerEvent::RoomError { reason, message } => {
            assert_eq!(reason, RoomErrorKind::RoomFull);
            assert_eq!(message, "Room is full");
        }
        other => panic!("expected roomError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_guest_drop_reopens_room() {
    let url = start_relay().await;
    let (mut host, guest, code) = paired(&url).await;

    drop(guest);
    assert_eq!(host.recv().await, ServerEvent::OpponentLeft);

    let mut replacement = TestClient::connect(&url).await;
    replacement.send(ClientEvent::JoinRoom { room_id: code.clone() }).await;
    assert_eq!(replacement.recv().await, ServerEvent::RoomJoined { room_id: code });
    assert_eq!(host.recv().await, ServerEvent::OpponentJoined { player_id: replacement.id });
}

#[tokio::test]
async fn test_host_leave_closes_room() {
    let url = start_relay().await;
    let (mut host, mut guest, code) = paired(&url).await;

    host.send(ClientEvent::LeaveRoom { room_id: Some(code.clone()) }).await;
    assert_eq!(guest.recv().await, ServerEvent::OpponentLeft);

    // The room is gone, so a lagging score update goes nowhere.
    guest.send(ClientEvent::UpdateScore { room_id: Some(code.clone()), player_id: None, score: 1.0, leaves: 1 }).await;
    host.expect_silence().await;

    let mut late = TestClient::connect(&url).await;
    late.send(ClientEvent::JoinRoom { room_id: code }).await;
    assert!(matches!(
        late.recv().await,
        ServerEvent::RoomError { reason: RoomErrorKind::RoomNotFound, .. }
    ));
}

#[tokio::test]
async fn test_malformed_frames() {
    let url = start_relay().await;
    let mut client = TestClient::connect(&url).await;

    client.socket.send(WsMessage::text(r#"{"type":"joinRoom"}"#)).await.unwrap();
    assert!(matches!(client.recv().await, ServerEvent::InvalidMessage { .. }));

    client.socket.send(WsMessage::binary(vec![0u8, 1, 2])).await.unwrap();
    assert!(matches!(client.recv().await, ServerEvent::InvalidMessage { .. }));

    // The connection survives bad input.
    client.send(ClientEvent::CreateRoom).await;
    assert!(matches!(client.recv().await, ServerEvent::RoomCreated { .. }));
}

#[tokio::test]
async fn test_fractional_scores_decide_match() {
    let url = start_relay().await;
    let (mut host, mut guest, code) = paired(&url).await;

    let frame = |leaves: u32| {
        WsMessage::text(format!(
            r#"{{"type":"playerDied","payload":{{"roomId":"{code}","score":123.4,"leaves":{leaves},"killer":null}}}}"#
        ))
    };
    host.socket.send(frame(4)).await.unwrap();
    assert_eq!(guest.recv().await, ServerEvent::OpponentDied { score: 123.4, leaves: 4, killer: None });

    guest.socket.send(frame(1)).await.unwrap();
    assert_eq!(host.recv().await, ServerEvent::OpponentDied { score: 123.4, leaves: 1, killer: None });

    for client in [&mut host, &mut guest] {
        match client.recv().await {
            ServerEvent::GameResult { winner, host_data, guest_data } => {
                assert_eq!(winner, Winner::Host);
                assert_eq!(host_data.score, 123.4);
                assert_eq!(guest_data.score, 123.4);
            }
            other => panic!("expected gameResult, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_accept_error_does_not_stop_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let client = tokio::spawn(async move { TestClient::connect(&url).await });

    let accepted = listener.accept().await.unwrap();
    let incoming = futures::stream::iter(vec![Err(io::Error::other("too many open files")), Ok(accepted)]);
    tokio::spawn(serve_incoming(incoming, Relay::new(Duration::from_secs(30))));

    let client = client.await.unwrap();
    assert!(!client.id.is_nil(), "connection after the failed accept is greeted");
}
