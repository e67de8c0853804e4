use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use shared::message_utils::parse_server_message;
use shared::ServerEvent;
use tokio::io::AsyncBufReadExt;
use tokio_tungstenite::connect_async;
use url::Url;

mod command;

use command::{command_to_message, Session, USAGE};

#[derive(Parser, Debug)]
#[command(name = "duel-client", about = "Terminal client for the duel relay")]
struct Args {
    #[arg(long, default_value = "ws://127.0.0.1:3001")]
    url: Url,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let (ws_stream, _) = match connect_async(args.url.as_str()).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.url, e);
            return;
        }
    };
    println!("WebSocket connected");

    let (mut write, mut read) = ws_stream.split();
    let session = Arc::new(Mutex::new(Session::default()));

    let receive_session = Arc::clone(&session);
    let receive_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(msg) if msg.is_text() => match parse_server_message(msg) {
                    Ok(event) => {
                        track_room(&receive_session, &event);
                        println!("Received: {:?}", event);
                    }
                    Err(e) => eprintln!("Unreadable server event: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error receiving message: {}", e);
                    break;
                }
            }
        }
    });

    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut line = String::new();

    println!("{}", USAGE);
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        line.clear();
        match stdin.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if line.trim().is_empty() {
            continue;
        }

        let outgoing = {
            let session = session.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            command_to_message(&line, &session)
        };
        let msg = match outgoing {
            Ok(msg) => msg,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let leaving = line.trim_start().starts_with("/leave");
        if let Err(e) = write.send(msg).await {
            eprintln!("Error sending message: {}", e);
            break;
        }
        if leaving {
            session.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).room_id = None;
        }
    }

    receive_task.abort();
}

/// Remembers the room this client sits in so later commands can name it.
fn track_room(session: &Mutex<Session>, event: &ServerEvent) {
    if let ServerEvent::RoomCreated { room_id } | ServerEvent::RoomJoined { room_id } = event {
        session.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).room_id = Some(room_id.clone());
    }
}
