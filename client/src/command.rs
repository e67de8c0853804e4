use shared::message_utils::IntoWebSocketMessage;
use shared::ClientEvent;
use tokio_tungstenite::tungstenite::Message as WsMessage;

pub const USAGE: &str =
    "Available commands: /create, /join <code>, /score <score> <leaves>, /die <score> <leaves> [killer], /leave";

/// What the client remembers between commands so room ids can be filled in.
#[derive(Debug, Default)]
pub struct Session {
    pub room_id: Option<String>,
}

// Parse a typed line into a protocol event
pub fn parse_command(input: &str, session: &Session) -> Result<ClientEvent, Box<dyn std::error::Error>> {
    let input = input.trim();
    let Some(stripped) = input.strip_prefix('/') else {
        return Err(USAGE.into());
    };

    let mut parts = stripped.split_whitespace();
    let command = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    let event = match command {
        "create" => ClientEvent::CreateRoom,
        "join" => {
            let room_id = args.first().ok_or("Room code cannot be empty")?;
            ClientEvent::JoinRoom { room_id: room_id.to_string() }
        }
        "score" => {
            let (score, leaves) = parse_progress(&args)?;
            ClientEvent::UpdateScore {
                room_id: session.room_id.clone(),
                player_id: None,
                score,
                leaves,
            }
        }
        "die" => {
            let (score, leaves) = parse_progress(&args)?;
            ClientEvent::PlayerDied {
                room_id: session.room_id.clone(),
                player_id: None,
                score,
                leaves,
                killer: args.get(2).map(|k| k.to_string()),
            }
        }
        "leave" => ClientEvent::LeaveRoom { room_id: session.room_id.clone() },
        _ => return Err(format!("Unknown command. {USAGE}").into()),
    };
    Ok(event)
}

fn parse_progress(args: &[&str]) -> Result<(f64, u32), Box<dyn std::error::Error>> {
    let (Some(score), Some(leaves)) = (args.first(), args.get(1)) else {
        return Err("Expected <score> <leaves>".into());
    };
    let score: f64 = score.parse()?;
    if !score.is_finite() {
        return Err("Score must be a finite number".into());
    }
    Ok((score, leaves.parse()?))
}

pub fn command_to_message(input: &str, session: &Session) -> Result<WsMessage, Box<dyn std::error::Error>> {
    let event = parse_command(input, session)?;
    event.into_ws_message().map_err(Into::into)
}
