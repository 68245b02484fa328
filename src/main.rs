use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use memeclash_protocol::{
    ClientToServer, LobbyRoom, RoomView, ServerToClient,
};

#[derive(Parser)]
#[command(name = "memeclash")]
#[command(about = "MemeClash - terminal client for the meme card server")]
struct Args {
    /// WebSocket endpoint of the server
    #[arg(long, default_value = "ws://127.0.0.1:9001/ws")]
    url: String,
}

/// Latest snapshots from the server, so numeric commands can be
/// resolved to card and submission ids.
#[derive(Default)]
struct Seen {
    rooms: Vec<LobbyRoom>,
    room: Option<RoomView>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("🎮 MemeClash CLI Client");
    println!("=======================");

    print!("Enter your name: ");
    io::stdout().flush()?;
    let mut player_name = String::new();
    io::stdin().read_line(&mut player_name)?;
    let player_name = player_name.trim().to_string();

    println!("🔗 Connecting to {}...", args.url);
    let (ws_stream, _) = connect_async(&args.url).await?;
    println!("✅ Connected to server!");

    let (mut write, mut read) = ws_stream.split();

    let register = ClientToServer::Register {
        name: player_name.clone(),
    };
    write.send(Message::Text(serde_json::to_string(&register)?)).await?;

    let state = Arc::new(Mutex::new(Seen::default()));

    // Handle incoming messages
    tokio::spawn({
        let state = Arc::clone(&state);
        async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Ok(server_msg) = serde_json::from_str::<ServerToClient>(&text) {
                            let mut seen = state.lock().await;
                            handle_server_message(server_msg, &mut seen);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        println!("🔌 Connection closed by server");
                        break;
                    }
                    Err(e) => {
                        println!("❌ WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    });

    println!("\n📋 Commands available:");
    println!("  name <name>          - Register under a new name");
    println!("  rooms                - List open rooms");
    println!("  create <name>        - Create an open room");
    println!("  lock <pass> <name>   - Create a password-locked room");
    println!("  join <n> [password]  - Join room number n from the list");
    println!("  leave                - Leave the current room");
    println!("  start                - Start the game (host only)");
    println!("  play <n>             - Play card number n from your hand");
    println!("  vote <n>             - Vote for submission number n");
    println!("  say <msg>            - Chat inside the room");
    println!("  lobby <msg>          - Chat in the lobby");
    println!("  quit                 - Exit");
    println!("\nType commands and press Enter:");

    // Handle user input
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();

        if line == "quit" {
            break;
        }

        let cmd = {
            let seen = state.lock().await;
            parse_command(line, &seen)
        };
        if let Some(msg) = cmd {
            let json = serde_json::to_string(&msg)?;
            write.send(Message::Text(json)).await?;
        } else {
            println!("❓ Unknown command: {}", line);
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}

fn handle_server_message(msg: ServerToClient, seen: &mut Seen) {
    match msg {
        ServerToClient::Registered { id, name } => {
            println!("👋 Welcome, {}! Your id: {}", name, id);
        }
        ServerToClient::LobbyState { rooms } => {
            print_lobby(&rooms);
            seen.rooms = rooms;
        }
        ServerToClient::LobbyChat { message } => {
            println!("💬 [lobby] {}: {}", message.from, message.body);
        }
        ServerToClient::RoomJoined { room_id } => {
            println!("🚪 Entered room {}", room_id);
        }
        ServerToClient::RoomError { message } => {
            println!("❌ {}", message);
        }
        ServerToClient::RoomState { room } => {
            print_room(&room);
            seen.room = Some(room);
        }
        ServerToClient::RoomChat { message } => {
            println!("💬 {}: {}", message.from, message.body);
        }
    }
}

fn print_lobby(rooms: &[LobbyRoom]) {
    if rooms.is_empty() {
        println!("🏠 No rooms open yet. Use `create <name>` to start one.");
        return;
    }
    println!("🏠 Open rooms:");
    for (i, room) in rooms.iter().enumerate() {
        let lock = if room.requires_password { " 🔒" } else { "" };
        println!(
            "  {}. {} - {} player(s), {} prompt(s), {}{}",
            i + 1,
            room.name,
            room.player_count,
            room.prompt_total,
            room.status,
            lock
        );
    }
}

fn print_room(view: &RoomView) {
    println!("\n🎲 === {} ({}) ===", view.name, view.status);
    if let Some(prompt) = &view.current_prompt {
        println!(
            "📝 Prompt {}/{}: {}",
            view.current_prompt_index + 1,
            view.prompt_total,
            prompt
        );
    }
    println!("👥 Players ({}):", view.players.len());
    for player in &view.players {
        let host = if player.is_host { " 🎩 HOST" } else { "" };
        let played = if player.has_played { " ✅ played" } else { "" };
        println!("  {} - {} point(s){}{}", player.name, player.score, host, played);
    }
    if !view.submissions.is_empty() {
        println!("🗳️  Submissions:");
        for (i, sub) in view.submissions.iter().enumerate() {
            let mine = if sub.is_mine { " (yours)" } else { "" };
            println!(
                "  {}. {} - {} vote(s), by {}{}",
                i + 1,
                sub.card.label,
                sub.vote_count,
                sub.owner_name,
                mine
            );
        }
    }
    if !view.hand.is_empty() {
        println!("🃏 Your hand:");
        for (i, card) in view.hand.iter().enumerate() {
            println!("  {}. {}", i + 1, card.label);
        }
    }
    println!("====================\n");
}

fn parse_command(input: &str, seen: &Seen) -> Option<ClientToServer> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    match parts[0].to_lowercase().as_str() {
        "name" if parts.len() > 1 => Some(ClientToServer::Register {
            name: parts[1..].join(" "),
        }),
        "rooms" => Some(ClientToServer::RequestRooms),
        "create" if parts.len() > 1 => Some(ClientToServer::CreateRoom {
            name: parts[1..].join(" "),
            password: String::new(),
            prompt_total: 0,
            prompts: String::new(),
        }),
        "lock" if parts.len() > 2 => Some(ClientToServer::CreateRoom {
            name: parts[2..].join(" "),
            password: parts[1].to_string(),
            prompt_total: 0,
            prompts: String::new(),
        }),
        "join" if parts.len() > 1 => {
            let index: usize = parts[1].parse().ok()?;
            let room = seen.rooms.get(index.checked_sub(1)?)?;
            Some(ClientToServer::JoinRoom {
                room_id: room.id.clone(),
                password: parts.get(2).unwrap_or(&"").to_string(),
            })
        }
        "leave" => Some(ClientToServer::LeaveRoom),
        "start" => Some(ClientToServer::StartGame),
        "play" if parts.len() > 1 => {
            let index: usize = parts[1].parse().ok()?;
            let view = seen.room.as_ref()?;
            let card = view.hand.get(index.checked_sub(1)?)?;
            Some(ClientToServer::PlayCard {
                card_id: card.id.clone(),
            })
        }
        "vote" if parts.len() > 1 => {
            let index: usize = parts[1].parse().ok()?;
            let view = seen.room.as_ref()?;
            let sub = view.submissions.get(index.checked_sub(1)?)?;
            Some(ClientToServer::Vote {
                target_player_id: sub.owner_id,
            })
        }
        "say" if parts.len() > 1 => Some(ClientToServer::RoomChat {
            message: parts[1..].join(" "),
        }),
        "lobby" if parts.len() > 1 => Some(ClientToServer::LobbyChat {
            message: parts[1..].join(" "),
        }),
        _ => None,
    }
}
