use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use memeclash_protocol::{ClientToServer, ServerToClient};

mod content;
mod deck;
mod game;
mod registry;
mod view;

use content::Content;
use game::Command;
use registry::Registry;

#[derive(Parser, Debug)]
#[command(name = "memeclash-server", about = "Meme party game server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:9001")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("memeclash_server=info")),
        )
        .init();

    let args = Args::parse();
    let registry = Arc::new(Registry::new(Content::builtin()));
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(registry);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!("listening on ws://{}/ws", args.listen);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<Registry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<Registry>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx_out, mut rx_out) = mpsc::unbounded_channel::<ServerToClient>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx_out.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let my_id = Uuid::new_v4();
    registry.connect(my_id, tx_out);
    tracing::info!("{} connected", my_id);

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientToServer>(&text) {
                Ok(cmd) => route_cmd(&registry, my_id, cmd),
                Err(err) => tracing::debug!("{} sent a malformed frame: {}", my_id, err),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    registry.disconnect(my_id);
    writer.abort();
    tracing::info!("{} disconnected", my_id);
}

fn route_cmd(registry: &Registry, my_id: Uuid, cmd: ClientToServer) {
    match cmd {
        ClientToServer::Register { name } => registry.register(my_id, &name),
        ClientToServer::CreateRoom {
            name,
            password,
            prompt_total,
            prompts,
        } => registry.create_room(my_id, &name, &password, prompt_total, &prompts),
        ClientToServer::RequestRooms => registry.send_lobby_to(my_id),
        ClientToServer::LobbyChat { message } => registry.lobby_chat(my_id, &message),
        ClientToServer::JoinRoom { room_id, password } => {
            registry.join_room(my_id, &room_id, &password)
        }
        ClientToServer::LeaveRoom => registry.leave_room(my_id),
        ClientToServer::RoomChat { message } => registry.room_command(
            my_id,
            Command::Chat {
                actor: my_id,
                body: message,
            },
        ),
        ClientToServer::StartGame => {
            registry.room_command(my_id, Command::Start { actor: my_id })
        }
        ClientToServer::PlayCard { card_id } => registry.room_command(
            my_id,
            Command::PlayCard {
                actor: my_id,
                card_id,
            },
        ),
        ClientToServer::Vote { target_player_id } => registry.room_command(
            my_id,
            Command::Vote {
                actor: my_id,
                target: target_player_id,
            },
        ),
    }
}
