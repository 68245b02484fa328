use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// ---- Text Limits ----
/// Server-side caps; clients may enforce tighter ones in their inputs.
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_ROOM_NAME_LEN: usize = 48;
pub const MAX_PASSWORD_LEN: usize = 64;
pub const MAX_CHAT_LEN: usize = 280;
pub const MAX_PROMPT_BLOB_LEN: usize = 2000;

/// Name used when a connection never registered one.
pub const GUEST_NAME: &str = "Guest";

/// Trim surrounding whitespace and cap at `max` characters.
pub fn clean_text(input: &str, max: usize) -> String {
    input.trim().chars().take(max).collect()
}

/// ---- Room Lifecycle ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Voting,
    Finished,
}

impl Default for RoomStatus {
    fn default() -> Self {
        RoomStatus::Waiting
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Waiting => write!(f, "waiting"),
            RoomStatus::Playing => write!(f, "playing"),
            RoomStatus::Voting => write!(f, "voting"),
            RoomStatus::Finished => write!(f, "finished"),
        }
    }
}

/// ---- Cards ----
/// One dealt card instance. The same catalog template may appear several
/// times in a deck; `id` is unique per instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub label: String,
    pub image_url: String,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// ---- Chat ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub from: String,
    pub body: String,
    /// Unix millis.
    pub ts: i64,
}

/// ---- Lobby & Room Views ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyRoom {
    pub id: String,
    pub name: String,
    pub player_count: usize,
    pub status: RoomStatus,
    pub requires_password: bool,
    pub prompt_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: Uuid,
    pub name: String,
    pub score: u32,
    pub is_host: bool,
    pub has_played: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionView {
    pub owner_id: Uuid,
    pub owner_name: String,
    pub card: Card,
    pub vote_count: usize,
    pub is_mine: bool,
}

/// Per-recipient projection of one room. `hand` is always the
/// recipient's own; nobody else's cards are ever serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub status: RoomStatus,
    pub host_id: Uuid,
    /// -1 until the first round has been dealt.
    pub current_prompt_index: i32,
    pub prompt_total: usize,
    pub current_prompt: Option<String>,
    /// Advisory deadlines (unix millis) for client countdowns.
    pub turn_ends_at: Option<i64>,
    pub vote_ends_at: Option<i64>,
    pub deck_remaining: usize,
    pub players: Vec<PlayerView>,
    pub submissions: Vec<SubmissionView>,
    pub hand: Vec<Card>,
    pub chat: Vec<ChatMessage>,
}

/// ---- Wire Messages ----
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientToServer {
    /// Claim a display name for this connection.
    Register { name: String },
    CreateRoom {
        name: String,
        password: String,
        prompt_total: usize,
        /// Optional newline-separated custom prompts; empty uses the
        /// builtin set.
        prompts: String,
    },
    RequestRooms,
    LobbyChat { message: String },
    JoinRoom { room_id: String, password: String },
    LeaveRoom,
    RoomChat { message: String },
    StartGame,
    PlayCard { card_id: String },
    Vote { target_player_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerToClient {
    Registered { id: Uuid, name: String },
    LobbyState { rooms: Vec<LobbyRoom> },
    LobbyChat { message: ChatMessage },
    RoomJoined { room_id: String },
    RoomError { message: String },
    RoomState { room: RoomView },
    RoomChat { message: ChatMessage },
}
