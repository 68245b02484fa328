use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use memeclash_protocol::{
    clean_text, ChatMessage, LobbyRoom, ServerToClient, GUEST_NAME, MAX_CHAT_LEN, MAX_NAME_LEN,
    MAX_PASSWORD_LEN, MAX_PROMPT_BLOB_LEN, MAX_ROOM_NAME_LEN,
};

use crate::content::Content;
use crate::game::{self, Command, Event, Player, Room, DEFAULT_PROMPT_TOTAL};
use crate::view;

/// Per-connection state. `name` stays empty until the connection
/// registers one; `room_id` tracks the single room membership.
#[derive(Debug)]
pub struct Session {
    pub name: String,
    pub room_id: Option<String>,
    pub tx: UnboundedSender<ServerToClient>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Room not found")]
    NotFound,
    #[error("Wrong password")]
    BadPassword,
}

/// Process-wide service owning all rooms, sessions, and the lobby chat
/// log. Constructed once in `main` and shared behind an `Arc`.
///
/// Lock order: `sessions` is never held while taking `rooms` or a room;
/// `rooms` may be held while locking one room, never two at once.
pub struct Registry {
    rooms: Mutex<HashMap<String, Arc<Mutex<Room>>>>,
    sessions: Mutex<HashMap<Uuid, Session>>,
    lobby_log: Mutex<Vec<ChatMessage>>,
    content: Arc<Content>,
}

impl Registry {
    pub fn new(content: Content) -> Self {
        Registry {
            rooms: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            lobby_log: Mutex::new(Vec::new()),
            content: Arc::new(content),
        }
    }

    /// Track a freshly opened connection.
    pub fn connect(&self, conn: Uuid, tx: UnboundedSender<ServerToClient>) {
        let session = Session {
            name: String::new(),
            room_id: None,
            tx,
        };
        self.sessions.lock().insert(conn, session);
    }

    /// A closed connection leaves its room like any other departure.
    pub fn disconnect(&self, conn: Uuid) {
        self.leave_room(conn);
        self.sessions.lock().remove(&conn);
    }

    /// Claim a display name. First registration also replays recent
    /// lobby chat so late arrivals see the conversation.
    pub fn register(&self, conn: Uuid, name: &str) {
        let cleaned = clean_text(name, MAX_NAME_LEN);
        let name = if cleaned.is_empty() {
            GUEST_NAME.to_string()
        } else {
            cleaned
        };
        let backlog: Vec<ChatMessage> = self.lobby_log.lock().clone();
        {
            let mut sessions = self.sessions.lock();
            let Some(session) = sessions.get_mut(&conn) else {
                return;
            };
            let first_time = session.name.is_empty();
            session.name = name.clone();
            let _ = session.tx.send(ServerToClient::Registered {
                id: conn,
                name: name.clone(),
            });
            if first_time {
                for message in backlog {
                    let _ = session.tx.send(ServerToClient::LobbyChat { message });
                }
            }
        }
        tracing::info!("{} registered as '{}'", conn, name);
        self.broadcast_lobby();
    }

    /// Create a room and seat the creator as host. Requires a
    /// registered name; leaves any current room first.
    pub fn create_room(
        &self,
        conn: Uuid,
        name: &str,
        password: &str,
        prompt_total: usize,
        prompts_blob: &str,
    ) {
        let (host_name, tx) = {
            let sessions = self.sessions.lock();
            match sessions.get(&conn) {
                Some(s) if !s.name.is_empty() => (s.name.clone(), s.tx.clone()),
                _ => return,
            }
        };
        self.leave_room(conn);

        let requested = if prompt_total == 0 {
            DEFAULT_PROMPT_TOTAL
        } else {
            prompt_total
        };
        let custom = normalize_prompts(prompts_blob);
        let prompts: Vec<String> = if custom.is_empty() {
            self.content.prompts.iter().take(requested).cloned().collect()
        } else {
            custom.into_iter().take(requested).collect()
        };

        let room_id = game::short_id("room");
        let room_name = {
            let cleaned = clean_text(name, MAX_ROOM_NAME_LEN);
            if cleaned.is_empty() {
                "New room".to_string()
            } else {
                cleaned
            }
        };
        let password = clean_text(password, MAX_PASSWORD_LEN);
        let mut room = Room::new(
            room_id.clone(),
            room_name,
            password,
            prompts,
            Arc::clone(&self.content),
        );
        room.add_player(Player::new(conn, host_name, tx));
        let room = Arc::new(Mutex::new(room));
        self.rooms.lock().insert(room_id.clone(), Arc::clone(&room));

        if let Some(session) = self.sessions.lock().get_mut(&conn) {
            session.room_id = Some(room_id.clone());
        }
        tracing::info!("{} created room {}", conn, room_id);
        self.send_to_conn(
            conn,
            ServerToClient::RoomJoined {
                room_id: room_id.clone(),
            },
        );
        self.broadcast_room(&room.lock());
        self.broadcast_lobby();
    }

    pub fn join_room(&self, conn: Uuid, room_id: &str, password: &str) {
        if let Err(err) = self.try_join(conn, room_id, password) {
            tracing::debug!("{} rejected from {}: {}", conn, room_id, err);
            self.send_to_conn(
                conn,
                ServerToClient::RoomError {
                    message: err.to_string(),
                },
            );
        }
    }

    fn try_join(&self, conn: Uuid, room_id: &str, password: &str) -> Result<(), JoinError> {
        let (name, tx) = {
            let sessions = self.sessions.lock();
            match sessions.get(&conn) {
                Some(s) => (s.name.clone(), s.tx.clone()),
                None => return Ok(()),
            }
        };
        // validate before the implicit leave so a rejected join never
        // unseats the caller
        {
            let rooms = self.rooms.lock();
            let Some(room) = rooms.get(room_id) else {
                return Err(JoinError::NotFound);
            };
            let r = room.lock();
            if !r.password.is_empty() && r.password != clean_text(password, MAX_PASSWORD_LEN) {
                return Err(JoinError::BadPassword);
            }
        }
        // only a valid join leaves the previous room
        if let Some(current) = self.session_room_id(conn) {
            if current != room_id {
                self.leave_room(conn);
            }
        }
        // look the room up afresh and seat while still holding the
        // registry lock: the last member may have left in the meantime,
        // destroying the room, and a seat must never outlive the listing
        let room = {
            let rooms = self.rooms.lock();
            let Some(room) = rooms.get(room_id) else {
                return Err(JoinError::NotFound);
            };
            {
                let mut r = room.lock();
                match r.players.iter_mut().find(|p| p.id == conn) {
                    Some(existing) => {
                        if !name.is_empty() {
                            existing.name = name.clone();
                        }
                    }
                    None => {
                        let display = if name.is_empty() {
                            GUEST_NAME.to_string()
                        } else {
                            name.clone()
                        };
                        r.add_player(Player::new(conn, display, tx));
                    }
                }
            }
            Arc::clone(room)
        };
        if let Some(session) = self.sessions.lock().get_mut(&conn) {
            session.room_id = Some(room_id.to_string());
        }
        tracing::info!("{} joined room {}", conn, room_id);
        self.send_to_conn(
            conn,
            ServerToClient::RoomJoined {
                room_id: room_id.to_string(),
            },
        );
        self.broadcast_room(&room.lock());
        self.broadcast_lobby();
        Ok(())
    }

    /// Unseat the connection from its room, if any. Destroys the room
    /// when it empties; otherwise announces the new roster.
    pub fn leave_room(&self, conn: Uuid) {
        let room_id = {
            let mut sessions = self.sessions.lock();
            match sessions.get_mut(&conn) {
                Some(session) => session.room_id.take(),
                None => None,
            }
        };
        let Some(room_id) = room_id else {
            return;
        };
        let mut destroyed = false;
        let room = {
            let mut rooms = self.rooms.lock();
            let Some(room) = rooms.get(&room_id).cloned() else {
                return;
            };
            {
                let mut r = room.lock();
                r.remove_player(conn);
                if r.players.is_empty() {
                    rooms.remove(&room_id);
                    destroyed = true;
                }
            }
            room
        };
        if destroyed {
            tracing::info!("{} left room {} (room destroyed)", conn, room_id);
        } else {
            tracing::info!("{} left room {}", conn, room_id);
            self.broadcast_room(&room.lock());
        }
        self.broadcast_lobby();
    }

    /// Run one engine command against the connection's current room and
    /// apply the resulting broadcasts.
    pub fn room_command(&self, conn: Uuid, cmd: Command) {
        let Some(room) = self.room_of(conn) else {
            return;
        };
        let events = {
            let mut r = room.lock();
            game::handle(&mut r, cmd)
        };
        self.apply_room_events(&room, events);
    }

    pub fn send_lobby_to(&self, conn: Uuid) {
        let rooms = self.lobby_rooms();
        self.send_to_conn(conn, ServerToClient::LobbyState { rooms });
    }

    /// Process-wide chat: logged (bounded) and fanned out to every
    /// registered connection. A connection that has not registered yet
    /// catches up from the replay when it does.
    pub fn lobby_chat(&self, conn: Uuid, body: &str) {
        let body = clean_text(body, MAX_CHAT_LEN);
        if body.is_empty() {
            return;
        }
        let from = {
            let sessions = self.sessions.lock();
            match sessions.get(&conn) {
                Some(s) if !s.name.is_empty() => s.name.clone(),
                Some(_) => GUEST_NAME.to_string(),
                None => return,
            }
        };
        let message = ChatMessage {
            id: game::short_id("msg"),
            from,
            body,
            ts: Utc::now().timestamp_millis(),
        };
        game::append_chat(&mut self.lobby_log.lock(), message.clone());
        let sessions = self.sessions.lock();
        for session in sessions.values() {
            if session.name.is_empty() {
                continue;
            }
            let _ = session.tx.send(ServerToClient::LobbyChat {
                message: message.clone(),
            });
        }
    }

    fn room_of(&self, conn: Uuid) -> Option<Arc<Mutex<Room>>> {
        let room_id = self.session_room_id(conn)?;
        let rooms = self.rooms.lock();
        rooms.get(&room_id).cloned()
    }

    fn session_room_id(&self, conn: Uuid) -> Option<String> {
        let sessions = self.sessions.lock();
        sessions.get(&conn)?.room_id.clone()
    }

    fn apply_room_events(&self, room: &Arc<Mutex<Room>>, events: Vec<Event>) {
        for event in events {
            match event {
                Event::RoomState => self.broadcast_room(&room.lock()),
                Event::LobbyState => self.broadcast_lobby(),
                Event::Chat(message) => {
                    let r = room.lock();
                    for p in &r.players {
                        let _ = p.tx.send(ServerToClient::RoomChat {
                            message: message.clone(),
                        });
                    }
                }
                Event::Error { to, message } => {
                    self.send_to_conn(to, ServerToClient::RoomError { message });
                }
            }
        }
    }

    fn broadcast_room(&self, room: &Room) {
        for p in &room.players {
            let _ = p.tx.send(ServerToClient::RoomState {
                room: view::room_view_for(room, p.id),
            });
        }
    }

    fn broadcast_lobby(&self) {
        let rooms = self.lobby_rooms();
        let sessions = self.sessions.lock();
        for session in sessions.values() {
            let _ = session.tx.send(ServerToClient::LobbyState {
                rooms: rooms.clone(),
            });
        }
    }

    fn lobby_rooms(&self) -> Vec<LobbyRoom> {
        let rooms = self.rooms.lock();
        let mut list: Vec<LobbyRoom> = rooms
            .values()
            .map(|room| view::lobby_room(&room.lock()))
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    fn send_to_conn(&self, conn: Uuid, msg: ServerToClient) {
        let sessions = self.sessions.lock();
        if let Some(session) = sessions.get(&conn) {
            let _ = session.tx.send(msg);
        }
    }
}

fn normalize_prompts(blob: &str) -> Vec<String> {
    clean_text(blob, MAX_PROMPT_BLOB_LEN)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
