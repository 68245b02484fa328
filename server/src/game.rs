use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use memeclash_protocol::{clean_text, Card, ChatMessage, RoomStatus, ServerToClient, MAX_CHAT_LEN};

use crate::content::Content;
use crate::deck;

// ==== knobs ====
pub const HAND_SIZE: usize = 6;
pub const TURN_TIME_MS: i64 = 45_000;
pub const VOTE_TIME_MS: i64 = 30_000;
pub const CHAT_LOG_LIMIT: usize = 50;
pub const DEFAULT_PROMPT_TOTAL: usize = 2;
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Short external id: `"{prefix}-{first 8 hex of a v4 uuid}"`.
pub fn short_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..8])
}

/// Append to a chat log, evicting the oldest lines past the cap.
pub fn append_chat(log: &mut Vec<ChatMessage>, message: ChatMessage) {
    log.push(message);
    if log.len() > CHAT_LOG_LIMIT {
        let excess = log.len() - CHAT_LOG_LIMIT;
        log.drain(..excess);
    }
}

#[derive(Debug)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub hand: Vec<Card>,
    pub score: u32,
    pub is_host: bool,
    pub played_card_id: Option<String>,
    /// Outbound channel of the connection seated here.
    pub tx: UnboundedSender<ServerToClient>,
}

impl Player {
    pub fn new(id: Uuid, name: String, tx: UnboundedSender<ServerToClient>) -> Self {
        Player {
            id,
            name,
            hand: Vec::new(),
            score: 0,
            is_host: false,
            played_card_id: None,
            tx,
        }
    }
}

#[derive(Debug)]
pub struct Submission {
    pub owner_id: Uuid,
    pub card: Card,
    pub voter_ids: HashSet<Uuid>,
}

/// One game session. All mutation goes through [`handle`] or the
/// membership methods; the registry serializes access per room.
#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub password: String,
    pub host_id: Uuid,
    pub status: RoomStatus,
    /// Insertion order; host migration picks the first remaining entry.
    pub players: Vec<Player>,
    pub deck: Vec<Card>,
    pub submissions: Vec<Submission>,
    /// voter id -> submission owner id, authoritative for tallying.
    pub vote_registry: HashMap<Uuid, Uuid>,
    pub prompts: Vec<String>,
    /// -1 until the first round of a game has been dealt.
    pub current_prompt_index: i32,
    pub turn_ends_at: Option<i64>,
    pub vote_ends_at: Option<i64>,
    pub chat: Vec<ChatMessage>,
    content: Arc<Content>,
}

/// One request against a single room, already bound to the acting
/// connection.
#[derive(Debug, Clone)]
pub enum Command {
    Start { actor: Uuid },
    PlayCard { actor: Uuid, card_id: String },
    Vote { actor: Uuid, target: Uuid },
    Chat { actor: Uuid, body: String },
    TimeUp,
}

/// Broadcast work produced by a command. The transport layer executes
/// these; the engine never touches a socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Re-send each member their own view of the room.
    RoomState,
    /// Room metadata changed; refresh the lobby list everywhere.
    LobbyState,
    /// Fan one chat line out to the room.
    Chat(ChatMessage),
    /// Explain a rejection to one connection.
    Error { to: Uuid, message: String },
}

pub fn handle(room: &mut Room, cmd: Command) -> Vec<Event> {
    match cmd {
        Command::Start { actor } => room.start(actor),
        Command::PlayCard { actor, card_id } => room.play_card(actor, &card_id),
        Command::Vote { actor, target } => room.vote(actor, target),
        Command::Chat { actor, body } => room.chat(actor, &body),
        Command::TimeUp => room.time_up(),
    }
}

impl Room {
    pub fn new(
        id: String,
        name: String,
        password: String,
        prompts: Vec<String>,
        content: Arc<Content>,
    ) -> Self {
        Room {
            id,
            name,
            password,
            host_id: Uuid::nil(),
            status: RoomStatus::Waiting,
            players: Vec::new(),
            deck: Vec::new(),
            submissions: Vec::new(),
            vote_registry: HashMap::new(),
            prompts,
            current_prompt_index: -1,
            turn_ends_at: None,
            vote_ends_at: None,
            chat: Vec::new(),
            content,
        }
    }

    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Seat a player. The first player to enter owns the room.
    pub fn add_player(&mut self, mut player: Player) {
        if self.players.is_empty() {
            player.is_host = true;
            self.host_id = player.id;
        }
        self.players.push(player);
    }

    /// Remove a player, migrate the host seat if needed, and re-run the
    /// round-completion checks the departure may have unblocked.
    /// Returns false if the id was not seated here. Departed players'
    /// submissions and recorded votes are kept; only the per-current-
    /// player completion checks ignore them.
    pub fn remove_player(&mut self, id: Uuid) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return false;
        }
        if self.players.is_empty() {
            return true;
        }
        if self.host_id == id {
            let next = &mut self.players[0];
            next.is_host = true;
            self.host_id = next.id;
        }
        match self.status {
            RoomStatus::Playing => {
                if self.all_players_played() {
                    self.begin_voting();
                }
            }
            RoomStatus::Voting => {
                if self.all_players_voted() {
                    self.finish_voting();
                }
            }
            _ => {}
        }
        true
    }

    /// Prompt shown for the current round; the final prompt stays
    /// visible in the finished state.
    pub fn current_prompt(&self) -> Option<&str> {
        if self.current_prompt_index < 0 {
            return None;
        }
        self.prompts
            .get(self.current_prompt_index as usize)
            .map(|s| s.as_str())
    }

    fn start(&mut self, actor: Uuid) -> Vec<Event> {
        if actor != self.host_id {
            return Vec::new();
        }
        if self.players.len() < MIN_PLAYERS_TO_START {
            return vec![Event::Error {
                to: actor,
                message: "Need at least 2 players".to_string(),
            }];
        }
        self.deck = deck::build(&self.content.cards, self.players.len() * HAND_SIZE);
        for p in &mut self.players {
            p.hand.clear();
            p.played_card_id = None;
            p.score = 0;
        }
        self.submissions.clear();
        self.vote_registry.clear();
        self.current_prompt_index = -1;
        self.advance_prompt();
        vec![Event::RoomState, Event::LobbyState]
    }

    fn play_card(&mut self, actor: Uuid, card_id: &str) -> Vec<Event> {
        if self.status != RoomStatus::Playing {
            return Vec::new();
        }
        let Some(player) = self.players.iter_mut().find(|p| p.id == actor) else {
            return Vec::new();
        };
        if player.played_card_id.is_some() {
            return Vec::new();
        }
        let Some(pos) = player.hand.iter().position(|c| c.id == card_id) else {
            return Vec::new();
        };
        let card = player.hand.remove(pos);
        player.played_card_id = Some(card.id.clone());
        if let Some(refill) = self.deck.pop() {
            player.hand.push(refill);
        }
        let owner_id = player.id;
        self.submissions.push(Submission {
            owner_id,
            card,
            voter_ids: HashSet::new(),
        });
        let before = self.status;
        if self.all_players_played() {
            self.begin_voting();
        }
        self.events_after(before)
    }

    fn vote(&mut self, actor: Uuid, target: Uuid) -> Vec<Event> {
        if self.status != RoomStatus::Voting {
            return Vec::new();
        }
        if actor == target || self.player(actor).is_none() {
            return Vec::new();
        }
        if !self.submissions.iter().any(|s| s.owner_id == target) {
            return Vec::new();
        }
        self.vote_registry.insert(actor, target);
        self.recount_votes();
        let before = self.status;
        if self.all_players_voted() {
            self.finish_voting();
        }
        self.events_after(before)
    }

    fn chat(&mut self, actor: Uuid, body: &str) -> Vec<Event> {
        let body = clean_text(body, MAX_CHAT_LEN);
        if body.is_empty() {
            return Vec::new();
        }
        let Some(player) = self.player(actor) else {
            return Vec::new();
        };
        let message = ChatMessage {
            id: short_id("msg"),
            from: player.name.clone(),
            body,
            ts: Utc::now().timestamp_millis(),
        };
        append_chat(&mut self.chat, message.clone());
        vec![Event::Chat(message)]
    }

    /// Forced end of the current phase. Deadlines are advisory; nothing
    /// schedules this, but the transition itself must exist.
    fn time_up(&mut self) -> Vec<Event> {
        let before = self.status;
        match self.status {
            RoomStatus::Playing => {
                if self.submissions.is_empty() {
                    self.advance_prompt();
                } else {
                    self.begin_voting();
                }
            }
            RoomStatus::Voting => self.finish_voting(),
            _ => return Vec::new(),
        }
        self.events_after(before)
    }

    fn events_after(&self, before: RoomStatus) -> Vec<Event> {
        let mut events = vec![Event::RoomState];
        if self.status != before {
            events.push(Event::LobbyState);
        }
        events
    }

    fn all_players_played(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.played_card_id.is_some())
    }

    fn all_players_voted(&self) -> bool {
        !self.players.is_empty()
            && self
                .players
                .iter()
                .all(|p| self.vote_registry.contains_key(&p.id))
    }

    fn begin_voting(&mut self) {
        self.status = RoomStatus::Voting;
        self.turn_ends_at = None;
        self.vote_ends_at = Some(Utc::now().timestamp_millis() + VOTE_TIME_MS);
    }

    /// Rebuild every submission's voter set from the registry. Keeps
    /// re-votes single-counted.
    fn recount_votes(&mut self) {
        for sub in &mut self.submissions {
            sub.voter_ids.clear();
        }
        for (voter, target) in &self.vote_registry {
            if let Some(sub) = self.submissions.iter_mut().find(|s| s.owner_id == *target) {
                sub.voter_ids.insert(*voter);
            }
        }
    }

    /// Tally the registry, award a point to every owner tied at the
    /// top, then move on.
    fn finish_voting(&mut self) {
        let mut tally: HashMap<Uuid, usize> = HashMap::new();
        for target in self.vote_registry.values() {
            *tally.entry(*target).or_insert(0) += 1;
        }
        let top = tally.values().copied().max().unwrap_or(0);
        if top > 0 {
            for (owner, count) in &tally {
                if *count == top {
                    if let Some(player) = self.player_mut(*owner) {
                        player.score += 1;
                    }
                }
            }
        }
        self.advance_prompt();
    }

    fn advance_prompt(&mut self) {
        self.current_prompt_index += 1;
        if self.current_prompt_index >= self.prompts.len() as i32 {
            self.current_prompt_index = self.prompts.len().saturating_sub(1) as i32;
            self.status = RoomStatus::Finished;
            self.turn_ends_at = None;
            self.vote_ends_at = None;
            self.submissions.clear();
            self.vote_registry.clear();
            for p in &mut self.players {
                p.hand.clear();
                p.played_card_id = None;
            }
            return;
        }
        self.status = RoomStatus::Playing;
        self.submissions.clear();
        self.vote_registry.clear();
        for p in &mut self.players {
            p.played_card_id = None;
        }
        self.deal_cards();
        self.turn_ends_at = Some(Utc::now().timestamp_millis() + TURN_TIME_MS);
        self.vote_ends_at = None;
    }

    /// Top players up to the hand cap, insertion order, until the deck
    /// runs out.
    fn deal_cards(&mut self) {
        for p in &mut self.players {
            while p.hand.len() < HAND_SIZE {
                match self.deck.pop() {
                    Some(card) => p.hand.push(card),
                    None => return,
                }
            }
        }
    }
}
