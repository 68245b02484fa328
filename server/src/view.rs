use uuid::Uuid;

use memeclash_protocol::{LobbyRoom, PlayerView, RoomView, SubmissionView};

use crate::game::Room;

/// Shown for a submission whose owner already left the room.
const DEPARTED_OWNER: &str = "???";

pub fn lobby_room(room: &Room) -> LobbyRoom {
    LobbyRoom {
        id: room.id.clone(),
        name: room.name.clone(),
        player_count: room.players.len(),
        status: room.status,
        requires_password: !room.password.is_empty(),
        prompt_total: room.prompts.len(),
    }
}

/// Project a room for one recipient. Only the viewer's own hand is
/// included; votes are counts, never voter identities.
pub fn room_view_for(room: &Room, viewer: Uuid) -> RoomView {
    let players = room
        .players
        .iter()
        .map(|p| PlayerView {
            id: p.id,
            name: p.name.clone(),
            score: p.score,
            is_host: p.is_host,
            has_played: p.played_card_id.is_some(),
        })
        .collect();
    let submissions = room
        .submissions
        .iter()
        .map(|s| SubmissionView {
            owner_id: s.owner_id,
            owner_name: room
                .player(s.owner_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| DEPARTED_OWNER.to_string()),
            card: s.card.clone(),
            vote_count: s.voter_ids.len(),
            is_mine: s.owner_id == viewer,
        })
        .collect();
    let hand = room
        .player(viewer)
        .map(|p| p.hand.clone())
        .unwrap_or_default();
    RoomView {
        id: room.id.clone(),
        name: room.name.clone(),
        status: room.status,
        host_id: room.host_id,
        current_prompt_index: room.current_prompt_index,
        prompt_total: room.prompts.len(),
        current_prompt: room.current_prompt().map(|s| s.to_string()),
        turn_ends_at: room.turn_ends_at,
        vote_ends_at: room.vote_ends_at,
        deck_remaining: room.deck.len(),
        players,
        submissions,
        hand,
        chat: room.chat.clone(),
    }
}
