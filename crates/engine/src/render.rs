//! Builds `OutboundEvent`s from engine state: GMCP packages and the plain
//! text lines commands and the login flow emit. Kept separate from the
//! registries themselves so no registry method needs to know about wire
//! framing.

use ambonmud_domain::{ItemInstance, MobState, OutboundEvent, PlayerState, Room, SessionId};

use crate::registry::PlayerRegistry;

pub fn send_text(session_id: SessionId, text: impl Into<String>) -> OutboundEvent {
    OutboundEvent::SendText { session_id, text: text.into() }
}

pub fn send_info(session_id: SessionId, text: impl Into<String>) -> OutboundEvent {
    OutboundEvent::SendInfo { session_id, text: text.into() }
}

pub fn send_prompt(session_id: SessionId) -> OutboundEvent {
    OutboundEvent::SendPrompt { session_id }
}

fn gmcp(session_id: SessionId, package: &str, payload: serde_json::Value) -> OutboundEvent {
    OutboundEvent::SendGmcp {
        session_id,
        package: package.to_string(),
        payload: payload.to_string(),
    }
}

pub fn char_name(player: &PlayerState) -> OutboundEvent {
    gmcp(
        player.session_id,
        "Char.Name",
        serde_json::json!({
            "name": player.name,
            "class": player.class.display_name(),
            "race": player.race.display_name(),
            "level": player.level,
        }),
    )
}

pub fn char_vitals(player: &PlayerState) -> OutboundEvent {
    gmcp(
        player.session_id,
        "Char.Vitals",
        serde_json::json!({
            "hp": player.hp,
            "maxHp": player.max_hp,
            "mana": player.mana,
            "maxMana": player.max_mana,
        }),
    )
}

pub fn room_info(session_id: SessionId, room: &Room, mobs: &[&MobState], players: &[&PlayerState]) -> OutboundEvent {
    gmcp(
        session_id,
        "Room.Info",
        serde_json::json!({
            "id": room.id.as_str(),
            "title": room.title,
            "description": room.description,
            "exits": room.exits.keys().map(|d| d.as_str()).collect::<Vec<_>>(),
            "mobs": mobs.iter().map(|m| m.name.clone()).collect::<Vec<_>>(),
            "players": players.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
        }),
    )
}

/// Mirrors `room_info`'s mob/player name arrays for the items sitting in
/// the room. Sent alongside `Room.Info` rather than folded into it, so a
/// room's item list can be refreshed on its own after a drop or pickup.
pub fn room_items(session_id: SessionId, items: &[ItemInstance]) -> OutboundEvent {
    gmcp(
        session_id,
        "Room.Items",
        serde_json::json!({
            "items": items.iter().map(|i| i.item.display_name.clone()).collect::<Vec<_>>(),
        }),
    )
}

pub fn room_add_player(session_id: SessionId, player_name: &str) -> OutboundEvent {
    gmcp(session_id, "Room.AddPlayer", serde_json::json!({ "name": player_name }))
}

pub fn room_remove_player(session_id: SessionId, player_name: &str) -> OutboundEvent {
    gmcp(session_id, "Room.RemovePlayer", serde_json::json!({ "name": player_name }))
}

pub fn room_add_mob(session_id: SessionId, mob: &MobState) -> OutboundEvent {
    gmcp(session_id, "Room.AddMob", serde_json::json!({ "id": mob.id.as_str(), "name": mob.name }))
}

pub fn room_remove_mob(session_id: SessionId, mob_id: &str) -> OutboundEvent {
    gmcp(session_id, "Room.RemoveMob", serde_json::json!({ "id": mob_id }))
}

pub fn room_update_mob(session_id: SessionId, mob: &MobState) -> OutboundEvent {
    gmcp(
        session_id,
        "Room.UpdateMob",
        serde_json::json!({ "id": mob.id.as_str(), "hp": mob.hp, "maxHp": mob.max_hp }),
    )
}

/// Emit `make_event(other_session_id)` for every session sharing `room_id`
/// with `exclude`, skipping `exclude` itself.
pub fn broadcast_room(
    registry: &PlayerRegistry,
    room_id: &ambonmud_domain::RoomId,
    exclude: Option<SessionId>,
    make_event: impl Fn(SessionId) -> OutboundEvent,
) -> Vec<OutboundEvent> {
    registry
        .in_room_sessions(room_id)
        .iter()
        .copied()
        .filter(|sid| Some(*sid) != exclude)
        .map(make_event)
        .collect()
}
