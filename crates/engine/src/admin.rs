//! Read-only engine snapshot for an admin HTTP frontend. Every field is an
//! owned copy assembled on the engine worker; callers never receive a
//! reference into a live registry.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::registry::{MobRegistry, PlayerRegistry};

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub name: String,
    pub room_id: String,
    pub level: u32,
    pub class: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AdminSnapshot {
    pub players_online: Vec<PlayerSummary>,
    pub zones: Vec<String>,
    pub rooms: usize,
    pub mob_counts: BTreeMap<String, usize>,
}

/// Build a snapshot from the live player/mob registries and the static
/// world. Called only from the engine worker, never across a channel.
pub fn snapshot(player_registry: &PlayerRegistry, mob_registry: &MobRegistry, world: &ambonmud_domain::World) -> AdminSnapshot {
    let players_online = player_registry
        .sessions()
        .filter(|p| p.login_phase == ambonmud_domain::LoginPhase::InGame)
        .map(|p| PlayerSummary {
            name: p.name.clone(),
            room_id: p.room_id.as_str().to_string(),
            level: p.level,
            class: p.class.display_name().to_string(),
            is_staff: p.is_staff,
        })
        .collect();

    let mut zones: Vec<String> = world.rooms.keys().map(|id| id.zone().to_string()).collect();
    zones.sort();
    zones.dedup();

    let mut mob_counts: BTreeMap<String, usize> = BTreeMap::new();
    for mob in mob_registry.iter() {
        *mob_counts.entry(mob.id.zone().to_string()).or_insert(0) += 1;
    }

    AdminSnapshot {
        players_online,
        zones,
        rooms: world.rooms.len(),
        mob_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_domain::{PlayerClass, Race, Room, RoomId};
    use std::collections::BTreeMap as Map;

    #[test]
    fn snapshot_counts_in_game_players_and_zones() {
        let room = RoomId::new("zone:start").unwrap();
        let mut rooms = Map::new();
        rooms.insert(room.clone(), Room::new(room.clone(), "Start", "desc"));
        let world = ambonmud_domain::World {
            rooms,
            start_room: room.clone(),
            mob_spawns: Vec::new(),
            item_spawns: Vec::new(),
            zone_lifespans_minutes: Map::new(),
            shop_definitions: Vec::new(),
            quest_definitions: Vec::new(),
        };
        let mut player_registry = PlayerRegistry::new();
        player_registry.connect(ambonmud_domain::SessionId(1), room.clone());
        player_registry.finalize_login_new(ambonmud_domain::SessionId(1), "Alice".to_string(), PlayerClass::Warrior, Race::Human, room);
        let mob_registry = MobRegistry::new();

        let snap = snapshot(&player_registry, &mob_registry, &world);
        assert_eq!(snap.players_online.len(), 1);
        assert_eq!(snap.zones, vec!["zone".to_string()]);
        assert_eq!(snap.rooms, 1);
    }
}
