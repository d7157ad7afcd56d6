//! Merges an ordered list of [`ZoneDocument`]s into one validated, immutable
//! [`World`]. Implements the eight-step algorithm: per-document validation,
//! id normalization, room merge, exit/door staging, mob tier resolution,
//! item validation, post-merge exit/placement resolution, and lifespan
//! consistency.

use std::collections::{BTreeMap, BTreeSet};

use ambonmud_domain::{
    Direction, DoorSpec, DropEntry, Item, ItemInstance, ItemSpawn, MobSpawn, OnUseEffect,
    QuestDefinition, Room, ShopDefinition, Slot, StatBonuses, World,
};
use ambonmud_domain::{ItemId, MobId, RoomId};
use ambonmud_shared::config::MobTierDef;

use crate::error::WorldLoadError;
use crate::world::document::ZoneDocument;

/// Load and merge `documents` into one [`World`]. `zone_filter`, if
/// non-empty, restricts the merged world to the named zones; exits
/// targeting a filtered-out zone are recorded in `remote_exits` instead of
/// erroring.
pub fn load_world(
    documents: &[ZoneDocument],
    mob_tiers: &BTreeMap<String, MobTierDef>,
    zone_filter: &BTreeSet<String>,
) -> Result<World, WorldLoadError> {
    let included: Vec<&ZoneDocument> = documents
        .iter()
        .filter(|doc| zone_filter.is_empty() || zone_filter.contains(&doc.zone))
        .collect();

    let mut rooms: BTreeMap<RoomId, Room> = BTreeMap::new();
    let mut zone_lifespans: BTreeMap<String, u64> = BTreeMap::new();
    let mut mob_spawns: Vec<MobSpawn> = Vec::new();
    let mut item_spawns: Vec<ItemSpawn> = Vec::new();
    let mut shop_definitions: Vec<ShopDefinition> = Vec::new();
    let mut quest_definitions: Vec<QuestDefinition> = Vec::new();
    let mut start_room: Option<RoomId> = None;
    // Staged (roomId, direction) -> raw target string, resolved post-merge.
    let mut staged_exits: Vec<(RoomId, Direction, String)> = Vec::new();

    for doc in &included {
        if doc.zone.trim().is_empty() {
            return Err(WorldLoadError::BlankZone { zone: doc.zone.clone() });
        }
        if doc.rooms.is_empty() {
            return Err(WorldLoadError::NoRooms { zone: doc.zone.clone() });
        }
        let normalized_start = RoomId::qualify(&doc.zone, &doc.start_room)
            .map_err(|_| WorldLoadError::BlankZone { zone: doc.zone.clone() })?;
        if !doc.rooms.iter().any(|r| {
            RoomId::qualify(&doc.zone, &r.id).map(|id| id == normalized_start).unwrap_or(false)
        }) {
            return Err(WorldLoadError::MissingStartRoom {
                zone: doc.zone.clone(),
                room: doc.start_room.clone(),
            });
        }
        // First included document's zone sets the merged start room, per
        // "startRoom: RoomId (must exist in rooms)" on the merged World.
        if start_room.is_none() {
            start_room = Some(normalized_start);
        }

        if let Some(minutes) = doc.zone_lifespan_minutes {
            match zone_lifespans.get(&doc.zone) {
                Some(existing) if *existing != minutes => {
                    return Err(WorldLoadError::InconsistentLifespan {
                        zone: doc.zone.clone(),
                        a: *existing,
                        b: minutes,
                    });
                }
                _ => {
                    zone_lifespans.insert(doc.zone.clone(), minutes);
                }
            }
        }

        for room_doc in &doc.rooms {
            let room_id = RoomId::qualify(&doc.zone, &room_doc.id)
                .map_err(|_| WorldLoadError::DuplicateRoom {
                    zone: doc.zone.clone(),
                    room_id: room_doc.id.clone(),
                })?;
            if rooms.contains_key(&room_id) {
                return Err(WorldLoadError::DuplicateRoom {
                    zone: doc.zone.clone(),
                    room_id: room_id.as_str().to_string(),
                });
            }
            let mut room = Room::new(room_id.clone(), room_doc.title.clone(), room_doc.description.clone());
            for (direction_str, exit_doc) in &room_doc.exits {
                let Some(direction) = Direction::parse(direction_str) else {
                    continue;
                };
                staged_exits.push((room_id.clone(), direction, exit_doc.target().to_string()));
                if let crate::world::document::ExitDoc::WithDoor { door, .. } = exit_doc {
                    let key_item_id = door
                        .key_item
                        .as_ref()
                        .and_then(|k| ItemId::qualify(&doc.zone, k).ok());
                    room.doors.insert(
                        direction,
                        DoorSpec {
                            keyword: door.keyword.clone(),
                            locked: door.locked,
                            key_item_id,
                        },
                    );
                }
            }
            rooms.insert(room_id, room);
        }

        for mob_doc in &doc.mob_spawns {
            let mob_id = MobId::qualify(&doc.zone, &mob_doc.id)
                .map_err(|_| WorldLoadError::DanglingMobRoom {
                    mob_id: mob_doc.id.clone(),
                    room_id: mob_doc.room.clone(),
                })?;
            let room_id = RoomId::qualify(&doc.zone, &mob_doc.room)
                .map_err(|_| WorldLoadError::DanglingMobRoom {
                    mob_id: mob_id.as_str().to_string(),
                    room_id: mob_doc.room.clone(),
                })?;
            let tier = mob_tiers.get(&mob_doc.tier).cloned().unwrap_or_default();
            let (max_hp, min_damage, max_damage, armor) = tier.at_level(mob_doc.level);
            let mut drops = Vec::with_capacity(mob_doc.drops.len());
            for drop in &mob_doc.drops {
                if !(0.0..=1.0).contains(&drop.chance) {
                    return Err(WorldLoadError::InvalidDropChance {
                        mob_id: mob_id.as_str().to_string(),
                        chance: drop.chance,
                    });
                }
                let item_id = ItemId::qualify(&doc.zone, &drop.item)
                    .map_err(|_| WorldLoadError::DanglingDropItem {
                        mob_id: mob_id.as_str().to_string(),
                        item_id: drop.item.clone(),
                    })?;
                drops.push(DropEntry { item_id, chance: drop.chance });
            }
            mob_spawns.push(MobSpawn {
                id: mob_id,
                name: mob_doc.name.clone(),
                room_id,
                max_hp: max_hp.max(1) as u32,
                min_damage: min_damage.max(0) as u32,
                max_damage: max_damage.max(0) as u32,
                armor: armor.max(0) as u32,
                xp_reward: mob_doc.xp_reward.max(0) as u32,
                drops,
                respawn_seconds: mob_doc.respawn_seconds,
                gold_min: mob_doc.gold_min.max(0) as u32,
                gold_max: mob_doc.gold_max.max(0) as u32,
                dialogue_id: mob_doc.dialogue.clone(),
                behavior_tree: mob_doc.behavior_tree.clone(),
                quest_ids: mob_doc.quest_ids.clone(),
            });
        }

        for item_doc in &doc.item_spawns {
            if item_doc.room.is_some() && item_doc.mob.is_some() {
                return Err(WorldLoadError::CombinedPlacement { item_id: item_doc.item.id.clone() });
            }
            let item_id = ItemId::qualify(&doc.zone, &item_doc.item.id)
                .map_err(|_| WorldLoadError::CombinedPlacement { item_id: item_doc.item.id.clone() })?;
            let slot = match &item_doc.item.slot {
                None => None,
                Some(raw) => Some(Slot::parse(raw).ok_or_else(|| WorldLoadError::InvalidSlot {
                    item_id: item_id.as_str().to_string(),
                    slot: raw.clone(),
                })?),
            };
            for (field, value) in [
                ("damage", item_doc.item.damage as f64),
                ("armor", item_doc.item.armor as f64),
            ] {
                if value < 0.0 {
                    return Err(WorldLoadError::NegativeField {
                        item_id: item_id.as_str().to_string(),
                        field,
                        value,
                    });
                }
            }
            let item = Item {
                keyword: item_doc.item.keyword.clone(),
                display_name: item_doc.item.display_name.clone(),
                description: item_doc.item.description.clone(),
                slot,
                damage: item_doc.item.damage as u32,
                armor: item_doc.item.armor as u32,
                stat_bonuses: StatBonuses {
                    str_bonus: item_doc.item.stat_bonuses.str_bonus,
                    dex_bonus: item_doc.item.stat_bonuses.dex_bonus,
                    con_bonus: item_doc.item.stat_bonuses.con_bonus,
                    int_bonus: item_doc.item.stat_bonuses.int_bonus,
                    wis_bonus: item_doc.item.stat_bonuses.wis_bonus,
                    cha_bonus: item_doc.item.stat_bonuses.cha_bonus,
                },
                consumable: item_doc.item.consumable,
                charges: item_doc.item.charges,
                on_use: item_doc.item.on_use.as_ref().map(|effect| OnUseEffect {
                    heal_hp: effect.heal_hp,
                    grant_xp: effect.grant_xp,
                }),
                match_by_key: item_doc.item.match_by_key,
                base_price: item_doc.item.base_price.max(0) as u32,
                is_currency: false,
            };
            let room_id = match &item_doc.room {
                Some(raw) => Some(RoomId::qualify(&doc.zone, raw).map_err(|_| {
                    WorldLoadError::DanglingItemRoom {
                        item_id: item_id.as_str().to_string(),
                        room_id: raw.clone(),
                    }
                })?),
                None => None,
            };
            item_spawns.push(ItemSpawn { instance: ItemInstance { id: item_id, item }, room_id });
        }

        for shop_doc in &doc.shop_definitions {
            shop_definitions.push(ShopDefinition {
                id: shop_doc.id.clone(),
                room_id: RoomId::qualify(&doc.zone, &shop_doc.room).map_err(|_| {
                    WorldLoadError::DanglingItemRoom {
                        item_id: shop_doc.id.clone(),
                        room_id: shop_doc.room.clone(),
                    }
                })?,
                keeper_mob_id: shop_doc
                    .keeper_mob
                    .as_ref()
                    .map(|m| MobId::qualify(&doc.zone, m))
                    .transpose()
                    .unwrap_or(None),
                stock: shop_doc
                    .stock
                    .iter()
                    .filter_map(|s| ItemId::qualify(&doc.zone, s).ok())
                    .collect(),
                sell_markup_pct: shop_doc.sell_markup_pct.max(0.0) as u32,
                buy_markup_pct: shop_doc.buy_markup_pct.max(0.0) as u32,
            });
        }

        for quest_doc in &doc.quest_definitions {
            quest_definitions.push(QuestDefinition {
                id: quest_doc.id.clone(),
                title: quest_doc.title.clone(),
                description: quest_doc.description.clone(),
                level_required: quest_doc.level_required,
                xp_reward: quest_doc.xp_reward.max(0) as u32,
                gold_reward: quest_doc.gold_reward.max(0) as u32,
                item_rewards: quest_doc
                    .item_rewards
                    .iter()
                    .filter_map(|i| ItemId::qualify(&doc.zone, i).ok())
                    .collect(),
            });
        }
    }

    // Resolve staged exits: a dangling target inside the merged world is an
    // error; a target whose zone was filtered out becomes a remote exit.
    for (room_id, direction, raw_target) in staged_exits {
        let target_zone = room_id.zone();
        let target = RoomId::qualify(target_zone, &raw_target)
            .map_err(|_| WorldLoadError::DanglingExit {
                room_id: room_id.as_str().to_string(),
                direction: direction.as_str().to_string(),
                target: raw_target.clone(),
            })?;
        if let Some(room) = rooms.get_mut(&room_id) {
            if rooms.contains_key(&target) {
                room.exits.insert(direction, target);
            } else if !zone_filter.is_empty() && !zone_filter.contains(target.zone()) {
                room.remote_exits.insert(direction);
            } else {
                return Err(WorldLoadError::DanglingExit {
                    room_id: room_id.as_str().to_string(),
                    direction: direction.as_str().to_string(),
                    target: target.as_str().to_string(),
                });
            }
        }
    }

    let start_room = start_room.ok_or_else(|| WorldLoadError::MissingMergedStartRoom {
        room: String::new(),
    })?;
    if !rooms.contains_key(&start_room) {
        return Err(WorldLoadError::MissingMergedStartRoom {
            room: start_room.as_str().to_string(),
        });
    }
    for mob in &mob_spawns {
        if !rooms.contains_key(&mob.room_id) {
            return Err(WorldLoadError::DanglingMobRoom {
                mob_id: mob.id.as_str().to_string(),
                room_id: mob.room_id.as_str().to_string(),
            });
        }
    }
    for item in &item_spawns {
        if let Some(room_id) = &item.room_id {
            if !rooms.contains_key(room_id) {
                return Err(WorldLoadError::DanglingItemRoom {
                    item_id: item.instance.id.as_str().to_string(),
                    room_id: room_id.as_str().to_string(),
                });
            }
        }
    }

    Ok(World {
        rooms,
        start_room,
        mob_spawns,
        item_spawns,
        zone_lifespans_minutes: zone_lifespans,
        shop_definitions,
        quest_definitions,
    })
}
