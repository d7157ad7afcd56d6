//! The immutable world model: rooms, exits, and the spawn tables a zone
//! reset replays.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, MobId, RoomId};
use crate::item::ItemInstance;

/// One of the six cardinal/vertical movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    /// The direction a traveler would take to return the way they came.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Parse the short or long-form name used in zone documents and player
    /// input (`"n"`/`"north"`, case-insensitive).
    pub fn parse(input: &str) -> Option<Direction> {
        match input.to_ascii_lowercase().as_str() {
            "n" | "north" => Some(Direction::North),
            "s" | "south" => Some(Direction::South),
            "e" | "east" => Some(Direction::East),
            "w" | "west" => Some(Direction::West),
            "u" | "up" => Some(Direction::Up),
            "d" | "down" => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// A door gate on an exit; present only when the zone document used the
/// object exit form with a door spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorSpec {
    pub keyword: String,
    pub locked: bool,
    pub key_item_id: Option<ItemId>,
}

/// A single room. Immutable once the world is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub title: String,
    pub description: String,
    pub exits: BTreeMap<Direction, RoomId>,
    pub doors: BTreeMap<Direction, DoorSpec>,
    /// Exits whose destination zone was filtered out of this load; the
    /// direction is kept so the room can still report "a passage leads
    /// east" without a resolvable target.
    pub remote_exits: BTreeSet<Direction>,
}

impl Room {
    pub fn new(id: RoomId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            exits: BTreeMap::new(),
            doors: BTreeMap::new(),
            remote_exits: BTreeSet::new(),
        }
    }
}

/// An independent Bernoulli-trial loot drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEntry {
    pub item_id: ItemId,
    /// Probability in `[0, 1]` that this drop occurs on death.
    pub chance: f64,
}

/// A mob's spawn definition, as authored in a zone document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobSpawn {
    pub id: MobId,
    pub name: String,
    pub room_id: RoomId,
    pub max_hp: u32,
    pub min_damage: u32,
    pub max_damage: u32,
    pub armor: u32,
    pub xp_reward: u32,
    pub drops: Vec<DropEntry>,
    pub respawn_seconds: Option<u64>,
    pub gold_min: u32,
    pub gold_max: u32,
    pub dialogue_id: Option<String>,
    pub behavior_tree: Option<String>,
    pub quest_ids: Vec<String>,
}

/// An item's spawn definition. An item spawn is either placed in exactly one
/// room or is an unplaced template (used only to instantiate mob drops).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpawn {
    pub instance: ItemInstance,
    pub room_id: Option<RoomId>,
}

/// A shop's static definition (stock list and markup); shops have no
/// dynamic state in the core engine beyond what the item registry tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopDefinition {
    pub id: String,
    pub room_id: RoomId,
    pub keeper_mob_id: Option<MobId>,
    pub stock: Vec<ItemId>,
    pub sell_markup_pct: u32,
    pub buy_markup_pct: u32,
}

/// A quest's static definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level_required: u32,
    pub xp_reward: u32,
    pub gold_reward: u32,
    pub item_rewards: Vec<ItemId>,
}

/// The immutable, shared world. Constructed once by the world loader and
/// never mutated afterwards; safe to share across workers by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub rooms: BTreeMap<RoomId, Room>,
    pub start_room: RoomId,
    pub mob_spawns: Vec<MobSpawn>,
    pub item_spawns: Vec<ItemSpawn>,
    pub zone_lifespans_minutes: BTreeMap<String, u64>,
    pub shop_definitions: Vec<ShopDefinition>,
    pub quest_definitions: Vec<QuestDefinition>,
}

impl World {
    /// Mob spawns whose `room_id.zone()` equals `zone`.
    pub fn mob_spawns_in_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a MobSpawn> {
        self.mob_spawns.iter().filter(move |m| m.id.zone() == zone)
    }

    /// Item spawns whose `instance.id.zone()` equals `zone`.
    pub fn item_spawns_in_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a ItemSpawn> {
        self.item_spawns
            .iter()
            .filter(move |i| i.instance.id.zone() == zone)
    }
}
