//! Serde shapes for a single zone document, as authored by world content.
//! These are intentionally loose (local, unqualified ids; tier + level
//! instead of concrete mob stats) — [`super::loader::load_world`] resolves
//! and validates them into the immutable domain [`ambonmud_domain::World`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorSpecDoc {
    pub keyword: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub key_item: Option<String>,
}

/// An exit may be authored as a bare target string, or as an object
/// carrying a door spec alongside the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExitDoc {
    Bare(String),
    WithDoor { target: String, door: DoorSpecDoc },
}

impl ExitDoc {
    pub fn target(&self) -> &str {
        match self {
            ExitDoc::Bare(target) => target,
            ExitDoc::WithDoor { target, .. } => target,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDoc {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exits: BTreeMap<String, ExitDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropDoc {
    pub item: String,
    pub chance: f64,
}

fn default_tier() -> String {
    "standard".to_string()
}

fn default_level() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobSpawnDoc {
    pub id: String,
    pub name: String,
    pub room: String,
    #[serde(default = "default_tier")]
    pub tier: String,
    #[serde(default = "default_level")]
    pub level: i64,
    #[serde(default)]
    pub xp_reward: i64,
    #[serde(default)]
    pub drops: Vec<DropDoc>,
    #[serde(default)]
    pub respawn_seconds: Option<u64>,
    #[serde(default)]
    pub gold_min: i64,
    #[serde(default)]
    pub gold_max: i64,
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub behavior_tree: Option<String>,
    #[serde(default)]
    pub quest_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnUseEffectDoc {
    #[serde(default)]
    pub heal_hp: u32,
    #[serde(default)]
    pub grant_xp: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatBonusesDoc {
    #[serde(default)]
    pub str_bonus: i32,
    #[serde(default)]
    pub dex_bonus: i32,
    #[serde(default)]
    pub con_bonus: i32,
    #[serde(default)]
    pub int_bonus: i32,
    #[serde(default)]
    pub wis_bonus: i32,
    #[serde(default)]
    pub cha_bonus: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDoc {
    pub id: String,
    pub keyword: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub armor: i32,
    #[serde(default)]
    pub stat_bonuses: StatBonusesDoc,
    #[serde(default)]
    pub consumable: bool,
    #[serde(default)]
    pub charges: Option<u32>,
    #[serde(default)]
    pub on_use: Option<OnUseEffectDoc>,
    #[serde(default)]
    pub match_by_key: bool,
    #[serde(default)]
    pub base_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpawnDoc {
    pub item: ItemDoc,
    #[serde(default)]
    pub room: Option<String>,
    /// Deprecated: mob-carried placement. Rejected if combined with `room`.
    #[serde(default)]
    pub mob: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopDefinitionDoc {
    pub id: String,
    pub room: String,
    #[serde(default)]
    pub keeper_mob: Option<String>,
    #[serde(default)]
    pub stock: Vec<String>,
    #[serde(default)]
    pub sell_markup_pct: f64,
    #[serde(default)]
    pub buy_markup_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestDefinitionDoc {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub level_required: u32,
    #[serde(default)]
    pub xp_reward: i64,
    #[serde(default)]
    pub gold_reward: i64,
    #[serde(default)]
    pub item_rewards: Vec<String>,
}

/// One authored zone document. A world is the validated merge of an
/// ordered list of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDocument {
    pub zone: String,
    pub start_room: String,
    #[serde(default)]
    pub rooms: Vec<RoomDoc>,
    #[serde(default)]
    pub mob_spawns: Vec<MobSpawnDoc>,
    #[serde(default)]
    pub item_spawns: Vec<ItemSpawnDoc>,
    #[serde(default)]
    pub zone_lifespan_minutes: Option<u64>,
    #[serde(default)]
    pub shop_definitions: Vec<ShopDefinitionDoc>,
    #[serde(default)]
    pub quest_definitions: Vec<QuestDefinitionDoc>,
}
