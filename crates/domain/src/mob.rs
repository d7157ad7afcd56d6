//! Live mob state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{MobId, RoomId};

/// Per-mob behavior-tree memory: patrol progress and named action
/// cooldowns. Cleared on despawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BtMemory {
    pub patrol_index: usize,
    pub cooldown_timestamps: BTreeMap<String, i64>,
}

/// Live mob state, indexed by the mob registry both by id and by room.
/// Removed from the registry atomically on death (`hp == 0` mobs never
/// persist in the registry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobState {
    pub id: MobId,
    pub name: String,
    pub room_id: RoomId,
    pub hp: u32,
    pub max_hp: u32,
    pub min_damage: u32,
    pub max_damage: u32,
    pub armor: u32,
    pub xp_reward: u32,
    pub dialogue_id: Option<String>,
    pub behavior_tree: Option<String>,
    pub memory: BtMemory,
}

impl MobState {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}
