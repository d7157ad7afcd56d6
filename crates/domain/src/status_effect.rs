//! Status-effect definitions and active instances.

use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, StatusEffectId};
use crate::player::CoreStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectType {
    Dot,
    Hot,
    StatBuff,
    StatDebuff,
    Stun,
    Root,
    Shield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackBehavior {
    Refresh,
    Stack,
    None,
}

/// Flat stat deltas a `StatBuff`/`StatDebuff` applies while active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatMods {
    pub str_mod: i32,
    pub dex_mod: i32,
    pub con_mod: i32,
    pub int_mod: i32,
    pub wis_mod: i32,
    pub cha_mod: i32,
}

impl StatMods {
    pub fn apply_to(&self, stats: CoreStats) -> CoreStats {
        CoreStats {
            str_: (stats.str_ as i32 + self.str_mod).max(0) as u16,
            dex: (stats.dex as i32 + self.dex_mod).max(0) as u16,
            con: (stats.con as i32 + self.con_mod).max(0) as u16,
            int: (stats.int as i32 + self.int_mod).max(0) as u16,
            wis: (stats.wis as i32 + self.wis_mod).max(0) as u16,
            cha: (stats.cha as i32 + self.cha_mod).max(0) as u16,
        }
    }

    pub fn sum(mods: impl Iterator<Item = StatMods>) -> StatMods {
        mods.fold(StatMods::default(), |acc, m| StatMods {
            str_mod: acc.str_mod + m.str_mod,
            dex_mod: acc.dex_mod + m.dex_mod,
            con_mod: acc.con_mod + m.con_mod,
            int_mod: acc.int_mod + m.int_mod,
            wis_mod: acc.wis_mod + m.wis_mod,
            cha_mod: acc.cha_mod + m.cha_mod,
        })
    }
}

/// A status effect's static definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectDef {
    pub id: StatusEffectId,
    pub display_name: String,
    pub effect_type: EffectType,
    pub duration_ms: i64,
    pub tick_interval_ms: i64,
    pub tick_min: u32,
    pub tick_max: u32,
    pub shield_amount: u32,
    pub stat_mods: StatMods,
    pub stack_behavior: StackBehavior,
    pub max_stacks: u32,
}

/// One applied instance of a status effect on a target (player or mob).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatusEffect {
    pub definition_id: StatusEffectId,
    pub applied_at_ms: i64,
    pub expires_at_ms: i64,
    pub last_tick_at_ms: i64,
    pub source_session_id: Option<SessionId>,
    pub shield_remaining: u32,
}

impl ActiveStatusEffect {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}
