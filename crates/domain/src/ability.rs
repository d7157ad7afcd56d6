//! Ability (spell/skill) definitions.

use serde::{Deserialize, Serialize};

use crate::ids::{AbilityId, StatusEffectId};
use crate::player::PlayerClass;

/// Who an ability can be cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    SelfTarget,
    Enemy,
}

/// What an ability does on a successful cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityEffect {
    DirectDamage { amount: u32 },
    DirectHeal { amount: u32 },
    ApplyStatus { status_id: StatusEffectId },
    /// Requires an active combat encounter; if none, no mana is consumed.
    AreaDamage { amount: u32 },
    /// Requires an active combat encounter; if none, no mana is consumed.
    Taunt,
}

/// A castable ability's static definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    pub id: AbilityId,
    pub display_name: String,
    pub mana_cost: u32,
    pub cooldown_ms: i64,
    pub level_required: u32,
    pub classes: Vec<PlayerClass>,
    pub target: TargetKind,
    pub effect: AbilityEffect,
}

impl AbilityDef {
    pub fn learnable_by(&self, level: u32, class: PlayerClass) -> bool {
        self.level_required <= level && self.classes.contains(&class)
    }

    /// True for effects that require an active combat encounter and must
    /// not consume mana when no target is available.
    pub fn requires_active_combat(&self) -> bool {
        matches!(self.effect, AbilityEffect::AreaDamage { .. } | AbilityEffect::Taunt)
    }
}
