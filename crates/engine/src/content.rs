//! The fixed ability and status-effect catalog. Unlike rooms, mobs, and
//! items, abilities and status effects are not authored per zone — every
//! build of the engine ships the same catalog, so it lives here rather than
//! in a content directory `GameEngine::new` loads at boot.

use std::collections::BTreeMap;

use ambonmud_domain::{
    AbilityDef, AbilityEffect, AbilityId, PlayerClass, StatMods, StatusEffectDef, StatusEffectId, TargetKind,
};
use ambonmud_domain::{EffectType, StackBehavior};

/// The abilities every class can eventually learn.
pub fn default_ability_defs() -> BTreeMap<AbilityId, AbilityDef> {
    let defs = vec![
        AbilityDef {
            id: AbilityId::new("power_strike"),
            display_name: "Power Strike".to_string(),
            mana_cost: 0,
            cooldown_ms: 4_000,
            level_required: 1,
            classes: vec![PlayerClass::Warrior],
            target: TargetKind::Enemy,
            effect: AbilityEffect::DirectDamage { amount: 12 },
        },
        AbilityDef {
            id: AbilityId::new("taunt"),
            display_name: "Taunt".to_string(),
            mana_cost: 0,
            cooldown_ms: 8_000,
            level_required: 3,
            classes: vec![PlayerClass::Warrior],
            target: TargetKind::Enemy,
            effect: AbilityEffect::Taunt,
        },
        AbilityDef {
            id: AbilityId::new("magic_missile"),
            display_name: "Magic Missile".to_string(),
            mana_cost: 10,
            cooldown_ms: 2_000,
            level_required: 1,
            classes: vec![PlayerClass::Mage],
            target: TargetKind::Enemy,
            effect: AbilityEffect::DirectDamage { amount: 16 },
        },
        AbilityDef {
            id: AbilityId::new("ignite"),
            display_name: "Ignite".to_string(),
            mana_cost: 15,
            cooldown_ms: 6_000,
            level_required: 4,
            classes: vec![PlayerClass::Mage],
            target: TargetKind::Enemy,
            effect: AbilityEffect::ApplyStatus { status_id: StatusEffectId::new("ignite") },
        },
        AbilityDef {
            id: AbilityId::new("fireball"),
            display_name: "Fireball".to_string(),
            mana_cost: 25,
            cooldown_ms: 10_000,
            level_required: 8,
            classes: vec![PlayerClass::Mage],
            target: TargetKind::Enemy,
            effect: AbilityEffect::AreaDamage { amount: 20 },
        },
        AbilityDef {
            id: AbilityId::new("heal"),
            display_name: "Heal".to_string(),
            mana_cost: 12,
            cooldown_ms: 3_000,
            level_required: 1,
            classes: vec![PlayerClass::Cleric],
            target: TargetKind::SelfTarget,
            effect: AbilityEffect::DirectHeal { amount: 20 },
        },
        AbilityDef {
            id: AbilityId::new("shield_of_faith"),
            display_name: "Shield of Faith".to_string(),
            mana_cost: 14,
            cooldown_ms: 12_000,
            level_required: 5,
            classes: vec![PlayerClass::Cleric],
            target: TargetKind::SelfTarget,
            effect: AbilityEffect::ApplyStatus { status_id: StatusEffectId::new("warded") },
        },
        AbilityDef {
            id: AbilityId::new("backstab"),
            display_name: "Backstab".to_string(),
            mana_cost: 0,
            cooldown_ms: 5_000,
            level_required: 1,
            classes: vec![PlayerClass::Rogue],
            target: TargetKind::Enemy,
            effect: AbilityEffect::DirectDamage { amount: 18 },
        },
        AbilityDef {
            id: AbilityId::new("crippling_venom"),
            display_name: "Crippling Venom".to_string(),
            mana_cost: 0,
            cooldown_ms: 9_000,
            level_required: 6,
            classes: vec![PlayerClass::Rogue],
            target: TargetKind::Enemy,
            effect: AbilityEffect::ApplyStatus { status_id: StatusEffectId::new("crippled") },
        },
    ];
    defs.into_iter().map(|def| (def.id.clone(), def)).collect()
}

/// The status effects the default ability catalog (and mob special
/// attacks) can apply.
pub fn default_status_effect_defs() -> BTreeMap<StatusEffectId, StatusEffectDef> {
    let defs = vec![
        StatusEffectDef {
            id: StatusEffectId::new("ignite"),
            display_name: "Ignite".to_string(),
            effect_type: EffectType::Dot,
            duration_ms: 9_000,
            tick_interval_ms: 3_000,
            tick_min: 4,
            tick_max: 7,
            shield_amount: 0,
            stat_mods: StatMods::default(),
            stack_behavior: StackBehavior::Refresh,
            max_stacks: 1,
        },
        StatusEffectDef {
            id: StatusEffectId::new("regeneration"),
            display_name: "Regeneration".to_string(),
            effect_type: EffectType::Hot,
            duration_ms: 12_000,
            tick_interval_ms: 3_000,
            tick_min: 3,
            tick_max: 6,
            shield_amount: 0,
            stat_mods: StatMods::default(),
            stack_behavior: StackBehavior::Refresh,
            max_stacks: 1,
        },
        StatusEffectDef {
            id: StatusEffectId::new("warded"),
            display_name: "Warded".to_string(),
            effect_type: EffectType::Shield,
            duration_ms: 15_000,
            tick_interval_ms: 15_000,
            tick_min: 0,
            tick_max: 0,
            shield_amount: 30,
            stat_mods: StatMods::default(),
            stack_behavior: StackBehavior::None,
            max_stacks: 1,
        },
        StatusEffectDef {
            id: StatusEffectId::new("crippled"),
            display_name: "Crippled".to_string(),
            effect_type: EffectType::StatDebuff,
            duration_ms: 8_000,
            tick_interval_ms: 8_000,
            tick_min: 0,
            tick_max: 0,
            shield_amount: 0,
            stat_mods: StatMods { dex_mod: -4, ..StatMods::default() },
            stack_behavior: StackBehavior::Refresh,
            max_stacks: 1,
        },
        StatusEffectDef {
            id: StatusEffectId::new("stunned"),
            display_name: "Stunned".to_string(),
            effect_type: EffectType::Stun,
            duration_ms: 2_000,
            tick_interval_ms: 2_000,
            tick_min: 0,
            tick_max: 0,
            shield_amount: 0,
            stat_mods: StatMods::default(),
            stack_behavior: StackBehavior::None,
            max_stacks: 1,
        },
    ];
    defs.into_iter().map(|def| (def.id.clone(), def)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ability_targets_a_status_id_present_in_the_catalog() {
        let statuses = default_status_effect_defs();
        for def in default_ability_defs().values() {
            if let AbilityEffect::ApplyStatus { status_id } = &def.effect {
                assert!(statuses.contains_key(status_id), "missing status def for {status_id}");
            }
        }
    }

    #[test]
    fn every_class_has_at_least_one_learnable_ability() {
        let defs = default_ability_defs();
        for class in [PlayerClass::Warrior, PlayerClass::Mage, PlayerClass::Cleric, PlayerClass::Rogue] {
            assert!(defs.values().any(|def| def.classes.contains(&class)), "{class:?} has no ability");
        }
    }
}
