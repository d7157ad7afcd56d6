//! Keyword lookup, learnability, cooldowns, and cast resolution for the
//! ability (spell/skill) system.

use std::collections::BTreeMap;

use ambonmud_domain::{
    AbilityDef, AbilityEffect, AbilityId, MobId, OutboundEvent, PlayerClass, PlayerState, SessionId, StatusEffectDef,
    StatusEffectId, TargetKind,
};

use crate::registry::mob::MobRegistry;
use crate::render;
use crate::status_effect::{StatusEffectEngine, Target};

#[derive(Default)]
pub struct AbilityRegistry {
    defs: BTreeMap<AbilityId, AbilityDef>,
}

impl AbilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: AbilityDef) {
        self.defs.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &AbilityId) -> Option<&AbilityDef> {
        self.defs.get(id)
    }

    /// Abilities learnable by a player of `level`/`class`, recomputed fresh
    /// each time (levels and classes are never revoked).
    pub fn learnable_for(&self, level: u32, class: PlayerClass) -> impl Iterator<Item = &AbilityDef> {
        self.defs.values().filter(move |def| def.learnable_by(level, class))
    }

    /// Lookup order: exact id (case-insensitive), case-insensitive
    /// displayName, id prefix, then displayName substring if `keyword` is
    /// at least 3 characters.
    pub fn resolve_keyword(&self, keyword: &str) -> Option<&AbilityDef> {
        let lower = keyword.to_ascii_lowercase();

        if let Some(def) = self.defs.values().find(|d| d.id.as_str().eq_ignore_ascii_case(&lower)) {
            return Some(def);
        }
        if let Some(def) = self.defs.values().find(|d| d.display_name.eq_ignore_ascii_case(&lower)) {
            return Some(def);
        }
        if let Some(def) = self.defs.values().find(|d| d.id.as_str().to_ascii_lowercase().starts_with(&lower)) {
            return Some(def);
        }
        if lower.len() >= 3 {
            if let Some(def) = self
                .defs
                .values()
                .find(|d| d.display_name.to_ascii_lowercase().contains(&lower))
            {
                return Some(def);
            }
        }
        None
    }
}

/// Recompute `player.known_abilities` from the registry, returning the ids
/// newly learned since the last sync (for a "you have learned X" message).
pub fn sync_abilities(player: &mut PlayerState, registry: &AbilityRegistry) -> Vec<AbilityId> {
    let learnable: std::collections::BTreeSet<AbilityId> =
        registry.learnable_for(player.level, player.class).map(|d| d.id.clone()).collect();
    let newly: Vec<AbilityId> = learnable.difference(&player.known_abilities).cloned().collect();
    player.known_abilities = learnable;
    newly
}

/// A successful cast's side effects. `mob_killed` is set when the resolved
/// target's hp reached zero; the caller invokes the combat kill handler.
pub struct CastSuccess {
    pub events: Vec<OutboundEvent>,
    pub mob_killed: Option<MobId>,
}

#[derive(Default)]
pub struct AbilityEngine {
    /// `(session, ability)` -> the tick timestamp at which it is next ready.
    cooldowns: BTreeMap<(SessionId, AbilityId), i64>,
}

impl AbilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_ready(&self, session_id: SessionId, ability_id: &AbilityId, now_ms: i64) -> bool {
        self.cooldowns.get(&(session_id, ability_id.clone())).map(|ready_at| now_ms >= *ready_at).unwrap_or(true)
    }

    fn set_cooldown(&mut self, session_id: SessionId, ability_id: &AbilityId, now_ms: i64, cooldown_ms: i64) {
        self.cooldowns.insert((session_id, ability_id.clone()), now_ms + cooldown_ms);
    }

    pub fn on_player_disconnected(&mut self, session_id: SessionId) {
        self.cooldowns.retain(|(sid, _), _| *sid != session_id);
    }

    /// Resolve and apply a cast. `target_keyword` is the optional explicit
    /// target name typed after the spell name; `current_combat_target` is
    /// the mob the caster is already fighting, if any.
    #[allow(clippy::too_many_arguments)]
    pub fn cast(
        &mut self,
        registry: &AbilityRegistry,
        player: &mut PlayerState,
        keyword: &str,
        target_keyword: Option<&str>,
        current_combat_target: Option<&MobId>,
        mob_registry: &mut MobRegistry,
        status_engine: &mut StatusEffectEngine,
        status_defs: &BTreeMap<StatusEffectId, StatusEffectDef>,
        now_ms: i64,
    ) -> Result<CastSuccess, String> {
        let def = registry
            .resolve_keyword(keyword)
            .ok_or_else(|| "You don't know any ability by that name.".to_string())?;
        if !player.known_abilities.contains(&def.id) {
            return Err("You don't know any ability by that name.".to_string());
        }

        let target_mob_id = resolve_target(def, player, target_keyword, current_combat_target, mob_registry)?;

        if player.mana < def.mana_cost {
            return Err("You don't have enough mana.".to_string());
        }
        if !self.is_ready(player.session_id, &def.id, now_ms) {
            return Err(format!("{} is not ready yet.", def.display_name));
        }

        player.mana -= def.mana_cost;
        self.set_cooldown(player.session_id, &def.id, now_ms, def.cooldown_ms);

        let mut events = Vec::new();
        let mut mob_killed = None;

        match &def.effect {
            AbilityEffect::DirectDamage { amount } => {
                let mob_id = target_mob_id.clone().expect("Enemy target resolved above");
                if let Some(mob) = mob_registry.get_mut(&mob_id) {
                    mob.hp = mob.hp.saturating_sub(*amount);
                    events.push(render::send_text(
                        player.session_id,
                        format!("You cast {} on {} for {} damage.", def.display_name, mob.name, amount),
                    ));
                    if mob.hp == 0 {
                        mob_killed = Some(mob_id);
                    }
                }
            }
            AbilityEffect::AreaDamage { amount } => {
                let mob_id = target_mob_id.clone().expect("combat target resolved above");
                if let Some(mob) = mob_registry.get_mut(&mob_id) {
                    mob.hp = mob.hp.saturating_sub(*amount);
                    events.push(render::send_text(
                        player.session_id,
                        format!("You unleash {} for {} damage.", def.display_name, amount),
                    ));
                    if mob.hp == 0 {
                        mob_killed = Some(mob_id);
                    }
                }
            }
            AbilityEffect::DirectHeal { amount } => match def.target {
                TargetKind::SelfTarget => {
                    player.hp = (player.hp + amount).min(player.max_hp);
                    events.push(render::send_text(player.session_id, format!("You cast {} and feel restored.", def.display_name)));
                }
                TargetKind::Enemy => {
                    let mob_id = target_mob_id.clone().expect("Enemy target resolved above");
                    if let Some(mob) = mob_registry.get_mut(&mob_id) {
                        mob.hp = (mob.hp + amount).min(mob.max_hp);
                    }
                }
            },
            AbilityEffect::ApplyStatus { status_id } => {
                let Some(status_def) = status_defs.get(status_id) else {
                    return Err("That ability has no effect.".to_string());
                };
                let target = match def.target {
                    TargetKind::SelfTarget => Target::Player(player.session_id),
                    TargetKind::Enemy => Target::Mob(target_mob_id.clone().expect("Enemy target resolved above")),
                };
                status_engine.apply(target, status_def, now_ms, Some(player.session_id));
                events.push(render::send_text(player.session_id, format!("You cast {}.", def.display_name)));
            }
            AbilityEffect::Taunt => {
                events.push(render::send_text(player.session_id, format!("You {}!", def.display_name)));
            }
        }

        Ok(CastSuccess { events, mob_killed })
    }
}

fn resolve_target(
    def: &AbilityDef,
    player: &PlayerState,
    target_keyword: Option<&str>,
    current_combat_target: Option<&MobId>,
    mob_registry: &MobRegistry,
) -> Result<Option<MobId>, String> {
    match def.target {
        TargetKind::SelfTarget => Ok(None),
        TargetKind::Enemy if def.requires_active_combat() => current_combat_target
            .cloned()
            .map(Some)
            .ok_or_else(|| "You aren't in combat.".to_string()),
        TargetKind::Enemy => {
            if let Some(keyword) = target_keyword {
                mob_registry
                    .find_in_room_by_name(&player.room_id, keyword)
                    .map(|mob| Some(mob.id.clone()))
                    .ok_or_else(|| "You don't see that here.".to_string())
            } else if let Some(cur) = current_combat_target {
                Ok(Some(cur.clone()))
            } else {
                Err("You don't see that here.".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_domain::{CoreStats, LoginPhase, MobState, Race, RoomId};
    use std::collections::BTreeSet;

    fn test_player(session_id: SessionId, room_id: RoomId) -> PlayerState {
        PlayerState {
            session_id,
            name: "Alice".to_string(),
            room_id,
            class: PlayerClass::Mage,
            race: Race::Human,
            level: 5,
            xp_total: 0,
            gold: 0,
            stats: CoreStats::default(),
            hp: 50,
            max_hp: 50,
            mana: 20,
            max_mana: 20,
            base_max_hp: 50,
            is_staff: false,
            title: None,
            active_quests: Default::default(),
            completed_quests: Default::default(),
            achievements: Default::default(),
            ansi_enabled: false,
            login_phase: LoginPhase::InGame,
            equipped: Default::default(),
            known_abilities: Default::default(),
        }
    }

    fn fireball() -> AbilityDef {
        AbilityDef {
            id: AbilityId::new("fireball"),
            display_name: "Fireball".to_string(),
            mana_cost: 10,
            cooldown_ms: 5_000,
            level_required: 3,
            classes: vec![PlayerClass::Mage],
            target: TargetKind::Enemy,
            effect: AbilityEffect::DirectDamage { amount: 15 },
        }
    }

    #[test]
    fn sync_abilities_reports_newly_learned() {
        let mut registry = AbilityRegistry::new();
        registry.insert(fireball());
        let room = RoomId::new("zone:a").unwrap();
        let mut player = test_player(SessionId(1), room);
        let newly = sync_abilities(&mut player, &registry);
        assert_eq!(newly, vec![AbilityId::new("fireball")]);
        assert_eq!(sync_abilities(&mut player, &registry), Vec::<AbilityId>::new());
    }

    #[test]
    fn resolve_keyword_matches_prefix_and_displayname_substring() {
        let mut registry = AbilityRegistry::new();
        registry.insert(fireball());
        assert!(registry.resolve_keyword("fireball").is_some());
        assert!(registry.resolve_keyword("FIRE").is_some());
        assert!(registry.resolve_keyword("ball").is_some());
        assert!(registry.resolve_keyword("fb").is_none());
    }

    #[test]
    fn cast_fails_without_enough_mana_and_does_not_consume_any() {
        let mut registry = AbilityRegistry::new();
        registry.insert(fireball());
        let room = RoomId::new("zone:a").unwrap();
        let mut player = test_player(SessionId(1), room.clone());
        player.known_abilities.insert(AbilityId::new("fireball"));
        player.mana = 2;
        let mut mob_registry = MobRegistry::new();
        mob_registry.upsert(MobState {
            id: MobId::new("zone:rat").unwrap(),
            name: "a rat".to_string(),
            room_id: room,
            hp: 10,
            max_hp: 10,
            min_damage: 1,
            max_damage: 2,
            armor: 0,
            xp_reward: 5,
            dialogue_id: None,
            behavior_tree: None,
            memory: Default::default(),
        });
        let mut status_engine = StatusEffectEngine::new();
        let status_defs = BTreeMap::new();
        let mut engine = AbilityEngine::new();
        let mob_id = MobId::new("zone:rat").unwrap();
        let result = engine.cast(
            &registry,
            &mut player,
            "fireball",
            None,
            Some(&mob_id),
            &mut mob_registry,
            &mut status_engine,
            &status_defs,
            0,
        );
        assert!(result.is_err());
        assert_eq!(player.mana, 2);
    }

    #[test]
    fn cast_direct_damage_kills_mob_and_reports_it() {
        let mut registry = AbilityRegistry::new();
        registry.insert(fireball());
        let room = RoomId::new("zone:a").unwrap();
        let mut player = test_player(SessionId(1), room.clone());
        player.known_abilities.insert(AbilityId::new("fireball"));
        let mob_id = MobId::new("zone:rat").unwrap();
        let mut mob_registry = MobRegistry::new();
        mob_registry.upsert(MobState {
            id: mob_id.clone(),
            name: "a rat".to_string(),
            room_id: room,
            hp: 10,
            max_hp: 10,
            min_damage: 1,
            max_damage: 2,
            armor: 0,
            xp_reward: 5,
            dialogue_id: None,
            behavior_tree: None,
            memory: Default::default(),
        });
        let mut status_engine = StatusEffectEngine::new();
        let status_defs = BTreeMap::new();
        let mut engine = AbilityEngine::new();
        let outcome = engine
            .cast(&registry, &mut player, "fireball", None, Some(&mob_id), &mut mob_registry, &mut status_engine, &status_defs, 0)
            .unwrap();
        assert_eq!(outcome.mob_killed, Some(mob_id));
        assert_eq!(player.mana, 10);
    }

    #[test]
    fn cooldown_rejects_an_immediate_recast_but_accepts_once_it_expires() {
        let mut registry = AbilityRegistry::new();
        registry.insert(fireball());
        let room = RoomId::new("zone:a").unwrap();
        let mut player = test_player(SessionId(1), room.clone());
        player.known_abilities.insert(AbilityId::new("fireball"));
        let mob_id = MobId::new("zone:rat").unwrap();
        let mut mob_registry = MobRegistry::new();
        mob_registry.upsert(MobState {
            id: mob_id.clone(),
            name: "a rat".to_string(),
            room_id,
            hp: 10_000,
            max_hp: 10_000,
            min_damage: 1,
            max_damage: 2,
            armor: 0,
            xp_reward: 5,
            dialogue_id: None,
            behavior_tree: None,
            memory: Default::default(),
        });
        let mut status_engine = StatusEffectEngine::new();
        let status_defs = BTreeMap::new();
        let mut engine = AbilityEngine::new();

        engine
            .cast(&registry, &mut player, "fireball", None, Some(&mob_id), &mut mob_registry, &mut status_engine, &status_defs, 0)
            .unwrap();

        let rejected = engine.cast(
            &registry,
            &mut player,
            "fireball",
            None,
            Some(&mob_id),
            &mut mob_registry,
            &mut status_engine,
            &status_defs,
            1_000,
        );
        assert!(rejected.unwrap_err().contains("not ready"));
        assert_eq!(player.mana, 10);

        let accepted = engine.cast(
            &registry,
            &mut player,
            "fireball",
            None,
            Some(&mob_id),
            &mut mob_registry,
            &mut status_engine,
            &status_defs,
            5_000,
        );
        assert!(accepted.is_ok());
        assert_eq!(player.mana, 0);
    }

    #[test]
    fn taunt_without_active_combat_refunds_no_mana() {
        let mut registry = AbilityRegistry::new();
        registry.insert(AbilityDef {
            id: AbilityId::new("roar"),
            display_name: "Roar".to_string(),
            mana_cost: 5,
            cooldown_ms: 1_000,
            level_required: 1,
            classes: vec![PlayerClass::Warrior],
            target: TargetKind::Enemy,
            effect: AbilityEffect::Taunt,
        });
        let room = RoomId::new("zone:a").unwrap();
        let mut player = test_player(SessionId(1), room);
        player.class = PlayerClass::Warrior;
        player.known_abilities.insert(AbilityId::new("roar"));
        let mut mob_registry = MobRegistry::new();
        let mut status_engine = StatusEffectEngine::new();
        let status_defs = BTreeMap::new();
        let mut engine = AbilityEngine::new();
        let result = engine.cast(&registry, &mut player, "roar", None, None, &mut mob_registry, &mut status_engine, &status_defs, 0);
        assert!(result.is_err());
        assert_eq!(player.mana, 20);
    }
}
