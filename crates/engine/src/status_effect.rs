//! Active status-effect bookkeeping: apply rules (REFRESH/STACK/NONE), the
//! per-tick DOT/HOT/SHIELD sweep, damage absorption, and stat-modifier
//! summation. Owned exclusively by the engine worker; no I/O.

use std::collections::BTreeMap;

use ambonmud_domain::{
    ActiveStatusEffect, EffectType, MobId, SessionId, StackBehavior, StatMods, StatusEffectDef, StatusEffectId,
};
use ambonmud_shared::GameRng;

/// A status effect's holder: either a player session or a live mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    Player(SessionId),
    Mob(MobId),
}

/// Outcome of one tick's DOT/HOT roll against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VitalDelta {
    pub target: Target,
    pub delta_hp: i64,
}

/// A fade (expiry) or shatter (shield exhaustion) notice to render for the
/// target's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectNotice {
    pub target: Target,
    pub definition_id: StatusEffectId,
    pub shattered: bool,
}

#[derive(Default)]
pub struct StatusEffectEngine {
    active: BTreeMap<Target, Vec<ActiveStatusEffect>>,
}

impl StatusEffectEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_on(&self, target: Target) -> &[ActiveStatusEffect] {
        self.active.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Apply `def` to `target` per its stack behavior. Returns `true` if a
    /// new or refreshed instance now exists.
    pub fn apply(
        &mut self,
        target: Target,
        def: &StatusEffectDef,
        now_ms: i64,
        source_session_id: Option<SessionId>,
    ) -> bool {
        let list = self.active.entry(target).or_default();
        let existing_count = list.iter().filter(|e| e.definition_id == def.id).count();

        match def.stack_behavior {
            StackBehavior::Refresh => {
                if let Some(instance) = list.iter_mut().find(|e| e.definition_id == def.id) {
                    instance.expires_at_ms = now_ms + def.duration_ms;
                    instance.last_tick_at_ms = now_ms;
                    return true;
                }
                list.push(new_instance(def, now_ms, source_session_id));
                true
            }
            StackBehavior::Stack => {
                if existing_count < def.max_stacks as usize {
                    list.push(new_instance(def, now_ms, source_session_id));
                    true
                } else if let Some(oldest) = list
                    .iter_mut()
                    .filter(|e| e.definition_id == def.id)
                    .min_by_key(|e| e.applied_at_ms)
                {
                    oldest.expires_at_ms = now_ms + def.duration_ms;
                    true
                } else {
                    false
                }
            }
            StackBehavior::None => {
                if existing_count > 0 {
                    false
                } else {
                    list.push(new_instance(def, now_ms, source_session_id));
                    true
                }
            }
        }
    }

    /// Advance every target's active effects by one tick: expire, roll
    /// DOT/HOT ticks, and drop exhausted shields. `definitions` resolves a
    /// `StatusEffectId` to its static rules; an unknown id is treated as
    /// already expired (defensive against a registry reload mid-flight).
    pub fn tick(
        &mut self,
        now_ms: i64,
        definitions: &BTreeMap<StatusEffectId, StatusEffectDef>,
        rng: &dyn GameRng,
        hp_lookup: &mut dyn FnMut(Target) -> Option<(u32, u32)>,
    ) -> (Vec<VitalDelta>, Vec<EffectNotice>) {
        let mut deltas = Vec::new();
        let mut notices = Vec::new();

        for (target, instances) in self.active.iter_mut() {
            let target = *target;
            instances.retain(|instance| {
                let Some(def) = definitions.get(&instance.definition_id) else {
                    notices.push(EffectNotice { target, definition_id: instance.definition_id.clone(), shattered: false });
                    return false;
                };
                if instance.is_expired(now_ms) {
                    notices.push(EffectNotice { target, definition_id: def.id.clone(), shattered: false });
                    return false;
                }
                if matches!(def.effect_type, EffectType::Shield) && instance.shield_remaining == 0 {
                    notices.push(EffectNotice { target, definition_id: def.id.clone(), shattered: true });
                    return false;
                }
                true
            });

            for instance in instances.iter_mut() {
                let Some(def) = definitions.get(&instance.definition_id) else { continue };
                if !matches!(def.effect_type, EffectType::Dot | EffectType::Hot) || def.tick_interval_ms <= 0 {
                    continue;
                }
                if now_ms - instance.last_tick_at_ms < def.tick_interval_ms {
                    continue;
                }
                instance.last_tick_at_ms = now_ms;
                let roll = rng.roll_range(def.tick_min, def.tick_max);
                let Some((hp, max_hp)) = hp_lookup(target) else { continue };
                let signed_roll = roll as i64;
                let raw_new_hp = match def.effect_type {
                    EffectType::Dot => hp as i64 - signed_roll,
                    EffectType::Hot => hp as i64 + signed_roll,
                    _ => hp as i64,
                };
                let clamped = raw_new_hp.clamp(0, max_hp as i64);
                deltas.push(VitalDelta { target, delta_hp: clamped - hp as i64 });
            }
        }

        self.active.retain(|_, instances| !instances.is_empty());
        (deltas, notices)
    }

    /// Subtract `raw` damage from active shields on `target` in application
    /// order, returning the residual damage that pierces through.
    pub fn absorb_player_damage(&mut self, target: Target, raw: u32) -> u32 {
        let Some(instances) = self.active.get_mut(&target) else { return raw };
        let mut remaining = raw;
        for instance in instances.iter_mut() {
            if remaining == 0 {
                break;
            }
            if instance.shield_remaining == 0 {
                continue;
            }
            let absorbed = remaining.min(instance.shield_remaining);
            instance.shield_remaining -= absorbed;
            remaining -= absorbed;
        }
        remaining
    }

    /// Sum the `statMods` of every active BUFF/DEBUFF on `target`.
    pub fn stat_mods_for(&self, target: Target, definitions: &BTreeMap<StatusEffectId, StatusEffectDef>) -> StatMods {
        let Some(instances) = self.active.get(&target) else { return StatMods::default() };
        StatMods::sum(instances.iter().filter_map(|instance| {
            let def = definitions.get(&instance.definition_id)?;
            matches!(def.effect_type, EffectType::StatBuff | EffectType::StatDebuff).then_some(def.stat_mods)
        }))
    }

    /// Mobs with `hp == 0` whose remaining DOT effects name a source,
    /// crediting the most recently applied DOT's source. The combat
    /// subsystem consumes and clears this per kill.
    pub fn dot_credit_for(&self, target: Target, definitions: &BTreeMap<StatusEffectId, StatusEffectDef>) -> Option<SessionId> {
        let instances = self.active.get(&target)?;
        instances
            .iter()
            .filter(|i| definitions.get(&i.definition_id).map(|d| d.effect_type == EffectType::Dot).unwrap_or(false))
            .max_by_key(|i| i.applied_at_ms)
            .and_then(|i| i.source_session_id)
    }

    pub fn on_player_disconnected(&mut self, session_id: SessionId) {
        self.active.remove(&Target::Player(session_id));
    }

    pub fn on_mob_removed(&mut self, mob_id: &MobId) {
        self.active.remove(&Target::Mob(mob_id.clone()));
    }

    /// Gateway reconnect: move every active effect from the old session id
    /// to the new one atomically.
    pub fn remap_session(&mut self, old: SessionId, new: SessionId) {
        if let Some(instances) = self.active.remove(&Target::Player(old)) {
            self.active.insert(Target::Player(new), instances);
        }
    }
}

fn new_instance(def: &StatusEffectDef, now_ms: i64, source_session_id: Option<SessionId>) -> ActiveStatusEffect {
    ActiveStatusEffect {
        definition_id: def.id.clone(),
        applied_at_ms: now_ms,
        expires_at_ms: now_ms + def.duration_ms,
        last_tick_at_ms: now_ms,
        source_session_id,
        shield_remaining: def.shield_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_shared::StdGameRng;

    fn dot_def() -> StatusEffectDef {
        StatusEffectDef {
            id: StatusEffectId::new("ignite"),
            display_name: "Ignite".to_string(),
            effect_type: EffectType::Dot,
            duration_ms: 10_000,
            tick_interval_ms: 1_000,
            tick_min: 5,
            tick_max: 5,
            shield_amount: 0,
            stat_mods: StatMods::default(),
            stack_behavior: StackBehavior::Refresh,
            max_stacks: 1,
        }
    }

    fn defs(def: StatusEffectDef) -> BTreeMap<StatusEffectId, StatusEffectDef> {
        let mut map = BTreeMap::new();
        map.insert(def.id.clone(), def);
        map
    }

    #[test]
    fn refresh_extends_existing_instance_instead_of_stacking() {
        let def = dot_def();
        let mut engine = StatusEffectEngine::new();
        let target = Target::Player(SessionId(1));
        engine.apply(target, &def, 0, None);
        engine.apply(target, &def, 5_000, None);
        assert_eq!(engine.active_on(target).len(), 1);
        assert_eq!(engine.active_on(target)[0].expires_at_ms, 15_000);
    }

    #[test]
    fn none_stack_behavior_rejects_reapplication() {
        let mut def = dot_def();
        def.stack_behavior = StackBehavior::None;
        let mut engine = StatusEffectEngine::new();
        let target = Target::Player(SessionId(1));
        assert!(engine.apply(target, &def, 0, None));
        assert!(!engine.apply(target, &def, 1, None));
        assert_eq!(engine.active_on(target).len(), 1);
    }

    #[test]
    fn stack_behavior_refreshes_oldest_once_at_cap() {
        let mut def = dot_def();
        def.stack_behavior = StackBehavior::Stack;
        def.max_stacks = 2;
        let mut engine = StatusEffectEngine::new();
        let target = Target::Player(SessionId(1));
        engine.apply(target, &def, 0, None);
        engine.apply(target, &def, 0, None);
        engine.apply(target, &def, 100, None);
        assert_eq!(engine.active_on(target).len(), 2);
        assert!(engine.active_on(target).iter().any(|i| i.expires_at_ms == 100 + def.duration_ms));
    }

    #[test]
    fn tick_rolls_dot_damage_and_clamps_to_zero() {
        let def = dot_def();
        let definitions = defs(def.clone());
        let mut engine = StatusEffectEngine::new();
        let target = Target::Player(SessionId(1));
        engine.apply(target, &def, 0, None);
        let rng = StdGameRng::from_seed(1);
        let mut hp = 3u32;
        let (deltas, notices) = engine.tick(1_000, &definitions, &rng, &mut |_| Some((hp, 50)));
        assert_eq!(deltas.len(), 1);
        hp = (hp as i64 + deltas[0].delta_hp).max(0) as u32;
        assert_eq!(hp, 0);
        assert!(notices.is_empty());
    }

    #[test]
    fn expired_instance_is_removed_with_fade_notice() {
        let def = dot_def();
        let definitions = defs(def.clone());
        let mut engine = StatusEffectEngine::new();
        let target = Target::Player(SessionId(1));
        engine.apply(target, &def, 0, None);
        let rng = StdGameRng::from_seed(1);
        let (_deltas, notices) = engine.tick(20_000, &definitions, &rng, &mut |_| Some((50, 50)));
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].shattered);
        assert!(engine.active_on(target).is_empty());
    }

    #[test]
    fn shield_absorbs_then_exhausts_with_shatter_notice() {
        let mut def = dot_def();
        def.effect_type = EffectType::Shield;
        def.shield_amount = 10;
        def.tick_interval_ms = 0;
        let definitions = defs(def.clone());
        let mut engine = StatusEffectEngine::new();
        let target = Target::Player(SessionId(1));
        engine.apply(target, &def, 0, None);

        let residual = engine.absorb_player_damage(target, 7);
        assert_eq!(residual, 0);
        assert_eq!(engine.active_on(target)[0].shield_remaining, 3);

        let residual = engine.absorb_player_damage(target, 10);
        assert_eq!(residual, 7);

        let rng = StdGameRng::from_seed(1);
        let (_deltas, notices) = engine.tick(1, &definitions, &rng, &mut |_| Some((50, 50)));
        assert_eq!(notices.len(), 1);
        assert!(notices[0].shattered);
    }

    #[test]
    fn disconnect_purges_all_active_effects_for_session() {
        let def = dot_def();
        let mut engine = StatusEffectEngine::new();
        let target = Target::Player(SessionId(1));
        engine.apply(target, &def, 0, None);
        engine.on_player_disconnected(SessionId(1));
        assert!(engine.active_on(target).is_empty());
    }

    #[test]
    fn remap_session_moves_effects_atomically() {
        let def = dot_def();
        let mut engine = StatusEffectEngine::new();
        engine.apply(Target::Player(SessionId(1)), &def, 0, None);
        engine.remap_session(SessionId(1), SessionId(2));
        assert!(engine.active_on(Target::Player(SessionId(1))).is_empty());
        assert_eq!(engine.active_on(Target::Player(SessionId(2))).len(), 1);
    }

    #[test]
    fn dot_credit_attributes_kill_to_most_recent_source() {
        let def = dot_def();
        let definitions = defs(def.clone());
        let mut engine = StatusEffectEngine::new();
        let target = Target::Mob(MobId::new("zone:rat").unwrap());
        engine.apply(target, &def, 0, Some(SessionId(1)));
        assert_eq!(engine.dot_credit_for(target, &definitions), Some(SessionId(1)));
    }
}
