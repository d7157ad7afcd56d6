//! Combat: per-session/per-mob engagement, round resolution, kill handling,
//! and player death/respawn.

use std::collections::BTreeMap;

use ambonmud_domain::{
    Item, ItemInstance, MobId, OutboundEvent, RoomId, SessionId, Slot, StatBonuses, StatusEffectDef, StatusEffectId,
    World,
};
use ambonmud_shared::GameRng;

use crate::registry::{ItemRegistry, MobRegistry, PlayerRegistry};
use crate::render;
use crate::status_effect::{StatusEffectEngine, Target};

pub struct KillReport {
    pub mob_id: MobId,
    pub killer_session_id: SessionId,
    pub xp_awarded: u64,
    pub gold_awarded: u64,
}

pub struct DeathReport {
    pub session_id: SessionId,
    pub respawned_at: RoomId,
}

#[derive(Default)]
pub struct CombatTickReport {
    pub events: Vec<OutboundEvent>,
    pub mob_kills: Vec<KillReport>,
    pub player_deaths: Vec<DeathReport>,
}

/// Tracks active session<->mob engagement and each side's swing timer. A
/// session has at most one active target; a mob swings back at whichever
/// session it is currently engaged with.
#[derive(Default)]
pub struct CombatEngine {
    player_target: BTreeMap<SessionId, MobId>,
    mob_attacker: BTreeMap<MobId, SessionId>,
    player_swing_due_ms: BTreeMap<SessionId, i64>,
    mob_swing_due_ms: BTreeMap<MobId, i64>,
    swing_interval_ms: i64,
}

impl CombatEngine {
    pub fn new(swing_interval_ms: i64) -> Self {
        Self {
            swing_interval_ms: swing_interval_ms.max(1),
            ..Self::default()
        }
    }

    /// Place `session_id` into combat against `mob_id`, replacing any prior
    /// target. Idempotent if already engaged with the same mob.
    pub fn engage(&mut self, session_id: SessionId, mob_id: MobId, now_ms: i64) {
        self.player_target.insert(session_id, mob_id.clone());
        self.player_swing_due_ms.entry(session_id).or_insert(now_ms);
        self.mob_attacker.entry(mob_id.clone()).or_insert(session_id);
        self.mob_swing_due_ms.entry(mob_id).or_insert(now_ms);
    }

    pub fn current_target(&self, session_id: SessionId) -> Option<&MobId> {
        self.player_target.get(&session_id)
    }

    pub fn is_mob_engaged(&self, mob_id: &MobId) -> bool {
        self.mob_attacker.contains_key(mob_id)
    }

    pub fn disengage_session(&mut self, session_id: SessionId) {
        if let Some(mob_id) = self.player_target.remove(&session_id) {
            if self.mob_attacker.get(&mob_id) == Some(&session_id) {
                self.mob_attacker.remove(&mob_id);
                self.mob_swing_due_ms.remove(&mob_id);
            }
        }
        self.player_swing_due_ms.remove(&session_id);
    }

    pub fn on_player_disconnected(&mut self, session_id: SessionId) {
        self.disengage_session(session_id);
    }

    pub fn on_mob_removed(&mut self, mob_id: &MobId) {
        self.mob_attacker.remove(mob_id);
        self.mob_swing_due_ms.remove(mob_id);
        self.player_target.retain(|_, target| target != mob_id);
    }

    /// Advance every active engagement by one tick: resolve player swings,
    /// resolve mob retaliation, and handle kills/deaths.
    #[allow(clippy::too_many_arguments)]
    pub fn run_tick(
        &mut self,
        now_ms: i64,
        rng: &dyn GameRng,
        player_registry: &mut PlayerRegistry,
        mob_registry: &mut MobRegistry,
        item_registry: &mut ItemRegistry,
        status_engine: &mut StatusEffectEngine,
        status_defs: &BTreeMap<StatusEffectId, StatusEffectDef>,
        world: &World,
        respawn_room: &RoomId,
        max_level: u32,
    ) -> CombatTickReport {
        let mut report = CombatTickReport::default();
        let pairs: Vec<(SessionId, MobId)> = self.player_target.iter().map(|(s, m)| (*s, m.clone())).collect();

        for (session_id, mob_id) in pairs {
            if mob_registry.get(&mob_id).is_none() {
                self.on_mob_removed(&mob_id);
                continue;
            }
            if player_registry.get(session_id).is_none() {
                self.disengage_session(session_id);
                continue;
            }

            let player_due = *self.player_swing_due_ms.entry(session_id).or_insert(now_ms);
            if now_ms >= player_due {
                self.player_swing_due_ms.insert(session_id, now_ms + self.swing_interval_ms);
                if let Some(event) = self.resolve_player_swing(session_id, &mob_id, rng, player_registry, mob_registry, item_registry, status_engine) {
                    report.events.push(event);
                }
                if mob_registry.get(&mob_id).map(|m| m.hp == 0).unwrap_or(false) {
                    if let Some(kill) = self.resolve_kill(session_id, &mob_id, mob_registry, item_registry, world, rng, player_registry, max_level, &mut report.events) {
                        report.mob_kills.push(kill);
                    }
                    continue;
                }
            }

            if self.mob_attacker.get(&mob_id) == Some(&session_id) {
                let mob_due = *self.mob_swing_due_ms.entry(mob_id.clone()).or_insert(now_ms);
                if now_ms >= mob_due {
                    self.mob_swing_due_ms.insert(mob_id.clone(), now_ms + self.swing_interval_ms);
                    if let Some(event) = self.resolve_mob_swing(session_id, &mob_id, rng, player_registry, mob_registry, item_registry, status_engine) {
                        report.events.push(event);
                    }
                    if player_registry.get(session_id).map(|p| p.hp == 0).unwrap_or(false) {
                        self.respawn_player(session_id, respawn_room, player_registry);
                        self.disengage_session(session_id);
                        report.player_deaths.push(DeathReport { session_id, respawned_at: respawn_room.clone() });
                        report.events.push(render::send_info(session_id, "You have died. You awaken at the respawn point."));
                    }
                }
            }
        }

        report
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_player_swing(
        &self,
        session_id: SessionId,
        mob_id: &MobId,
        rng: &dyn GameRng,
        player_registry: &PlayerRegistry,
        mob_registry: &mut MobRegistry,
        item_registry: &ItemRegistry,
        status_engine: &mut StatusEffectEngine,
    ) -> Option<OutboundEvent> {
        let player = player_registry.get(session_id)?;
        let weapon_damage = item_registry
            .equipped(session_id)
            .and_then(|equipped| equipped.get(&Slot::Hand))
            .map(|instance| instance.item.damage)
            .unwrap_or(1);
        let mob = mob_registry.get(mob_id)?;
        let raw = rng.roll_range(weapon_damage, weapon_damage).saturating_sub(mob.armor).max(1);
        let residual = status_engine.absorb_player_damage(Target::Mob(mob_id.clone()), raw);
        let mob = mob_registry.get_mut(mob_id)?;
        mob.hp = mob.hp.saturating_sub(residual);
        Some(render::send_text(player.session_id, format!("You hit {} for {} damage.", mob.name, residual)))
    }

    fn resolve_mob_swing(
        &self,
        session_id: SessionId,
        mob_id: &MobId,
        rng: &dyn GameRng,
        player_registry: &mut PlayerRegistry,
        mob_registry: &MobRegistry,
        item_registry: &ItemRegistry,
        status_engine: &mut StatusEffectEngine,
    ) -> Option<OutboundEvent> {
        let mob = mob_registry.get(mob_id)?;
        let armor: u32 = item_registry.equipped(session_id).map(|equipped| equipped.values().map(|i| i.item.armor).sum()).unwrap_or(0);
        let raw = rng.roll_range(mob.min_damage, mob.max_damage.max(mob.min_damage)).saturating_sub(armor).max(1);
        let residual = status_engine.absorb_player_damage(Target::Player(session_id), raw);
        let player = player_registry.get_mut(session_id)?;
        player.hp = player.hp.saturating_sub(residual);
        Some(render::send_text(session_id, format!("{} hits you for {} damage.", mob.name, residual)))
    }

    /// Finalizes a mob's death: drops, gold/XP award, level-up, and the
    /// room-wide slain broadcast. Shared by melee kills and DOT kills.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn resolve_kill(
        &mut self,
        killer_session_id: SessionId,
        mob_id: &MobId,
        mob_registry: &mut MobRegistry,
        item_registry: &mut ItemRegistry,
        world: &World,
        rng: &dyn GameRng,
        player_registry: &mut PlayerRegistry,
        max_level: u32,
        events: &mut Vec<OutboundEvent>,
    ) -> Option<KillReport> {
        let mob = mob_registry.remove(mob_id)?;
        self.on_mob_removed(mob_id);

        item_registry.drop_mob_items_to_room(mob_id, mob.room_id.clone());

        let spawn_def = world.mob_spawns.iter().find(|m| m.id == *mob_id);
        let mut gold_awarded = 0;
        if let Some(spawn_def) = spawn_def {
            for drop in &spawn_def.drops {
                if rng.roll_chance(drop.chance) {
                    if let Some(instance) = item_registry.instantiate_drop(&drop.item_id) {
                        item_registry.place_in_room(mob.room_id.clone(), instance);
                    }
                }
            }
            gold_awarded = rng.roll_range(spawn_def.gold_min, spawn_def.gold_max.max(spawn_def.gold_min)) as u64;
            if gold_awarded > 0 {
                item_registry.place_in_room(mob.room_id.clone(), gold_drop(mob_id, gold_awarded as u32));
            }
        }

        let xp_awarded = mob.xp_reward as u64;
        if let Some(player) = player_registry.get_mut(killer_session_id) {
            let (new_xp_total, result) = crate::progression::apply_xp_gain(player.level, player.xp_total, xp_awarded, max_level);
            player.xp_total = new_xp_total;
            if result.leveled_up {
                player.level = result.new_level;
                player.max_hp = crate::progression::compute_max_hp(player.base_max_hp, player.class, player.level);
                player.max_mana = crate::progression::compute_max_mana(player.class, player.level);
                player.hp = player.max_hp;
                player.mana = player.max_mana;
                events.push(render::send_info(killer_session_id, format!("You have reached level {}!", player.level)));
            }
            events.push(render::send_info(killer_session_id, format!("You have slain {}! You gain {} experience.", mob.name, xp_awarded)));
        }

        events.extend(render::broadcast_room(player_registry, &mob.room_id, Some(killer_session_id), {
            let mob_name = mob.name.clone();
            move |sid| render::send_info(sid, format!("{mob_name} has been slain."))
        }));

        Some(KillReport { mob_id: mob_id.clone(), killer_session_id, xp_awarded, gold_awarded })
    }

    fn respawn_player(&self, session_id: SessionId, respawn_room: &RoomId, player_registry: &mut PlayerRegistry) {
        player_registry.move_to(session_id, respawn_room.clone());
        if let Some(player) = player_registry.get_mut(session_id) {
            player.hp = player.max_hp;
            player.mana = player.max_mana;
        }
    }
}

/// A room-placed pile of gold a dead mob carried, picked up the same way
/// as any other item drop.
fn gold_drop(mob_id: &MobId, amount: u32) -> ItemInstance {
    ItemInstance {
        id: ambonmud_domain::ItemId::new(format!("{}:gold", mob_id.zone())).expect("zone-qualified id"),
        item: Item {
            keyword: "gold".to_string(),
            display_name: format!("{amount} gold coins"),
            description: "A small pile of gold coins.".to_string(),
            slot: None,
            damage: 0,
            armor: 0,
            stat_bonuses: StatBonuses::default(),
            consumable: false,
            charges: None,
            on_use: None,
            match_by_key: false,
            base_price: amount,
            is_currency: true,
        },
    }
}
