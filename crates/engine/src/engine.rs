//! The `GameEngine`: owns every mutable registry and subsystem, and runs
//! the fixed-period tick loop (drain inbound, dispatch, run periodic
//! subsystems in the documented order, emit outbound events).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ambonmud_domain::{
    AbilityDef, DisconnectReason, InboundEvent, ItemId, MobId, MobSpawn, OutboundEvent, SessionId,
    StatusEffectDef, StatusEffectId, TransportKind, World,
};
use ambonmud_shared::config::GameplayConfig;
use ambonmud_shared::repository::PlayerRepository;
use ambonmud_shared::{Clock, GameRng, MetricsSink};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::ability::{AbilityEngine, AbilityRegistry};
use crate::admin::{self, AdminSnapshot};
use crate::behavior::{self, BehaviorScheduler};
use crate::combat::CombatEngine;
use crate::command::{self, CommandContext};
use crate::dialogue::{DialogueEngine, DialogueTree};
use crate::login;
use crate::progression::{compute_max_hp, compute_max_mana};
use crate::registry::{ItemRegistry, MobRegistry, PlayerRegistry};
use crate::render;
use crate::scheduler::Scheduler;
use crate::status_effect::StatusEffectEngine;

/// Everything the engine needs to construct itself once at bootstrap: the
/// loaded world, static definitions, and the ambient ports.
pub struct EngineDeps {
    pub world: World,
    pub ability_defs: BTreeMap<ambonmud_domain::AbilityId, AbilityDef>,
    pub status_defs: BTreeMap<StatusEffectId, StatusEffectDef>,
    pub dialogue_trees: BTreeMap<MobId, DialogueTree>,
    pub respawn_room: ambonmud_domain::RoomId,
    pub max_level: u32,
    pub clock: Arc<dyn Clock>,
    pub rng: Arc<dyn GameRng>,
    pub metrics: Arc<dyn MetricsSink>,
    pub repository: Arc<dyn PlayerRepository>,
    pub config: GameplayConfig,
}

pub struct GameEngine {
    world: World,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn GameRng>,
    metrics: Arc<dyn MetricsSink>,
    repository: Arc<dyn PlayerRepository>,
    config: GameplayConfig,

    player_registry: PlayerRegistry,
    mob_registry: MobRegistry,
    item_registry: ItemRegistry,
    scheduler: Scheduler,
    status_engine: StatusEffectEngine,
    status_defs: BTreeMap<StatusEffectId, StatusEffectDef>,
    ability_registry: AbilityRegistry,
    ability_engine: AbilityEngine,
    behavior_scheduler: BehaviorScheduler,
    combat_engine: CombatEngine,
    dialogue_engine: DialogueEngine,
    dialogue_trees: BTreeMap<MobId, DialogueTree>,
    respawn_room: ambonmud_domain::RoomId,
    max_level: u32,

    last_regen_ms: BTreeMap<SessionId, i64>,
    /// Mob spawns and zone names whose scheduled respawn/reset action has
    /// fired. `Scheduler` actions run as plain closures and cannot borrow
    /// `&mut GameEngine`, so they drop their payload here for
    /// `run_due_respawns`/`run_zone_lifecycle` to apply right after
    /// `scheduler.run_due` returns.
    due_respawns: Arc<Mutex<Vec<MobSpawn>>>,
    due_zone_resets: Arc<Mutex<Vec<String>>>,
}

impl GameEngine {
    pub fn new(deps: EngineDeps) -> Self {
        let mut ability_registry = AbilityRegistry::new();
        for (id, def) in deps.ability_defs {
            ability_registry.insert(id, def);
        }

        let mut mob_registry = MobRegistry::new();
        let mut behavior_scheduler = BehaviorScheduler::new(
            deps.config.behavior_min_action_delay_ms,
            deps.config.behavior_max_action_delay_ms,
        );
        let now = deps.clock.now_ms();
        for spawn in &deps.world.mob_spawns {
            spawn_mob(&mut mob_registry, &mut behavior_scheduler, spawn, now, deps.rng.as_ref());
        }

        let mut item_registry = ItemRegistry::new();
        for item_spawn in &deps.world.item_spawns {
            match &item_spawn.room_id {
                Some(room_id) => item_registry.place_in_room(room_id.clone(), item_spawn.instance.clone()),
                None => item_registry.place_unplaced(item_spawn.instance.clone()),
            }
            item_registry.register_template(item_spawn.instance.clone());
        }

        let zone_lifespans = deps.world.zone_lifespans_minutes.clone();

        let mut engine = Self {
            world: deps.world,
            clock: deps.clock,
            rng: deps.rng,
            metrics: deps.metrics,
            repository: deps.repository,
            config: deps.config,
            player_registry: PlayerRegistry::new(),
            mob_registry,
            item_registry,
            scheduler: Scheduler::new(),
            status_engine: StatusEffectEngine::new(),
            status_defs: deps.status_defs,
            ability_registry,
            ability_engine: AbilityEngine::new(),
            behavior_scheduler,
            combat_engine: CombatEngine::new(deps.config.combat_round_millis),
            dialogue_engine: DialogueEngine::new(),
            dialogue_trees: deps.dialogue_trees,
            respawn_room: deps.respawn_room,
            max_level: deps.max_level,
            last_regen_ms: BTreeMap::new(),
            due_respawns: Arc::new(Mutex::new(Vec::new())),
            due_zone_resets: Arc::new(Mutex::new(Vec::new())),
        };
        for (zone, minutes) in zone_lifespans {
            engine.schedule_zone_reset(zone, minutes as i64 * 60_000);
        }
        engine
    }

    /// Handle one inbound event: login, disconnect bookkeeping, or in-game
    /// command dispatch. Async only at the persistence handoff points
    /// (login finalize, disconnect), never mid-registry-mutation.
    pub async fn handle_inbound(&mut self, event: InboundEvent) -> Vec<OutboundEvent> {
        match event {
            InboundEvent::Connected { session_id, transport, ansi_enabled } => {
                let _ = transport;
                self.player_registry.connect(session_id, self.world.start_room.clone());
                if let Some(player) = self.player_registry.get_mut(session_id) {
                    player.ansi_enabled = ansi_enabled;
                }
                login::prompt_name(session_id)
            }
            InboundEvent::Disconnected { session_id, reason } => {
                self.on_disconnect(session_id, reason).await;
                Vec::new()
            }
            InboundEvent::LineReceived { session_id, text } => self.handle_line(session_id, &text).await,
            InboundEvent::GmcpReceived { .. } => Vec::new(),
        }
    }

    async fn handle_line(&mut self, session_id: SessionId, text: &str) -> Vec<OutboundEvent> {
        let Some(player) = self.player_registry.get(session_id) else { return Vec::new() };
        if player.login_phase != ambonmud_domain::LoginPhase::InGame {
            // The race answer is the last step of character creation; its
            // `AwaitingRace` phase is the only one still carrying the
            // password hash the caller must persist once `finalize_login_new`
            // lands the record in-registry (see `login::handle_race`).
            let pending_password_hash = match &player.login_phase {
                ambonmud_domain::LoginPhase::AwaitingRace { password_hash, .. } => Some(password_hash.clone()),
                _ => None,
            };
            let events = login::handle_line(
                session_id,
                text,
                &mut self.player_registry,
                self.repository.as_ref(),
                &self.world,
                self.clock.as_ref(),
            )
            .await;
            if let Some(password_hash) = pending_password_hash {
                if let Some(player) = self.player_registry.get(session_id) {
                    if player.login_phase == ambonmud_domain::LoginPhase::InGame {
                        if let Err(error) = login::persist_new_character(
                            &self.player_registry,
                            self.repository.as_ref(),
                            session_id,
                            &password_hash,
                            self.clock.as_ref(),
                        )
                        .await
                        {
                            tracing::warn!(error = %error, "failed to persist newly created character");
                            self.metrics.incr_counter("persistence.save_failed", 1);
                        }
                    }
                }
            }
            return events;
        }

        let now_ms = self.clock.now_ms();
        let mut ctx = CommandContext {
            world: &self.world,
            player_registry: &mut self.player_registry,
            mob_registry: &mut self.mob_registry,
            item_registry: &mut self.item_registry,
            ability_registry: &self.ability_registry,
            ability_engine: &mut self.ability_engine,
            status_engine: &mut self.status_engine,
            status_defs: &self.status_defs,
            combat_engine: &mut self.combat_engine,
            dialogue_engine: &mut self.dialogue_engine,
            dialogue_trees: &self.dialogue_trees,
            now_ms,
        };
        command::dispatch(session_id, text, &mut ctx)
    }

    async fn on_disconnect(&mut self, session_id: SessionId, reason: DisconnectReason) {
        let _ = reason;
        self.ability_engine.on_player_disconnected(session_id);
        self.status_engine.on_player_disconnected(session_id);
        self.combat_engine.on_player_disconnected(session_id);
        self.dialogue_engine.on_player_disconnected(session_id);
        self.last_regen_ms.remove(&session_id);

        let Some(player) = self.player_registry.disconnect(session_id) else { return };
        if player.login_phase != ambonmud_domain::LoginPhase::InGame {
            return;
        }
        let (inventory, equipped) = self.item_registry.take_session_items(session_id);
        let inventory_item_ids: Vec<ItemId> = inventory.iter().map(|i| i.id.clone()).collect();
        let equipped_item_ids: BTreeMap<ambonmud_domain::Slot, ItemId> =
            equipped.iter().map(|(slot, inst)| (*slot, inst.id.clone())).collect();
        let now = chrono::DateTime::from_timestamp_millis(self.clock.now_ms()).unwrap_or_else(chrono::Utc::now);
        let record = crate::registry::player::to_player_record(
            &player,
            inventory_item_ids,
            equipped_item_ids,
            String::new(),
            now,
            self.clock.as_ref(),
        );
        if let Err(error) = self.repository.save(&record).await {
            tracing::warn!(error = %error, player = %player.name, "failed to persist player on disconnect");
            self.metrics.incr_counter("persistence.save_failed", 1);
        }
    }

    /// Run one tick's periodic subsystems in the documented order (steps
    /// 3-8 of the engine loop; steps 1-2 are `handle_inbound`). Returns the
    /// outbound events produced.
    pub async fn run_periodic(&mut self) -> Vec<OutboundEvent> {
        let now_ms = self.clock.now_ms();
        let mut events = Vec::new();

        let run_report = self.scheduler.run_due(self.clock.as_ref(), self.config.scheduler_max_actions_per_tick);
        self.metrics.set_gauge("scheduler.dropped", run_report.dropped as f64);

        let player_registry = &self.player_registry;
        let mob_registry = &self.mob_registry;
        let mut hp_lookup = |target: crate::status_effect::Target| match target {
            crate::status_effect::Target::Player(sid) => player_registry.get(sid).map(|p| (p.hp, p.max_hp)),
            crate::status_effect::Target::Mob(ref mob_id) => mob_registry.get(mob_id).map(|m| (m.hp, m.max_hp)),
        };
        let (vital_deltas, notices) = self.status_engine.tick(now_ms, &self.status_defs, self.rng.as_ref(), &mut hp_lookup);
        let dot_kills = self.apply_vital_deltas(&vital_deltas, &mut events);
        self.emit_status_notices(&notices, &mut events);
        self.process_dot_kills(&dot_kills, now_ms, &mut events);

        let in_combat_mobs: BTreeSet<MobId> = self.combat_registry_mob_ids();
        let bt_report = self.behavior_scheduler.run_tick(
            now_ms,
            self.config.behavior_max_actions_per_tick,
            &mut self.mob_registry,
            &self.player_registry,
            &self.status_engine,
            &self.status_defs,
            &in_combat_mobs,
            &self.world,
            self.rng.as_ref(),
        );
        events.extend(bt_report.events);
        for aggro in bt_report.aggro_requests {
            self.combat_engine.engage(aggro.session_id, aggro.mob_id, now_ms);
        }

        self.run_regen(now_ms, &mut events);

        let combat_report = self.combat_engine.run_tick(
            now_ms,
            self.rng.as_ref(),
            &mut self.player_registry,
            &mut self.mob_registry,
            &mut self.item_registry,
            &mut self.status_engine,
            &self.status_defs,
            &self.world,
            &self.respawn_room,
            self.max_level,
        );
        events.extend(combat_report.events);
        for kill in &combat_report.mob_kills {
            self.behavior_scheduler.unregister(&kill.mob_id);
            self.dialogue_engine.on_mob_removed(&kill.mob_id);
            self.schedule_respawn(&kill.mob_id);
        }
        for death in &combat_report.player_deaths {
            events.push(render::send_info(death.session_id, "You have died and been returned to the waking world."));
            if let Some(player) = self.player_registry.get(death.session_id) {
                events.push(render::char_vitals(player));
            }
        }

        self.run_due_respawns(now_ms, &mut events);
        self.run_zone_lifecycle(now_ms, &mut events);

        events
    }

    fn combat_registry_mob_ids(&self) -> BTreeSet<MobId> {
        self.mob_registry.iter().filter(|m| self.combat_engine.is_mob_engaged(&m.id)).map(|m| m.id.clone()).collect()
    }

    /// Applies each delta and returns the mobs a DOT tick just reduced to
    /// `hp == 0`, for `process_dot_kills` to finalize.
    fn apply_vital_deltas(&mut self, deltas: &[crate::status_effect::VitalDelta], events: &mut Vec<OutboundEvent>) -> Vec<MobId> {
        let mut dead_mobs = Vec::new();
        for delta in deltas {
            match delta.target {
                crate::status_effect::Target::Player(sid) => {
                    if let Some(player) = self.player_registry.get_mut(sid) {
                        let new_hp = (player.hp as i64 + delta.delta_hp).clamp(0, player.max_hp as i64) as u32;
                        player.hp = new_hp;
                        events.push(render::char_vitals(player));
                    }
                }
                crate::status_effect::Target::Mob(ref mob_id) => {
                    if let Some(mob) = self.mob_registry.get_mut(mob_id) {
                        let new_hp = (mob.hp as i64 + delta.delta_hp).clamp(0, mob.max_hp as i64) as u32;
                        mob.hp = new_hp;
                        if new_hp == 0 {
                            dead_mobs.push(mob_id.clone());
                        }
                    }
                }
            }
        }
        dead_mobs
    }

    /// `mobsKilledByDot()`: any mob a DOT tick just reduced to 0 hp credits
    /// its most recently applied DOT's source through the same kill path
    /// melee combat uses (drops, gold, XP, level-up, room broadcast). A
    /// sourceless DOT (the session that cast it has since disconnected)
    /// still removes the mob but awards nothing.
    fn process_dot_kills(&mut self, dead_mobs: &[MobId], now_ms: i64, events: &mut Vec<OutboundEvent>) {
        for mob_id in dead_mobs {
            let credit = self.status_engine.dot_credit_for(crate::status_effect::Target::Mob(mob_id.clone()), &self.status_defs);
            self.status_engine.on_mob_removed(mob_id);

            match credit {
                Some(killer_session_id) => {
                    self.combat_engine.resolve_kill(
                        killer_session_id,
                        mob_id,
                        &mut self.mob_registry,
                        &mut self.item_registry,
                        &self.world,
                        self.rng.as_ref(),
                        &mut self.player_registry,
                        self.max_level,
                        events,
                    );
                }
                None => {
                    if let Some(mob) = self.mob_registry.remove(mob_id) {
                        self.combat_engine.on_mob_removed(mob_id);
                        self.item_registry.drop_mob_items_to_room(mob_id, mob.room_id.clone());
                        events.extend(render::broadcast_room(&self.player_registry, &mob.room_id, None, {
                            let mob_name = mob.name.clone();
                            move |sid| render::send_info(sid, format!("{mob_name} has been slain."))
                        }));
                    }
                }
            }

            self.behavior_scheduler.unregister(mob_id);
            self.dialogue_engine.on_mob_removed(mob_id);
            self.schedule_respawn(mob_id);
        }
    }

    fn emit_status_notices(&mut self, notices: &[crate::status_effect::EffectNotice], events: &mut Vec<OutboundEvent>) {
        for notice in notices {
            if let crate::status_effect::Target::Player(sid) = notice.target {
                let text = if notice.shattered { "Your shield shatters." } else { "An effect fades." };
                events.push(render::send_info(sid, text));
            }
        }
    }

    fn run_regen(&mut self, now_ms: i64, events: &mut Vec<OutboundEvent>) {
        let interval = self.config.regen_interval_millis;
        let session_ids: Vec<SessionId> = self.player_registry.sessions().map(|p| p.session_id).collect();
        for session_id in session_ids {
            let due = *self.last_regen_ms.entry(session_id).or_insert(now_ms);
            if now_ms < due {
                continue;
            }
            self.last_regen_ms.insert(session_id, now_ms + interval);
            if let Some(player) = self.player_registry.get_mut(session_id) {
                if player.hp >= player.max_hp && player.mana >= player.max_mana {
                    continue;
                }
                let hp_regen = 1 + (player.stats.con as u32) / 5;
                let mana_regen = 1 + (player.stats.wis as u32) / 5;
                player.hp = (player.hp + hp_regen).min(player.max_hp);
                player.mana = (player.mana + mana_regen).min(player.max_mana);
                events.push(render::char_vitals(player));
            }
        }
    }

    fn schedule_respawn(&mut self, mob_id: &MobId) {
        let Some(spawn) = self.world.mob_spawns.iter().find(|m| &m.id == mob_id) else { return };
        let Some(respawn_seconds) = spawn.respawn_seconds else { return };
        let sink = self.due_respawns.clone();
        let spawn = spawn.clone();
        self.scheduler.schedule_in(self.clock.as_ref(), respawn_seconds as i64 * 1000, Box::new(move || {
            sink.lock().expect("due_respawns mutex poisoned").push(spawn);
        }));
    }

    fn run_due_respawns(&mut self, now_ms: i64, events: &mut Vec<OutboundEvent>) {
        let due = std::mem::take(&mut *self.due_respawns.lock().expect("due_respawns mutex poisoned"));
        for spawn in due {
            spawn_mob(&mut self.mob_registry, &mut self.behavior_scheduler, &spawn, now_ms, self.rng.as_ref());
            events.extend(render::broadcast_room(&self.player_registry, &spawn.room_id, None, {
                let name = spawn.name.clone();
                move |sid| render::send_info(sid, format!("{name} has returned."))
            }));
        }
    }

    /// Schedules the next reset of `zone` `delay_ms` from now. Called once
    /// at startup for every zone with a configured lifespan, then again
    /// after each reset fires, so the schedule is self-renewing.
    fn schedule_zone_reset(&mut self, zone: String, delay_ms: i64) {
        let sink = self.due_zone_resets.clone();
        self.scheduler.schedule_in(self.clock.as_ref(), delay_ms, Box::new(move || {
            sink.lock().expect("due_zone_resets mutex poisoned").push(zone);
        }));
    }

    fn run_zone_lifecycle(&mut self, now_ms: i64, events: &mut Vec<OutboundEvent>) {
        let _ = events;
        let due = std::mem::take(&mut *self.due_zone_resets.lock().expect("due_zone_resets mutex poisoned"));
        for zone in due {
            self.reset_zone(&zone, now_ms);
            if let Some(minutes) = self.world.zone_lifespans_minutes.get(&zone) {
                self.schedule_zone_reset(zone, *minutes as i64 * 60_000);
            }
        }
    }

    fn reset_zone(&mut self, zone: &str, now_ms: i64) {
        for mob_id in self.mob_registry.all_ids_in_zone(zone) {
            self.behavior_scheduler.unregister(&mob_id);
            self.combat_engine.on_mob_removed(&mob_id);
            self.dialogue_engine.on_mob_removed(&mob_id);
        }
        self.mob_registry.remove_zone(zone);
        for spawn in self.world.mob_spawns_in_zone(zone) {
            spawn_mob(&mut self.mob_registry, &mut self.behavior_scheduler, spawn, now_ms, self.rng.as_ref());
        }

        let spawns = self
            .world
            .item_spawns_in_zone(zone)
            .map(|s| (s.instance.clone(), s.room_id.clone()));
        self.item_registry.reset_zone(zone, spawns);
    }

    pub fn snapshot(&self) -> AdminSnapshot {
        admin::snapshot(&self.player_registry, &self.mob_registry, &self.world)
    }

    pub fn world(&self) -> &World {
        &self.world
    }
}

fn spawn_mob(mob_registry: &mut MobRegistry, behavior_scheduler: &mut BehaviorScheduler, spawn: &MobSpawn, now_ms: i64, rng: &dyn GameRng) {
    let mob = ambonmud_domain::MobState {
        id: spawn.id.clone(),
        name: spawn.name.clone(),
        room_id: spawn.room_id.clone(),
        hp: spawn.max_hp,
        max_hp: spawn.max_hp,
        min_damage: spawn.min_damage,
        max_damage: spawn.max_damage,
        armor: spawn.armor,
        xp_reward: spawn.xp_reward,
        dialogue_id: spawn.dialogue_id.clone(),
        behavior_tree: spawn.behavior_tree.clone(),
        memory: ambonmud_domain::BtMemory::default(),
    };
    if let Some(template_name) = &spawn.behavior_tree {
        if let Some(tree) = behavior::template(template_name) {
            behavior_scheduler.register(spawn.id.clone(), tree, now_ms, rng);
        }
    }
    mob_registry.upsert(mob);
}

/// Drive the engine's fixed-period tick loop until `cancel` fires. Drains
/// the inbound bus within `inbound_budget`, dispatches each event, runs
/// the periodic subsystems, and forwards outbound events to `outbound_tx`.
pub async fn run_tick_loop(
    engine: &mut GameEngine,
    mut inbound_rx: mpsc::Receiver<InboundEvent>,
    outbound_tx: mpsc::Sender<OutboundEvent>,
    tick_period: Duration,
    inbound_budget: Duration,
    metrics: Arc<dyn MetricsSink>,
    admin_snapshot: Arc<tokio::sync::RwLock<AdminSnapshot>>,
    mut cancel: tokio::sync::watch::Receiver<bool>,
) {
    let mut next_tick = Instant::now() + tick_period;
    loop {
        if *cancel.borrow() {
            return;
        }

        let drain_deadline = Instant::now() + inbound_budget;
        loop {
            if Instant::now() >= drain_deadline {
                metrics.incr_counter("engine.inbound_budget_exceeded", 1);
                break;
            }
            match tokio::time::timeout_at(drain_deadline, inbound_rx.recv()).await {
                Ok(Some(event)) => {
                    for out in engine.handle_inbound(event).await {
                        if outbound_tx.send(out).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(None) => return,
                Err(_elapsed) => break,
            }
        }

        for out in engine.run_periodic().await {
            if outbound_tx.send(out).await.is_err() {
                return;
            }
        }

        *admin_snapshot.write().await = engine.snapshot();

        metrics.incr_counter("engine.ticks", 1);
        let now = Instant::now();
        if now > next_tick {
            metrics.incr_counter("engine.tick_overrun", 1);
            next_tick = now;
        }
        tokio::select! {
            _ = tokio::time::sleep_until(next_tick) => {}
            _ = cancel.changed() => { if *cancel.borrow() { return; } }
        }
        next_tick += tick_period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_shared::{FakeClock, InMemoryMetrics, NoopMetrics, StdGameRng};
    use ambonmud_shared::repository::InMemoryPlayerRepository;
    use std::collections::BTreeMap as Map;

    fn test_world() -> World {
        let room = ambonmud_domain::RoomId::new("zone:start").unwrap();
        let mut rooms = Map::new();
        rooms.insert(room.clone(), ambonmud_domain::Room::new(room.clone(), "Start", "desc"));
        World {
            rooms,
            start_room: room,
            mob_spawns: Vec::new(),
            item_spawns: Vec::new(),
            zone_lifespans_minutes: Map::new(),
            shop_definitions: Vec::new(),
            quest_definitions: Vec::new(),
        }
    }

    fn test_engine() -> GameEngine {
        let world = test_world();
        let respawn_room = world.start_room.clone();
        let deps = EngineDeps {
            world,
            ability_defs: Map::new(),
            status_defs: Map::new(),
            dialogue_trees: Map::new(),
            respawn_room,
            max_level: 50,
            clock: Arc::new(FakeClock::new(0)),
            rng: Arc::new(StdGameRng::from_seed(1)),
            metrics: Arc::new(NoopMetrics),
            repository: Arc::new(InMemoryPlayerRepository::new()),
            config: GameplayConfig::default(),
        };
        GameEngine::new(deps)
    }

    #[tokio::test]
    async fn connecting_prompts_for_a_name() {
        let mut engine = test_engine();
        let sid = SessionId(1);
        let events = engine
            .handle_inbound(InboundEvent::Connected { session_id: sid, transport: TransportKind::Telnet, ansi_enabled: false })
            .await;
        assert!(matches!(events.as_slice(), [OutboundEvent::SendText { .. }]));
    }

    #[tokio::test]
    async fn full_login_then_look_reaches_in_game_and_renders_room() {
        let mut engine = test_engine();
        let sid = SessionId(2);
        engine.handle_inbound(InboundEvent::Connected { session_id: sid, transport: TransportKind::Telnet, ansi_enabled: false }).await;
        for line in ["Alice", "yes", "secret", "Warrior", "Human"] {
            engine.handle_inbound(InboundEvent::LineReceived { session_id: sid, text: line.to_string() }).await;
        }
        let events = engine.handle_inbound(InboundEvent::LineReceived { session_id: sid, text: "look".to_string() }).await;
        assert!(events.iter().any(|e| matches!(e, OutboundEvent::SendGmcp { package, .. } if package == "Room.Info")));
    }

    #[tokio::test]
    async fn disconnect_purges_derived_state_without_panicking() {
        let mut engine = test_engine();
        let sid = SessionId(3);
        engine.handle_inbound(InboundEvent::Connected { session_id: sid, transport: TransportKind::Telnet, ansi_enabled: false }).await;
        engine.handle_inbound(InboundEvent::Disconnected { session_id: sid, reason: DisconnectReason::Eof }).await;
        assert!(engine.player_registry.get(sid).is_none());
    }

    #[test]
    fn metrics_counter_helper_compiles() {
        let metrics = InMemoryMetrics::new();
        metrics.incr_counter("x", 1);
        assert_eq!(metrics.counter("x"), 1);
    }

    #[tokio::test]
    async fn a_dot_tick_that_kills_a_mob_credits_its_source_with_xp_and_gold() {
        let mut world = test_world();
        let room = world.start_room.clone();
        world.mob_spawns.push(ambonmud_domain::MobSpawn {
            id: MobId::new("zone:rat").unwrap(),
            name: "a rat".to_string(),
            room_id: room.clone(),
            max_hp: 5,
            min_damage: 1,
            max_damage: 1,
            armor: 0,
            xp_reward: 10,
            drops: Vec::new(),
            respawn_seconds: None,
            gold_min: 2,
            gold_max: 2,
            dialogue_id: None,
            behavior_tree: None,
            quest_ids: Vec::new(),
        });

        let ignite = ambonmud_domain::StatusEffectDef {
            id: ambonmud_domain::StatusEffectId::new("ignite"),
            display_name: "Ignite".to_string(),
            effect_type: ambonmud_domain::EffectType::Dot,
            duration_ms: 2_000,
            tick_interval_ms: 1_000,
            tick_min: 5,
            tick_max: 5,
            shield_amount: 0,
            stat_mods: ambonmud_domain::StatMods::default(),
            stack_behavior: ambonmud_domain::StackBehavior::Refresh,
            max_stacks: 1,
        };
        let mut status_defs = Map::new();
        status_defs.insert(ignite.id.clone(), ignite.clone());

        let clock = Arc::new(FakeClock::new(0));
        let deps = EngineDeps {
            world,
            ability_defs: Map::new(),
            status_defs,
            dialogue_trees: Map::new(),
            respawn_room: room.clone(),
            max_level: 50,
            clock: clock.clone(),
            rng: Arc::new(StdGameRng::from_seed(1)),
            metrics: Arc::new(NoopMetrics),
            repository: Arc::new(InMemoryPlayerRepository::new()),
            config: GameplayConfig::default(),
        };
        let mut engine = GameEngine::new(deps);

        let sid = SessionId(1);
        engine.handle_inbound(InboundEvent::Connected { session_id: sid, transport: TransportKind::Telnet, ansi_enabled: false }).await;
        for line in ["Alice", "yes", "secret", "Warrior", "Human"] {
            engine.handle_inbound(InboundEvent::LineReceived { session_id: sid, text: line.to_string() }).await;
        }

        let mob_id = MobId::new("zone:rat").unwrap();
        engine.status_engine.apply(crate::status_effect::Target::Mob(mob_id.clone()), &ignite, 0, Some(sid));

        clock.advance(1_000);
        engine.run_periodic().await;

        assert!(engine.mob_registry.get(&mob_id).is_none());
        let player = engine.player_registry.get(sid).unwrap();
        assert_eq!(player.xp_total, 10);
        let dropped = engine.item_registry.room_items(&room);
        assert_eq!(dropped.len(), 1);
        assert!(dropped[0].item.is_currency);
        assert_eq!(dropped[0].item.base_price, 2);
    }

    #[tokio::test]
    async fn a_dead_mob_respawns_through_the_scheduler_once_its_delay_elapses() {
        let mut world = test_world();
        let room = world.start_room.clone();
        let mob_id = MobId::new("zone:rat").unwrap();
        world.mob_spawns.push(ambonmud_domain::MobSpawn {
            id: mob_id.clone(),
            name: "a rat".to_string(),
            room_id: room.clone(),
            max_hp: 5,
            min_damage: 1,
            max_damage: 1,
            armor: 0,
            xp_reward: 10,
            drops: Vec::new(),
            respawn_seconds: Some(30),
            gold_min: 0,
            gold_max: 0,
            dialogue_id: None,
            behavior_tree: None,
            quest_ids: Vec::new(),
        });

        let clock = Arc::new(FakeClock::new(0));
        let deps = EngineDeps {
            world,
            ability_defs: Map::new(),
            status_defs: Map::new(),
            dialogue_trees: Map::new(),
            respawn_room: room,
            max_level: 50,
            clock: clock.clone(),
            rng: Arc::new(StdGameRng::from_seed(1)),
            metrics: Arc::new(NoopMetrics),
            repository: Arc::new(InMemoryPlayerRepository::new()),
            config: GameplayConfig::default(),
        };
        let mut engine = GameEngine::new(deps);

        assert!(engine.mob_registry.get(&mob_id).is_some());
        engine.mob_registry.remove(&mob_id);
        engine.schedule_respawn(&mob_id);
        assert_eq!(engine.scheduler.pending_len(), 1);

        clock.advance(29_999);
        engine.run_periodic().await;
        assert!(engine.mob_registry.get(&mob_id).is_none());

        clock.advance(1);
        engine.run_periodic().await;
        assert!(engine.mob_registry.get(&mob_id).is_some());
    }
}
