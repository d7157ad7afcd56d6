//! Per-mob behavior trees: node primitives, named templates, and the
//! per-tick scheduling that walks due mobs through their tree.

use std::collections::{BTreeMap, BTreeSet};

use ambonmud_domain::{Direction, MobId, OutboundEvent, RoomId, SessionId, StatusEffectDef, StatusEffectId, World};
use ambonmud_shared::GameRng;

use crate::registry::{MobRegistry, PlayerRegistry};
use crate::render;
use crate::status_effect::{StatusEffectEngine, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtStatus {
    Success,
    Failure,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BtCondition {
    IsInCombat,
    IsHpBelow(f64),
    IsPlayerInRoom,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BtAction {
    Aggro,
    Wander,
    Patrol,
    Flee,
    Say(String),
    Stationary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BtNode {
    Selector(Vec<BtNode>),
    Sequence(Vec<BtNode>),
    Inverter(Box<BtNode>),
    Cooldown { key: String, ms: i64, child: Box<BtNode> },
    Condition(BtCondition),
    Action(BtAction),
}

/// Build the named template tree, or `None` if `name` is not recognized.
pub fn template(name: &str) -> Option<BtNode> {
    use BtAction::*;
    use BtCondition::*;
    use BtNode::*;

    Some(match name {
        "aggro_guard" => Selector(vec![
            Sequence(vec![Condition(IsPlayerInRoom), Action(Aggro)]),
            Action(Stationary),
        ]),
        "stationary_aggro" => Selector(vec![
            Sequence(vec![Condition(IsPlayerInRoom), Action(Aggro)]),
            Action(Stationary),
        ]),
        "patrol" => Action(Patrol),
        "patrol_aggro" => Selector(vec![
            Sequence(vec![Condition(IsPlayerInRoom), Action(Aggro)]),
            Action(Patrol),
        ]),
        "wander" => Action(Wander),
        "wander_aggro" => Selector(vec![
            Sequence(vec![Condition(IsPlayerInRoom), Action(Aggro)]),
            Action(Wander),
        ]),
        "coward" => Selector(vec![
            Sequence(vec![Condition(IsHpBelow(0.3)), Action(Flee)]),
            Sequence(vec![Condition(IsPlayerInRoom), Action(Aggro)]),
            Action(Wander),
        ]),
        _ => return None,
    })
}

/// Everything a tick of a single mob's tree needs; borrowed, not owned, so
/// the scheduler can reuse one context per mob per tick.
pub struct BtContext<'a> {
    pub mob_registry: &'a mut MobRegistry,
    pub player_registry: &'a PlayerRegistry,
    pub world: &'a World,
    pub rng: &'a dyn GameRng,
    pub now_ms: i64,
    pub in_combat: bool,
    pub events: Vec<OutboundEvent>,
    pub aggro_target: Option<SessionId>,
    pub fled: bool,
}

/// Tick `node` against the mob identified by `mob_id`, mutating its memory
/// in place via the registry.
pub fn tick(node: &BtNode, mob_id: &MobId, ctx: &mut BtContext) -> BtStatus {
    match node {
        BtNode::Selector(children) => {
            for child in children {
                match tick(child, mob_id, ctx) {
                    BtStatus::Failure => continue,
                    other => return other,
                }
            }
            BtStatus::Failure
        }
        BtNode::Sequence(children) => {
            for child in children {
                match tick(child, mob_id, ctx) {
                    BtStatus::Success => continue,
                    other => return other,
                }
            }
            BtStatus::Success
        }
        BtNode::Inverter(child) => match tick(child, mob_id, ctx) {
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
            BtStatus::Running => BtStatus::Running,
        },
        BtNode::Cooldown { key, ms, child } => {
            let last = ctx.mob_registry.get(mob_id).and_then(|m| m.memory.cooldown_timestamps.get(key)).copied();
            if let Some(last) = last {
                if ctx.now_ms - last < *ms {
                    return BtStatus::Failure;
                }
            }
            let result = tick(child, mob_id, ctx);
            if result == BtStatus::Success {
                if let Some(mob) = ctx.mob_registry.get_mut(mob_id) {
                    mob.memory.cooldown_timestamps.insert(key.clone(), ctx.now_ms);
                }
            }
            result
        }
        BtNode::Condition(condition) => tick_condition(*condition, mob_id, ctx),
        BtNode::Action(action) => tick_action(action, mob_id, ctx),
    }
}

fn tick_condition(condition: BtCondition, mob_id: &MobId, ctx: &BtContext) -> BtStatus {
    let Some(mob) = ctx.mob_registry.get(mob_id) else { return BtStatus::Failure };
    let success = match condition {
        BtCondition::IsInCombat => ctx.in_combat,
        BtCondition::IsHpBelow(pct) => (mob.hp as f64) < (mob.max_hp as f64) * pct,
        BtCondition::IsPlayerInRoom => ctx.player_registry.in_room(&mob.room_id).next().is_some(),
    };
    if success {
        BtStatus::Success
    } else {
        BtStatus::Failure
    }
}

fn tick_action(action: &BtAction, mob_id: &MobId, ctx: &mut BtContext) -> BtStatus {
    match action {
        BtAction::Stationary => BtStatus::Success,
        BtAction::Aggro => {
            let Some(mob) = ctx.mob_registry.get(mob_id) else { return BtStatus::Failure };
            let Some(player) = ctx.player_registry.in_room(&mob.room_id).next() else {
                return BtStatus::Failure;
            };
            ctx.aggro_target = Some(player.session_id);
            BtStatus::Success
        }
        BtAction::Say(message) => {
            let Some(mob) = ctx.mob_registry.get(mob_id) else { return BtStatus::Failure };
            let message = message.clone();
            ctx.events.extend(render::broadcast_room(ctx.player_registry, &mob.room_id, None, move |sid| {
                render::send_info(sid, message.clone())
            }));
            BtStatus::Success
        }
        BtAction::Wander => {
            let Some(mob) = ctx.mob_registry.get(mob_id) else { return BtStatus::Failure };
            let home_zone = mob_id.zone().to_string();
            let Some(room) = ctx.world.rooms.get(&mob.room_id) else { return BtStatus::Failure };
            let candidates: Vec<&RoomId> = room.exits.values().filter(|target| target.zone() == home_zone).collect();
            let Some(idx) = ctx.rng.choose_index(candidates.len()) else { return BtStatus::Failure };
            let destination = candidates[idx].clone();
            ctx.mob_registry.move_to_room(mob_id, destination);
            BtStatus::Success
        }
        BtAction::Patrol => {
            let Some(mob) = ctx.mob_registry.get(mob_id) else { return BtStatus::Failure };
            let Some(room) = ctx.world.rooms.get(&mob.room_id) else { return BtStatus::Failure };
            let waypoints: Vec<RoomId> = room.exits.values().cloned().collect();
            if waypoints.is_empty() {
                return BtStatus::Failure;
            }
            let next_index = mob.memory.patrol_index % waypoints.len();
            let destination = waypoints[next_index].clone();
            ctx.mob_registry.move_to_room(mob_id, destination);
            if let Some(mob) = ctx.mob_registry.get_mut(mob_id) {
                mob.memory.patrol_index = (next_index + 1) % waypoints.len().max(1);
            }
            BtStatus::Success
        }
        BtAction::Flee => {
            let Some(mob) = ctx.mob_registry.get(mob_id) else { return BtStatus::Failure };
            let Some(room) = ctx.world.rooms.get(&mob.room_id) else { return BtStatus::Failure };
            let Some(destination) = room.exits.values().next().cloned() else { return BtStatus::Failure };
            ctx.mob_registry.move_to_room(mob_id, destination);
            ctx.fled = true;
            BtStatus::Success
        }
    }
}

/// Owns each mob's tree and due-time bookkeeping; ticks a shuffled,
/// capped subset of due mobs per engine tick.
#[derive(Default)]
pub struct BehaviorScheduler {
    trees: BTreeMap<MobId, BtNode>,
    next_due_ms: BTreeMap<MobId, i64>,
    min_delay_ms: i64,
    max_delay_ms: i64,
}

/// One mob's aggro result for the combat subsystem to consume.
pub struct AggroRequest {
    pub mob_id: MobId,
    pub session_id: SessionId,
}

pub struct TickReport {
    pub events: Vec<OutboundEvent>,
    pub aggro_requests: Vec<AggroRequest>,
}

impl BehaviorScheduler {
    pub fn new(min_delay_ms: i64, max_delay_ms: i64) -> Self {
        Self {
            trees: BTreeMap::new(),
            next_due_ms: BTreeMap::new(),
            min_delay_ms: min_delay_ms.max(0),
            max_delay_ms: max_delay_ms.max(min_delay_ms.max(0)),
        }
    }

    pub fn register(&mut self, mob_id: MobId, tree: BtNode, now_ms: i64, rng: &dyn GameRng) {
        let due = now_ms + rng.roll_range(self.min_delay_ms.max(0) as u32, self.max_delay_ms.max(0) as u32) as i64;
        self.next_due_ms.insert(mob_id.clone(), due);
        self.trees.insert(mob_id, tree);
    }

    pub fn unregister(&mut self, mob_id: &MobId) {
        self.trees.remove(mob_id);
        self.next_due_ms.remove(mob_id);
    }

    pub fn run_tick(
        &mut self,
        now_ms: i64,
        max_actions_per_tick: usize,
        mob_registry: &mut MobRegistry,
        player_registry: &PlayerRegistry,
        status_engine: &StatusEffectEngine,
        status_defs: &BTreeMap<StatusEffectId, StatusEffectDef>,
        in_combat_mobs: &BTreeSet<MobId>,
        world: &World,
        rng: &dyn GameRng,
    ) -> TickReport {
        let mut due: Vec<MobId> = self
            .next_due_ms
            .iter()
            .filter(|(id, due_at)| **due_at <= now_ms && mob_registry.get(id).is_some())
            .map(|(id, _)| id.clone())
            .collect();
        shuffle(&mut due, rng);

        let mut events = Vec::new();
        let mut aggro_requests = Vec::new();
        let mut actions_run = 0;

        for mob_id in due {
            if actions_run >= max_actions_per_tick {
                break;
            }
            let delay = rng.roll_range(self.min_delay_ms as u32, self.max_delay_ms as u32) as i64;
            self.next_due_ms.insert(mob_id.clone(), now_ms + delay);

            if is_rooted(&mob_id, status_engine, status_defs) {
                continue;
            }
            let Some(tree) = self.trees.get(&mob_id) else { continue };
            let mut ctx = BtContext {
                mob_registry: &mut *mob_registry,
                player_registry,
                world,
                rng,
                now_ms,
                in_combat: in_combat_mobs.contains(&mob_id),
                events: Vec::new(),
                aggro_target: None,
                fled: false,
            };
            tick(tree, &mob_id, &mut ctx);
            events.extend(ctx.events);
            if let Some(session_id) = ctx.aggro_target {
                aggro_requests.push(AggroRequest { mob_id, session_id });
            }
            actions_run += 1;
        }

        TickReport { events, aggro_requests }
    }
}

fn is_rooted(mob_id: &MobId, status_engine: &StatusEffectEngine, status_defs: &BTreeMap<StatusEffectId, StatusEffectDef>) -> bool {
    status_engine.active_on(Target::Mob(mob_id.clone())).iter().any(|active| {
        status_defs.get(&active.definition_id).map(|def| def.effect_type == ambonmud_domain::EffectType::Root).unwrap_or(false)
    })
}

fn shuffle<T>(items: &mut [T], rng: &dyn GameRng) {
    for i in (1..items.len()).rev() {
        if let Some(j) = rng.choose_index(i + 1) {
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_domain::{BtMemory, MobState, Room};
    use ambonmud_shared::StdGameRng;

    fn world_with_two_rooms() -> World {
        let a = RoomId::new("zone:a").unwrap();
        let b = RoomId::new("zone:b").unwrap();
        let mut room_a = Room::new(a.clone(), "A", "Room A");
        room_a.exits.insert(Direction::North, b.clone());
        let room_b = Room::new(b.clone(), "B", "Room B");
        let mut rooms = BTreeMap::new();
        rooms.insert(a.clone(), room_a);
        rooms.insert(b.clone(), room_b);
        World {
            rooms,
            start_room: a,
            mob_spawns: Vec::new(),
            item_spawns: Vec::new(),
            zone_lifespans_minutes: BTreeMap::new(),
            shop_definitions: Vec::new(),
            quest_definitions: Vec::new(),
        }
    }

    fn test_mob(id: &str, room: RoomId) -> MobState {
        MobState {
            id: MobId::new(id).unwrap(),
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
            memory: BtMemory::default(),
        }
    }

    #[test]
    fn selector_returns_first_success() {
        let node = BtNode::Selector(vec![BtNode::Condition(BtCondition::IsPlayerInRoom), BtNode::Action(BtAction::Stationary)]);
        let world = world_with_two_rooms();
        let mut mob_registry = MobRegistry::new();
        let mob_id = MobId::new("zone:rat").unwrap();
        mob_registry.upsert(test_mob("zone:rat", world.start_room.clone()));
        let player_registry = PlayerRegistry::new();
        let rng = StdGameRng::from_seed(1);
        let mut ctx = BtContext {
            mob_registry: &mut mob_registry,
            player_registry: &player_registry,
            world: &world,
            rng: &rng,
            now_ms: 0,
            in_combat: false,
            events: Vec::new(),
            aggro_target: None,
            fled: false,
        };
        assert_eq!(tick(&node, &mob_id, &mut ctx), BtStatus::Success);
    }

    #[test]
    fn wander_moves_within_home_zone_only() {
        let world = world_with_two_rooms();
        let mut mob_registry = MobRegistry::new();
        let mob_id = MobId::new("zone:rat").unwrap();
        mob_registry.upsert(test_mob("zone:rat", world.start_room.clone()));
        let player_registry = PlayerRegistry::new();
        let rng = StdGameRng::from_seed(1);
        let mut ctx = BtContext {
            mob_registry: &mut mob_registry,
            player_registry: &player_registry,
            world: &world,
            rng: &rng,
            now_ms: 0,
            in_combat: false,
            events: Vec::new(),
            aggro_target: None,
            fled: false,
        };
        let status = tick(&BtNode::Action(BtAction::Wander), &mob_id, &mut ctx);
        assert_eq!(status, BtStatus::Success);
        assert_eq!(ctx.mob_registry.get(&mob_id).unwrap().room_id, RoomId::new("zone:b").unwrap());
    }

    #[test]
    fn cooldown_blocks_repeat_within_window() {
        let node = BtNode::Cooldown {
            key: "roar".to_string(),
            ms: 10_000,
            child: Box::new(BtNode::Action(BtAction::Stationary)),
        };
        let world = world_with_two_rooms();
        let mut mob_registry = MobRegistry::new();
        let mob_id = MobId::new("zone:rat").unwrap();
        mob_registry.upsert(test_mob("zone:rat", world.start_room.clone()));
        let player_registry = PlayerRegistry::new();
        let rng = StdGameRng::from_seed(1);
        let mut ctx = BtContext {
            mob_registry: &mut mob_registry,
            player_registry: &player_registry,
            world: &world,
            rng: &rng,
            now_ms: 0,
            in_combat: false,
            events: Vec::new(),
            aggro_target: None,
            fled: false,
        };
        assert_eq!(tick(&node, &mob_id, &mut ctx), BtStatus::Success);
        ctx.now_ms = 5_000;
        assert_eq!(tick(&node, &mob_id, &mut ctx), BtStatus::Failure);
        ctx.now_ms = 11_000;
        assert_eq!(tick(&node, &mob_id, &mut ctx), BtStatus::Success);
    }

    #[test]
    fn scheduler_respects_per_tick_cap() {
        let world = world_with_two_rooms();
        let mut mob_registry = MobRegistry::new();
        let mut scheduler = BehaviorScheduler::new(0, 0);
        let rng = StdGameRng::from_seed(7);
        for i in 0..5 {
            let id = MobId::new(format!("zone:rat{i}")).unwrap();
            mob_registry.upsert(test_mob(&format!("zone:rat{i}"), world.start_room.clone()));
            scheduler.register(id, template("wander").unwrap(), 0, &rng);
        }
        let player_registry = PlayerRegistry::new();
        let status_engine = StatusEffectEngine::new();
        let status_defs = BTreeMap::new();
        let in_combat = BTreeSet::new();
        let report = scheduler.run_tick(0, 2, &mut mob_registry, &player_registry, &status_engine, &status_defs, &in_combat, &world, &rng);
        assert!(report.aggro_requests.is_empty());
        let moved = mob_registry.iter().filter(|m| m.room_id == RoomId::new("zone:b").unwrap()).count();
        assert_eq!(moved, 2);
    }

    #[test]
    fn templates_are_all_recognized() {
        for name in ["aggro_guard", "stationary_aggro", "patrol", "patrol_aggro", "wander", "wander_aggro", "coward"] {
            assert!(template(name).is_some(), "missing template {name}");
        }
        assert!(template("unknown").is_none());
    }
}
