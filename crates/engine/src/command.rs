//! Parses an in-game input line into a verb and arguments and dispatches
//! it to the matching handler. Handlers mutate registries directly and
//! return the `OutboundEvent`s to emit; unknown verbs, missing targets,
//! and similar user mistakes return a plain message and never log as an
//! error, per the command-level user error contract.

use std::collections::BTreeMap;

use ambonmud_domain::{
    Direction, EquipResult, GiveResult, MobId, OutboundEvent, SessionId, Slot, StatusEffectDef,
    StatusEffectId, UseResult, World,
};

use crate::ability::{AbilityEngine, AbilityRegistry};
use crate::combat::CombatEngine;
use crate::dialogue::{DialogueEngine, DialogueTree};
use crate::registry::item::PickedUp;
use crate::registry::{ItemRegistry, MobRegistry, PlayerRegistry};
use crate::render;
use crate::status_effect::StatusEffectEngine;

pub struct CommandContext<'a> {
    pub world: &'a World,
    pub player_registry: &'a mut PlayerRegistry,
    pub mob_registry: &'a mut MobRegistry,
    pub item_registry: &'a mut ItemRegistry,
    pub ability_registry: &'a AbilityRegistry,
    pub ability_engine: &'a mut AbilityEngine,
    pub status_engine: &'a mut StatusEffectEngine,
    pub status_defs: &'a BTreeMap<StatusEffectId, StatusEffectDef>,
    pub combat_engine: &'a mut CombatEngine,
    pub dialogue_engine: &'a mut DialogueEngine,
    pub dialogue_trees: &'a BTreeMap<MobId, DialogueTree>,
    pub now_ms: i64,
}

/// Parse and run one in-game input line.
pub fn dispatch(session_id: SessionId, line: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or("").to_ascii_lowercase();
    let rest = parts.next().unwrap_or("").trim();

    if let Some(direction) = Direction::parse(&verb) {
        return handle_move(session_id, direction, ctx);
    }

    match verb.as_str() {
        "look" | "l" => handle_look(session_id, ctx),
        "kill" | "attack" | "k" => handle_kill(session_id, rest, ctx),
        "cast" | "c" => handle_cast(session_id, rest, ctx),
        "equip" | "wear" | "wield" => handle_equip(session_id, rest, ctx),
        "remove" | "unequip" => handle_unequip(session_id, rest, ctx),
        "use" | "quaff" => handle_use(session_id, rest, ctx),
        "get" | "take" => handle_get(session_id, rest, ctx),
        "drop" => handle_drop(session_id, rest, ctx),
        "give" => handle_give(session_id, rest, ctx),
        "inventory" | "inv" | "i" => handle_inventory(session_id, ctx),
        "say" => handle_say(session_id, rest, ctx),
        "talk" | "greet" => handle_talk(session_id, rest, ctx),
        "say-to" | "choose" => handle_choose(session_id, rest, ctx),
        _ => vec![render::send_info(session_id, format!("I don't understand '{verb}'."))],
    }
}

fn handle_look(session_id: SessionId, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let Some(room) = ctx.world.rooms.get(&player.room_id) else {
        return vec![render::send_info(session_id, "You are nowhere.")];
    };
    let mobs: Vec<_> = ctx.mob_registry.in_room(&player.room_id).collect();
    let players: Vec<_> = ctx.player_registry.in_room(&player.room_id).collect();
    vec![
        render::room_info(session_id, room, &mobs, &players),
        render::room_items(session_id, ctx.item_registry.room_items(&player.room_id)),
    ]
}

fn handle_move(session_id: SessionId, direction: Direction, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let old_room = player.room_id.clone();
    let Some(room) = ctx.world.rooms.get(&old_room) else { return Vec::new() };
    let Some(target) = room.exits.get(&direction).cloned() else {
        return vec![render::send_info(session_id, "You can't go that way.")];
    };

    let mut events = render::broadcast_room(ctx.player_registry, &old_room, Some(session_id), {
        let name = player.name.clone();
        move |sid| render::room_remove_player(sid, &name)
    });

    ctx.player_registry.move_to(session_id, target.clone());
    ctx.combat_engine.disengage_session(session_id);
    ctx.dialogue_engine.on_player_moved(session_id);

    let Some(player) = ctx.player_registry.get(session_id) else { return events };
    events.extend(render::broadcast_room(ctx.player_registry, &target, Some(session_id), {
        let name = player.name.clone();
        move |sid| render::room_add_player(sid, &name)
    }));

    if let Some(room) = ctx.world.rooms.get(&target) {
        let mobs: Vec<_> = ctx.mob_registry.in_room(&target).collect();
        let players: Vec<_> = ctx.player_registry.in_room(&target).collect();
        events.push(render::room_info(session_id, room, &mobs, &players));
        events.push(render::room_items(session_id, ctx.item_registry.room_items(&target)));
    }
    events
}

fn handle_kill(session_id: SessionId, target_name: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if target_name.is_empty() {
        return vec![render::send_info(session_id, "Kill whom?")];
    }
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let Some(mob) = ctx.mob_registry.find_in_room_by_name(&player.room_id, target_name) else {
        return vec![render::send_info(session_id, format!("There is no '{target_name}' here."))];
    };
    let mob_id = mob.id.clone();
    ctx.combat_engine.engage(session_id, mob_id, ctx.now_ms);
    vec![render::send_info(session_id, format!("You attack {}!", mob.name))]
}

fn handle_cast(session_id: SessionId, args: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or("");
    let target_keyword = parts.next().map(str::trim).filter(|s| !s.is_empty());
    if keyword.is_empty() {
        return vec![render::send_info(session_id, "Cast what?")];
    }

    let current_target = ctx.combat_engine.current_target(session_id).cloned();
    let Some(player) = ctx.player_registry.get_mut(session_id) else { return Vec::new() };

    match ctx.ability_engine.cast(
        ctx.ability_registry,
        player,
        keyword,
        target_keyword,
        current_target.as_ref(),
        ctx.mob_registry,
        ctx.status_engine,
        ctx.status_defs,
        ctx.now_ms,
    ) {
        Ok(success) => {
            let mut events = success.events;
            if let Some(mob_id) = success.mob_killed {
                ctx.mob_registry.remove(&mob_id);
                ctx.combat_engine.on_mob_removed(&mob_id);
                ctx.item_registry.drop_mob_items_to_room(&mob_id, player.room_id.clone());
                events.push(render::send_info(session_id, "The mob collapses."));
            }
            events
        }
        Err(message) => vec![render::send_info(session_id, message)],
    }
}

fn handle_equip(session_id: SessionId, keyword: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if keyword.is_empty() {
        return vec![render::send_info(session_id, "Equip what?")];
    }
    match ctx.item_registry.equip(session_id, keyword) {
        EquipResult::Equipped { slot } => vec![render::send_info(session_id, format!("You equip it in your {slot:?} slot."))],
        EquipResult::NotFound => vec![render::send_info(session_id, "You don't have that.")],
        EquipResult::NotWearable => vec![render::send_info(session_id, "You can't wear that.")],
        EquipResult::SlotOccupied { .. } => vec![render::send_info(session_id, "That slot is already occupied.")],
    }
}

fn handle_unequip(session_id: SessionId, keyword: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    let Some(slot) = Slot::parse(keyword) else {
        return vec![render::send_info(session_id, "Remove what?")];
    };
    match ctx.item_registry.unequip(session_id, slot) {
        EquipResult::Equipped { .. } => vec![render::send_info(session_id, "You remove it.")],
        _ => vec![render::send_info(session_id, "You have nothing equipped there.")],
    }
}

fn handle_use(session_id: SessionId, keyword: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if keyword.is_empty() {
        return vec![render::send_info(session_id, "Use what?")];
    }
    match ctx.item_registry.use_item(session_id, keyword) {
        UseResult::Used { .. } => {
            let Some(player) = ctx.player_registry.get_mut(session_id) else { return Vec::new() };
            vec![render::send_info(session_id, "You use it."), render::char_vitals(player)]
        }
        UseResult::NotFound => vec![render::send_info(session_id, "You don't have that.")],
        UseResult::NotUsable => vec![render::send_info(session_id, "You can't use that.")],
    }
}

fn handle_get(session_id: SessionId, keyword: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if keyword.is_empty() {
        return vec![render::send_info(session_id, "Get what?")];
    }
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let room_id = player.room_id.clone();
    match ctx.item_registry.pick_up(session_id, &room_id, keyword) {
        Some(PickedUp::Item(_)) => vec![render::send_info(session_id, "You pick it up.")],
        Some(PickedUp::Gold(amount)) => {
            if let Some(player) = ctx.player_registry.get_mut(session_id) {
                player.gold += amount as u64;
            }
            vec![render::send_info(session_id, format!("You pick up {amount} gold."))]
        }
        None => vec![render::send_info(session_id, "You don't see that here.")],
    }
}

fn handle_drop(session_id: SessionId, keyword: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if keyword.is_empty() {
        return vec![render::send_info(session_id, "Drop what?")];
    }
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let room_id = player.room_id.clone();
    match ctx.item_registry.drop(session_id, room_id, keyword) {
        Some(_) => vec![render::send_info(session_id, "You drop it.")],
        None => vec![render::send_info(session_id, "You aren't carrying that.")],
    }
}

fn handle_give(session_id: SessionId, args: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let item_keyword = parts.next().unwrap_or("");
    let recipient_name = parts.next().map(str::trim).unwrap_or("");
    if item_keyword.is_empty() || recipient_name.is_empty() {
        return vec![render::send_info(session_id, "Give what to whom?")];
    }
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let room_id = player.room_id.clone();
    let recipient = ctx
        .player_registry
        .in_room(&room_id)
        .find(|p| p.name.eq_ignore_ascii_case(recipient_name))
        .map(|p| p.session_id);

    let Some(recipient) = recipient else {
        return vec![render::send_info(session_id, format!("{recipient_name} isn't here."))];
    };

    match ctx.item_registry.give(session_id, recipient, true, item_keyword) {
        GiveResult::Given => vec![render::send_info(session_id, "Given.")],
        GiveResult::NotFound => vec![render::send_info(session_id, "You aren't carrying that.")],
        GiveResult::RecipientNotInRoom => vec![render::send_info(session_id, "They aren't here.")],
    }
}

fn handle_inventory(session_id: SessionId, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    let names: Vec<String> = ctx.item_registry.inventory(session_id).iter().map(|i| i.item.display_name.clone()).collect();
    if names.is_empty() {
        vec![render::send_info(session_id, "You are carrying nothing.")]
    } else {
        vec![render::send_info(session_id, format!("You are carrying: {}", names.join(", ")))]
    }
}

fn handle_say(session_id: SessionId, text: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if text.is_empty() {
        return vec![render::send_info(session_id, "Say what?")];
    }
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let room_id = player.room_id.clone();
    let name = player.name.clone();
    let mut events = vec![render::send_text(session_id, format!("You say, '{text}'"))];
    events.extend(render::broadcast_room(ctx.player_registry, &room_id, Some(session_id), {
        let text = text.to_string();
        move |sid| render::send_text(sid, format!("{name} says, '{text}'"))
    }));
    events
}

fn handle_talk(session_id: SessionId, target_name: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if target_name.is_empty() {
        return vec![render::send_info(session_id, "Talk to whom?")];
    }
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let Some(mob) = ctx.mob_registry.find_in_room_by_name(&player.room_id, target_name) else {
        return vec![render::send_info(session_id, format!("There is no '{target_name}' here."))];
    };
    let mob_id = mob.id.clone();
    let Some(tree) = ctx.dialogue_trees.get(&mob_id) else {
        return vec![render::send_info(session_id, "They have nothing to say.")];
    };
    let level = player.level;
    let class = player.class;
    ctx.dialogue_engine.start(session_id, mob_id, tree, level, class)
}

fn handle_choose(session_id: SessionId, key: &str, ctx: &mut CommandContext) -> Vec<OutboundEvent> {
    if key.is_empty() {
        return vec![render::send_info(session_id, "Choose what?")];
    }
    let Some(player) = ctx.player_registry.get(session_id) else { return Vec::new() };
    let (level, class) = (player.level, player.class);
    let Some(mob_id) = ctx.dialogue_engine.current_mob(session_id).cloned() else {
        return vec![render::send_info(session_id, "You aren't talking to anyone.")];
    };
    let Some(tree) = ctx.dialogue_trees.get(&mob_id) else { return Vec::new() };
    ctx.dialogue_engine.choose(session_id, key, tree, level, class).unwrap_or_else(|| {
        vec![render::send_info(session_id, "That isn't a choice right now.")]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambonmud_domain::{PlayerClass, Race, RoomId};

    fn two_room_world() -> World {
        let start = RoomId::new("zone:start").unwrap();
        let plaza = RoomId::new("zone:plaza").unwrap();
        let mut start_room = ambonmud_domain::Room::new(start.clone(), "Start Room", "Where journeys begin.");
        start_room.exits.insert(Direction::North, plaza.clone());
        let plaza_room = ambonmud_domain::Room::new(plaza.clone(), "Plaza", "A busy plaza.");
        let mut rooms = BTreeMap::new();
        rooms.insert(start.clone(), start_room);
        rooms.insert(plaza.clone(), plaza_room);
        World {
            rooms,
            start_room: start,
            mob_spawns: Vec::new(),
            item_spawns: Vec::new(),
            zone_lifespans_minutes: BTreeMap::new(),
            shop_definitions: Vec::new(),
            quest_definitions: Vec::new(),
        }
    }

    #[test]
    fn moving_north_crosses_the_exit_and_renders_the_new_room() {
        let world = two_room_world();
        let sid = SessionId(1);
        let mut player_registry = PlayerRegistry::new();
        player_registry.connect(sid, world.start_room.clone());
        player_registry.finalize_login_new(
            sid,
            "Alice".to_string(),
            PlayerClass::Warrior,
            Race::Human,
            world.start_room.clone(),
        );
        let mut mob_registry = MobRegistry::new();
        let mut item_registry = ItemRegistry::new();
        let ability_registry = AbilityRegistry::new();
        let mut ability_engine = AbilityEngine::new();
        let mut status_engine = StatusEffectEngine::new();
        let status_defs = BTreeMap::new();
        let mut combat_engine = CombatEngine::new(1000);
        let mut dialogue_engine = DialogueEngine::new();
        let dialogue_trees = BTreeMap::new();

        let mut ctx = CommandContext {
            world: &world,
            player_registry: &mut player_registry,
            mob_registry: &mut mob_registry,
            item_registry: &mut item_registry,
            ability_registry: &ability_registry,
            ability_engine: &mut ability_engine,
            status_engine: &mut status_engine,
            status_defs: &status_defs,
            combat_engine: &mut combat_engine,
            dialogue_engine: &mut dialogue_engine,
            dialogue_trees: &dialogue_trees,
            now_ms: 0,
        };

        let events = dispatch(sid, "north", &mut ctx);

        let plaza = RoomId::new("zone:plaza").unwrap();
        assert_eq!(player_registry.get(sid).unwrap().room_id, plaza);
        assert!(events.iter().any(|e| matches!(e, OutboundEvent::SendGmcp { package, .. } if package == "Room.Info")));
    }

    #[test]
    fn moving_a_direction_with_no_exit_reports_the_failure_and_does_not_move() {
        let world = two_room_world();
        let sid = SessionId(1);
        let mut player_registry = PlayerRegistry::new();
        player_registry.connect(sid, world.start_room.clone());
        player_registry.finalize_login_new(
            sid,
            "Alice".to_string(),
            PlayerClass::Warrior,
            Race::Human,
            world.start_room.clone(),
        );
        let mut mob_registry = MobRegistry::new();
        let mut item_registry = ItemRegistry::new();
        let ability_registry = AbilityRegistry::new();
        let mut ability_engine = AbilityEngine::new();
        let mut status_engine = StatusEffectEngine::new();
        let status_defs = BTreeMap::new();
        let mut combat_engine = CombatEngine::new(1000);
        let mut dialogue_engine = DialogueEngine::new();
        let dialogue_trees = BTreeMap::new();

        let mut ctx = CommandContext {
            world: &world,
            player_registry: &mut player_registry,
            mob_registry: &mut mob_registry,
            item_registry: &mut item_registry,
            ability_registry: &ability_registry,
            ability_engine: &mut ability_engine,
            status_engine: &mut status_engine,
            status_defs: &status_defs,
            combat_engine: &mut combat_engine,
            dialogue_engine: &mut dialogue_engine,
            dialogue_trees: &dialogue_trees,
            now_ms: 0,
        };

        let events = dispatch(sid, "south", &mut ctx);

        assert_eq!(player_registry.get(sid).unwrap().room_id, world.start_room);
        assert!(matches!(events.as_slice(), [OutboundEvent::SendInfo { text, .. }] if text == "You can't go that way."));
    }
}
