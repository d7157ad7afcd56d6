//! Prompt-driven login state machine: name -> password (existing) or
//! create/confirm -> password -> class -> race (new). Drives
//! `PlayerRegistry` finalize methods and the `PlayerRepository` port.

use ambonmud_domain::{is_valid_player_name, LoginPhase, OutboundEvent, PlayerClass, Race, SessionId, World};
use ambonmud_shared::repository::PlayerRepository;
use ambonmud_shared::Clock;

use crate::auth::{hash_password, verify_password};
use crate::registry::player::{name_exists, to_player_record};
use crate::registry::PlayerRegistry;
use crate::render;

pub fn prompt_name(session_id: SessionId) -> Vec<OutboundEvent> {
    vec![render::send_text(session_id, "Enter your name:")]
}

/// Advance the login state machine by one input line. Returns the outbound
/// events to emit (prompts, confirmations, or the post-login GMCP burst).
pub async fn handle_line(
    session_id: SessionId,
    input: &str,
    registry: &mut PlayerRegistry,
    repository: &dyn PlayerRepository,
    world: &World,
    clock: &dyn Clock,
) -> Vec<OutboundEvent> {
    let input = input.trim();
    let Some(phase) = registry.get(session_id).map(|p| p.login_phase.clone()) else {
        return Vec::new();
    };

    match phase {
        LoginPhase::AwaitingName => handle_awaiting_name(session_id, input, registry, repository).await,
        LoginPhase::AwaitingPassword { name } => {
            handle_awaiting_password(session_id, input, &name, registry, repository, world, clock).await
        }
        LoginPhase::AwaitingCreateConfirmation { name } => {
            handle_create_confirmation(session_id, input, &name, registry)
        }
        LoginPhase::AwaitingNewPassword { name } => handle_new_password(session_id, input, &name, registry),
        LoginPhase::AwaitingClass { name, password_hash } => {
            handle_class(session_id, input, &name, &password_hash, registry)
        }
        LoginPhase::AwaitingRace { name, password_hash, class } => {
            handle_race(session_id, input, &name, &password_hash, class, registry, world)
        }
        LoginPhase::InGame => Vec::new(),
    }
}

async fn handle_awaiting_name(
    session_id: SessionId,
    input: &str,
    registry: &mut PlayerRegistry,
    repository: &dyn PlayerRepository,
) -> Vec<OutboundEvent> {
    if !is_valid_player_name(input) {
        return vec![render::send_info(
            session_id,
            "Names must be 2-20 characters, start with a letter, and contain only letters, digits, and underscores.",
        ), render::send_text(session_id, "Enter your name:")];
    }

    let exists = match name_exists(registry, repository, input).await {
        Ok(exists) => exists,
        Err(_) => {
            return vec![render::send_info(session_id, "The player database is unavailable. Try again shortly.")];
        }
    };

    let Some(player) = registry.get_mut(session_id) else { return Vec::new() };
    if exists {
        player.login_phase = LoginPhase::AwaitingPassword { name: input.to_string() };
        vec![render::send_text(session_id, "Enter your password:")]
    } else {
        player.login_phase = LoginPhase::AwaitingCreateConfirmation { name: input.to_string() };
        vec![render::send_text(session_id, format!("'{input}' is a new name. Create this character? (yes/no)"))]
    }
}

async fn handle_awaiting_password(
    session_id: SessionId,
    input: &str,
    name: &str,
    registry: &mut PlayerRegistry,
    repository: &dyn PlayerRepository,
    world: &World,
    clock: &dyn Clock,
) -> Vec<OutboundEvent> {
    let record = match repository.find_by_name(name).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            if let Some(player) = registry.get_mut(session_id) {
                player.login_phase = LoginPhase::AwaitingName;
            }
            return vec![render::send_info(session_id, "That character no longer exists."), render::send_text(session_id, "Enter your name:")];
        }
        Err(_) => return vec![render::send_info(session_id, "The player database is unavailable. Try again shortly.")],
    };

    if !verify_password(&name.to_ascii_lowercase(), input, &record.password_hash) {
        return vec![render::send_info(session_id, "Incorrect password."), render::send_text(session_id, "Enter your password:")];
    }

    let _ = world; // start room for existing players comes from the record.
    registry.finalize_login_existing(session_id, record);
    post_login_events(session_id, registry, clock)
}

fn handle_create_confirmation(
    session_id: SessionId,
    input: &str,
    name: &str,
    registry: &mut PlayerRegistry,
) -> Vec<OutboundEvent> {
    let Some(player) = registry.get_mut(session_id) else { return Vec::new() };
    match input.to_ascii_lowercase().as_str() {
        "y" | "yes" => {
            player.login_phase = LoginPhase::AwaitingNewPassword { name: name.to_string() };
            vec![render::send_text(session_id, "Choose a password:")]
        }
        "n" | "no" => {
            player.login_phase = LoginPhase::AwaitingName;
            vec![render::send_text(session_id, "Enter your name:")]
        }
        _ => vec![render::send_text(session_id, "Please answer yes or no:")],
    }
}

fn handle_new_password(
    session_id: SessionId,
    input: &str,
    name: &str,
    registry: &mut PlayerRegistry,
) -> Vec<OutboundEvent> {
    if input.is_empty() {
        return vec![render::send_info(session_id, "Password must not be empty."), render::send_text(session_id, "Choose a password:")];
    }
    let password_hash = hash_password(&name.to_ascii_lowercase(), input);
    let Some(player) = registry.get_mut(session_id) else { return Vec::new() };
    player.login_phase = LoginPhase::AwaitingClass { name: name.to_string(), password_hash };
    vec![render::send_text(session_id, "Choose a class: Warrior, Mage, Cleric, or Rogue:")]
}

fn handle_class(
    session_id: SessionId,
    input: &str,
    name: &str,
    password_hash: &str,
    registry: &mut PlayerRegistry,
) -> Vec<OutboundEvent> {
    let Some(class) = PlayerClass::parse(input) else {
        return vec![render::send_text(session_id, "Choose a class: Warrior, Mage, Cleric, or Rogue:")];
    };
    let Some(player) = registry.get_mut(session_id) else { return Vec::new() };
    player.login_phase = LoginPhase::AwaitingRace {
        name: name.to_string(),
        password_hash: password_hash.to_string(),
        class,
    };
    vec![render::send_text(session_id, "Choose a race: Human, Elf, Dwarf, or Orc:")]
}

fn handle_race(
    session_id: SessionId,
    input: &str,
    name: &str,
    password_hash: &str,
    class: PlayerClass,
    registry: &mut PlayerRegistry,
    world: &World,
) -> Vec<OutboundEvent> {
    let Some(race) = Race::parse(input) else {
        return vec![render::send_text(session_id, "Choose a race: Human, Elf, Dwarf, or Orc:")];
    };
    let _ = password_hash; // persisted by the caller once the record is first saved.
    registry.finalize_login_new(session_id, name.to_string(), class, race, world.start_room.clone());
    let mut events = post_login_events(session_id, registry, &ambonmud_shared::SystemClock);
    events.push(render::send_info(session_id, "Your character has been created."));
    events
}

fn post_login_events(session_id: SessionId, registry: &PlayerRegistry, _clock: &dyn Clock) -> Vec<OutboundEvent> {
    let Some(player) = registry.get(session_id) else { return Vec::new() };
    vec![render::char_name(player), render::char_vitals(player), render::send_prompt(session_id)]
}

/// Stamp and persist the freshly-created record; called by the engine after
/// `finalize_login_new` so the caller controls exactly when the repository
/// write happens (login finalize, per the persistence contract).
pub async fn persist_new_character(
    registry: &PlayerRegistry,
    repository: &dyn PlayerRepository,
    session_id: SessionId,
    password_hash: &str,
    clock: &dyn Clock,
) -> Result<(), ambonmud_shared::repository::RepositoryError> {
    let Some(player) = registry.get(session_id) else { return Ok(()) };
    let now = chrono::DateTime::from_timestamp_millis(clock.now_ms()).unwrap_or_else(chrono::Utc::now);
    let record = to_player_record(player, Vec::new(), Default::default(), password_hash.to_string(), now, clock);
    repository.save(&record).await
}
