//! Player-facing value types: classes, stats, live session state, and the
//! durable record a `PlayerRepository` persists.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AbilityId, ItemId, RoomId, SessionId};
use crate::item::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerClass {
    Warrior,
    Mage,
    Cleric,
    Rogue,
}

impl PlayerClass {
    pub fn parse(input: &str) -> Option<PlayerClass> {
        match input.to_ascii_lowercase().as_str() {
            "w" | "warrior" => Some(PlayerClass::Warrior),
            "m" | "mage" => Some(PlayerClass::Mage),
            "c" | "cleric" => Some(PlayerClass::Cleric),
            "r" | "rogue" => Some(PlayerClass::Rogue),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PlayerClass::Warrior => "Warrior",
            PlayerClass::Mage => "Mage",
            PlayerClass::Cleric => "Cleric",
            PlayerClass::Rogue => "Rogue",
        }
    }

    /// Per-level HP granted by this class, used by the progression curve.
    pub fn hp_per_level(self) -> u32 {
        match self {
            PlayerClass::Warrior => 12,
            PlayerClass::Mage => 5,
            PlayerClass::Cleric => 8,
            PlayerClass::Rogue => 8,
        }
    }

    /// Per-level mana granted by this class.
    pub fn mana_per_level(self) -> u32 {
        match self {
            PlayerClass::Warrior => 2,
            PlayerClass::Mage => 10,
            PlayerClass::Cleric => 8,
            PlayerClass::Rogue => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Orc,
}

impl Race {
    pub fn parse(input: &str) -> Option<Race> {
        match input.to_ascii_lowercase().as_str() {
            "h" | "human" => Some(Race::Human),
            "e" | "elf" => Some(Race::Elf),
            "d" | "dwarf" => Some(Race::Dwarf),
            "o" | "orc" => Some(Race::Orc),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Race::Human => "Human",
            Race::Elf => "Elf",
            Race::Dwarf => "Dwarf",
            Race::Orc => "Orc",
        }
    }

    /// Flat bonus folded into `baseMaxHp` at character creation.
    pub fn base_hp_bonus(self) -> u32 {
        match self {
            Race::Human => 0,
            Race::Elf => -5,
            Race::Dwarf => 10,
            Race::Orc => 15,
        }
    }
}

/// The six core stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreStats {
    pub str_: u16,
    pub dex: u16,
    pub con: u16,
    pub int: u16,
    pub wis: u16,
    pub cha: u16,
}

impl Default for CoreStats {
    fn default() -> Self {
        Self {
            str_: 10,
            dex: 10,
            con: 10,
            int: 10,
            wis: 10,
            cha: 10,
        }
    }
}

/// The login-phase state machine's current position (see `login.rs` in the
/// engine crate for the transitions driving it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginPhase {
    AwaitingName,
    AwaitingPassword { name: String },
    AwaitingCreateConfirmation { name: String },
    AwaitingNewPassword { name: String },
    AwaitingClass { name: String, password_hash: String },
    AwaitingRace { name: String, password_hash: String, class: PlayerClass },
    InGame,
}

/// Live, mutable per-session player state. Owned exclusively by the engine
/// worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub session_id: SessionId,
    pub name: String,
    pub room_id: RoomId,
    pub class: PlayerClass,
    pub race: Race,
    pub level: u32,
    pub xp_total: u64,
    pub gold: u64,
    pub stats: CoreStats,
    pub hp: u32,
    pub max_hp: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub base_max_hp: u32,
    pub is_staff: bool,
    pub title: Option<String>,
    pub active_quests: BTreeSet<String>,
    pub completed_quests: BTreeSet<String>,
    pub achievements: BTreeSet<String>,
    pub ansi_enabled: bool,
    pub login_phase: LoginPhase,
    pub equipped: BTreeMap<Slot, ItemId>,
    pub known_abilities: BTreeSet<AbilityId>,
}

impl PlayerState {
    /// `0 <= hp <= maxHp` and `0 <= mana <= maxMana`.
    pub fn vitals_in_range(&self) -> bool {
        self.hp <= self.max_hp && self.mana <= self.max_mana
    }
}

/// The durable counterpart of [`PlayerState`], persisted by a
/// `PlayerRepository` (see `ambonmud-shared::repository`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub password_hash: String,
    pub class: PlayerClass,
    pub race: Race,
    pub level: u32,
    pub xp_total: u64,
    pub gold: u64,
    pub stats: CoreStats,
    pub base_max_hp: u32,
    pub room_id: RoomId,
    pub inventory_item_ids: Vec<ItemId>,
    pub equipped_item_ids: BTreeMap<Slot, ItemId>,
    pub active_quests: BTreeSet<String>,
    pub completed_quests: BTreeSet<String>,
    pub achievements: BTreeSet<String>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

/// Result of a rename attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenameResult {
    Ok,
    Invalid,
    Taken,
}

/// Name rules: 2-20 chars, `[A-Za-z][A-Za-z0-9_]*`.
pub fn is_valid_player_name(name: &str) -> bool {
    if name.len() < 2 || name.len() > 20 {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_player_name("Alice"));
        assert!(is_valid_player_name("bob_2"));
        assert!(is_valid_player_name("ab"));
    }

    #[test]
    fn invalid_names() {
        assert!(!is_valid_player_name("a"));
        assert!(!is_valid_player_name("1bob"));
        assert!(!is_valid_player_name("_bob"));
        assert!(!is_valid_player_name(&"a".repeat(21)));
        assert!(!is_valid_player_name("bad name"));
    }
}
