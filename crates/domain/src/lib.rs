//! AmbonMUD Domain - core value types, world model, and invariants.
//!
//! This crate holds only pure data and the invariants that can be checked
//! without I/O: identifiers, the immutable world model, live player/mob
//! state, items, status effects, abilities, and the inbound/outbound event
//! types. Everything that performs I/O or owns mutable registries lives in
//! `ambonmud-engine`.

pub mod ability;
pub mod error;
pub mod events;
pub mod ids;
pub mod item;
pub mod mob;
pub mod player;
pub mod status_effect;
pub mod world;

pub use ability::{AbilityDef, AbilityEffect, TargetKind};
pub use error::DomainError;
pub use events::{DisconnectReason, InboundEvent, OutboundEvent, TransportKind};
pub use ids::{AbilityId, ItemId, MobId, RoomId, SessionId, SessionIdGenerator, StatusEffectId};
pub use item::{EquipResult, GiveResult, Item, ItemInstance, OnUseEffect, Slot, StatBonuses, UseResult};
pub use mob::{BtMemory, MobState};
pub use player::{
    is_valid_player_name, CoreStats, LoginPhase, PlayerClass, PlayerRecord, PlayerState, Race,
    RenameResult,
};
pub use status_effect::{ActiveStatusEffect, EffectType, StackBehavior, StatMods, StatusEffectDef};
pub use world::{
    Direction, DoorSpec, DropEntry, ItemSpawn, MobSpawn, QuestDefinition, Room, ShopDefinition,
    World,
};
