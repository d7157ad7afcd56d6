//! Live, mutable engine-owned state: players, mobs, and items. Every
//! registry here is private to the engine worker; no synchronization is
//! needed because only the worker ever mutates them.

pub mod item;
pub mod mob;
pub mod player;

pub use item::ItemRegistry;
pub use mob::MobRegistry;
pub use player::PlayerRegistry;
