//! Error taxonomy for the engine crate. Mirrors the seven failure classes
//! the core distinguishes: protocol violations, world-load errors,
//! scheduler action failures, transport I/O failures, command-level user
//! errors, persistence failures, and duplicate gateway leases.

use thiserror::Error;

/// A telnet framing abuse guard was tripped. The transport closes the
/// session; the engine never sees this as a panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("line exceeded maximum length of {max} bytes")]
    LineTooLong { max: usize },

    #[error("too many non-printable bytes in a single line (max {max})")]
    TooManyNonPrintable { max: usize },

    #[error("subnegotiation payload exceeded maximum length of {max} bytes")]
    SubnegotiationTooLong { max: usize },
}

/// Fatal at startup: malformed zone document, dangling reference, duplicate
/// id, invalid slot, out-of-range drop chance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldLoadError {
    #[error("zone '{zone}': zone name must not be blank")]
    BlankZone { zone: String },

    #[error("zone '{zone}': document declares no rooms")]
    NoRooms { zone: String },

    #[error("zone '{zone}': startRoom '{room}' does not exist in this document")]
    MissingStartRoom { zone: String, room: String },

    #[error("room '{room_id}' is defined more than once (zone '{zone}')")]
    DuplicateRoom { zone: String, room_id: String },

    #[error("room '{room_id}' exit '{direction}' targets unknown room '{target}'")]
    DanglingExit {
        room_id: String,
        direction: String,
        target: String,
    },

    #[error("mob '{mob_id}' placed in unknown room '{room_id}'")]
    DanglingMobRoom { mob_id: String, room_id: String },

    #[error("item '{item_id}' placed in unknown room '{room_id}'")]
    DanglingItemRoom { item_id: String, room_id: String },

    #[error("mob '{mob_id}' drop chance {chance} is out of range [0,1]")]
    InvalidDropChance { mob_id: String, chance: f64 },

    #[error("mob '{mob_id}' references unknown drop item '{item_id}'")]
    DanglingDropItem { mob_id: String, item_id: String },

    #[error("item '{item_id}' declares both a room and a mob placement")]
    CombinedPlacement { item_id: String },

    #[error("item '{item_id}' has an invalid slot '{slot}'")]
    InvalidSlot { item_id: String, slot: String },

    #[error("item '{item_id}' field '{field}' must be non-negative, got {value}")]
    NegativeField {
        item_id: String,
        field: &'static str,
        value: f64,
    },

    #[error("zone '{zone}' declares inconsistent lifespan minutes across documents ({a} vs {b})")]
    InconsistentLifespan { zone: String, a: u64, b: u64 },

    #[error("startRoom '{room}' does not exist in the merged world")]
    MissingMergedStartRoom { room: String },

    #[error("failed to read zone document '{path}'")]
    ReadFailed { path: String },

    #[error("failed to parse zone document '{path}': {reason}")]
    ParseFailed { path: String, reason: String },
}

/// A user-visible, non-fatal failure reported back to a command's actor.
/// Never logged as an error; never mutates state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserError(pub String);

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
