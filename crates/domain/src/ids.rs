//! Identifier types.
//!
//! `RoomId`, `MobId` and `ItemId` share the `"<zone>:<local>"` namespaced
//! shape described in the world model. `SessionId` is an opaque 64-bit
//! integer; `AbilityId` and `StatusEffectId` are flat definition keys.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Error returned when a namespaced id string is missing its `zone:local`
/// separator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("id {0:?} is missing the required ':' separator between zone and local id")]
pub struct MissingZoneSeparator(pub String);

macro_rules! define_namespaced_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Arc<str>);

        impl $name {
            /// Build an id from an already-qualified `"<zone>:<local>"` string.
            pub fn new(qualified: impl Into<String>) -> Result<Self, MissingZoneSeparator> {
                let qualified = qualified.into();
                if !qualified.contains(':') {
                    return Err(MissingZoneSeparator(qualified));
                }
                Ok(Self(Arc::from(qualified.as_str())))
            }

            /// Qualify a possibly-bare local id with `zone`, leaving an
            /// already-qualified id untouched.
            pub fn qualify(zone: &str, local_or_qualified: &str) -> Result<Self, MissingZoneSeparator> {
                if local_or_qualified.contains(':') {
                    Self::new(local_or_qualified.to_string())
                } else {
                    Self::new(format!("{zone}:{local_or_qualified}"))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The zone segment (before the first `:`).
            pub fn zone(&self) -> &str {
                self.0.split_once(':').map(|(z, _)| z).unwrap_or(&self.0)
            }

            /// The local segment (after the first `:`).
            pub fn local(&self) -> &str {
                self.0.split_once(':').map(|(_, l)| l).unwrap_or("")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = MissingZoneSeparator;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0.to_string()
            }
        }
    };
}

define_namespaced_id!(RoomId, "A room id of the form `\"<zone>:<local>\"`.");
define_namespaced_id!(MobId, "A mob id of the form `\"<zone>:<local>\"`.");
define_namespaced_id!(ItemId, "An item id of the form `\"<zone>:<local>\"`.");

/// An opaque 64-bit session identifier.
///
/// In single-node mode a monotonic counter is sufficient
/// ([`SessionIdGenerator::single_node`]). In multi-gateway mode, ids use a
/// Snowflake layout: `[16 bits gatewayId | 32 bits unix seconds | 16 bits
/// per-second sequence]`, guaranteeing cross-gateway uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates unique [`SessionId`]s, either as a bare monotonic counter or as
/// a Snowflake encoding a gateway id and wall-clock second.
pub struct SessionIdGenerator {
    gateway_id: u16,
    last_second: u32,
    sequence: u16,
}

impl SessionIdGenerator {
    /// A generator for single-node deployments; `gateway_id` is folded into
    /// the same Snowflake layout but callers typically pass `0`.
    pub fn new(gateway_id: u16) -> Self {
        Self {
            gateway_id,
            last_second: 0,
            sequence: 0,
        }
    }

    pub fn single_node() -> Self {
        Self::new(0)
    }

    /// Mint the next id for the given wall-clock unix-seconds value.
    ///
    /// On sequence overflow within one second, `now_unix_secs` must be
    /// advanced by the caller (monotonic-floor on clock rollback): this
    /// method never moves backwards relative to the last second it saw.
    pub fn next(&mut self, now_unix_secs: u32) -> SessionId {
        let second = now_unix_secs.max(self.last_second);
        if second == self.last_second {
            self.sequence = self.sequence.wrapping_add(1);
            if self.sequence == 0 {
                // Sequence space exhausted for this second; the caller is
                // expected to retry with an advanced clock reading. We
                // still return a value rather than panic, floored to the
                // next second, matching "wait for clock to advance".
                self.last_second = second + 1;
                return self.encode(self.last_second, 0);
            }
        } else {
            self.last_second = second;
            self.sequence = 0;
        }
        self.encode(self.last_second, self.sequence)
    }

    fn encode(&self, second: u32, sequence: u16) -> SessionId {
        let value = ((self.gateway_id as u64) << 48) | ((second as u64) << 16) | (sequence as u64);
        SessionId(value)
    }
}

/// A learned/grantable ability's definition key (e.g. `"magic_missile"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityId(Arc<str>);

/// A status effect definition key (e.g. `"ignite"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatusEffectId(Arc<str>);

macro_rules! define_flat_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(Arc::from(id.into().as_str()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

define_flat_id!(AbilityId);
define_flat_id!(StatusEffectId);
