//! Unified error type for domain-level validation and invariants.

use thiserror::Error;

/// Validation and invariant errors raised while constructing or mutating
/// domain values. Command-level user errors (unknown spell, no mana, ...)
/// are *not* `DomainError`s — they are typed result enums returned directly
/// by the engine subsystem that produced them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
