//! Error types for the battle simulation.
//!
//! Per-tick anomalies (a target dying, a projectile leaving the arena) are
//! never errors: processors express them as events. Only problems with the
//! battle setup and broken internal invariants surface here.

use thiserror::Error;

use crate::components::{EntityId, Team};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all battle simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// The battle setup was rejected before the first tick.
    #[error("Invalid battle setup: {0}")]
    Setup(#[from] SetupError),

    /// A spawn record names a unit kind missing from the catalog.
    #[error("Unknown unit kind: {0}")]
    UnknownUnitKind(String),

    /// A catalog entry or override holds a value the core cannot use.
    #[error("Invalid data for unit kind {kind}: {reason}")]
    InvalidUnitData {
        /// Unit kind being resolved.
        kind: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An internal invariant broke mid-battle. This is always a bug in
    /// processor ordering, never a normal game condition.
    #[error("Invariant violated at tick {tick}: {message}")]
    InvariantViolation {
        /// Tick at which the violation was detected.
        tick: u64,
        /// What went wrong.
        message: String,
    },

    /// The battle already reached a terminal outcome.
    #[error("Battle already finished at tick {tick}")]
    BattleFinished {
        /// Tick on which the battle ended.
        tick: u64,
    },
}

/// Reasons a battle setup is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// One side has no units at all.
    #[error("Team {0:?} has no units")]
    EmptyTeam(Team),

    /// Two spawn positions are closer than the configured tolerance.
    #[error("Spawn records {first} and {second} overlap")]
    OverlappingSpawns {
        /// Index of the earlier spawn record.
        first: usize,
        /// Index of the later spawn record.
        second: usize,
    },

    /// A spawn position lies outside the arena.
    #[error("Spawn record {index} is outside the arena")]
    OutOfBounds {
        /// Index of the offending spawn record.
        index: usize,
    },

    /// A stat value is out of its allowed range.
    #[error("Spawn record {index} has invalid stats: {reason}")]
    InvalidStats {
        /// Index of the offending spawn record.
        index: usize,
        /// Which stat is wrong.
        reason: String,
    },

    /// A ranged unit has no projectile profile.
    #[error("Spawn record {index} is ranged but has no projectile profile")]
    MissingProjectileProfile {
        /// Index of the offending spawn record.
        index: usize,
    },

    /// The battle configuration itself is unusable.
    #[error("Invalid battle config: {0}")]
    InvalidConfig(String),
}

impl GameError {
    /// Build an invariant violation for `tick`.
    pub(crate) fn invariant(tick: u64, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            tick,
            message: message.into(),
        }
    }

    /// Entity-level invariant violation helper.
    pub(crate) fn entity_invariant(tick: u64, entity: EntityId, message: &str) -> Self {
        Self::invariant(tick, format!("entity {entity}: {message}"))
    }
}
