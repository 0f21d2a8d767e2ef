//! # Battle Core
//!
//! Deterministic combat resolution for auto-resolving tactical battles.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math inside the tick loop (uses fixed-point)
//!
//! Two armies are placed once, then fight with no further input. A given
//! placement always produces the same battle, tick for tick.
//!
//! ## Crate Structure
//!
//! - [`components`] - Unit and projectile component definitions
//! - [`events`] - Same-tick event queue
//! - [`state_machine`] - Per-unit state transitions
//! - [`systems`] - The seven battle processors
//! - [`simulation`] - Battle driver and termination
//! - [`setup`] - Battle configuration and setup validation
//! - [`snapshot`] - Per-tick snapshots and the terminal result
//! - [`data`] - Unit catalog and spawn records
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod math;
pub mod setup;
pub mod simulation;
pub mod snapshot;
pub mod state_machine;
pub mod systems;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::Lookup;
    pub use crate::components::*;
    pub use crate::data::{SpawnRecord, StatOverrides, UnitCatalog, UnitData};
    pub use crate::error::{GameError, Result, SetupError};
    pub use crate::events::BattleEvent;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::setup::{ArenaBounds, BattleConfig, BattleSetup, UnitSpawn};
    pub use crate::simulation::{Battle, TickEvents};
    pub use crate::snapshot::{BattleResult, BattleStatus, EndReason, SurvivingUnit, TickSnapshot};
}
