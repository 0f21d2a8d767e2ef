//! Data structures for unit configuration.
//!
//! Pure data: unit definitions, per-spawn overrides and the catalog that
//! resolves placements into core spawns. All structs deserialize from RON.
//!
//! **Note:** This module contains no IO. File loading is handled by
//! `battle_headless`.

mod unit_data;

pub use unit_data::{AttackData, ProjectileData, SpawnRecord, StatOverrides, UnitCatalog, UnitData};
