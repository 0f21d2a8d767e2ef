//! Headless battle runner for scripted verification and batch runs.
//!
//! Loads battle files and unit catalogs from RON, resolves them into core
//! setups, and drives battles without graphics:
//!
//! - **Scripted control**: step a battle tick by tick over JSON lines
//! - **CI verification**: replay the same battle in parallel and compare hashes
//! - **Batch runs**: play a whole directory of battles and summarize outcomes
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, query, hash, abort)
//! - **stdout**: Snapshots, results and responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Step a battle interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p battle_headless -- interactive assets/battles/shield_wall.ron
//!
//! # Play a battle to the end, printing every tick
//! cargo run -p battle_headless -- run assets/battles/shield_wall.ron --snapshots
//!
//! # Verify determinism
//! cargo run -p battle_headless -- verify assets/battles/cavalry_charge.ron --runs 8
//! ```

pub mod batch;
pub mod catalog;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults, BattleSummary};
pub use catalog::{default_catalog, load_catalog, load_catalog_or_default};
pub use protocol::{Command, Response};
pub use runner::{verify_setup, HeadlessConfig, HeadlessRunner, VerifyReport};
pub use scenario::{Placement, Scenario, ScenarioError};
