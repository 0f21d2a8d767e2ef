//! Battle file loading.
//!
//! A scenario is the authoring form of a battle: two lists of unit
//! placements plus optional config overrides, written in RON with plain
//! float coordinates. [`Scenario::into_setup`] resolves it against a
//! [`UnitCatalog`] into a core [`BattleSetup`].

use std::path::Path;

use battle_core::components::Team;
use battle_core::data::{SpawnRecord, StatOverrides, UnitCatalog};
use battle_core::error::{GameError, SetupError};
use battle_core::math::checked_from_f64;
use battle_core::setup::{ArenaBounds, BattleConfig, BattleSetup};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario and catalog loading.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse RON: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The core rejected the resolved battle.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl From<SetupError> for ScenarioError {
    fn from(error: SetupError) -> Self {
        Self::Game(GameError::Setup(error))
    }
}

/// Optional replacements for [`BattleConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    /// Ticks per second.
    pub tick_rate: Option<u32>,
    /// Stalemate guard in ticks.
    pub max_ticks: Option<u64>,
    /// Arena width and height, origin at (0, 0).
    pub arena_size: Option<(f64, f64)>,
    /// Vertical targeting weight.
    pub target_y_bias: Option<f64>,
}

impl ConfigOverrides {
    /// Apply the overrides on top of the default config.
    pub fn to_config(&self) -> Result<BattleConfig, ScenarioError> {
        let mut config = BattleConfig::default();
        if let Some(tick_rate) = self.tick_rate {
            config = config.with_tick_rate(tick_rate);
        }
        if let Some(max_ticks) = self.max_ticks {
            config = config.with_max_ticks(max_ticks);
        }
        if let Some((width, height)) = self.arena_size {
            let (Some(width), Some(height)) = (checked_from_f64(width), checked_from_f64(height)) else {
                return Err(SetupError::InvalidConfig(format!("arena size ({width}, {height}) is not representable")).into());
            };
            config = config.with_arena(ArenaBounds::from_size(width, height));
        }
        if let Some(bias) = self.target_y_bias {
            let bias = checked_from_f64(bias)
                .ok_or_else(|| SetupError::InvalidConfig(format!("target_y_bias {bias} is not representable")))?;
            config = config.with_target_y_bias(bias);
        }
        Ok(config)
    }
}

/// One unit in a battle file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Catalog id of the unit.
    pub kind: String,
    /// World position (x, y).
    pub position: (f64, f64),
    /// Per-placement stat changes.
    #[serde(default, skip_serializing_if = "StatOverrides::is_empty")]
    pub overrides: StatOverrides,
}

impl Placement {
    /// Place a catalog unit without overrides.
    pub fn new(kind: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            kind: kind.into(),
            position: (x, y),
            overrides: StatOverrides::default(),
        }
    }

    fn to_record(&self, team: Team) -> SpawnRecord {
        SpawnRecord::new(self.kind.as_str(), team, self.position).with_overrides(self.overrides)
    }
}

/// A complete battle file.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "Shield Wall",
///     description: "Three swordsmen hold against two archers",
///     config: (max_ticks: Some(1200)),
///     allies: [
///         (kind: "core_swordsman", position: (600.0, 500.0)),
///     ],
///     enemies: [
///         (kind: "core_archer", position: (1300.0, 500.0)),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Config overrides.
    #[serde(default)]
    pub config: ConfigOverrides,
    /// Team A placements, in spawn order.
    pub allies: Vec<Placement>,
    /// Team B placements, spawned after the allies.
    pub enemies: Vec<Placement>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Spawn records in spawn order: allies first, then enemies.
    pub fn spawn_records(&self) -> Vec<SpawnRecord> {
        self.allies
            .iter()
            .map(|p| p.to_record(Team::A))
            .chain(self.enemies.iter().map(|p| p.to_record(Team::B)))
            .collect()
    }

    /// Resolve every placement against `catalog` and validate the result.
    pub fn into_setup(self, catalog: &UnitCatalog) -> Result<BattleSetup, ScenarioError> {
        let config = self.config.to_config()?;
        let units = catalog.resolve_all(&self.spawn_records())?;
        let setup = BattleSetup { config, units };
        setup.validate()?;
        Ok(setup)
    }
}
