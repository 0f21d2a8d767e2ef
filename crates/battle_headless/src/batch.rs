//! Batch battle runner.
//!
//! Runs every battle file in a directory in parallel using rayon and
//! collects one summary per battle.

use std::path::{Path, PathBuf};
use std::time::Instant;

use battle_core::components::Team;
use battle_core::data::UnitCatalog;
use battle_core::simulation::Battle;
use battle_core::snapshot::{BattleStatus, EndReason};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory of `.ron` battle files.
    pub battles_dir: PathBuf,
    /// Maximum parallel battles (0 = use rayon default).
    pub parallel: usize,
    /// Replaces every scenario's tick budget when set.
    pub max_ticks: Option<u64>,
}

impl BatchConfig {
    /// Create config for a battle directory.
    pub fn new(battles_dir: impl Into<PathBuf>) -> Self {
        Self {
            battles_dir: battles_dir.into(),
            parallel: 0,
            max_ticks: None,
        }
    }

    /// Set maximum parallelism.
    #[must_use]
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Override every scenario's tick budget.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

/// Outcome of one battle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSummary {
    /// Battle file, relative to the batch directory.
    pub file: String,
    /// Scenario name.
    pub name: String,
    /// Final status.
    pub outcome: BattleStatus,
    /// Why it ended.
    pub reason: EndReason,
    /// Ticks played.
    pub ticks: u64,
    /// Team A units placed.
    pub team_a_units: usize,
    /// Team B units placed.
    pub team_b_units: usize,
    /// Team A survivors.
    pub team_a_survivors: usize,
    /// Team B survivors.
    pub team_b_survivors: usize,
    /// Final state hash.
    pub state_hash: u64,
}

/// A battle file that could not be played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Battle file, relative to the batch directory.
    pub file: String,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// One entry per battle that completed, in file name order.
    pub battles: Vec<BattleSummary>,
    /// Battles that failed to load or run.
    pub errors: Vec<BatchError>,
    /// Total wall-clock runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Number of battles won by `team`.
    pub fn wins(&self, team: Team) -> usize {
        self.battles
            .iter()
            .filter(|b| b.outcome.winner() == Some(team))
            .count()
    }

    /// Number of drawn battles.
    pub fn draws(&self) -> usize {
        self.battles.iter().filter(|b| b.outcome == BattleStatus::Draw).count()
    }
}

/// Battle files in `dir`, sorted by name.
pub fn battle_files(dir: &Path) -> Result<Vec<PathBuf>, ScenarioError> {
    if !dir.is_dir() {
        return Err(ScenarioError::FileNotFound(dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "ron") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load, resolve and play one battle file.
pub fn run_battle_file(
    path: &Path,
    catalog: &UnitCatalog,
    max_ticks: Option<u64>,
) -> Result<BattleSummary, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let name = scenario.name.clone();
    let mut setup = scenario.into_setup(catalog)?;
    if let Some(max_ticks) = max_ticks {
        setup.config = setup.config.with_max_ticks(max_ticks);
    }
    let team_a_units = setup.team_size(Team::A);
    let team_b_units = setup.team_size(Team::B);

    let mut battle = Battle::new(setup)?;
    let result = battle.run()?;
    debug!(file = %path.display(), outcome = ?result.outcome, ticks = result.ticks, "Battle complete");

    Ok(BattleSummary {
        file: file_label(path),
        name,
        outcome: result.outcome,
        reason: result.reason,
        ticks: result.ticks,
        team_a_units,
        team_b_units,
        team_a_survivors: result.survivors_of(Team::A).count(),
        team_b_survivors: result.survivors_of(Team::B).count(),
        state_hash: battle.state_hash(),
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Run every battle file in the configured directory.
pub fn run_batch(config: BatchConfig, catalog: &UnitCatalog) -> Result<BatchResults, ScenarioError> {
    let start = Instant::now();
    let files = battle_files(&config.battles_dir)?;

    info!(
        dir = %config.battles_dir.display(),
        battles = files.len(),
        "Starting batch run"
    );

    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build_global()
            .ok(); // Ignore if already set
    }

    let outcomes: Vec<Result<BattleSummary, BatchError>> = files
        .par_iter()
        .map(|path| {
            run_battle_file(path, catalog, config.max_ticks).map_err(|e| {
                warn!(file = %path.display(), error = %e, "Battle failed");
                BatchError {
                    file: file_label(path),
                    message: e.to_string(),
                }
            })
        })
        .collect();

    let (battles, errors): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(Result::is_ok);
    let battles: Vec<BattleSummary> = battles.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        completed = battles.len(),
        failed = errors.len(),
        duration_secs = format!("{duration_seconds:.2}"),
        "Batch complete"
    );

    Ok(BatchResults {
        config,
        battles,
        errors,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    const DUEL: &str = r#"
        Scenario(
            name: "Duel",
            allies: [(kind: "core_swordsman", position: (600.0, 500.0))],
            enemies: [(kind: "core_duelist", position: (900.0, 500.0))],
        )
    "#;

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("battles").with_parallel(2).with_max_ticks(100);
        assert_eq!(config.battles_dir, PathBuf::from("battles"));
        assert_eq!(config.parallel, 2);
        assert_eq!(config.max_ticks, Some(100));
    }

    #[test]
    fn test_run_batch_collects_battles_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_duel.ron"), DUEL).unwrap();
        std::fs::write(dir.path().join("b_broken.ron"), "Scenario(").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let results = run_batch(BatchConfig::new(dir.path()), &default_catalog()).unwrap();

        assert_eq!(results.battles.len(), 1);
        assert_eq!(results.battles[0].file, "a_duel.ron");
        assert_eq!(results.battles[0].team_a_units, 1);
        assert!(results.battles[0].outcome.is_finished());
        assert_eq!(results.errors.len(), 1);
        assert_eq!(results.errors[0].file, "b_broken.ron");
    }

    #[test]
    fn test_max_ticks_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("duel.ron"), DUEL).unwrap();

        let results = run_batch(BatchConfig::new(dir.path()).with_max_ticks(5), &default_catalog()).unwrap();
        let summary = &results.battles[0];
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.outcome, BattleStatus::Draw);
        assert_eq!(summary.reason, EndReason::TickBudget);
        assert_eq!(results.draws(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let err = run_batch(BatchConfig::new("no/such/dir"), &default_catalog()).unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_batch_results_save_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("duel.ron"), DUEL).unwrap();
        let results = run_batch(BatchConfig::new(dir.path()), &default_catalog()).unwrap();

        let path = dir.path().join("out").join("results.json");
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.battles, results.battles);
        assert_eq!(loaded.wins(Team::A) + loaded.wins(Team::B) + loaded.draws(), 1);
    }
}
