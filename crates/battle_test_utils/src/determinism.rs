//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Re-fighting an identical placement must yield an identical outcome.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`battle_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted entity ID order.
//!
//! - **Randomness and wall-clock time**: the core uses neither.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual processor behavior
//! 2. **Property tests**: Random rosters must still resolve deterministically
//! 3. **Integration tests**: Full battle scenarios are reproducible
//! 4. **Parallel tests**: Running N battles in parallel all match

use std::thread;

use battle_core::simulation::Battle;
use battle_core::snapshot::BattleResult;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Terminal result from each battle.
    pub results: Vec<BattleResult>,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1]) && self.results.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes or results.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}\n\
                 Outcomes: {:?}",
                self.num_battles,
                unique.len(),
                self.hashes,
                self.results.iter().map(|r| (r.outcome, r.ticks)).collect::<Vec<_>>()
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use battle_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Advance a battle one tick, ignoring the error once it has finished.
fn step_battle(battle: &mut Battle) {
    if battle.status().is_finished() {
        return;
    }
    if let Err(error) = battle.tick() {
        tracing::error!(%error, "battle tick failed during determinism check");
    }
}

/// Run a battle twice from identical setups and compare final hashes.
///
/// # Arguments
///
/// * `setup_fn` - Function that builds the battle
/// * `num_ticks` - Number of ticks to run (finished battles stop early)
///
/// # Returns
///
/// `true` if both runs produced identical state hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let result = verify_determinism(2, num_ticks, &setup_fn, step_battle, Battle::state_hash);
    result.is_deterministic
}

/// Run N battles to completion on scoped threads and collect their outcomes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Panics
///
/// Panics if a battle fails or a worker thread panics.
pub fn run_parallel_battles_scoped<F>(setup_fn: F, num_battles: usize) -> ParallelBattleResult
where
    F: Fn() -> Battle + Sync,
{
    let outcomes: Vec<(u64, BattleResult)> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    let result = battle.run().expect("battle failed");
                    (battle.state_hash(), result)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    let (hashes, results) = outcomes.into_iter().unzip();
    ParallelBattleResult {
        hashes,
        results,
        num_battles,
    }
}

/// Compare two battle runs tick-by-tick, finding first divergence.
///
/// Both the state hash and the rendered snapshot are compared.
///
/// # Returns
///
/// `None` if the runs agree for `num_ticks` ticks (or until both finish),
/// `Some(tick)` for the first tick at which they differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        if first.status().is_finished() && second.status().is_finished() {
            break;
        }
        let a = first.tick().ok();
        let b = second.tick().ok();

        if a != b || first.state_hash() != second.state_hash() || first.snapshot() != second.snapshot() {
            tracing::debug!(tick, "battles diverged");
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for battle rosters.
///
/// Rosters are laid out on a jittered grid so spawn positions never
/// overlap and always validate.
pub mod strategies {
    use battle_core::components::{Armor, AttackProfile, ProjectileProfile, Team, UnitStats};
    use battle_core::math::{Fixed, Vec2Fixed};
    use battle_core::setup::{BattleConfig, BattleSetup, UnitSpawn};
    use proptest::prelude::*;

    /// Generate health values (1-200).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..200u32
    }

    /// Generate damage values (0-40).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..40u32
    }

    /// Generate attack range (0-300).
    pub fn arb_attack_range() -> impl Strategy<Value = Fixed> {
        (0i32..300i32).prop_map(Fixed::from_num)
    }

    /// Generate movement speed in units per second (0-120).
    pub fn arb_speed() -> impl Strategy<Value = Fixed> {
        (0i32..120i32).prop_map(Fixed::from_num)
    }

    /// Generate a cooldown in twentieths of a second (0.05-2.0).
    pub fn arb_cooldown() -> impl Strategy<Value = Fixed> {
        (1i32..40i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(20))
    }

    /// Generate armor.
    pub fn arb_armor() -> impl Strategy<Value = Armor> {
        (0u32..5u32, 0u8..60u8).prop_map(|(flat, percent)| Armor::new(flat, percent))
    }

    /// Generate a melee or ranged attack profile.
    pub fn arb_attack() -> impl Strategy<Value = AttackProfile> {
        (
            arb_damage(),
            arb_attack_range(),
            arb_cooldown(),
            proptest::option::of((100i32..800i32, 1i32..6i32)),
        )
            .prop_map(|(damage, range, cooldown, projectile)| match projectile {
                Some((speed, radius)) => AttackProfile::ranged(
                    damage,
                    range,
                    cooldown,
                    ProjectileProfile {
                        speed: Fixed::from_num(speed),
                        radius: Fixed::from_num(radius),
                    },
                ),
                None => AttackProfile::melee(damage, range, cooldown),
            })
    }

    /// Generate full unit stats.
    pub fn arb_unit_stats() -> impl Strategy<Value = UnitStats> {
        (arb_health(), 2i32..16i32, arb_speed(), arb_attack(), arb_armor()).prop_map(
            |(health, radius, speed, attack, armor)| UnitStats {
                health,
                radius: Fixed::from_num(radius),
                speed,
                attack,
                armor,
            },
        )
    }

    /// Place `stats` for one team on a jittered 5-wide grid.
    ///
    /// Cells are 60 apart and jitter stays under 20, so no two units of
    /// the same team are closer than 20. Team A fills the left of the
    /// arena and team B the right.
    fn place(team: Team, roster: Vec<(UnitStats, (i32, i32))>) -> Vec<UnitSpawn> {
        let origin_x = if team == Team::A { 100 } else { 1500 };
        let mut spawns = Vec::with_capacity(roster.len());
        let (mut col, mut row) = (0, 0);
        for (stats, (jx, jy)) in roster {
            let position = Vec2Fixed::new(
                Fixed::from_num(origin_x + col * 60 + jx),
                Fixed::from_num(100 + row * 60 + jy),
            );
            spawns.push(UnitSpawn::new("generated", team, position, stats));
            col += 1;
            if col == 5 {
                col = 0;
                row += 1;
            }
        }
        spawns
    }

    /// Generate one team's roster of 1..=`max_units` units.
    pub fn arb_team(team: Team, max_units: usize) -> impl Strategy<Value = Vec<UnitSpawn>> {
        proptest::collection::vec((arb_unit_stats(), (0i32..20i32, 0i32..20i32)), 1..=max_units)
            .prop_map(move |roster| place(team, roster))
    }

    /// Generate a valid battle setup with up to `max_per_side` units per
    /// team and a tick budget of `max_ticks`.
    pub fn arb_battle_setup(max_per_side: usize, max_ticks: u64) -> impl Strategy<Value = BattleSetup> {
        (arb_team(Team::A, max_per_side), arb_team(Team::B, max_per_side)).prop_map(move |(a, b)| {
            let mut setup = BattleSetup::new(BattleConfig::default().with_max_ticks(max_ticks));
            setup.units.extend(a);
            setup.units.extend(b);
            setup
        })
    }
}
