//! Battle driver.
//!
//! [`Battle`] owns the entity store and the event queue for one battle and
//! advances it one fixed timestep at a time.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No randomness and no wall-clock time
//! - Units and projectiles are kept sorted by id and iterated in that order
//! - Same setup always produces the same tick sequence and result
//!
//! # Example
//!
//! ```
//! use battle_core::components::{Armor, AttackProfile, Team, UnitStats};
//! use battle_core::math::{Fixed, Vec2Fixed};
//! use battle_core::setup::{BattleConfig, BattleSetup, UnitSpawn};
//! use battle_core::simulation::Battle;
//!
//! let stats = UnitStats {
//!     health: 30,
//!     radius: Fixed::from_num(8),
//!     speed: Fixed::from_num(60),
//!     attack: AttackProfile::melee(6, Fixed::from_num(16), Fixed::ONE),
//!     armor: Armor::NONE,
//! };
//! let setup = BattleSetup::new(BattleConfig::default())
//!     .with_unit(UnitSpawn::new("swordsman", Team::A, Vec2Fixed::from_f64(400.0, 500.0), stats))
//!     .with_unit(UnitSpawn::new("swordsman", Team::B, Vec2Fixed::from_f64(600.0, 500.0), stats));
//!
//! let mut battle = Battle::new(setup).unwrap();
//! let result = battle.run().unwrap();
//! assert!(result.outcome.is_finished());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::combat::Lookup;
use crate::components::{EntityId, Projectile, Team, Unit, UnitState, DAMAGE_SCALE};
use crate::error::{GameError, Result};
use crate::events::{BattleEvent, EventQueue};
use crate::math::Fixed;
use crate::setup::{BattleConfig, BattleSetup};
use crate::snapshot::{BattleResult, BattleStatus, EndReason, ProjectileSnapshot, SurvivingUnit, TickSnapshot, UnitSnapshot};
use crate::systems::{
    attack_system, cleanup_system, health_system, movement_system, projectile_system, state_system,
    targeting_system,
};

/// Everything that happened during one tick.
///
/// These events can be used by the presentation layer to trigger effects,
/// sounds and animations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick number that produced these events.
    pub tick: u64,
    /// All events in emission order.
    pub events: Vec<BattleEvent>,
    /// Battle status after the tick.
    pub status: BattleStatus,
}

impl TickEvents {
    /// Units that died this tick.
    pub fn deaths(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|event| match *event {
            BattleEvent::Death { entity } => Some(entity),
            _ => None,
        })
    }

    /// `(source, target, amount)` of every damage event, before armor.
    pub fn damage(&self) -> impl Iterator<Item = (EntityId, EntityId, u32)> + '_ {
        self.events.iter().filter_map(|event| match *event {
            BattleEvent::Damage {
                source,
                target,
                amount,
            } => Some((source, target, amount)),
            _ => None,
        })
    }
}

/// One battle in progress.
///
/// # Processor Execution Order
///
/// Each tick, processors run in this order:
/// 1. **Targeting** - validate targets, acquire the nearest enemy
/// 2. **State** - apply targeting events to the state machine
/// 3. **Movement** - advance pursuing units toward attack range
/// 4. **Attack** - tick cooldowns, melee hits, projectile launches
/// 5. **Projectile** - move projectiles, resolve collisions
/// 6. **Health** - apply damage and armor, emit deaths
/// 7. **Cleanup** - move dead units out of the live pool
///
/// then **State** once more for the events of steps 3 to 6, the invariant
/// check, and the end-of-battle check.
#[derive(Debug, Clone)]
pub struct Battle {
    config: BattleConfig,
    dt: Fixed,
    tick: u64,
    /// Live units, sorted by id.
    units: Vec<Unit>,
    /// Dead units, sorted by id.
    fallen: Vec<Unit>,
    /// In-flight projectiles, sorted by id.
    projectiles: Vec<Projectile>,
    events: EventQueue,
    next_id: EntityId,
    status: BattleStatus,
    end_reason: Option<EndReason>,
}

impl Battle {
    /// Validate a setup and place its units.
    ///
    /// Units receive ids `1..=n` in spawn order.
    pub fn new(setup: BattleSetup) -> Result<Self> {
        setup.validate()?;

        let BattleSetup { config, units: spawns } = setup;
        let units: Vec<Unit> = spawns
            .into_iter()
            .zip(1..)
            .map(|(spawn, id)| Unit::new(id, spawn.kind, spawn.team, spawn.position, spawn.stats))
            .collect();
        let next_id = units.last().map_or(1, |u| u.id + 1);

        tracing::info!(
            team_a = units.iter().filter(|u| u.team == Team::A).count(),
            team_b = units.iter().filter(|u| u.team == Team::B).count(),
            tick_rate = config.tick_rate,
            max_ticks = config.max_ticks,
            "Battle started"
        );

        Ok(Self {
            dt: config.delta_time(),
            config,
            tick: 0,
            units,
            fallen: Vec::new(),
            projectiles: Vec::new(),
            events: EventQueue::new(),
            next_id,
            status: BattleStatus::Running,
            end_reason: None,
        })
    }

    /// Get the current tick number.
    ///
    /// Starts at 0 and increments by 1 each time [`tick()`](Self::tick)
    /// completes.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Battle configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Current battle status.
    #[must_use]
    pub const fn status(&self) -> BattleStatus {
        self.status
    }

    /// Live units, sorted by id.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Dead units, sorted by id.
    #[must_use]
    pub fn fallen(&self) -> &[Unit] {
        &self.fallen
    }

    /// In-flight projectiles, sorted by id.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Resolve an entity id against live and fallen units.
    #[must_use]
    pub fn lookup(&self, id: EntityId) -> Lookup<'_> {
        match Lookup::find(&self.units, id) {
            Lookup::Absent => match Lookup::find(&self.fallen, id) {
                Lookup::Alive(unit) | Lookup::Dead(unit) => Lookup::Dead(unit),
                Lookup::Absent => Lookup::Absent,
            },
            found => found,
        }
    }

    /// Number of living units on `team`.
    #[must_use]
    pub fn living(&self, team: Team) -> usize {
        self.units.iter().filter(|u| u.team == team && u.is_alive()).count()
    }

    /// Advance the battle by one tick.
    ///
    /// Returns every event emitted during the tick.
    ///
    /// # Errors
    ///
    /// [`GameError::BattleFinished`] if the battle already ended, and
    /// [`GameError::InvariantViolation`] if the tick left the store in an
    /// impossible state.
    pub fn tick(&mut self) -> Result<TickEvents> {
        if self.status.is_finished() {
            return Err(GameError::BattleFinished { tick: self.tick });
        }

        self.tick += 1;
        self.events.clear();

        // 1. Targeting
        targeting_system(&self.units, self.config.target_y_bias, &mut self.events);

        // 2. State
        state_system(&mut self.units, &mut self.events);

        // 3. Movement
        movement_system(&mut self.units, self.dt, &mut self.events);

        // 4. Attack
        attack_system(
            &mut self.units,
            &mut self.projectiles,
            &mut self.next_id,
            self.dt,
            &mut self.events,
        );

        // 5. Projectile
        projectile_system(
            &mut self.projectiles,
            &self.units,
            &self.config.arena,
            self.dt,
            &mut self.events,
        );

        // 6. Health
        health_system(&mut self.units, &mut self.events);

        // 7. Cleanup
        let removed = cleanup_system(&mut self.units, &mut self.fallen);
        if removed > 0 {
            tracing::debug!(tick = self.tick, removed, "Dead units removed");
        }

        // Settle everything emitted by steps 3-6 before the tick ends.
        state_system(&mut self.units, &mut self.events);

        self.check_invariants()?;
        self.update_status();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        Ok(TickEvents {
            tick: self.tick,
            events: self.events.drain(),
            status: self.status,
        })
    }

    /// Drive the battle to completion.
    ///
    /// Returns immediately if the battle has already ended.
    pub fn run(&mut self) -> Result<BattleResult> {
        loop {
            if let Some(result) = self.result() {
                return Ok(result);
            }
            self.tick()?;
        }
    }

    /// Terminal result, once the battle has ended.
    #[must_use]
    pub fn result(&self) -> Option<BattleResult> {
        self.end_reason.map(|reason| BattleResult {
            outcome: self.status,
            reason,
            ticks: self.tick,
            surviving_units: self
                .units
                .iter()
                .filter(|u| u.is_alive())
                .map(|u| SurvivingUnit {
                    id: u.id,
                    unit_kind: u.kind.clone(),
                    team: u.team,
                })
                .collect(),
        })
    }

    /// Read-only view of the current state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            tick: self.tick,
            units: self.units.iter().map(UnitSnapshot::from).collect(),
            projectiles: self.projectiles.iter().map(ProjectileSnapshot::from).collect(),
        }
    }

    fn update_status(&mut self) {
        let team_a = self.living(Team::A);
        let team_b = self.living(Team::B);

        let ending = match (team_a, team_b) {
            (0, 0) => Some((BattleStatus::Draw, EndReason::MutualAnnihilation)),
            (_, 0) => Some((BattleStatus::TeamAWins, EndReason::Elimination)),
            (0, _) => Some((BattleStatus::TeamBWins, EndReason::Elimination)),
            _ if self.tick >= self.config.max_ticks => {
                tracing::warn!(
                    tick = self.tick,
                    team_a,
                    team_b,
                    "Tick budget exhausted, declaring a draw"
                );
                Some((BattleStatus::Draw, EndReason::TickBudget))
            }
            _ => None,
        };

        if let Some((status, reason)) = ending {
            self.status = status;
            self.end_reason = Some(reason);
            tracing::info!(
                tick = self.tick,
                outcome = ?status,
                reason = ?reason,
                survivors = team_a + team_b,
                "Battle finished"
            );
        }
    }

    /// Verify the store after a completed tick.
    fn check_invariants(&self) -> Result<()> {
        let tick = self.tick;
        let fail = |error: GameError| {
            tracing::error!(%error, "Battle invariant violated");
            Err(error)
        };

        if !self.units.windows(2).all(|w| w[0].id < w[1].id) {
            return fail(GameError::invariant(tick, "live units not strictly ordered by id"));
        }
        if !self.fallen.windows(2).all(|w| w[0].id < w[1].id) {
            return fail(GameError::invariant(tick, "fallen units not strictly ordered by id"));
        }
        if !self.projectiles.windows(2).all(|w| w[0].id < w[1].id) {
            return fail(GameError::invariant(tick, "projectiles not strictly ordered by id"));
        }

        for unit in &self.units {
            if unit.id == 0 || unit.id >= self.next_id {
                return fail(GameError::entity_invariant(tick, unit.id, "id never allocated"));
            }
            if Lookup::find(&self.fallen, unit.id) != Lookup::Absent {
                return fail(GameError::entity_invariant(tick, unit.id, "duplicate id in live and fallen pools"));
            }
            if !unit.is_alive() {
                return fail(GameError::entity_invariant(tick, unit.id, "dead unit left in live pool"));
            }
            if unit.health.current == 0
                || unit.health.current > unit.health.max
                || u64::from(unit.health.partial_loss) >= DAMAGE_SCALE
            {
                return fail(GameError::entity_invariant(tick, unit.id, "health out of range"));
            }
            match (unit.behavior.state, unit.behavior.target) {
                (UnitState::Idle, Some(_)) => {
                    return fail(GameError::entity_invariant(tick, unit.id, "idle unit holds a target"));
                }
                (UnitState::Pursuing | UnitState::Attacking, None) => {
                    return fail(GameError::entity_invariant(tick, unit.id, "engaged unit has no target"));
                }
                _ => {}
            }
            if let Some(target) = unit.behavior.target {
                if target == unit.id {
                    return fail(GameError::entity_invariant(tick, unit.id, "unit targets itself"));
                }
                let ally = match self.lookup(target) {
                    Lookup::Alive(other) | Lookup::Dead(other) => other.team == unit.team,
                    Lookup::Absent => false,
                };
                if ally {
                    return fail(GameError::entity_invariant(tick, unit.id, "unit targets an ally"));
                }
            }
        }

        for unit in &self.fallen {
            if unit.is_alive() || unit.health.current != 0 {
                return fail(GameError::entity_invariant(tick, unit.id, "fallen unit is not dead"));
            }
        }

        Ok(())
    }

    /// Deterministic hash of the full battle state.
    ///
    /// Two battles built from the same setup produce the same hash after
    /// the same number of ticks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.status.hash(&mut hasher);
        self.next_id.hash(&mut hasher);

        self.units.len().hash(&mut hasher);
        for unit in &self.units {
            unit.id.hash(&mut hasher);
            unit.team.hash(&mut hasher);
            unit.spatial.position.hash(&mut hasher);
            unit.health.current.hash(&mut hasher);
            unit.health.partial_loss.hash(&mut hasher);
            unit.behavior.state.hash(&mut hasher);
            unit.behavior.target.hash(&mut hasher);
            unit.behavior.cooldown_remaining.to_bits().hash(&mut hasher);
        }

        self.fallen.len().hash(&mut hasher);
        for unit in &self.fallen {
            unit.id.hash(&mut hasher);
        }

        self.projectiles.len().hash(&mut hasher);
        for projectile in &self.projectiles {
            projectile.id.hash(&mut hasher);
            projectile.position.hash(&mut hasher);
            projectile.direction.hash(&mut hasher);
        }

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Armor, AttackProfile, ProjectileProfile, UnitStats};
    use crate::error::SetupError;
    use crate::math::Vec2Fixed;
    use crate::setup::UnitSpawn;

    fn fx(value: i32) -> Fixed {
        Fixed::from_num(value)
    }

    fn at(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::new(fx(x), fx(y))
    }

    fn fighter(health: u32, damage: u32) -> UnitStats {
        UnitStats {
            health,
            radius: fx(5),
            speed: fx(40),
            attack: AttackProfile::melee(damage, fx(10), fx(1)),
            armor: Armor::NONE,
        }
    }

    fn duel(a: UnitStats, b: UnitStats) -> BattleSetup {
        BattleSetup::new(BattleConfig::default())
            .with_unit(UnitSpawn::new("a", Team::A, at(100, 100), a))
            .with_unit(UnitSpawn::new("b", Team::B, at(200, 100), b))
    }

    #[test]
    fn test_ids_follow_spawn_order() {
        let battle = Battle::new(duel(fighter(10, 1), fighter(10, 1))).unwrap();
        let ids: Vec<_> = battle.units().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(battle.current_tick(), 0);
        assert_eq!(battle.status(), BattleStatus::Running);
    }

    #[test]
    fn test_invalid_setup_rejected() {
        let setup = BattleSetup::new(BattleConfig::default()).with_unit(UnitSpawn::new(
            "a",
            Team::A,
            at(100, 100),
            fighter(10, 1),
        ));
        let err = Battle::new(setup).unwrap_err();
        assert!(matches!(err, GameError::Setup(SetupError::EmptyTeam(Team::B))));
    }

    #[test]
    fn test_first_tick_acquires_targets() {
        let mut battle = Battle::new(duel(fighter(10, 1), fighter(10, 1))).unwrap();
        let events = battle.tick().unwrap();

        assert_eq!(events.tick, 1);
        assert!(events
            .events
            .contains(&BattleEvent::TargetAcquired { entity: 1, target: 2 }));
        assert_eq!(battle.units()[0].behavior.target, Some(2));
        assert_eq!(battle.units()[0].state(), UnitState::Pursuing);
    }

    #[test]
    fn test_stronger_unit_wins() {
        let mut battle = Battle::new(duel(fighter(50, 10), fighter(20, 3))).unwrap();
        let result = battle.run().unwrap();

        assert_eq!(result.outcome, BattleStatus::TeamAWins);
        assert_eq!(result.reason, EndReason::Elimination);
        assert_eq!(result.surviving_units.len(), 1);
        assert_eq!(result.surviving_units[0].id, 1);
        assert_eq!(battle.fallen().len(), 1);
        assert!(matches!(battle.lookup(2), Lookup::Dead(_)));
    }

    #[test]
    fn test_tick_after_finish_errors() {
        let mut battle = Battle::new(duel(fighter(50, 10), fighter(20, 3))).unwrap();
        let result = battle.run().unwrap();

        let err = battle.tick().unwrap_err();
        assert!(matches!(err, GameError::BattleFinished { tick } if tick == result.ticks));
        // run() on a finished battle just reports the result again
        assert_eq!(battle.run().unwrap(), result);
    }

    #[test]
    fn test_ranged_unit_kills_with_projectiles() {
        let archer = UnitStats {
            attack: AttackProfile::ranged(
                5,
                fx(300),
                fx(1),
                ProjectileProfile {
                    speed: fx(400),
                    radius: fx(2),
                },
            ),
            ..fighter(30, 0)
        };
        let mut target = fighter(10, 0);
        target.speed = Fixed::ZERO;

        let mut battle = Battle::new(duel(archer, target)).unwrap();
        let mut fired = 0;
        let mut collisions = 0;
        while battle.status() == BattleStatus::Running {
            let events = battle.tick().unwrap();
            fired += events
                .events
                .iter()
                .filter(|e| matches!(e, BattleEvent::AttackFired { .. }))
                .count();
            collisions += events
                .events
                .iter()
                .filter(|e| matches!(e, BattleEvent::ProjectileCollision { .. }))
                .count();
        }

        assert_eq!(battle.status(), BattleStatus::TeamAWins);
        assert_eq!(collisions, 2);
        assert!(fired >= collisions);
    }

    #[test]
    fn test_snapshot_reports_health_fraction() {
        let mut battle = Battle::new(duel(fighter(40, 10), fighter(40, 10))).unwrap();
        while battle.snapshot().units.iter().all(|u| u.health_fraction == Fixed::ONE) {
            battle.tick().unwrap();
        }

        let snapshot = battle.snapshot();
        assert_eq!(snapshot.tick, battle.current_tick());
        assert!(snapshot
            .units
            .iter()
            .any(|u| u.health_fraction == Fixed::from_num(0.75)));
        assert!(snapshot.projectiles.is_empty());
    }

    #[test]
    fn test_state_hash_is_reproducible() {
        let mut first = Battle::new(duel(fighter(40, 7), fighter(35, 6))).unwrap();
        let mut second = Battle::new(duel(fighter(40, 7), fighter(35, 6))).unwrap();
        assert_eq!(first.state_hash(), second.state_hash());

        for _ in 0..50 {
            first.tick().unwrap();
            second.tick().unwrap();
            assert_eq!(first.state_hash(), second.state_hash());
        }
    }
}
