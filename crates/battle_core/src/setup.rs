//! Battle setup and configuration.
//!
//! A [`BattleSetup`] is everything the core needs to start a battle: a
//! [`BattleConfig`] and an ordered list of fully resolved [`UnitSpawn`]s.
//! Validation happens here, before the first tick; a setup that passes
//! [`BattleSetup::validate`] can always be simulated.

use serde::{Deserialize, Serialize};

use crate::components::{AttackKind, Team, UnitKind, UnitStats};
use crate::error::SetupError;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Largest absolute coordinate accepted for the arena.
///
/// Keeps squared distances well inside the fixed-point range.
pub const MAX_COORDINATE: i32 = 4_096;

/// Largest accepted vertical targeting bias.
pub const MAX_TARGET_Y_BIAS: i32 = 4;

/// Highest accepted simulation rate in ticks per second.
pub const MAX_TICK_RATE: u32 = 1_000;

/// Default simulation rate in ticks per second.
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Default tick budget: three minutes at the default rate.
pub const DEFAULT_MAX_TICKS: u64 = 3_600;

/// Axis-aligned arena rectangle. Projectiles leaving it are destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaBounds {
    /// Lower-left corner (inclusive).
    pub min: Vec2Fixed,
    /// Upper-right corner (inclusive).
    pub max: Vec2Fixed,
}

impl ArenaBounds {
    /// Arena spanning `0..=width` by `0..=height`.
    #[must_use]
    pub fn from_size(width: Fixed, height: Fixed) -> Self {
        Self {
            min: Vec2Fixed::ZERO,
            max: Vec2Fixed::new(width, height),
        }
    }

    /// Check if a point lies inside the arena, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    fn validate(&self) -> Result<(), SetupError> {
        let limit = Fixed::from_num(MAX_COORDINATE);
        let corners = [self.min.x, self.min.y, self.max.x, self.max.y];
        if corners.iter().any(|c| c.abs() > limit) {
            return Err(SetupError::InvalidConfig(format!(
                "arena must lie within ±{MAX_COORDINATE}"
            )));
        }
        if self.min.x >= self.max.x || self.min.y >= self.max.y {
            return Err(SetupError::InvalidConfig("arena has no area".to_string()));
        }
        Ok(())
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self::from_size(Fixed::from_num(1920), Fixed::from_num(1080))
    }
}

/// Battle-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Ticks per simulated second; `Δt = 1 / tick_rate`.
    pub tick_rate: u32,
    /// Stalemate guard. The battle ends in a draw after this many ticks.
    pub max_ticks: u64,
    /// Arena rectangle.
    pub arena: ArenaBounds,
    /// Minimum distance between any two spawn positions.
    #[serde(with = "fixed_serde")]
    pub spawn_overlap_tolerance: Fixed,
    /// Vertical weighting applied when ranking targets; 1 is plain distance.
    #[serde(with = "fixed_serde")]
    pub target_y_bias: Fixed,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_ticks: DEFAULT_MAX_TICKS,
            arena: ArenaBounds::default(),
            spawn_overlap_tolerance: Fixed::ONE,
            target_y_bias: Fixed::ONE,
        }
    }
}

impl BattleConfig {
    /// Builder method to set the tick rate.
    #[must_use]
    pub const fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Builder method to set the tick budget.
    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Builder method to set the arena.
    #[must_use]
    pub const fn with_arena(mut self, arena: ArenaBounds) -> Self {
        self.arena = arena;
        self
    }

    /// Builder method to set the spawn overlap tolerance.
    #[must_use]
    pub const fn with_spawn_overlap_tolerance(mut self, tolerance: Fixed) -> Self {
        self.spawn_overlap_tolerance = tolerance;
        self
    }

    /// Builder method to set the vertical targeting bias.
    #[must_use]
    pub const fn with_target_y_bias(mut self, bias: Fixed) -> Self {
        self.target_y_bias = bias;
        self
    }

    /// Seconds simulated by one tick.
    #[must_use]
    pub fn delta_time(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.clamp(1, MAX_TICK_RATE))
    }

    /// Check the configuration on its own.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.tick_rate == 0 || self.tick_rate > MAX_TICK_RATE {
            return Err(SetupError::InvalidConfig(format!(
                "tick_rate must be in 1..={MAX_TICK_RATE}"
            )));
        }
        if self.max_ticks == 0 {
            return Err(SetupError::InvalidConfig("max_ticks must be positive".to_string()));
        }
        if self.spawn_overlap_tolerance < Fixed::ZERO
            || self.spawn_overlap_tolerance > Fixed::from_num(MAX_COORDINATE)
        {
            return Err(SetupError::InvalidConfig(format!(
                "spawn_overlap_tolerance must be in 0..={MAX_COORDINATE}"
            )));
        }
        if self.target_y_bias <= Fixed::ZERO || self.target_y_bias > Fixed::from_num(MAX_TARGET_Y_BIAS) {
            return Err(SetupError::InvalidConfig(format!(
                "target_y_bias must be in (0, {MAX_TARGET_Y_BIAS}]"
            )));
        }
        self.arena.validate()
    }
}

/// One unit to place at battle start, with fully resolved stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpawn {
    /// Opaque kind label carried through to the result.
    pub kind: UnitKind,
    /// Side.
    pub team: Team,
    /// Starting position.
    pub position: Vec2Fixed,
    /// Stats after all upgrades and overrides.
    pub stats: UnitStats,
}

impl UnitSpawn {
    /// Create a spawn record.
    #[must_use]
    pub fn new(kind: impl Into<UnitKind>, team: Team, position: Vec2Fixed, stats: UnitStats) -> Self {
        Self {
            kind: kind.into(),
            team,
            position,
            stats,
        }
    }

    fn validate(&self, index: usize, arena: &ArenaBounds) -> Result<(), SetupError> {
        let invalid = |reason: &str| SetupError::InvalidStats {
            index,
            reason: reason.to_string(),
        };
        let stats = &self.stats;

        if stats.health == 0 {
            return Err(invalid("health must be positive"));
        }
        if stats.radius < Fixed::ZERO {
            return Err(invalid("radius must not be negative"));
        }
        if stats.speed < Fixed::ZERO {
            return Err(invalid("speed must not be negative"));
        }
        if stats.attack.range < Fixed::ZERO {
            return Err(invalid("attack range must not be negative"));
        }
        if stats.attack.cooldown < Fixed::ZERO {
            return Err(invalid("attack cooldown must not be negative"));
        }
        let limit = Fixed::from_num(MAX_COORDINATE);
        if [stats.radius, stats.speed, stats.attack.range].iter().any(|v| *v > limit) {
            return Err(invalid("stat exceeds the coordinate limit"));
        }
        if stats.armor.percent_reduction > 100 {
            return Err(invalid("armor percentage above 100"));
        }
        if stats.attack.kind == AttackKind::Ranged {
            let profile = stats
                .attack
                .projectile
                .ok_or(SetupError::MissingProjectileProfile { index })?;
            if profile.speed <= Fixed::ZERO {
                return Err(invalid("projectile speed must be positive"));
            }
            if profile.radius < Fixed::ZERO {
                return Err(invalid("projectile radius must not be negative"));
            }
            if profile.speed > limit || profile.radius > limit {
                return Err(invalid("projectile stat exceeds the coordinate limit"));
            }
        }
        if !arena.contains(self.position) {
            return Err(SetupError::OutOfBounds { index });
        }
        Ok(())
    }
}

/// Complete input for one battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSetup {
    /// Battle-wide settings.
    pub config: BattleConfig,
    /// Units in spawn order. Entity ids follow this order.
    pub units: Vec<UnitSpawn>,
}

impl BattleSetup {
    /// Create a setup with the given config and no units.
    #[must_use]
    pub fn new(config: BattleConfig) -> Self {
        Self {
            config,
            units: Vec::new(),
        }
    }

    /// Builder method to append a unit.
    #[must_use]
    pub fn with_unit(mut self, spawn: UnitSpawn) -> Self {
        self.units.push(spawn);
        self
    }

    /// Number of units on `team`.
    #[must_use]
    pub fn team_size(&self, team: Team) -> usize {
        self.units.iter().filter(|u| u.team == team).count()
    }

    /// Reject setups that cannot be simulated.
    ///
    /// Checks run in this order: config, per-unit stats and bounds, empty
    /// teams, overlapping spawn positions.
    pub fn validate(&self) -> Result<(), SetupError> {
        self.config.validate()?;

        for (index, spawn) in self.units.iter().enumerate() {
            spawn.validate(index, &self.config.arena)?;
        }

        for team in [Team::A, Team::B] {
            if self.team_size(team) == 0 {
                return Err(SetupError::EmptyTeam(team));
            }
        }

        let tolerance_sq = self.config.spawn_overlap_tolerance * self.config.spawn_overlap_tolerance;
        for (first, a) in self.units.iter().enumerate() {
            for (offset, b) in self.units[first + 1..].iter().enumerate() {
                if a.position.distance_squared(b.position) < tolerance_sq {
                    return Err(SetupError::OverlappingSpawns {
                        first,
                        second: first + 1 + offset,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Armor, AttackProfile, ProjectileProfile};

    fn stats() -> UnitStats {
        UnitStats {
            health: 10,
            radius: Fixed::from_num(4),
            speed: Fixed::from_num(30),
            attack: AttackProfile::melee(2, Fixed::from_num(8), Fixed::ONE),
            armor: Armor::NONE,
        }
    }

    fn at(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    fn duel() -> BattleSetup {
        BattleSetup::new(BattleConfig::default())
            .with_unit(UnitSpawn::new("a", Team::A, at(100, 100), stats()))
            .with_unit(UnitSpawn::new("b", Team::B, at(200, 100), stats()))
    }

    #[test]
    fn test_valid_duel() {
        assert_eq!(duel().validate(), Ok(()));
    }

    #[test]
    fn test_empty_team_rejected() {
        let setup = BattleSetup::new(BattleConfig::default())
            .with_unit(UnitSpawn::new("a", Team::A, at(100, 100), stats()));
        assert_eq!(setup.validate(), Err(SetupError::EmptyTeam(Team::B)));
    }

    #[test]
    fn test_overlapping_spawns_rejected() {
        let setup = duel().with_unit(UnitSpawn::new("c", Team::A, at(100, 100), stats()));
        assert_eq!(
            setup.validate(),
            Err(SetupError::OverlappingSpawns { first: 0, second: 2 })
        );
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let setup = duel().with_unit(UnitSpawn::new("c", Team::B, at(-5, 100), stats()));
        assert_eq!(setup.validate(), Err(SetupError::OutOfBounds { index: 2 }));
    }

    #[test]
    fn test_ranged_without_projectile_rejected() {
        let mut archer = stats();
        archer.attack.kind = AttackKind::Ranged;
        let setup = duel().with_unit(UnitSpawn::new("archer", Team::A, at(50, 50), archer));
        assert_eq!(
            setup.validate(),
            Err(SetupError::MissingProjectileProfile { index: 2 })
        );
    }

    #[test]
    fn test_zero_health_rejected() {
        let mut broken = stats();
        broken.health = 0;
        let setup = duel().with_unit(UnitSpawn::new("ghost", Team::A, at(50, 50), broken));
        assert!(matches!(
            setup.validate(),
            Err(SetupError::InvalidStats { index: 2, .. })
        ));
    }

    #[test]
    fn test_ranged_with_profile_accepted() {
        let mut archer = stats();
        archer.attack = AttackProfile::ranged(
            3,
            Fixed::from_num(200),
            Fixed::ONE,
            ProjectileProfile {
                speed: Fixed::from_num(400),
                radius: Fixed::from_num(2),
            },
        );
        let setup = duel().with_unit(UnitSpawn::new("archer", Team::A, at(50, 50), archer));
        assert_eq!(setup.validate(), Ok(()));
    }

    #[test]
    fn test_invalid_config() {
        let mut setup = duel();
        setup.config = setup.config.with_tick_rate(0);
        assert!(matches!(setup.validate(), Err(SetupError::InvalidConfig(_))));

        let mut setup = duel();
        setup.config = setup.config.with_target_y_bias(Fixed::ZERO);
        assert!(matches!(setup.validate(), Err(SetupError::InvalidConfig(_))));
    }

    #[test]
    fn test_tick_rate_above_limit_rejected() {
        let mut setup = duel();
        setup.config = setup.config.with_tick_rate(3_000_000_000);
        assert!(matches!(setup.validate(), Err(SetupError::InvalidConfig(_))));

        setup.config = setup.config.with_tick_rate(MAX_TICK_RATE);
        assert_eq!(setup.validate(), Ok(()));
        assert_eq!(setup.config.delta_time(), Fixed::ONE / Fixed::from_num(MAX_TICK_RATE));
    }

    #[test]
    fn test_huge_overlap_tolerance_rejected() {
        let mut setup = duel();
        setup.config = setup.config.with_spawn_overlap_tolerance(Fixed::from_num(50_000));
        assert!(matches!(setup.validate(), Err(SetupError::InvalidConfig(_))));

        setup.config = setup
            .config
            .with_spawn_overlap_tolerance(Fixed::from_num(MAX_COORDINATE));
        assert!(matches!(
            setup.validate(),
            Err(SetupError::OverlappingSpawns { first: 0, second: 1 })
        ));
    }

    #[test]
    fn test_default_delta_time() {
        let dt = BattleConfig::default().delta_time();
        assert_eq!(dt, Fixed::ONE / Fixed::from_num(20));
    }
}
