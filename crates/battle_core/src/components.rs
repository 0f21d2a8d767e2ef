//! Component definitions.
//!
//! Components are pure data with no behavior beyond small accessors.
//! Units and projectiles are composed of these components and live in the
//! flat entity storage owned by [`Battle`](crate::simulation::Battle).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed, COOLDOWN_TOLERANCE};

/// Unique identifier for entities. Ids are never reused within a battle.
pub type EntityId = u64;

// ============================================================================
// Identity
// ============================================================================

/// One of the two opposing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// The player's side.
    A,
    /// The opposing side.
    B,
}

impl Team {
    /// The opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Opaque unit kind label (e.g. `"core_swordsman"`).
///
/// The core never interprets it; it only carries it through to the
/// snapshot and the surviving roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKind(pub String);

impl UnitKind {
    /// Create a kind label.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// The label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for UnitKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Behavioral
// ============================================================================

/// Per-unit state machine tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// No target.
    #[default]
    Idle,
    /// Has a target that is not yet in range.
    Pursuing,
    /// Target in range; cooldown gates each attack.
    Attacking,
    /// Terminal.
    Dead,
}

impl UnitState {
    /// Whether the unit can still act.
    #[must_use]
    pub const fn is_alive(self) -> bool {
        !matches!(self, Self::Dead)
    }
}

/// Last transition reason, consumed by animation mapping outside the core.
///
/// Never read by simulation logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PresentationTag {
    /// Freshly spawned, nothing happened yet.
    #[default]
    Spawned,
    /// Picked a new target.
    TargetAcquired,
    /// Dropped its target.
    TargetLost,
    /// Reached attack range.
    TargetInRange,
    /// Issued an attack.
    Attacked,
    /// Died.
    Died,
}

/// Targeting and attack-timing state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Behavior {
    /// Current state machine tag.
    pub state: UnitState,
    /// Weak reference to the current target, resolved by id lookup.
    pub target: Option<EntityId>,
    /// Seconds until the next attack is permitted.
    #[serde(with = "fixed_serde")]
    pub cooldown_remaining: Fixed,
}

impl Behavior {
    /// Check if ready to attack.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.cooldown_remaining <= COOLDOWN_TOLERANCE
    }

    /// Tick down the cooldown by `dt`, flooring at zero.
    pub fn tick_cooldown(&mut self, dt: Fixed) {
        if self.cooldown_remaining > Fixed::ZERO {
            self.cooldown_remaining = (self.cooldown_remaining - dt).max(Fixed::ZERO);
        }
    }
}

// ============================================================================
// Spatial
// ============================================================================

/// Position and collision footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spatial {
    /// World position. Mutated only by Movement.
    pub position: Vec2Fixed,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

/// Movement capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Movement speed in world units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
}

// ============================================================================
// Combat
// ============================================================================

/// Hundredths of a health point per whole point.
///
/// Mitigated damage is tracked at this resolution so that hits weaker than
/// one point still add up.
pub const DAMAGE_SCALE: u64 = 100;

/// Health component for damageable entities.
///
/// Effective health is `current - partial_loss / 100`: whole points plus
/// the fractional damage taken since the last whole point was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
    /// Hundredths of a point already lost from `current`, below 100.
    #[serde(default)]
    pub partial_loss: u8,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self {
            current: max,
            max,
            partial_loss: 0,
        }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply whole points of damage, returning the whole points lost.
    ///
    /// Health floors at zero; excess damage is discarded.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        self.apply_scaled_damage(u64::from(amount) * DAMAGE_SCALE)
    }

    /// Apply damage given in hundredths of a point, returning the whole
    /// points lost.
    ///
    /// The unit dies once its effective health reaches zero. Fractions
    /// carry over to later hits.
    pub fn apply_scaled_damage(&mut self, hundredths: u64) -> u32 {
        if self.current == 0 || hundredths == 0 {
            return 0;
        }
        let owed = hundredths + u64::from(self.partial_loss);
        let whole = owed / DAMAGE_SCALE;
        if whole >= u64::from(self.current) {
            let lost = self.current;
            self.current = 0;
            self.partial_loss = 0;
            return lost;
        }
        // whole < current, so both conversions are lossless
        let whole = u32::try_from(whole).unwrap_or(self.current);
        self.current -= whole;
        self.partial_loss = u8::try_from(owed % DAMAGE_SCALE).unwrap_or(0);
        whole
    }

    /// Current health as a fraction of max in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        if self.max == 0 {
            Fixed::ZERO
        } else {
            let left = Fixed::from_num(self.current) - Fixed::from_num(self.partial_loss) / Fixed::from_num(100);
            left / Fixed::from_num(self.max)
        }
    }
}

/// Whether an attack lands instantly or travels as a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackKind {
    /// Damage applied the tick the attack is issued.
    #[default]
    Melee,
    /// Damage deferred until a projectile collides.
    Ranged,
}

/// Flight characteristics of a ranged unit's projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileProfile {
    /// Travel speed in world units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Collision radius of the projectile.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

/// Attack capability of a unit. Immutable for the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Attack range in world units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Base damage per hit.
    pub damage: u32,
    /// Seconds between attacks.
    #[serde(with = "fixed_serde")]
    pub cooldown: Fixed,
    /// Melee or ranged.
    pub kind: AttackKind,
    /// Required for ranged attacks.
    pub projectile: Option<ProjectileProfile>,
}

impl AttackProfile {
    /// A melee attack.
    #[must_use]
    pub const fn melee(damage: u32, range: Fixed, cooldown: Fixed) -> Self {
        Self {
            range,
            damage,
            cooldown,
            kind: AttackKind::Melee,
            projectile: None,
        }
    }

    /// A ranged attack firing projectiles with the given profile.
    #[must_use]
    pub const fn ranged(
        damage: u32,
        range: Fixed,
        cooldown: Fixed,
        projectile: ProjectileProfile,
    ) -> Self {
        Self {
            range,
            damage,
            cooldown,
            kind: AttackKind::Ranged,
            projectile: Some(projectile),
        }
    }

    /// Check if this attack spawns projectiles.
    #[must_use]
    pub const fn is_ranged(&self) -> bool {
        matches!(self.kind, AttackKind::Ranged)
    }
}

/// Damage mitigation: a flat reduction followed by a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Armor {
    /// Subtracted from every hit first.
    pub flat_reduction: u32,
    /// Percentage (0-100) removed from what remains.
    pub percent_reduction: u8,
}

impl Armor {
    /// No mitigation.
    pub const NONE: Self = Self {
        flat_reduction: 0,
        percent_reduction: 0,
    };

    /// Create armor, clamping the percentage to 100.
    #[must_use]
    pub const fn new(flat_reduction: u32, percent_reduction: u8) -> Self {
        Self {
            flat_reduction,
            percent_reduction: if percent_reduction > 100 {
                100
            } else {
                percent_reduction
            },
        }
    }

    /// Damage remaining after mitigation, in hundredths of a point.
    ///
    /// Exact: nothing is rounded away, so weak hits on heavy armor still
    /// accumulate.
    #[must_use]
    pub fn mitigate(&self, damage: u32) -> u64 {
        let after_flat = u64::from(damage.saturating_sub(self.flat_reduction));
        let kept = 100 - u64::from(self.percent_reduction.min(100));
        after_flat * kept * DAMAGE_SCALE / 100
    }
}

/// Fully resolved stats of one unit, handed to the core by the setup layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum (and starting) health.
    pub health: u32,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Movement speed in world units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Attack profile.
    pub attack: AttackProfile,
    /// Damage mitigation.
    #[serde(default)]
    pub armor: Armor,
}

impl UnitStats {
    /// Builder method to set armor.
    #[must_use]
    pub const fn with_armor(mut self, armor: Armor) -> Self {
        self.armor = armor;
        self
    }

    /// Builder method to set the collision radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: Fixed) -> Self {
        self.radius = radius;
        self
    }
}

// ============================================================================
// Entities
// ============================================================================

/// One combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable id.
    pub id: EntityId,
    /// Opaque kind label.
    pub kind: UnitKind,
    /// Side; immutable.
    pub team: Team,
    /// Position and footprint.
    pub spatial: Spatial,
    /// Health pool.
    pub health: Health,
    /// Attack capability.
    pub attack: AttackProfile,
    /// Damage mitigation.
    pub armor: Armor,
    /// Movement capability.
    pub movement: Movement,
    /// State machine, target and cooldown.
    pub behavior: Behavior,
    /// Presentation hook.
    pub presentation: PresentationTag,
}

impl Unit {
    /// Build a fresh unit at full health in the `Idle` state.
    #[must_use]
    pub fn new(id: EntityId, kind: UnitKind, team: Team, position: Vec2Fixed, stats: UnitStats) -> Self {
        Self {
            id,
            kind,
            team,
            spatial: Spatial {
                position,
                radius: stats.radius,
            },
            health: Health::new(stats.health),
            attack: stats.attack,
            armor: stats.armor,
            movement: Movement { speed: stats.speed },
            behavior: Behavior::default(),
            presentation: PresentationTag::Spawned,
        }
    }

    /// Whether the unit is not `Dead`.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.behavior.state.is_alive()
    }

    /// Current state machine tag.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.behavior.state
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.spatial.position
    }
}

/// One in-flight ranged attack.
///
/// The direction is locked at spawn; projectiles do not home. The
/// target is informational only and may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Stable id.
    pub id: EntityId,
    /// Unit that fired it.
    pub owner: EntityId,
    /// Side of the unit that fired it.
    pub owner_team: Team,
    /// Current position.
    pub position: Vec2Fixed,
    /// Unit direction vector.
    pub direction: Vec2Fixed,
    /// Travel speed per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Damage on impact.
    pub damage: u32,
    /// Unit it was aimed at.
    pub target: Option<EntityId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::A.opponent(), Team::B);
        assert_eq!(Team::B.opponent(), Team::A);
    }

    #[test]
    fn test_health_floors_at_zero() {
        let mut health = Health::new(5);
        let dealt = health.apply_damage(999);
        assert_eq!(dealt, 5);
        assert_eq!(health.current, 0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_health_fraction() {
        let mut health = Health::new(40);
        health.apply_damage(10);
        assert_eq!(health.fraction(), Fixed::from_num(0.75));
    }

    #[test]
    fn test_armor_mitigation() {
        assert_eq!(Armor::NONE.mitigate(10), 1000);
        assert_eq!(Armor::new(3, 0).mitigate(10), 700);
        assert_eq!(Armor::new(0, 50).mitigate(10), 500);
        assert_eq!(Armor::new(4, 50).mitigate(10), 300);
        assert_eq!(Armor::new(20, 0).mitigate(10), 0);
        assert_eq!(Armor::new(0, 60).mitigate(1), 40);
        assert_eq!(Armor::new(0, 200).percent_reduction, 100);
    }

    #[test]
    fn test_fractional_damage_accumulates() {
        let mut health = Health::new(10);
        let hit = Armor::new(0, 60).mitigate(1);

        for _ in 0..24 {
            health.apply_scaled_damage(hit);
        }
        assert_eq!(health.current, 1);
        assert_eq!(health.partial_loss, 60);
        assert!(!health.is_dead());

        assert_eq!(health.apply_scaled_damage(hit), 1);
        assert!(health.is_dead());
        assert_eq!(health.partial_loss, 0);
    }

    #[test]
    fn test_partial_loss_shows_in_fraction() {
        let mut health = Health::new(4);
        health.apply_scaled_damage(150);
        assert_eq!(health.current, 3);
        assert_eq!(health.partial_loss, 50);
        assert_eq!(health.fraction(), Fixed::from_num(2.5) / Fixed::from_num(4));
    }

    #[test]
    fn test_cooldown_floors_at_zero() {
        let mut behavior = Behavior {
            cooldown_remaining: Fixed::from_num(0.1),
            ..Behavior::default()
        };
        assert!(!behavior.can_attack());
        behavior.tick_cooldown(Fixed::from_num(0.25));
        assert_eq!(behavior.cooldown_remaining, Fixed::ZERO);
        assert!(behavior.can_attack());
    }
}
