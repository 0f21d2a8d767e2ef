//! Combat helpers shared by the processors.
//!
//! This module implements:
//! - Id lookups that report dead or absent targets explicitly
//! - Range checks with a fixed rounding tolerance
//! - Weighted nearest-enemy scoring for target selection
//! - Armor mitigation of incoming hits

use crate::components::{Armor, EntityId, Team, Unit};
use crate::math::{Fixed, Vec2Fixed, RANGE_TOLERANCE};

/// Result of resolving a weak target reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The unit exists and is not dead.
    Alive(&'a Unit),
    /// The unit exists but is dead.
    Dead(&'a Unit),
    /// No unit with this id is present.
    Absent,
}

impl<'a> Lookup<'a> {
    /// Resolve `id` against an id-sorted unit slice.
    #[must_use]
    pub fn find(units: &'a [Unit], id: EntityId) -> Self {
        match units.binary_search_by_key(&id, |u| u.id) {
            Ok(index) => {
                let unit = &units[index];
                if unit.is_alive() {
                    Self::Alive(unit)
                } else {
                    Self::Dead(unit)
                }
            }
            Err(_) => Self::Absent,
        }
    }

    /// The unit, if alive.
    #[must_use]
    pub const fn alive(self) -> Option<&'a Unit> {
        match self {
            Self::Alive(unit) => Some(unit),
            Self::Dead(_) | Self::Absent => None,
        }
    }
}

/// Index of unit `id` in an id-sorted slice.
pub(crate) fn index_of(units: &[Unit], id: EntityId) -> Option<usize> {
    units.binary_search_by_key(&id, |u| u.id).ok()
}

/// Check if `target` lies within `range` of `from`.
///
/// Distances are centre to centre.
#[must_use]
pub fn within_range(from: Vec2Fixed, target: Vec2Fixed, range: Fixed) -> bool {
    let reach = range + RANGE_TOLERANCE;
    from.distance_squared(target) <= reach * reach
}

/// Distance² used to rank targeting candidates.
///
/// The vertical offset is scaled by `y_bias` before squaring; a bias of 1
/// is plain Euclidean distance.
#[must_use]
pub fn targeting_distance_squared(from: Vec2Fixed, to: Vec2Fixed, y_bias: Fixed) -> Fixed {
    let dx = to.x - from.x;
    let dy = (to.y - from.y) * y_bias;
    dx * dx + dy * dy
}

/// Pick the nearest living enemy of `team` as seen from `from`.
///
/// Ties are broken by the lowest entity id.
#[must_use]
pub fn nearest_enemy(units: &[Unit], team: Team, from: Vec2Fixed, y_bias: Fixed) -> Option<EntityId> {
    units
        .iter()
        .filter(|candidate| candidate.team != team && candidate.is_alive())
        .map(|candidate| {
            let score = targeting_distance_squared(from, candidate.position(), y_bias);
            (score, candidate.id)
        })
        .min()
        .map(|(_, id)| id)
}

/// Health lost, in hundredths of a point, by a unit wearing `armor` when
/// hit for `raw` damage.
#[must_use]
pub fn mitigated_damage(raw: u32, armor: &Armor) -> u64 {
    armor.mitigate(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AttackProfile, UnitKind, UnitStats, UnitState};

    fn unit(id: EntityId, team: Team, x: i32, y: i32) -> Unit {
        let stats = UnitStats {
            health: 10,
            radius: Fixed::from_num(5),
            speed: Fixed::from_num(10),
            attack: AttackProfile::melee(1, Fixed::from_num(10), Fixed::ONE),
            armor: Armor::NONE,
        };
        Unit::new(
            id,
            UnitKind::from("test"),
            team,
            Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)),
            stats,
        )
    }

    #[test]
    fn test_lookup_variants() {
        let mut units = vec![unit(1, Team::A, 0, 0), unit(3, Team::B, 10, 0)];
        units[1].behavior.state = UnitState::Dead;

        assert!(matches!(Lookup::find(&units, 1), Lookup::Alive(u) if u.id == 1));
        assert!(matches!(Lookup::find(&units, 3), Lookup::Dead(_)));
        assert_eq!(Lookup::find(&units, 2), Lookup::Absent);
    }

    #[test]
    fn test_within_range_boundary() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::new(Fixed::from_num(10), Fixed::ZERO);
        assert!(within_range(a, b, Fixed::from_num(10)));
        assert!(!within_range(a, b, Fixed::from_num(9)));
    }

    #[test]
    fn test_nearest_enemy_tie_breaks_on_lowest_id() {
        let units = vec![
            unit(1, Team::A, 0, 0),
            unit(2, Team::B, 10, 0),
            unit(3, Team::B, -10, 0),
        ];
        assert_eq!(nearest_enemy(&units, Team::A, Vec2Fixed::ZERO, Fixed::ONE), Some(2));

        let reversed = vec![
            unit(1, Team::A, 0, 0),
            unit(2, Team::B, -10, 0),
            unit(3, Team::B, 10, 0),
        ];
        assert_eq!(nearest_enemy(&reversed, Team::A, Vec2Fixed::ZERO, Fixed::ONE), Some(2));
    }

    #[test]
    fn test_nearest_enemy_skips_allies_and_dead() {
        let mut units = vec![
            unit(1, Team::A, 0, 0),
            unit(2, Team::A, 1, 0),
            unit(3, Team::B, 5, 0),
            unit(4, Team::B, 50, 0),
        ];
        units[2].behavior.state = UnitState::Dead;
        assert_eq!(nearest_enemy(&units, Team::A, Vec2Fixed::ZERO, Fixed::ONE), Some(4));
    }

    #[test]
    fn test_y_bias_prefers_horizontal_enemies() {
        // Enemy 2 is 10 away vertically, enemy 3 is 15 away horizontally.
        let units = vec![
            unit(1, Team::A, 0, 0),
            unit(2, Team::B, 0, 10),
            unit(3, Team::B, 15, 0),
        ];
        let origin = Vec2Fixed::ZERO;
        assert_eq!(nearest_enemy(&units, Team::A, origin, Fixed::ONE), Some(2));
        assert_eq!(nearest_enemy(&units, Team::A, origin, Fixed::from_num(2)), Some(3));
    }

    #[test]
    fn test_mitigated_damage_never_heals() {
        assert_eq!(mitigated_damage(3, &Armor::new(10, 50)), 0);
    }
}
