//! Test fixtures and helpers.
//!
//! Pre-built unit stats and battle setups for consistent testing.

use battle_core::components::{Armor, AttackProfile, ProjectileProfile, Team, UnitStats};
use battle_core::math::Vec2Fixed;
use battle_core::setup::{BattleConfig, BattleSetup, UnitSpawn};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Fixed-point number from a float, for fractional fixture stats.
fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Integer world position.
fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::new(fixed(x), fixed(y))
}

/// A sword-and-board melee unit: range 16, one attack per second.
#[must_use]
pub fn melee_stats(health: u32, damage: u32) -> UnitStats {
    UnitStats {
        health,
        radius: fixed(8),
        speed: fixed(60),
        attack: AttackProfile::melee(damage, fixed(16), fixed(1)),
        armor: Armor::NONE,
    }
}

/// An archer: range 300, one arrow every 1.5 seconds.
#[must_use]
pub fn ranged_stats(health: u32, damage: u32) -> UnitStats {
    UnitStats {
        health,
        radius: fixed(8),
        speed: fixed(50),
        attack: AttackProfile::ranged(
            damage,
            fixed(300),
            fixed_f(1.5),
            ProjectileProfile {
                speed: fixed(500),
                radius: fixed(3),
            },
        ),
        armor: Armor::NONE,
    }
}

/// Stats for a unit that can neither move nor reach anything.
#[must_use]
pub fn inert_stats(health: u32) -> UnitStats {
    UnitStats {
        health,
        radius: fixed(8),
        speed: I32F32::ZERO,
        attack: AttackProfile::melee(0, I32F32::ZERO, fixed(1)),
        armor: Armor::NONE,
    }
}

/// Place a unit at an integer position.
#[must_use]
pub fn unit_at(kind: &str, team: Team, x: i32, y: i32, stats: UnitStats) -> UnitSpawn {
    UnitSpawn::new(kind, team, pos(x, y), stats)
}

/// One unit per side, 300 apart on the arena's horizontal midline.
#[must_use]
pub fn duel_setup(team_a: UnitStats, team_b: UnitStats) -> BattleSetup {
    BattleSetup::new(BattleConfig::default())
        .with_unit(unit_at("duelist_a", Team::A, 800, 540, team_a))
        .with_unit(unit_at("duelist_b", Team::B, 1100, 540, team_b))
}

/// Two mirrored columns of `per_side` units, alternating melee and ranged.
///
/// Team A stands at x = 300, team B at x = 1600; rows are 40 apart.
#[must_use]
pub fn line_battle(per_side: usize) -> BattleSetup {
    let mut setup = BattleSetup::new(BattleConfig::default());
    for team in [Team::A, Team::B] {
        let x = if team == Team::A { 300 } else { 1600 };
        let mut y = 100;
        for row in 0..per_side {
            let spawn = if row % 2 == 0 {
                unit_at("core_swordsman", team, x, y, melee_stats(100, 12))
            } else {
                unit_at("core_archer", team, x, y, ranged_stats(60, 8))
            };
            setup.units.push(spawn);
            y += 40;
        }
    }
    setup
}
