//! Battle processors.
//!
//! Each processor is a free function over explicit slices of the entity
//! store plus the tick's [`EventQueue`]. They never call each other; the
//! driver in [`simulation`](crate::simulation) runs them in this fixed
//! order every tick:
//!
//! 1. [`targeting_system`]
//! 2. [`state_system`]
//! 3. [`movement_system`]
//! 4. [`attack_system`]
//! 5. [`projectile_system`]
//! 6. [`health_system`]
//! 7. [`cleanup_system`]
//!
//! followed by a second [`state_system`] pass so that every event is
//! applied within the tick that produced it.
//!
//! Unit slices are always sorted by id, which fixes iteration order.

use crate::combat::{index_of, mitigated_damage, nearest_enemy, within_range, Lookup};
use crate::components::{AttackKind, EntityId, Projectile, Unit, UnitState};
use crate::events::{BattleEvent, EventQueue};
use crate::math::{segment_closest_approach, Fixed, Vec2Fixed};
use crate::setup::ArenaBounds;
use crate::state_machine::{transition, Engagement, Trigger};

// ============================================================================
// Targeting
// ============================================================================

/// Validates current targets and acquires new ones.
///
/// Read-only over units. For every living unit:
/// - a target that is still alive is kept, however far away it is;
/// - a dead or absent target produces `TargetLost`;
/// - a unit without a live target acquires the nearest living enemy
///   (ties to the lowest id) and produces `TargetAcquired`.
///
/// `TargetLost` and the replacement `TargetAcquired` are emitted in the
/// same pass. With no enemies left the unit stays idle.
pub fn targeting_system(units: &[Unit], y_bias: Fixed, events: &mut EventQueue) {
    for unit in units.iter().filter(|u| u.is_alive()) {
        if let Some(target) = unit.behavior.target {
            match Lookup::find(units, target) {
                Lookup::Alive(current) if current.team != unit.team => continue,
                _ => events.push(BattleEvent::TargetLost {
                    entity: unit.id,
                    target,
                }),
            }
        }

        if let Some(target) = nearest_enemy(units, unit.team, unit.position(), y_bias) {
            events.push(BattleEvent::TargetAcquired {
                entity: unit.id,
                target,
            });
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Applies queued events to the per-unit state machine.
///
/// Consumes only events it has not seen yet this tick. Events are applied
/// in queue order. `Dead` units ignore everything, so a death anywhere in
/// the tick wins over any other pending transition.
pub fn state_system(units: &mut [Unit], events: &mut EventQueue) {
    for event in events.take_unread() {
        match event {
            BattleEvent::TargetAcquired { entity, target } => {
                apply(units, entity, Trigger::TargetAcquired, Some(Some(target)));
            }
            BattleEvent::TargetLost { entity, target } => {
                if holds_target(units, entity, target) {
                    apply(units, entity, Trigger::TargetLost, Some(None));
                }
            }
            BattleEvent::TargetInRange { entity, target } => {
                if holds_target(units, entity, target) {
                    apply(units, entity, Trigger::TargetInRange, None);
                }
            }
            BattleEvent::AttackCompleted { entity, target } => {
                if !holds_target(units, entity, target) {
                    continue;
                }
                let engagement = engagement(units, entity, target);
                let retarget = (engagement == Engagement::Gone).then_some(None);
                apply(units, entity, Trigger::AttackCompleted(engagement), retarget);
            }
            BattleEvent::Death { entity } => {
                apply(units, entity, Trigger::Death, Some(None));
            }
            BattleEvent::AttackFired { .. }
            | BattleEvent::Damage { .. }
            | BattleEvent::ProjectileCollision { .. } => {}
        }
    }
}

/// Apply one trigger to a living unit, optionally replacing its target.
fn apply(units: &mut [Unit], entity: EntityId, trigger: Trigger, new_target: Option<Option<EntityId>>) {
    let Some(index) = index_of(units, entity) else {
        return;
    };
    let unit = &mut units[index];
    if !unit.is_alive() {
        return;
    }

    unit.behavior.state = transition(unit.behavior.state, trigger);
    unit.presentation = trigger.presentation_tag();
    if let Some(target) = new_target {
        unit.behavior.target = target;
    }
}

fn holds_target(units: &[Unit], entity: EntityId, target: EntityId) -> bool {
    Lookup::find(units, entity)
        .alive()
        .is_some_and(|unit| unit.behavior.target == Some(target))
}

fn engagement(units: &[Unit], entity: EntityId, target: EntityId) -> Engagement {
    let Some(attacker) = Lookup::find(units, entity).alive() else {
        return Engagement::Gone;
    };
    match Lookup::find(units, target).alive() {
        Some(victim) if within_range(attacker.position(), victim.position(), attacker.attack.range) => {
            Engagement::InRange
        }
        Some(_) => Engagement::OutOfRange,
        None => Engagement::Gone,
    }
}

// ============================================================================
// Movement
// ============================================================================

/// Advances pursuing units toward their targets.
///
/// Each unit moves at most `speed × dt`, and never past the point where
/// its target enters attack range. A unit already in range does not move.
/// Either way, being in range emits `TargetInRange`.
///
/// Target positions are read from the start of the pass, so the result
/// does not depend on iteration order.
pub fn movement_system(units: &mut [Unit], dt: Fixed, events: &mut EventQueue) {
    let mut moves: Vec<(usize, Vec2Fixed)> = Vec::new();

    for (index, unit) in units.iter().enumerate() {
        if unit.behavior.state != UnitState::Pursuing {
            continue;
        }
        let Some(target_id) = unit.behavior.target else {
            continue;
        };
        let Some(target) = Lookup::find(units, target_id).alive() else {
            continue;
        };

        let from = unit.position();
        let goal = target.position();
        let range = unit.attack.range;

        if within_range(from, goal, range) {
            events.push(BattleEvent::TargetInRange {
                entity: unit.id,
                target: target_id,
            });
            continue;
        }

        let gap = from.distance(goal) - range;
        let step = (unit.movement.speed * dt).min(gap);
        if step <= Fixed::ZERO {
            continue;
        }

        let to = from.move_toward(goal, step);
        moves.push((index, to));

        if within_range(to, goal, range) {
            events.push(BattleEvent::TargetInRange {
                entity: unit.id,
                target: target_id,
            });
        }
    }

    for (index, to) in moves {
        units[index].spatial.position = to;
    }
}

// ============================================================================
// Attack
// ============================================================================

/// Ticks cooldowns and issues attacks.
///
/// Every living unit's cooldown drops by `dt`. Then each `Attacking` unit
/// checks its target:
/// - dead, absent or out of range: emits `TargetLost`, no attack;
/// - cooldown still running: nothing;
/// - otherwise a melee unit emits `Damage` and a ranged unit spawns a
///   projectile aimed at the target's current position and emits
///   `AttackFired`. The cooldown resets and `AttackCompleted` follows.
///
/// Projectile ids are drawn from `next_id`.
pub fn attack_system(
    units: &mut [Unit],
    projectiles: &mut Vec<Projectile>,
    next_id: &mut EntityId,
    dt: Fixed,
    events: &mut EventQueue,
) {
    for unit in units.iter_mut().filter(|u| u.is_alive()) {
        unit.behavior.tick_cooldown(dt);
    }

    for index in 0..units.len() {
        let unit = &units[index];
        if unit.behavior.state != UnitState::Attacking {
            continue;
        }
        let Some(target_id) = unit.behavior.target else {
            continue;
        };

        let target_position = match Lookup::find(units, target_id).alive() {
            Some(target) if within_range(unit.position(), target.position(), unit.attack.range) => {
                target.position()
            }
            _ => {
                events.push(BattleEvent::TargetLost {
                    entity: unit.id,
                    target: target_id,
                });
                continue;
            }
        };

        if !unit.behavior.can_attack() {
            continue;
        }

        let attack = unit.attack;
        match (attack.kind, attack.projectile) {
            (AttackKind::Ranged, Some(profile)) => {
                let id = *next_id;
                *next_id += 1;
                projectiles.push(Projectile {
                    id,
                    owner: unit.id,
                    owner_team: unit.team,
                    position: unit.position(),
                    direction: (target_position - unit.position()).normalize(),
                    speed: profile.speed,
                    radius: profile.radius,
                    damage: attack.damage,
                    target: Some(target_id),
                });
                events.push(BattleEvent::AttackFired {
                    entity: unit.id,
                    target: target_id,
                    projectile: id,
                });
            }
            _ => events.push(BattleEvent::Damage {
                source: unit.id,
                target: target_id,
                amount: attack.damage,
            }),
        }

        let attacker = units[index].id;
        units[index].behavior.cooldown_remaining = attack.cooldown;
        events.push(BattleEvent::AttackCompleted {
            entity: attacker,
            target: target_id,
        });
    }
}

// ============================================================================
// Projectile
// ============================================================================

/// Moves projectiles and resolves collisions.
///
/// Each projectile sweeps the segment it travels this tick against every
/// living unit of the opposing team; it hits when the segment passes
/// within `projectile radius + unit radius` of a unit's centre. The first
/// unit along the path is hit (ties to the lowest id), the projectile emits
/// `ProjectileCollision` and `Damage`, and is destroyed. A projectile that
/// ends the tick outside the arena is destroyed without effect.
pub fn projectile_system(
    projectiles: &mut Vec<Projectile>,
    units: &[Unit],
    arena: &ArenaBounds,
    dt: Fixed,
    events: &mut EventQueue,
) {
    projectiles.retain_mut(|projectile| {
        let start = projectile.position;
        let end = start + projectile.direction.scale(projectile.speed * dt);

        let hit = units
            .iter()
            .filter(|u| u.team != projectile.owner_team && u.is_alive())
            .filter_map(|u| {
                let (along, dist_sq) = segment_closest_approach(start, end, u.position());
                let reach = projectile.radius + u.spatial.radius;
                (dist_sq <= reach * reach).then_some((along, u.id))
            })
            .min();

        if let Some((_, target)) = hit {
            events.push(BattleEvent::ProjectileCollision {
                projectile: projectile.id,
                target,
                damage: projectile.damage,
            });
            events.push(BattleEvent::Damage {
                source: projectile.owner,
                target,
                amount: projectile.damage,
            });
            return false;
        }

        projectile.position = end;
        if !arena.contains(end) {
            tracing::trace!(projectile = projectile.id, "projectile left the arena");
            return false;
        }
        true
    });
}

// ============================================================================
// Health
// ============================================================================

/// Applies this tick's `Damage` events in queue order.
///
/// Armor is applied per hit and fractions of a point carry over between
/// hits. Health floors at zero and excess damage is discarded. A unit
/// whose health goes from positive to zero becomes `Dead` and emits
/// exactly one `Death`. Hits on units that are already dead or
/// gone are ignored.
pub fn health_system(units: &mut [Unit], events: &mut EventQueue) {
    let hits: Vec<(EntityId, u32)> = events
        .iter()
        .filter_map(|event| match *event {
            BattleEvent::Damage { target, amount, .. } => Some((target, amount)),
            _ => None,
        })
        .collect();

    for (target, amount) in hits {
        let Some(index) = index_of(units, target) else {
            continue;
        };
        let unit = &mut units[index];
        if !unit.is_alive() {
            continue;
        }

        let dealt = unit.health.apply_scaled_damage(mitigated_damage(amount, &unit.armor));
        tracing::trace!(unit = unit.id, dealt, remaining = unit.health.current, "damage applied");

        if unit.health.is_dead() {
            unit.behavior.state = transition(unit.behavior.state, Trigger::Death);
            unit.behavior.target = None;
            unit.presentation = Trigger::Death.presentation_tag();
            events.push(BattleEvent::Death { entity: unit.id });
        }
    }
}

// ============================================================================
// Cleanup
// ============================================================================

/// Moves dead units out of the live pool into `fallen`.
///
/// After this runs, dead units are no longer targeting candidates or
/// collision targets. `fallen` stays sorted by id. Returns how many units
/// were removed.
pub fn cleanup_system(units: &mut Vec<Unit>, fallen: &mut Vec<Unit>) -> usize {
    if units.iter().all(Unit::is_alive) {
        return 0;
    }

    let (dead, live): (Vec<Unit>, Vec<Unit>) = std::mem::take(units).into_iter().partition(|u| !u.is_alive());
    *units = live;

    let removed = dead.len();
    for unit in dead {
        let at = fallen.partition_point(|f| f.id < unit.id);
        fallen.insert(at, unit);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Armor, AttackProfile, PresentationTag, ProjectileProfile, Team, UnitKind, UnitStats};

    fn fx(value: i32) -> Fixed {
        Fixed::from_num(value)
    }

    fn at(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::new(fx(x), fx(y))
    }

    fn melee(id: EntityId, team: Team, position: Vec2Fixed) -> Unit {
        let stats = UnitStats {
            health: 20,
            radius: fx(5),
            speed: fx(20),
            attack: AttackProfile::melee(5, fx(10), fx(1)),
            armor: Armor::NONE,
        };
        Unit::new(id, UnitKind::from("melee"), team, position, stats)
    }

    fn engage(unit: &mut Unit, target: EntityId, state: UnitState) {
        unit.behavior.target = Some(target);
        unit.behavior.state = state;
    }

    // 16 Hz keeps dt exact in binary fixed point.
    fn dt() -> Fixed {
        Fixed::ONE / fx(16)
    }

    #[test]
    fn test_targeting_acquires_nearest() {
        let units = vec![
            melee(1, Team::A, at(0, 0)),
            melee(2, Team::B, at(50, 0)),
            melee(3, Team::B, at(30, 0)),
        ];
        let mut events = EventQueue::new();
        targeting_system(&units, Fixed::ONE, &mut events);

        assert!(events.iter().any(|e| *e == BattleEvent::TargetAcquired { entity: 1, target: 3 }));
        assert!(events.iter().any(|e| *e == BattleEvent::TargetAcquired { entity: 2, target: 1 }));
        assert!(events.iter().any(|e| *e == BattleEvent::TargetAcquired { entity: 3, target: 1 }));
    }

    #[test]
    fn test_targeting_keeps_live_target_even_if_farther() {
        let mut units = vec![
            melee(1, Team::A, at(0, 0)),
            melee(2, Team::B, at(50, 0)),
            melee(3, Team::B, at(30, 0)),
        ];
        engage(&mut units[0], 2, UnitState::Pursuing);
        let mut events = EventQueue::new();
        targeting_system(&units, Fixed::ONE, &mut events);

        assert!(!events.iter().any(|e| e.subject() == 1));
    }

    #[test]
    fn test_targeting_replaces_absent_target_in_same_pass() {
        let mut units = vec![melee(1, Team::A, at(0, 0)), melee(3, Team::B, at(30, 0))];
        engage(&mut units[0], 2, UnitState::Pursuing);
        let mut events = EventQueue::new();
        targeting_system(&units, Fixed::ONE, &mut events);

        let own: Vec<_> = events.iter().filter(|e| e.subject() == 1).copied().collect();
        assert_eq!(
            own,
            vec![
                BattleEvent::TargetLost { entity: 1, target: 2 },
                BattleEvent::TargetAcquired { entity: 1, target: 3 },
            ]
        );

        state_system(&mut units, &mut events);
        assert_eq!(units[0].behavior.target, Some(3));
        assert_eq!(units[0].state(), UnitState::Pursuing);
        assert_eq!(units[0].presentation, PresentationTag::TargetAcquired);
    }

    #[test]
    fn test_state_death_wins_over_in_range() {
        let mut units = vec![melee(1, Team::A, at(0, 0)), melee(2, Team::B, at(5, 0))];
        engage(&mut units[0], 2, UnitState::Pursuing);
        let mut events = EventQueue::new();
        events.push(BattleEvent::Death { entity: 1 });
        events.push(BattleEvent::TargetInRange { entity: 1, target: 2 });

        state_system(&mut units, &mut events);
        assert_eq!(units[0].state(), UnitState::Dead);
        assert_eq!(units[0].presentation, PresentationTag::Died);
    }

    #[test]
    fn test_movement_stops_at_attack_range() {
        let mut units = vec![melee(1, Team::A, at(0, 0)), melee(2, Team::B, at(15, 0))];
        engage(&mut units[0], 2, UnitState::Pursuing);
        let mut events = EventQueue::new();

        // 1.25 per tick, gap to range is 5
        for _ in 0..10 {
            movement_system(&mut units, dt(), &mut events);
        }

        assert_eq!(units[0].position(), at(5, 0));
        assert!(events
            .iter()
            .any(|e| *e == BattleEvent::TargetInRange { entity: 1, target: 2 }));
    }

    #[test]
    fn test_melee_attack_fires_and_resets_cooldown() {
        let mut units = vec![melee(1, Team::A, at(0, 0)), melee(2, Team::B, at(5, 0))];
        engage(&mut units[0], 2, UnitState::Attacking);
        let mut projectiles = Vec::new();
        let mut next_id = 3;
        let mut events = EventQueue::new();

        attack_system(&mut units, &mut projectiles, &mut next_id, dt(), &mut events);

        assert_eq!(
            events.as_slice(),
            &[
                BattleEvent::Damage { source: 1, target: 2, amount: 5 },
                BattleEvent::AttackCompleted { entity: 1, target: 2 },
            ]
        );
        assert_eq!(units[0].behavior.cooldown_remaining, fx(1));
        assert!(projectiles.is_empty());
    }

    #[test]
    fn test_attack_out_of_range_loses_target() {
        let mut units = vec![melee(1, Team::A, at(0, 0)), melee(2, Team::B, at(100, 0))];
        engage(&mut units[0], 2, UnitState::Attacking);
        let mut projectiles = Vec::new();
        let mut next_id = 3;
        let mut events = EventQueue::new();

        attack_system(&mut units, &mut projectiles, &mut next_id, dt(), &mut events);
        assert_eq!(events.as_slice(), &[BattleEvent::TargetLost { entity: 1, target: 2 }]);
    }

    #[test]
    fn test_ranged_attack_spawns_projectile() {
        let mut archer = melee(1, Team::A, at(0, 0));
        archer.attack = AttackProfile::ranged(
            7,
            fx(100),
            fx(2),
            ProjectileProfile {
                speed: fx(200),
                radius: fx(1),
            },
        );
        let mut units = vec![archer, melee(2, Team::B, at(80, 0))];
        engage(&mut units[0], 2, UnitState::Attacking);
        let mut projectiles = Vec::new();
        let mut next_id = 3;
        let mut events = EventQueue::new();

        attack_system(&mut units, &mut projectiles, &mut next_id, dt(), &mut events);

        assert_eq!(next_id, 4);
        assert_eq!(projectiles.len(), 1);
        assert_eq!(projectiles[0].direction, at(1, 0));
        assert_eq!(projectiles[0].damage, 7);
        assert!(events.iter().any(|e| *e
            == BattleEvent::AttackFired {
                entity: 1,
                target: 2,
                projectile: 3
            }));
        assert!(!events.iter().any(|e| matches!(e, BattleEvent::Damage { .. })));
    }

    fn arrow(id: EntityId, position: Vec2Fixed, speed: i32) -> Projectile {
        Projectile {
            id,
            owner: 1,
            owner_team: Team::A,
            position,
            direction: at(1, 0),
            speed: fx(speed),
            radius: fx(1),
            damage: 9,
            target: Some(2),
        }
    }

    #[test]
    fn test_projectile_swept_collision_hits_first_unit_on_path() {
        // Travels 50 this tick, passing both enemies.
        let units = vec![
            melee(1, Team::A, at(0, 0)),
            melee(2, Team::B, at(35, 0)),
            melee(3, Team::B, at(20, 0)),
        ];
        let mut projectiles = vec![arrow(10, at(0, 0), 800)];
        let mut events = EventQueue::new();

        projectile_system(&mut projectiles, &units, &ArenaBounds::default(), dt(), &mut events);

        assert!(projectiles.is_empty());
        assert_eq!(
            events.as_slice(),
            &[
                BattleEvent::ProjectileCollision { projectile: 10, target: 3, damage: 9 },
                BattleEvent::Damage { source: 1, target: 3, amount: 9 },
            ]
        );
    }

    #[test]
    fn test_projectile_ignores_own_team() {
        let units = vec![melee(1, Team::A, at(0, 0)), melee(4, Team::A, at(20, 0))];
        let mut projectiles = vec![arrow(10, at(0, 0), 800)];
        let mut events = EventQueue::new();

        projectile_system(&mut projectiles, &units, &ArenaBounds::default(), dt(), &mut events);

        assert_eq!(projectiles.len(), 1);
        assert_eq!(projectiles[0].position, at(50, 0));
        assert!(events.is_empty());
    }

    #[test]
    fn test_projectile_leaving_arena_is_destroyed() {
        let units = vec![melee(2, Team::B, at(500, 500))];
        let mut projectiles = vec![arrow(10, at(1910, 10), 800)];
        let mut events = EventQueue::new();

        projectile_system(&mut projectiles, &units, &ArenaBounds::default(), dt(), &mut events);

        assert!(projectiles.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_health_overkill_single_death() {
        let mut units = vec![melee(2, Team::B, at(0, 0))];
        units[0].health.current = 5;
        let mut events = EventQueue::new();
        events.push(BattleEvent::Damage { source: 1, target: 2, amount: 999 });
        events.push(BattleEvent::Damage { source: 1, target: 2, amount: 999 });

        health_system(&mut units, &mut events);

        assert_eq!(units[0].health.current, 0);
        assert_eq!(units[0].state(), UnitState::Dead);
        let deaths = events
            .iter()
            .filter(|e| matches!(e, BattleEvent::Death { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_health_applies_armor() {
        let mut units = vec![melee(2, Team::B, at(0, 0))];
        units[0].armor = Armor::new(2, 50);
        let mut events = EventQueue::new();
        events.push(BattleEvent::Damage { source: 1, target: 2, amount: 10 });

        health_system(&mut units, &mut events);
        assert_eq!(units[0].health.current, 16);
    }

    #[test]
    fn test_cleanup_moves_dead_to_fallen() {
        let mut units = vec![
            melee(1, Team::A, at(0, 0)),
            melee(2, Team::B, at(10, 0)),
            melee(3, Team::B, at(20, 0)),
        ];
        units[1].behavior.state = UnitState::Dead;
        let mut fallen = Vec::new();

        assert_eq!(cleanup_system(&mut units, &mut fallen), 1);
        assert_eq!(units.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(fallen[0].id, 2);
        assert_eq!(cleanup_system(&mut units, &mut fallen), 0);
    }
}
