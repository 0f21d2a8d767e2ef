//! Property tests over generated battles.

use std::collections::{BTreeMap, BTreeSet};

use battle_core::prelude::*;
use battle_test_utils::determinism::strategies::arb_battle_setup;
use battle_test_utils::determinism::{find_first_divergence, verify_battle_determinism};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Same setup, same events and snapshot on every tick, same result.
    #[test]
    fn prop_battles_are_deterministic(setup in arb_battle_setup(6, 300)) {
        let build = || Battle::new(setup.clone()).unwrap();
        prop_assert_eq!(find_first_divergence(build, 300), None);
        prop_assert!(verify_battle_determinism(build, 300));

        let mut first = build();
        let mut second = build();
        prop_assert_eq!(first.run().unwrap(), second.run().unwrap());
    }

    /// Health never goes up, and never drops below zero.
    #[test]
    fn prop_health_never_increases(setup in arb_battle_setup(6, 300)) {
        let mut battle = Battle::new(setup).unwrap();
        let mut last: BTreeMap<EntityId, u32> =
            battle.units().iter().map(|u| (u.id, u.health.current)).collect();

        while !battle.status().is_finished() {
            battle.tick().unwrap();
            for unit in battle.units().iter().chain(battle.fallen()) {
                let previous = last.insert(unit.id, unit.health.current).unwrap();
                prop_assert!(unit.health.current <= previous);
                prop_assert!(unit.health.current <= unit.health.max);
            }
        }
    }

    /// Once dead, a unit stays dead and never reappears in the live pool.
    #[test]
    fn prop_death_is_permanent(setup in arb_battle_setup(6, 300)) {
        let mut battle = Battle::new(setup).unwrap();
        let mut dead: BTreeSet<EntityId> = BTreeSet::new();

        while !battle.status().is_finished() {
            let events = battle.tick().unwrap();
            for id in events.deaths() {
                prop_assert!(dead.insert(id), "unit {} died twice", id);
            }
            for unit in battle.units() {
                prop_assert!(!dead.contains(&unit.id));
            }
            for unit in battle.fallen() {
                prop_assert_eq!(unit.state(), UnitState::Dead);
                prop_assert!(dead.contains(&unit.id));
            }
        }
    }

    /// Survivors are a subset of the roster and agree with the outcome.
    #[test]
    fn prop_result_matches_survivors(setup in arb_battle_setup(6, 300)) {
        let roster: BTreeMap<EntityId, (UnitKind, Team)> = setup
            .units
            .iter()
            .zip(1..)
            .map(|(spawn, id)| (id, (spawn.kind.clone(), spawn.team)))
            .collect();

        let mut battle = Battle::new(setup).unwrap();
        let result = battle.run().unwrap();

        prop_assert!(result.ticks <= 300);
        for survivor in &result.surviving_units {
            let (kind, team) = &roster[&survivor.id];
            prop_assert_eq!(&survivor.unit_kind, kind);
            prop_assert_eq!(survivor.team, *team);
        }

        let a = result.survivors_of(Team::A).count();
        let b = result.survivors_of(Team::B).count();
        match result.outcome {
            BattleStatus::TeamAWins => prop_assert!(a > 0 && b == 0),
            BattleStatus::TeamBWins => prop_assert!(b > 0 && a == 0),
            BattleStatus::Draw => prop_assert!(
                (a == 0 && b == 0) || result.reason == EndReason::TickBudget
            ),
            BattleStatus::Running => prop_assert!(false, "finished battle reported Running"),
        }
    }

    /// Living units only ever target enemies at the end of a tick. The
    /// target may have died this tick; Targeting drops it on the next one.
    #[test]
    fn prop_targets_are_enemies(setup in arb_battle_setup(6, 200)) {
        let mut battle = Battle::new(setup).unwrap();
        while !battle.status().is_finished() {
            battle.tick().unwrap();
            for unit in battle.units() {
                if let Some(target) = unit.behavior.target {
                    match battle.lookup(target) {
                        Lookup::Alive(other) | Lookup::Dead(other) => {
                            prop_assert_ne!(other.team, unit.team);
                        }
                        Lookup::Absent => prop_assert!(false, "target {} was never spawned", target),
                    }
                }
            }
        }
    }
}
