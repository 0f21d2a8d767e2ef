//! Per-unit state machine.
//!
//! ```text
//! IDLE --acquired--> PURSUING --in range--> ATTACKING
//!   ^                   |  ^                   |
//!   +------lost---------+  +---out of range----+
//!   +----------------target gone---------------+
//!
//! any --death--> DEAD (absorbing)
//! ```
//!
//! The transition function is pure so it can be checked exhaustively; the
//! State processor feeds it one trigger per queued event.

use crate::components::{PresentationTag, UnitState};

/// Where an attacker's target stands after an attack was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    /// Target alive and still within range.
    InRange,
    /// Target alive but out of range.
    OutOfRange,
    /// Target dead or no longer present.
    Gone,
}

/// Input to the state machine, derived from a queued event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `TargetAcquired`.
    TargetAcquired,
    /// `TargetLost`.
    TargetLost,
    /// `TargetInRange`.
    TargetInRange,
    /// `AttackCompleted`, resolved against the target's current standing.
    AttackCompleted(Engagement),
    /// `Death`.
    Death,
}

impl Trigger {
    /// Every trigger, for exhaustive checks.
    pub const ALL: [Self; 7] = [
        Self::TargetAcquired,
        Self::TargetLost,
        Self::TargetInRange,
        Self::AttackCompleted(Engagement::InRange),
        Self::AttackCompleted(Engagement::OutOfRange),
        Self::AttackCompleted(Engagement::Gone),
        Self::Death,
    ];

    /// Presentation tag recorded when this trigger is applied.
    #[must_use]
    pub const fn presentation_tag(self) -> PresentationTag {
        match self {
            Self::TargetAcquired => PresentationTag::TargetAcquired,
            Self::TargetLost | Self::AttackCompleted(Engagement::Gone) => {
                PresentationTag::TargetLost
            }
            Self::TargetInRange => PresentationTag::TargetInRange,
            Self::AttackCompleted(_) => PresentationTag::Attacked,
            Self::Death => PresentationTag::Died,
        }
    }
}

/// Every state, for exhaustive checks.
pub const ALL_STATES: [UnitState; 4] = [
    UnitState::Idle,
    UnitState::Pursuing,
    UnitState::Attacking,
    UnitState::Dead,
];

/// Compute the state after applying `trigger` in `current`.
///
/// Triggers that make no sense in the current state leave it unchanged.
#[must_use]
pub const fn transition(current: UnitState, trigger: Trigger) -> UnitState {
    use UnitState::{Attacking, Dead, Idle, Pursuing};

    match (current, trigger) {
        (Dead, _) | (_, Trigger::Death) => Dead,
        (_, Trigger::TargetAcquired) => Pursuing,
        (_, Trigger::TargetLost) => Idle,
        (Pursuing | Attacking, Trigger::TargetInRange) => Attacking,
        (Attacking, Trigger::AttackCompleted(engagement)) => match engagement {
            Engagement::InRange => Attacking,
            Engagement::OutOfRange => Pursuing,
            Engagement::Gone => Idle,
        },
        (state, _) => state,
    }
}
