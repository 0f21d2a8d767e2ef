//! Read-only views handed to collaborators.
//!
//! A [`TickSnapshot`] is what a renderer polls after each tick; a
//! [`BattleResult`] is the terminal output consumed by progression.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PresentationTag, Projectile, Team, Unit, UnitKind, UnitState};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Battle-level state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    /// Still being simulated.
    #[default]
    Running,
    /// Team B has no living units.
    TeamAWins,
    /// Team A has no living units.
    TeamBWins,
    /// Mutual annihilation or tick budget exhausted.
    Draw,
}

impl BattleStatus {
    /// Whether a terminal outcome was reached.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// The winning team, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Team> {
        match self {
            Self::TeamAWins => Some(Team::A),
            Self::TeamBWins => Some(Team::B),
            Self::Running | Self::Draw => None,
        }
    }
}

/// Why a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// One team lost every unit.
    Elimination,
    /// Both teams lost their last units in the same tick.
    MutualAnnihilation,
    /// The stalemate guard fired.
    TickBudget,
}

/// One surviving unit in the terminal result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivingUnit {
    /// Entity id during the battle.
    pub id: EntityId,
    /// Kind label from the spawn record.
    pub unit_kind: UnitKind,
    /// Side.
    pub team: Team,
}

/// Terminal battle output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    /// Final battle status; never `Running`.
    pub outcome: BattleStatus,
    /// Why the battle ended.
    pub reason: EndReason,
    /// Tick on which the battle ended.
    pub ticks: u64,
    /// Living units at the end, by id.
    pub surviving_units: Vec<SurvivingUnit>,
}

impl BattleResult {
    /// Surviving units belonging to `team`.
    pub fn survivors_of(&self, team: Team) -> impl Iterator<Item = &SurvivingUnit> {
        self.surviving_units.iter().filter(move |u| u.team == team)
    }
}

/// Per-unit view for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Kind label.
    pub kind: UnitKind,
    /// Side.
    pub team: Team,
    /// Position.
    pub position: Vec2Fixed,
    /// Current health over max health.
    #[serde(with = "fixed_serde")]
    pub health_fraction: Fixed,
    /// State machine tag.
    pub state: UnitState,
    /// Last transition reason.
    pub presentation_tag: PresentationTag,
}

impl From<&Unit> for UnitSnapshot {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            kind: unit.kind.clone(),
            team: unit.team,
            position: unit.position(),
            health_fraction: unit.health.fraction(),
            state: unit.state(),
            presentation_tag: unit.presentation,
        }
    }
}

/// Per-projectile view for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Position.
    pub position: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(projectile: &Projectile) -> Self {
        Self {
            id: projectile.id,
            position: projectile.position,
            direction: projectile.direction,
        }
    }
}

/// Everything a renderer needs after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickSnapshot {
    /// Tick this snapshot was taken after.
    pub tick: u64,
    /// Live units, by id.
    pub units: Vec<UnitSnapshot>,
    /// In-flight projectiles, by id.
    pub projectiles: Vec<ProjectileSnapshot>,
}

impl TickSnapshot {
    /// Snapshot of a single unit.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> Option<&UnitSnapshot> {
        self.units.iter().find(|u| u.id == id)
    }
}
