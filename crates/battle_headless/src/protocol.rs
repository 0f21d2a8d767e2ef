//! JSON-lines protocol for the headless runner.
//!
//! **Input (stdin):** commands, one JSON object per line
//! **Output (stdout):** responses, one JSON object per line
//!
//! Positions and fractions are plain floats on the wire; the simulation
//! itself never sees them.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"units":6}
//! -> {"cmd":"tick","count":20}
//! <- {"type":"snapshot","tick":20,"status":"running","units":[...],"projectiles":[...]}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":20,"hash":1234567890}
//! -> {"cmd":"abort"}
//! <- {"type":"bye"}
//! ```

use battle_core::components::{EntityId, PresentationTag, Team, UnitState};
use battle_core::snapshot::{BattleResult, BattleStatus, ProjectileSnapshot, TickSnapshot, UnitSnapshot};
use serde::{Deserialize, Serialize};

/// Protocol version reported in the `ready` response.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands accepted in interactive mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the battle by N ticks (default: 1), stopping early if it ends.
    Tick {
        /// Number of ticks.
        #[serde(default = "default_tick_count")]
        count: u32,
    },
    /// Report the current snapshot without advancing.
    Query,
    /// Report the current state hash.
    Hash,
    /// End the session.
    Abort,
}

fn default_tick_count() -> u32 {
    1
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name, echoed back in error responses.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Abort => "abort",
        }
    }
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses written by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
        /// Number of units placed.
        units: usize,
    },

    /// State after a tick or on `query`.
    Snapshot {
        /// Tick the snapshot was taken after.
        tick: u64,
        /// Battle status.
        status: BattleStatus,
        /// Live units.
        units: Vec<UnitView>,
        /// In-flight projectiles.
        projectiles: Vec<ProjectileView>,
    },

    /// The battle has ended.
    Result {
        /// Terminal result.
        result: BattleResult,
        /// State hash at the final tick.
        hash: u64,
    },

    /// State hash for determinism checks.
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash value.
        hash: u64,
    },

    /// Outcome of a determinism verification run.
    Verified {
        /// Number of runs compared.
        runs: usize,
        /// Whether every run agreed.
        deterministic: bool,
        /// Distinct final hashes seen.
        hashes: Vec<u64>,
        /// Result of the first run.
        result: BattleResult,
    },

    /// A command could not be processed.
    Error {
        /// What went wrong.
        message: String,
        /// Offending command, if it parsed.
        #[serde(skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// Session over.
    Bye,
}

/// Unit state on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    /// Entity id.
    pub id: EntityId,
    /// Kind label.
    pub kind: String,
    /// Side.
    pub team: Team,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Current health over max, in `[0, 1]`.
    pub health_fraction: f64,
    /// State machine tag.
    pub state: UnitState,
    /// Last transition reason, for animation.
    pub presentation: PresentationTag,
}

impl From<&UnitSnapshot> for UnitView {
    fn from(unit: &UnitSnapshot) -> Self {
        let (x, y) = unit.position.to_f64();
        Self {
            id: unit.id,
            kind: unit.kind.as_str().to_string(),
            team: unit.team,
            x,
            y,
            health_fraction: unit.health_fraction.to_num(),
            state: unit.state,
            presentation: unit.presentation_tag,
        }
    }
}

/// Projectile state on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    /// Entity id.
    pub id: EntityId,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Direction of travel, x component.
    pub dx: f64,
    /// Direction of travel, y component.
    pub dy: f64,
}

impl From<&ProjectileSnapshot> for ProjectileView {
    fn from(projectile: &ProjectileSnapshot) -> Self {
        let (x, y) = projectile.position.to_f64();
        let (dx, dy) = projectile.direction.to_f64();
        Self {
            id: projectile.id,
            x,
            y,
            dx,
            dy,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64, units: usize) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            units,
        }
    }

    /// Build a snapshot response.
    pub fn snapshot(snapshot: &TickSnapshot, status: BattleStatus) -> Self {
        Self::Snapshot {
            tick: snapshot.tick,
            status,
            units: snapshot.units.iter().map(UnitView::from).collect(),
            projectiles: snapshot.projectiles.iter().map(ProjectileView::from).collect(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::math::{Fixed, Vec2Fixed};
    use battle_core::snapshot::EndReason;

    #[test]
    fn test_parse_tick_command() {
        let cmd = Command::from_json(r#"{"cmd":"tick","count":60}"#).unwrap();
        assert_eq!(cmd, Command::Tick { count: 60 });
    }

    #[test]
    fn test_default_tick_count() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert_eq!(cmd, Command::Tick { count: 1 });
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::from_json(r#"{"cmd":"query"}"#).unwrap(), Command::Query);
        assert_eq!(Command::from_json(r#"{"cmd":"hash"}"#).unwrap(), Command::Hash);
        assert_eq!(Command::from_json(r#"{"cmd":"abort"}"#).unwrap(), Command::Abort);
        assert!(Command::from_json(r#"{"cmd":"spawn"}"#).is_err());
    }

    #[test]
    fn test_ready_line() {
        let line = Response::ready(0, 6).to_json_line();
        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""type":"ready""#));
        assert!(line.contains(r#""version":"1.0""#));
    }

    #[test]
    fn test_snapshot_uses_float_positions() {
        let snapshot = TickSnapshot {
            tick: 7,
            units: vec![UnitSnapshot {
                id: 1,
                kind: "core_archer".into(),
                team: Team::A,
                position: Vec2Fixed::from_f64(100.5, 200.25),
                health_fraction: Fixed::from_num(0.5),
                state: UnitState::Pursuing,
                presentation_tag: PresentationTag::TargetAcquired,
            }],
            projectiles: Vec::new(),
        };

        let json = Response::snapshot(&snapshot, BattleStatus::Running).to_json_line();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["status"], "running");
        assert_eq!(value["units"][0]["x"], 100.5);
        assert_eq!(value["units"][0]["y"], 200.25);
        assert_eq!(value["units"][0]["health_fraction"], 0.5);
        assert_eq!(value["units"][0]["kind"], "core_archer");
    }

    #[test]
    fn test_result_roundtrip() {
        let response = Response::Result {
            result: BattleResult {
                outcome: BattleStatus::Draw,
                reason: EndReason::TickBudget,
                ticks: 3600,
                surviving_units: Vec::new(),
            },
            hash: 42,
        };
        let line = response.to_json_line();
        let parsed: Response = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed, response);
    }
}
