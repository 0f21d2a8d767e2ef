//! Unit data structures for data-driven unit definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Armor, AttackKind, AttackProfile, ProjectileProfile, Team, UnitKind, UnitStats};
use crate::error::{GameError, Result};
use crate::math::{checked_from_f64, Vec2Fixed};
use crate::setup::UnitSpawn;

/// Projectile flight data in authoring units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileData {
    /// World units per second.
    pub speed: f64,
    /// Collision radius.
    #[serde(default = "default_projectile_radius")]
    pub radius: f64,
}

const fn default_projectile_radius() -> f64 {
    4.0
}

/// Attack data in authoring units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackData {
    /// Range in world units, centre to centre.
    pub range: f64,
    /// Damage per hit.
    pub damage: u32,
    /// Seconds between attacks.
    pub cooldown: f64,
    /// Melee or ranged.
    #[serde(default)]
    pub kind: AttackKind,
    /// Required when `kind` is `Ranged`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectile: Option<ProjectileData>,
}

/// Data-driven unit definition.
///
/// All distances, speeds and times are plain floats so the files stay
/// readable; they are converted to fixed point when a spawn is resolved.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "core_archer",
///     name: "Archer",
///     health: 60,
///     radius: 12.0,
///     speed: 70.0,
///     attack: AttackData(
///         range: 420.0,
///         damage: 9,
///         cooldown: 1.5,
///         kind: Ranged,
///         projectile: Some(ProjectileData(speed: 600.0, radius: 4.0)),
///     ),
///     tags: ["ranged"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier; used as the unit kind label.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Maximum health points.
    pub health: u32,

    /// Collision radius.
    pub radius: f64,

    /// Movement speed in world units per second.
    pub speed: f64,

    /// Attack capability.
    pub attack: AttackData,

    /// Damage mitigation.
    #[serde(default)]
    pub armor: Armor,

    /// Tags for categorization (e.g. "melee", "ranged", "mounted").
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UnitData {
    /// Check if this unit has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Check if this unit attacks with projectiles.
    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.attack.kind == AttackKind::Ranged
    }

    /// Convert to core stats, applying `overrides` first.
    pub fn resolve_stats(&self, overrides: &StatOverrides) -> Result<UnitStats> {
        let convert = |value: f64, field: &str| {
            checked_from_f64(value).ok_or_else(|| GameError::InvalidUnitData {
                kind: self.id.clone(),
                reason: format!("{field} is not a representable number"),
            })
        };

        let projectile = match self.attack.projectile {
            Some(data) => Some(ProjectileProfile {
                speed: convert(overrides.projectile_speed.unwrap_or(data.speed), "projectile speed")?,
                radius: convert(data.radius, "projectile radius")?,
            }),
            None => None,
        };

        let attack = AttackProfile {
            range: convert(overrides.range.unwrap_or(self.attack.range), "range")?,
            damage: overrides.damage.unwrap_or(self.attack.damage),
            cooldown: convert(overrides.cooldown.unwrap_or(self.attack.cooldown), "cooldown")?,
            kind: self.attack.kind,
            projectile,
        };

        Ok(UnitStats {
            health: overrides.health.unwrap_or(self.health),
            radius: convert(overrides.radius.unwrap_or(self.radius), "radius")?,
            speed: convert(overrides.speed.unwrap_or(self.speed), "speed")?,
            attack,
            armor: overrides.armor.unwrap_or(self.armor),
        })
    }
}

/// Per-spawn stat replacements, resolved before the battle starts.
///
/// Every field is optional; a present field replaces the catalog value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatOverrides {
    /// Maximum health.
    pub health: Option<u32>,
    /// Damage per hit.
    pub damage: Option<u32>,
    /// Attack range.
    pub range: Option<f64>,
    /// Seconds between attacks.
    pub cooldown: Option<f64>,
    /// Movement speed.
    pub speed: Option<f64>,
    /// Collision radius.
    pub radius: Option<f64>,
    /// Projectile speed (ranged units only).
    pub projectile_speed: Option<f64>,
    /// Damage mitigation.
    pub armor: Option<Armor>,
}

impl StatOverrides {
    /// Whether no field is overridden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One unit placement as handed over by the setup layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    /// Catalog id of the unit.
    pub unit_kind: String,
    /// Side.
    pub team: Team,
    /// Starting position in world units.
    pub position: (f64, f64),
    /// Stat replacements.
    #[serde(default, skip_serializing_if = "StatOverrides::is_empty")]
    pub stat_overrides: StatOverrides,
}

impl SpawnRecord {
    /// Placement without overrides.
    #[must_use]
    pub fn new(unit_kind: impl Into<String>, team: Team, position: (f64, f64)) -> Self {
        Self {
            unit_kind: unit_kind.into(),
            team,
            position,
            stat_overrides: StatOverrides::default(),
        }
    }

    /// Builder method to set overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: StatOverrides) -> Self {
        self.stat_overrides = overrides;
        self
    }
}

/// Lookup table of unit definitions by id.
///
/// Serialized as a plain list of [`UnitData`]; later entries replace
/// earlier ones with the same id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<UnitData>", into = "Vec<UnitData>")]
pub struct UnitCatalog {
    units: BTreeMap<String, UnitData>,
}

impl From<Vec<UnitData>> for UnitCatalog {
    fn from(units: Vec<UnitData>) -> Self {
        units.into_iter().collect()
    }
}

impl From<UnitCatalog> for Vec<UnitData> {
    fn from(catalog: UnitCatalog) -> Self {
        catalog.units.into_values().collect()
    }
}

impl FromIterator<UnitData> for UnitCatalog {
    fn from_iter<I: IntoIterator<Item = UnitData>>(iter: I) -> Self {
        let mut catalog = Self::default();
        for unit in iter {
            catalog.insert(unit);
        }
        catalog
    }
}

impl UnitCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition.
    pub fn insert(&mut self, unit: UnitData) {
        self.units.insert(unit.id.clone(), unit);
    }

    /// Definition for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&UnitData> {
        self.units.get(id)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitData> {
        self.units.values()
    }

    /// Resolve a placement into a core spawn.
    pub fn resolve(&self, record: &SpawnRecord) -> Result<UnitSpawn> {
        let data = self
            .get(&record.unit_kind)
            .ok_or_else(|| GameError::UnknownUnitKind(record.unit_kind.clone()))?;
        let stats = data.resolve_stats(&record.stat_overrides)?;
        let (x, y) = record.position;
        let position = Vec2Fixed::checked_from_f64(x, y).ok_or_else(|| GameError::InvalidUnitData {
            kind: record.unit_kind.clone(),
            reason: format!("position ({x}, {y}) is not representable"),
        })?;

        Ok(UnitSpawn {
            kind: UnitKind::new(data.id.as_str()),
            team: record.team,
            position,
            stats,
        })
    }

    /// Resolve every placement, preserving order.
    pub fn resolve_all(&self, records: &[SpawnRecord]) -> Result<Vec<UnitSpawn>> {
        records.iter().map(|record| self.resolve(record)).collect()
    }
}
