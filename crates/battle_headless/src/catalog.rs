//! Unit catalog loading.
//!
//! The catalog file is a RON list of `UnitData` entries. Without a file the
//! runner falls back to [`default_catalog`], which holds the core roster.

use std::path::Path;

use battle_core::components::{Armor, AttackKind};
use battle_core::data::{AttackData, ProjectileData, UnitCatalog, UnitData};

use crate::scenario::ScenarioError;

/// Load a unit catalog from a RON file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<UnitCatalog, ScenarioError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let catalog: UnitCatalog = ron::from_str(&contents)?;
    tracing::debug!(path = %path.display(), units = catalog.len(), "Loaded unit catalog");
    Ok(catalog)
}

/// Load `path` if given, otherwise the built-in roster.
pub fn load_catalog_or_default(path: Option<&Path>) -> Result<UnitCatalog, ScenarioError> {
    path.map_or_else(|| Ok(default_catalog()), load_catalog)
}

fn melee(damage: u32, range: f64, cooldown: f64) -> AttackData {
    AttackData {
        range,
        damage,
        cooldown,
        kind: AttackKind::Melee,
        projectile: None,
    }
}

fn ranged(damage: u32, range: f64, cooldown: f64, speed: f64, radius: f64) -> AttackData {
    AttackData {
        range,
        damage,
        cooldown,
        kind: AttackKind::Ranged,
        projectile: Some(ProjectileData { speed, radius }),
    }
}

fn unit(id: &str, name: &str, health: u32, radius: f64, speed: f64, attack: AttackData) -> UnitData {
    UnitData {
        id: id.to_string(),
        name: name.to_string(),
        health,
        radius,
        speed,
        attack,
        armor: Armor::NONE,
        tags: Vec::new(),
    }
}

/// The built-in core roster.
///
/// Mirrors `assets/data/units.ron`.
pub fn default_catalog() -> UnitCatalog {
    let tagged = |mut data: UnitData, tags: &[&str]| {
        data.tags = tags.iter().map(|t| (*t).to_string()).collect();
        data
    };

    [
        tagged(
            UnitData {
                armor: Armor::new(2, 0),
                ..unit("core_swordsman", "Swordsman", 100, 12.0, 60.0, melee(12, 30.0, 1.0))
            },
            &["melee", "infantry"],
        ),
        tagged(
            unit("core_archer", "Archer", 60, 12.0, 55.0, ranged(9, 400.0, 1.5, 600.0, 4.0)),
            &["ranged", "infantry"],
        ),
        tagged(
            unit("core_duelist", "Duelist", 70, 10.0, 90.0, melee(5, 24.0, 0.4)),
            &["melee", "infantry"],
        ),
        tagged(
            unit("core_wizard", "Wizard", 45, 12.0, 45.0, ranged(25, 350.0, 3.0, 300.0, 9.0)),
            &["ranged", "caster"],
        ),
        tagged(
            UnitData {
                armor: Armor::new(0, 20),
                ..unit("core_cavalry", "Cavalry", 160, 16.0, 140.0, melee(15, 36.0, 1.2))
            },
            &["melee", "mounted"],
        ),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_catalog_has_core_roster() {
        let catalog = default_catalog();
        let ids: Vec<_> = catalog.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["core_archer", "core_cavalry", "core_duelist", "core_swordsman", "core_wizard"]
        );
        assert!(catalog.get("core_wizard").unwrap().is_ranged());
        assert!(catalog.get("core_cavalry").unwrap().has_tag("mounted"));
    }

    #[test]
    fn test_asset_file_matches_default_catalog() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/data/units.ron");
        let loaded = load_catalog(path).unwrap();
        assert_eq!(loaded, default_catalog());
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                (
                    id: "militia",
                    health: 30,
                    radius: 8.0,
                    speed: 50.0,
                    attack: (range: 20.0, damage: 3, cooldown: 1.0),
                ),
            ]"#
        )
        .unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        let militia = catalog.get("militia").unwrap();
        assert_eq!(militia.attack.kind, AttackKind::Melee);
        assert_eq!(militia.armor, Armor::NONE);
    }

    #[test]
    fn test_missing_catalog_file() {
        let err = load_catalog("nowhere/units.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_fallback_to_default() {
        let catalog = load_catalog_or_default(None).unwrap();
        assert_eq!(catalog, default_catalog());
    }
}
