//! The complete stat catalog for one battle.

use serde::{Deserialize, Serialize};

use crate::data::{BuildingData, BuildingRole, SpellData, TroopData};
use crate::error::{RaidError, Result};
use crate::math::Fixed;
use crate::spells::SpellKind;
use crate::units::UnitKind;

const BUILTIN_CATALOG: &str = include_str!("../../data/default_catalog.ron");

/// Troop, spell and building definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Troop definitions, one per [`UnitKind`].
    #[serde(default)]
    pub troops: Vec<TroopData>,
    /// Spell definitions, one per [`SpellKind`].
    #[serde(default)]
    pub spells: Vec<SpellData>,
    /// Building definitions keyed by name.
    #[serde(default)]
    pub buildings: Vec<BuildingData>,
}

impl Catalog {
    /// Parse a catalog from RON text. `origin` names the source in errors.
    pub fn from_ron_str(source: &str, origin: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| RaidError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str(BUILTIN_CATALOG, "default_catalog.ron")
    }

    /// Troop definition for a kind.
    pub fn troop(&self, kind: UnitKind) -> Result<&TroopData> {
        self.troops
            .iter()
            .find(|t| t.kind == kind)
            .ok_or_else(|| RaidError::UnknownTroop(kind.to_string()))
    }

    /// Spell definition for a kind.
    pub fn spell(&self, kind: SpellKind) -> Result<&SpellData> {
        self.spells
            .iter()
            .find(|s| s.kind == kind)
            .ok_or_else(|| RaidError::UnknownSpell(kind.to_string()))
    }

    /// Building definition by name.
    pub fn building(&self, name: &str) -> Result<&BuildingData> {
        self.buildings
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| RaidError::UnknownBuilding(name.to_string()))
    }

    /// Check the catalog for problems a parser cannot catch.
    ///
    /// Returns human-readable issues; an empty list means the catalog is
    /// usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for kind in UnitKind::ALL {
            match self.troops.iter().filter(|t| t.kind == kind).count() {
                0 => issues.push(format!("no troop entry for {kind}")),
                1 => {}
                n => issues.push(format!("{n} troop entries for {kind}")),
            }
        }
        for troop in &self.troops {
            if troop.levels.is_empty() {
                issues.push(format!("troop {} has no levels", troop.kind));
            }
            for (i, level) in troop.levels.iter().enumerate() {
                if level.hp <= Fixed::ZERO || level.attack_speed <= Fixed::ZERO {
                    issues.push(format!(
                        "troop {} level {} needs positive hp and attack speed",
                        troop.kind,
                        i + 1
                    ));
                }
            }
        }

        for kind in SpellKind::ALL {
            if self.spells.iter().all(|s| s.kind != kind) {
                issues.push(format!("no spell entry for {kind}"));
            }
        }

        for (i, building) in self.buildings.iter().enumerate() {
            if self.buildings[..i].iter().any(|b| b.name == building.name) {
                issues.push(format!("duplicate building name {}", building.name));
            }
            if building.grid_count == 0 {
                issues.push(format!("building {} has zero footprint", building.name));
            }
            if building.levels.is_empty() {
                issues.push(format!("building {} has no levels", building.name));
            }
            for level in 1..=u32::try_from(building.levels.len()).unwrap_or(u32::MAX) {
                if let Err(e) = building.kind_at(level) {
                    issues.push(e.to_string());
                }
            }
            if building.role == BuildingRole::TownHall && building.grid_count < 2 {
                issues.push(format!("town hall {} is smaller than 2x2", building.name));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingKind;

    #[test]
    fn test_builtin_catalog_parses_and_validates() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.validate().is_empty(), "{:?}", catalog.validate());
    }

    #[test]
    fn test_troop_lookup_and_levels() {
        let catalog = Catalog::builtin().unwrap();
        let giant = catalog.troop(UnitKind::Giant).unwrap();
        assert!(giant.level(1).is_some());
        assert!(giant.level(0).is_none());
        assert!(giant.level(giant.max_level() + 1).is_none());
    }

    #[test]
    fn test_unknown_building_is_error() {
        let catalog = Catalog::builtin().unwrap();
        assert!(matches!(
            catalog.building("Obelisk"),
            Err(RaidError::UnknownBuilding(_))
        ));
    }

    #[test]
    fn test_defense_kind_carries_stats() {
        let catalog = Catalog::builtin().unwrap();
        let kind = catalog.building("Cannon").unwrap().kind_at(1).unwrap();
        match kind {
            BuildingKind::Defense(stats) => assert_eq!(stats.damage, Fixed::from_num(9)),
            other => panic!("expected a defense, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = Catalog::from_ron_str("Catalog(troops: [", "broken.ron").unwrap_err();
        assert!(err.to_string().contains("broken.ron"));
    }

    #[test]
    fn test_validate_reports_missing_entries() {
        let issues = Catalog::default().validate();
        assert!(issues.iter().any(|i| i.contains("barbarian")));
        assert!(issues.iter().any(|i| i.contains("Rage")));
    }
}
