//! Building data structures for data-driven building definitions.

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind, DefenseStats, TrapStats};
use crate::grid::GridParameters;
use crate::error::{RaidError, Result};
use crate::math::{fixed_decimal, Fixed};
use crate::units::UnitCategory;

/// Broad building role; selects the [`BuildingKind`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingRole {
    /// The town hall.
    TownHall,
    /// Attacks units in range.
    Defense,
    /// Produces resources.
    Resource,
    /// Stores resources.
    Storage,
    /// Trains and houses troops.
    Barracks,
    /// Blocks movement.
    Wall,
    /// Hidden one-shot explosive.
    Trap,
}

/// Combat stats of a defense level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseLevel {
    /// Damage per shot.
    #[serde(with = "fixed_decimal")]
    pub damage: Fixed,
    /// Reach in world units.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Shots per second.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,
    /// Unit categories this defense can hit; empty means all.
    #[serde(default)]
    pub targets: Vec<UnitCategory>,
}

/// Stats of a trap level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapLevel {
    /// Blast damage.
    #[serde(with = "fixed_decimal")]
    pub damage: Fixed,
    /// A unit this close sets the trap off.
    #[serde(with = "fixed_decimal")]
    pub trigger_radius: Fixed,
    /// Every unit this close takes the blast.
    #[serde(with = "fixed_decimal")]
    pub blast_radius: Fixed,
}

/// Stats of one building level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLevel {
    /// Maximum hit points.
    #[serde(with = "fixed_decimal")]
    pub hp: Fixed,

    /// Required for defenses.
    #[serde(default)]
    pub defense: Option<DefenseLevel>,

    /// Required for traps.
    #[serde(default)]
    pub trap: Option<TrapLevel>,

    /// Resource or troop capacity.
    #[serde(default)]
    pub capacity: u32,

    /// Resource produced per hour (collectors only).
    #[serde(default)]
    pub production_rate: u32,
}

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     name: "Cannon",
///     role: Defense,
///     grid_count: 3,
///     levels: [
///         (hp: 420.0, defense: Some((damage: 9.0, range: 180.0, attack_speed: 1.25, targets: [Land]))),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Unique name, also the key used in village layouts.
    pub name: String,

    /// Building role.
    pub role: BuildingRole,

    /// Footprint side length in cells.
    #[serde(default = "default_grid_count")]
    pub grid_count: u32,

    /// Stats per level; index 0 is level 1.
    pub levels: Vec<BuildingLevel>,
}

const fn default_grid_count() -> u32 {
    1
}

impl BuildingData {
    /// Stats for a 1-based level.
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&BuildingLevel> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.levels.get(index)
    }

    /// Build the tagged kind for a level.
    ///
    /// # Errors
    ///
    /// Fails if the level does not exist or a defense/trap level lacks its
    /// combat block.
    pub fn kind_at(&self, level: u32) -> Result<BuildingKind> {
        let stats = self.level(level).ok_or_else(|| RaidError::InvalidLevel {
            name: self.name.clone(),
            level,
        })?;

        let missing = |block: &str| RaidError::DataParseError {
            path: self.name.clone(),
            message: format!("level {level} has no {block} stats"),
        };

        Ok(match self.role {
            BuildingRole::TownHall => BuildingKind::TownHall,
            BuildingRole::Defense => {
                let d = stats.defense.as_ref().ok_or_else(|| missing("defense"))?;
                BuildingKind::Defense(DefenseStats {
                    damage: d.damage,
                    range: d.range,
                    attack_speed: d.attack_speed,
                    targets: d.targets.clone(),
                })
            }
            BuildingRole::Resource => BuildingKind::Resource {
                capacity: stats.capacity,
                production_rate: stats.production_rate,
            },
            BuildingRole::Storage => BuildingKind::Storage {
                capacity: stats.capacity,
            },
            BuildingRole::Barracks => BuildingKind::Barracks {
                capacity: stats.capacity,
            },
            BuildingRole::Wall => BuildingKind::Wall,
            BuildingRole::Trap => {
                let t = stats.trap.as_ref().ok_or_else(|| missing("trap"))?;
                BuildingKind::Trap(TrapStats {
                    damage: t.damage,
                    trigger_radius: t.trigger_radius,
                    blast_radius: t.blast_radius,
                })
            }
        })
    }

    /// Create a full-HP building of this type anchored on `(row, col)`.
    ///
    /// # Errors
    /// Returns an error if the level does not exist or lacks the stats its
    /// role needs.
    pub fn instantiate(
        &self,
        level: u32,
        row: Fixed,
        col: Fixed,
        grid: &GridParameters,
    ) -> Result<Building> {
        let kind = self.kind_at(level)?;
        let max_hp = self.level(level).map_or(Fixed::ONE, |l| l.hp);
        Ok(Building::new(
            self.name.clone(),
            kind,
            level,
            max_hp,
            self.grid_count,
            row,
            col,
            grid,
        ))
    }
}
