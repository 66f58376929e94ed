//! Troop data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};
use crate::units::{AttackPreference, UnitCategory, UnitKind, UnitStats};

/// Stats of one troop level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopLevel {
    /// Maximum hit points.
    #[serde(with = "fixed_decimal")]
    pub hp: Fixed,
    /// Damage per attack.
    #[serde(with = "fixed_decimal")]
    pub damage: Fixed,
    /// Attacks per second.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,
    /// World units per second.
    #[serde(with = "fixed_decimal")]
    pub move_speed: Fixed,
    /// Attack reach in world units.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
}

impl TroopLevel {
    /// Convert to the runtime stat block.
    #[must_use]
    pub fn to_stats(&self) -> UnitStats {
        UnitStats {
            max_hp: self.hp,
            attack_damage: self.damage,
            attack_speed: self.attack_speed,
            move_speed: self.move_speed,
            attack_range: self.range,
        }
    }
}

/// Data-driven troop definition.
///
/// # Example RON
///
/// ```ron
/// TroopData(
///     kind: Giant,
///     category: Land,
///     preference: Defense,
///     levels: [
///         (hp: 300.0, damage: 11.0, attack_speed: 0.5, move_speed: 60.0, range: 40.0),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopData {
    /// Troop type this entry describes.
    pub kind: UnitKind,

    /// Movement layer.
    pub category: UnitCategory,

    /// Target preference.
    #[serde(default)]
    pub preference: AttackPreference,

    /// Stats per level; index 0 is level 1.
    pub levels: Vec<TroopLevel>,
}

impl TroopData {
    /// Stats for a 1-based level.
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&TroopLevel> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.levels.get(index)
    }

    /// Highest level defined.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX)
    }
}
