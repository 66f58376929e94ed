//! Spell data structures.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};
use crate::spells::{SpellCategory, SpellKind};

/// Data-driven spell definition.
///
/// `amount` is the total heal or damage. For duration spells it is spread
/// evenly over `duration` seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellData {
    /// Spell type this entry describes.
    pub kind: SpellKind,

    /// Instant or duration.
    pub category: SpellCategory,

    /// Effect radius in world units.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,

    /// Heal or damage amount.
    #[serde(with = "fixed_decimal", default = "default_amount")]
    pub amount: Fixed,

    /// Lifetime in seconds (duration spells only).
    #[serde(with = "fixed_decimal", default)]
    pub duration: Fixed,

    /// Stat multiplier (Rage only).
    #[serde(with = "fixed_decimal", default = "default_ratio")]
    pub ratio: Fixed,
}

fn default_amount() -> Fixed {
    Fixed::from_num(100)
}

fn default_ratio() -> Fixed {
    Fixed::ONE
}
