//! Events generated during a battle tick.
//!
//! The core never calls back into the presentation layer. Instead every tick
//! returns a [`TickEvents`] value the game layer can use to drive effects,
//! sounds and animations.

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingId};
use crate::math::{fixed_serde, Fixed};
use crate::spells::SpellId;
use crate::units::{Unit, UnitId};

/// Who dealt damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attacker {
    /// A troop.
    Unit(UnitId),
    /// A defense or trap.
    Building(BuildingId),
    /// A spell.
    Spell(SpellId),
}

/// Who took damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Victim {
    /// A troop.
    Unit(UnitId),
    /// A building.
    Building(BuildingId),
}

/// A single hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Damage source.
    pub source: Attacker,
    /// Damage target.
    pub target: Victim,
    /// Damage dealt.
    #[serde(with = "fixed_serde")]
    pub amount: Fixed,
}

/// Everything that happened in one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Hits, in the order they landed.
    pub damage: Vec<DamageEvent>,
    /// Units that died this tick.
    pub unit_deaths: Vec<UnitId>,
    /// Buildings destroyed this tick.
    pub buildings_destroyed: Vec<BuildingId>,
    /// Traps that exploded this tick.
    pub traps_detonated: Vec<BuildingId>,
    /// Units placed this tick.
    pub units_spawned: Vec<UnitId>,
    /// Spells cast this tick.
    pub spells_cast: Vec<SpellId>,
    /// Spells that ended this tick.
    pub spells_expired: Vec<SpellId>,
}

impl TickEvents {
    /// Damage a unit and record the hit (and the death, if any).
    pub fn hit_unit(&mut self, source: Attacker, unit: &mut Unit, amount: Fixed) {
        if !unit.is_alive() {
            return;
        }
        let died = unit.take_damage(amount);
        self.damage.push(DamageEvent {
            source,
            target: Victim::Unit(unit.id),
            amount,
        });
        if died {
            tracing::debug!(unit = %unit.id, kind = %unit.kind, ?source, "unit killed");
            self.unit_deaths.push(unit.id);
        }
    }

    /// Damage a building and record the hit (and the destruction, if any).
    pub fn hit_building(&mut self, source: Attacker, building: &mut Building, amount: Fixed) {
        if !building.is_alive() {
            return;
        }
        let destroyed = building.take_damage(amount);
        self.damage.push(DamageEvent {
            source,
            target: Victim::Building(building.id),
            amount,
        });
        if destroyed {
            tracing::info!(building = %building.id, name = %building.name, "building destroyed");
            self.buildings_destroyed.push(building.id);
        }
    }

    /// Record a unit that died outside of a hit (a bomber's self-destruct).
    pub fn record_death(&mut self, unit: UnitId) {
        self.unit_deaths.push(unit);
    }

    /// Merge another batch of events into this one, preserving order.
    pub fn extend(&mut self, other: Self) {
        self.damage.extend(other.damage);
        self.unit_deaths.extend(other.unit_deaths);
        self.buildings_destroyed.extend(other.buildings_destroyed);
        self.traps_detonated.extend(other.traps_detonated);
        self.units_spawned.extend(other.units_spawned);
        self.spells_cast.extend(other.spells_cast);
        self.spells_expired.extend(other.spells_expired);
    }

    /// True if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.damage.is_empty()
            && self.unit_deaths.is_empty()
            && self.buildings_destroyed.is_empty()
            && self.traps_detonated.is_empty()
            && self.units_spawned.is_empty()
            && self.spells_cast.is_empty()
            && self.spells_expired.is_empty()
    }
}
