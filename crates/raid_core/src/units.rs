//! Attacking troops and their storage.
//!
//! A [`Unit`] is a plain record: its behaviour lives in [`crate::ai`]. Units
//! are stored in a [`UnitArena`] and referenced by [`UnitId`] everywhere, so
//! structures and spells never hold references into each other.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingId, BuildingKind};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Unique identifier for a unit within one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Troop type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Melee all-rounder.
    Barbarian,
    /// Ranged attacker.
    Archer,
    /// Slow, durable defense hunter.
    Giant,
    /// Wall breaker that explodes on contact.
    Bomber,
    /// Flying attacker.
    Dragon,
}

impl UnitKind {
    /// All troop kinds in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Barbarian,
        Self::Archer,
        Self::Giant,
        Self::Bomber,
        Self::Dragon,
    ];

    /// Category string used in placement logs.
    #[must_use]
    pub const fn category_name(self) -> &'static str {
        match self {
            Self::Barbarian => "barbarian",
            Self::Archer => "archer",
            Self::Giant => "giant",
            Self::Bomber => "bomber",
            Self::Dragon => "dragon",
        }
    }

    /// Parse a placement-log category string.
    #[must_use]
    pub fn from_category_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.category_name() == name)
    }

    /// True for troops whose attack is a single self-destructing blast.
    #[must_use]
    pub const fn explodes_on_attack(self) -> bool {
        matches!(self, Self::Bomber)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category_name())
    }
}

/// Movement layer of a unit; defenses filter targets by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitCategory {
    /// Walks on the grid and uses path finding.
    Land,
    /// Flies straight over everything.
    Air,
}

/// Which buildings a unit prefers to attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackPreference {
    /// Every building is preferred.
    #[default]
    Any,
    /// Defensive structures.
    Defense,
    /// Resource collectors and storages.
    Resource,
    /// The town hall.
    TownHall,
    /// Walls.
    Wall,
}

impl AttackPreference {
    /// True if a building of this kind is in the preferred tier.
    #[must_use]
    pub fn matches(self, kind: &BuildingKind) -> bool {
        match self {
            Self::Any => true,
            Self::Defense => matches!(kind, BuildingKind::Defense(_)),
            Self::Resource => {
                matches!(kind, BuildingKind::Resource { .. } | BuildingKind::Storage { .. })
            }
            Self::TownHall => matches!(kind, BuildingKind::TownHall),
            Self::Wall => matches!(kind, BuildingKind::Wall),
        }
    }
}

/// AI state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// Looking for a target.
    #[default]
    Idle,
    /// Walking along a path.
    Moving,
    /// In range of its target and attacking.
    Attacking,
    /// Terminal. No further state changes.
    Dead,
}

/// Combat statistics of a live unit.
///
/// Stored as raw fixed-point bits so that scaled values survive a snapshot
/// round trip exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum hit points.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Damage per attack.
    #[serde(with = "fixed_serde")]
    pub attack_damage: Fixed,
    /// Attacks per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// World units per second.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,
    /// Attack reach in world units.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,
}

impl UnitStats {
    /// Seconds between two attacks.
    #[must_use]
    pub fn attack_interval(&self) -> Fixed {
        if self.attack_speed > Fixed::ZERO {
            Fixed::ONE / self.attack_speed
        } else {
            Fixed::MAX
        }
    }
}

/// A troop on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Arena identifier.
    pub id: UnitId,
    /// Troop type.
    pub kind: UnitKind,
    /// Troop level the stats were taken from.
    pub level: u32,
    /// Movement layer.
    pub category: UnitCategory,
    /// Target preference.
    pub preference: AttackPreference,
    /// World position.
    pub position: Vec2Fixed,
    /// Current (possibly buffed) combat stats.
    pub stats: UnitStats,
    #[serde(with = "fixed_serde")]
    hp: Fixed,
    state: UnitState,
    /// Building currently targeted.
    pub target: Option<BuildingId>,
    /// Remaining waypoints; the front is the current movement target.
    pub path: VecDeque<Vec2Fixed>,
    /// Seconds until the next attack may land.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
}

impl Unit {
    /// Create a unit at full health in the `Idle` state.
    ///
    /// The id is assigned when the unit is inserted into a [`UnitArena`].
    #[must_use]
    pub fn new(
        kind: UnitKind,
        level: u32,
        category: UnitCategory,
        preference: AttackPreference,
        stats: UnitStats,
        position: Vec2Fixed,
    ) -> Self {
        Self {
            id: UnitId(0),
            kind,
            level,
            category,
            preference,
            position,
            stats,
            hp: stats.max_hp,
            state: UnitState::Idle,
            target: None,
            path: VecDeque::new(),
            attack_cooldown: Fixed::ZERO,
        }
    }

    /// Current hit points.
    #[must_use]
    pub const fn hp(&self) -> Fixed {
        self.hp
    }

    /// Current AI state.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// True unless the unit is dead.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != UnitState::Dead
    }

    /// Switch AI state. Has no effect on a dead unit.
    pub fn set_state(&mut self, state: UnitState) {
        if self.is_alive() {
            self.state = state;
        }
    }

    /// Apply damage. Returns `true` if this hit killed the unit.
    ///
    /// Ignored once the unit is dead.
    pub fn take_damage(&mut self, amount: Fixed) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp -= amount;
        if self.hp <= Fixed::ZERO {
            self.kill();
            return true;
        }
        false
    }

    /// Kill the unit outright, clamping HP to zero.
    pub fn kill(&mut self) {
        self.hp = Fixed::ZERO;
        self.state = UnitState::Dead;
        self.target = None;
        self.path.clear();
    }

    /// Restore HP, clamped to the maximum. Ignored once dead.
    pub fn heal(&mut self, amount: Fixed) {
        if self.is_alive() {
            self.hp = (self.hp + amount).min(self.stats.max_hp);
        }
    }

    /// Multiply damage, attack speed and move speed by `ratio`.
    pub fn apply_rage(&mut self, ratio: Fixed) {
        if !self.is_alive() {
            return;
        }
        self.stats.attack_damage *= ratio;
        self.stats.attack_speed *= ratio;
        self.stats.move_speed *= ratio;
    }

    /// Exact inverse of [`Unit::apply_rage`] with the same ratio.
    pub fn remove_rage(&mut self, ratio: Fixed) {
        if !self.is_alive() {
            return;
        }
        self.stats.attack_damage /= ratio;
        self.stats.attack_speed /= ratio;
        self.stats.move_speed /= ratio;
    }

    /// Forget the current target and path and go back to `Idle`.
    pub fn clear_target(&mut self) {
        self.target = None;
        self.path.clear();
        self.set_state(UnitState::Idle);
    }
}

/// Storage for all units in a battle.
///
/// Keyed by [`UnitId`] in a `BTreeMap`, so iteration is always in ascending
/// id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitArena {
    units: BTreeMap<UnitId, Unit>,
    next_id: u32,
}

impl UnitArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a unit, assigning it the next id.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = UnitId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit entirely (presentation-side cleanup of corpses).
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Iterate in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Iterate mutably in ascending id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    /// Live units in ascending id order.
    pub fn alive(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|u| u.is_alive())
    }

    /// Number of units, alive or dead.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if no unit was ever inserted (or all were removed).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
