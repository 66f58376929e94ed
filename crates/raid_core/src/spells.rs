//! Spell effect engine.
//!
//! A spell is cast at a world position and affects whatever lies within its
//! radius. Two lifecycles exist:
//!
//! - **Instant**: the effect lands once on cast and the spell lingers for a
//!   short grace period before it is discarded.
//! - **Duration**: the spell lives for `duration` seconds. It keeps an
//!   affected set of unit ids, applying its modifier when a unit enters the
//!   radius and reversing it exactly when the unit leaves, dies, or the spell
//!   expires.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingArena;
use crate::data::SpellData;
use crate::events::{Attacker, TickEvents};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::units::{Unit, UnitArena, UnitId};

/// Instant spells are discarded once they are older than this (0.1 s).
pub const INSTANT_GRACE: Fixed = Fixed::from_bits(0x1999_999A);

/// Rage multiplier used when the configured ratio is not positive.
pub const DEFAULT_RAGE_RATIO: Fixed = Fixed::from_bits(0x1_8000_0000);

/// Unique identifier for a cast spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpellId(pub u32);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spell#{}", self.0)
    }
}

/// Spell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpellKind {
    /// Restores HP to units.
    Heal,
    /// Damages buildings.
    Lightning,
    /// Boosts damage, attack speed and move speed.
    Rage,
}

impl SpellKind {
    /// All spell kinds in declaration order.
    pub const ALL: [Self; 3] = [Self::Heal, Self::Lightning, Self::Rage];

    /// Category string used in placement logs.
    #[must_use]
    pub const fn category_name(self) -> &'static str {
        match self {
            Self::Heal => "Heal",
            Self::Lightning => "Lightning",
            Self::Rage => "Rage",
        }
    }

    /// Parse a placement-log category string.
    #[must_use]
    pub fn from_category_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.category_name() == name)
    }
}

impl fmt::Display for SpellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category_name())
    }
}

/// Spell lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellCategory {
    /// Lands once, then lingers for [`INSTANT_GRACE`].
    Instant,
    /// Lasts for a configured number of seconds.
    Duration,
}

/// A spell on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEffect {
    /// Identifier assigned by the session.
    pub id: SpellId,
    /// Spell type.
    pub kind: SpellKind,
    /// Lifecycle.
    pub category: SpellCategory,
    /// Centre of the effect.
    pub position: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    radius: Fixed,
    #[serde(with = "fixed_serde")]
    amount: Fixed,
    #[serde(with = "fixed_serde")]
    duration: Fixed,
    #[serde(with = "fixed_serde")]
    ratio: Fixed,
    #[serde(with = "fixed_serde")]
    elapsed: Fixed,
    active: bool,
    affected: BTreeSet<UnitId>,
}

impl SpellEffect {
    /// Instantiate a spell from its catalog entry.
    #[must_use]
    pub fn new(id: SpellId, data: &SpellData, position: Vec2Fixed) -> Self {
        let ratio = if data.kind == SpellKind::Rage && data.ratio <= Fixed::ZERO {
            DEFAULT_RAGE_RATIO
        } else {
            data.ratio
        };
        Self {
            id,
            kind: data.kind,
            category: data.category,
            position,
            radius: data.radius,
            amount: data.amount,
            duration: data.duration,
            ratio,
            elapsed: Fixed::ZERO,
            active: true,
            affected: BTreeSet::new(),
        }
    }

    /// False once the spell has ended.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Seconds since cast.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Units currently carrying this spell's modifier.
    #[must_use]
    pub const fn affected(&self) -> &BTreeSet<UnitId> {
        &self.affected
    }

    fn covers(&self, point: Vec2Fixed) -> bool {
        self.position.within(point, self.radius)
    }

    /// Apply the on-cast effect.
    pub fn cast(&mut self, units: &mut UnitArena, buildings: &mut BuildingArena, events: &mut TickEvents) {
        tracing::debug!(spell = %self.id, kind = %self.kind, "spell cast");
        match self.category {
            SpellCategory::Instant => {
                self.apply_pulse(self.amount, units, buildings, events);
                self.sync_affected(units);
            }
            SpellCategory::Duration => self.sync_affected(units),
        }
    }

    /// Advance the spell by `dt` seconds.
    pub fn update(
        &mut self,
        dt: Fixed,
        units: &mut UnitArena,
        buildings: &mut BuildingArena,
        events: &mut TickEvents,
    ) {
        if !self.active {
            return;
        }
        self.elapsed += dt;

        match self.category {
            SpellCategory::Instant => {
                if self.elapsed > INSTANT_GRACE {
                    self.end(units, events);
                }
            }
            SpellCategory::Duration => {
                if self.elapsed >= self.duration {
                    self.end(units, events);
                    return;
                }
                self.sync_affected(units);
                let per_tick = self.amount / self.duration * dt;
                self.apply_pulse(per_tick, units, buildings, events);
            }
        }
    }

    /// Heal or damage everything in range by `amount`.
    fn apply_pulse(
        &self,
        amount: Fixed,
        units: &mut UnitArena,
        buildings: &mut BuildingArena,
        events: &mut TickEvents,
    ) {
        match self.kind {
            SpellKind::Heal => {
                for unit in units.iter_mut() {
                    if unit.is_alive() && self.covers(unit.position) {
                        unit.heal(amount);
                    }
                }
            }
            SpellKind::Lightning => {
                let source = Attacker::Spell(self.id);
                for building in buildings.iter_mut() {
                    if building.is_targetable() && self.covers(building.position()) {
                        events.hit_building(source, building, amount);
                    }
                }
            }
            SpellKind::Rage => {}
        }
    }

    /// Bring the affected set in line with the live units inside the radius.
    fn sync_affected(&mut self, units: &mut UnitArena) {
        let inside: BTreeSet<UnitId> = units
            .alive()
            .filter(|u| self.covers(u.position))
            .map(|u| u.id)
            .collect();

        let left: Vec<UnitId> = self.affected.difference(&inside).copied().collect();
        for id in left {
            if let Some(unit) = units.get_mut(id) {
                self.on_exit(unit);
            }
        }

        let entered: Vec<UnitId> = inside.difference(&self.affected).copied().collect();
        for id in entered {
            if let Some(unit) = units.get_mut(id) {
                self.on_enter(unit);
            }
        }

        self.affected = inside;
    }

    fn on_enter(&self, unit: &mut Unit) {
        if self.kind == SpellKind::Rage {
            unit.apply_rage(self.ratio);
        }
    }

    fn on_exit(&self, unit: &mut Unit) {
        if self.kind == SpellKind::Rage {
            unit.remove_rage(self.ratio);
        }
    }

    fn end(&mut self, units: &mut UnitArena, events: &mut TickEvents) {
        for id in std::mem::take(&mut self.affected) {
            if let Some(unit) = units.get_mut(id) {
                self.on_exit(unit);
            }
        }
        self.active = false;
        tracing::debug!(spell = %self.id, kind = %self.kind, "spell ended");
        events.spells_expired.push(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{Building, BuildingKind};
    use crate::grid::GridParameters;
    use crate::units::{AttackPreference, UnitCategory, UnitKind, UnitStats};

    fn dt() -> Fixed {
        Fixed::ONE / 20
    }

    fn base_stats() -> UnitStats {
        UnitStats {
            max_hp: Fixed::from_num(100),
            attack_damage: Fixed::from_num(10),
            attack_speed: Fixed::ONE,
            move_speed: Fixed::from_num(100),
            attack_range: Fixed::from_num(30),
        }
    }

    fn unit_at(x: i32, y: i32) -> Unit {
        Unit::new(
            UnitKind::Barbarian,
            1,
            UnitCategory::Land,
            AttackPreference::Any,
            base_stats(),
            Vec2Fixed::from_ints(x, y),
        )
    }

    fn spell(kind: SpellKind, category: SpellCategory, amount: i32, duration: i32) -> SpellEffect {
        let data = SpellData {
            kind,
            category,
            radius: Fixed::from_num(100),
            amount: Fixed::from_num(amount),
            duration: Fixed::from_num(duration),
            ratio: Fixed::from_num(1.5),
        };
        SpellEffect::new(SpellId(1), &data, Vec2Fixed::ZERO)
    }

    #[test]
    fn test_category_names_round_trip() {
        for kind in SpellKind::ALL {
            assert_eq!(SpellKind::from_category_name(kind.category_name()), Some(kind));
        }
        assert_eq!(SpellKind::from_category_name("heal"), None);
    }

    #[test]
    fn test_instant_heal_clamps_and_expires() {
        let mut units = UnitArena::new();
        let hurt = units.insert(unit_at(10, 0));
        let far = units.insert(unit_at(500, 0));
        units.get_mut(hurt).unwrap().take_damage(Fixed::from_num(30));
        units.get_mut(far).unwrap().take_damage(Fixed::from_num(30));
        let mut buildings = BuildingArena::new();
        let mut events = TickEvents::default();

        let mut heal = spell(SpellKind::Heal, SpellCategory::Instant, 100, 0);
        heal.cast(&mut units, &mut buildings, &mut events);
        assert_eq!(units.get(hurt).unwrap().hp(), Fixed::from_num(100));
        assert_eq!(units.get(far).unwrap().hp(), Fixed::from_num(70));

        heal.update(dt(), &mut units, &mut buildings, &mut events);
        heal.update(dt(), &mut units, &mut buildings, &mut events);
        assert!(heal.is_active());
        heal.update(dt(), &mut units, &mut buildings, &mut events);
        assert!(!heal.is_active());
        assert_eq!(events.spells_expired, vec![SpellId(1)]);
    }

    #[test]
    fn test_lightning_hits_buildings_only() {
        let grid = GridParameters::new(Vec2Fixed::ZERO, Fixed::from_num(32), Fixed::from_num(16), 20);
        let mut buildings = BuildingArena::new();
        let near = buildings.insert(Building::new(
            "Wall",
            BuildingKind::Wall,
            1,
            Fixed::from_num(300),
            1,
            Fixed::ONE,
            Fixed::ONE,
            &grid,
        ));
        let far = buildings.insert(Building::new(
            "Wall",
            BuildingKind::Wall,
            1,
            Fixed::from_num(300),
            1,
            Fixed::from_num(10),
            Fixed::from_num(10),
            &grid,
        ));
        let mut units = UnitArena::new();
        let bystander = units.insert(unit_at(0, 0));
        let mut events = TickEvents::default();

        let mut lightning = spell(SpellKind::Lightning, SpellCategory::Instant, 150, 0);
        lightning.cast(&mut units, &mut buildings, &mut events);

        assert_eq!(buildings.get(near).unwrap().hp(), Fixed::from_num(150));
        assert_eq!(buildings.get(far).unwrap().hp(), Fixed::from_num(300));
        assert_eq!(units.get(bystander).unwrap().hp(), Fixed::from_num(100));
        assert_eq!(events.damage.len(), 1);
    }

    #[test]
    fn test_rage_enter_exit_reenter_expire() {
        let mut units = UnitArena::new();
        let id = units.insert(unit_at(10, 0));
        let mut buildings = BuildingArena::new();
        let mut events = TickEvents::default();

        let mut rage = spell(SpellKind::Rage, SpellCategory::Duration, 0, 2);
        rage.cast(&mut units, &mut buildings, &mut events);
        assert_eq!(units.get(id).unwrap().stats.move_speed, Fixed::from_num(150));
        assert!(rage.affected().contains(&id));

        units.get_mut(id).unwrap().position = Vec2Fixed::from_ints(300, 0);
        rage.update(dt(), &mut units, &mut buildings, &mut events);
        assert_eq!(units.get(id).unwrap().stats, base_stats());
        assert!(rage.affected().is_empty());

        units.get_mut(id).unwrap().position = Vec2Fixed::from_ints(20, 0);
        rage.update(dt(), &mut units, &mut buildings, &mut events);
        assert_eq!(units.get(id).unwrap().stats.attack_damage, Fixed::from_num(15));

        for _ in 0..60 {
            rage.update(dt(), &mut units, &mut buildings, &mut events);
        }
        assert!(!rage.is_active());
        assert_eq!(units.get(id).unwrap().stats, base_stats());
    }

    #[test]
    fn test_rage_drops_dead_units_without_touching_them() {
        let mut units = UnitArena::new();
        let id = units.insert(unit_at(10, 0));
        let mut buildings = BuildingArena::new();
        let mut events = TickEvents::default();

        let mut rage = spell(SpellKind::Rage, SpellCategory::Duration, 0, 2);
        rage.cast(&mut units, &mut buildings, &mut events);
        units.get_mut(id).unwrap().kill();
        let corpse = units.get(id).unwrap().clone();

        rage.update(dt(), &mut units, &mut buildings, &mut events);
        assert!(rage.affected().is_empty());
        assert_eq!(units.get(id).unwrap(), &corpse);
    }

    #[test]
    fn test_non_positive_rage_ratio_uses_default() {
        let data = SpellData {
            kind: SpellKind::Rage,
            category: SpellCategory::Duration,
            radius: Fixed::from_num(100),
            amount: Fixed::ZERO,
            duration: Fixed::from_num(5),
            ratio: Fixed::ZERO,
        };
        let mut units = UnitArena::new();
        let id = units.insert(unit_at(0, 0));
        let mut rage = SpellEffect::new(SpellId(7), &data, Vec2Fixed::ZERO);
        rage.cast(&mut units, &mut BuildingArena::new(), &mut TickEvents::default());
        assert_eq!(units.get(id).unwrap().stats.move_speed, Fixed::from_num(150));
    }

    #[test]
    fn test_duration_heal_spreads_amount() {
        let mut units = UnitArena::new();
        let id = units.insert(unit_at(0, 0));
        units.get_mut(id).unwrap().take_damage(Fixed::from_num(90));
        let mut buildings = BuildingArena::new();
        let mut events = TickEvents::default();

        // 40 HP over 4 seconds = 10 HP per second.
        let mut heal = spell(SpellKind::Heal, SpellCategory::Duration, 40, 4);
        heal.cast(&mut units, &mut buildings, &mut events);
        for _ in 0..20 {
            heal.update(dt(), &mut units, &mut buildings, &mut events);
        }
        let hp = units.get(id).unwrap().hp();
        let epsilon = Fixed::ONE / 100;
        assert!((hp - Fixed::from_num(20)).abs() < epsilon, "hp = {hp}");
    }
}
