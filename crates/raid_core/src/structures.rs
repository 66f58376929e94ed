//! Structure combat: defenses shooting at units and traps exploding.
//!
//! Both systems scan the unit arena every tick in ascending id order, so the
//! choice of target is deterministic.

use crate::buildings::{BuildingArena, BuildingKind, CombatState, DefenseStats, TrapState};
use crate::events::{Attacker, TickEvents};
use crate::math::{Fixed, Vec2Fixed};
use crate::units::{Unit, UnitArena, UnitId};

/// Seconds a detonated trap lingers before it is spent.
pub const TRAP_REMOVAL_DELAY: Fixed = Fixed::const_from_int(1);

fn is_eligible(unit: &Unit, stats: &DefenseStats, origin: Vec2Fixed) -> bool {
    unit.is_alive() && stats.can_target(unit.category) && unit.position.within(origin, stats.range)
}

/// Nearest eligible unit; equal distances go to the lower id.
fn nearest_eligible(units: &UnitArena, stats: &DefenseStats, origin: Vec2Fixed) -> Option<UnitId> {
    units
        .alive()
        .filter(|u| is_eligible(u, stats, origin))
        .min_by_key(|u| (u.position.distance_squared(origin), u.id))
        .map(|u| u.id)
}

/// Run every standing defense for one tick.
///
/// A defense keeps its target until the target dies, leaves range or stops
/// matching the category filter. A new target is only picked when the
/// cooldown has run out, and each shot resets the cooldown to
/// `1 / attack_speed`.
pub fn update_defenses(
    buildings: &mut BuildingArena,
    units: &mut UnitArena,
    dt: Fixed,
    events: &mut TickEvents,
) {
    for building in buildings.iter_mut() {
        if !building.is_alive() {
            continue;
        }
        let origin = building.position();
        let source = Attacker::Building(building.id);
        let BuildingKind::Defense(stats) = &building.kind else {
            continue;
        };
        let CombatState::Defense { cooldown, target } = &mut building.combat else {
            continue;
        };

        *cooldown = (*cooldown - dt).max(Fixed::ZERO);

        if let Some(id) = *target {
            if !units.get(id).is_some_and(|u| is_eligible(u, stats, origin)) {
                *target = None;
            }
        }

        if *cooldown > Fixed::ZERO {
            continue;
        }

        if target.is_none() {
            *target = nearest_eligible(units, stats, origin);
        }
        let Some(id) = *target else {
            continue;
        };

        if let Some(unit) = units.get_mut(id) {
            events.hit_unit(source, unit, stats.damage);
            if !unit.is_alive() {
                *target = None;
            }
        }
        *cooldown = stats.attack_interval();
    }
}

/// Run every trap for one tick.
///
/// An armed trap explodes the first time any live unit comes within its
/// trigger radius, damaging every live unit within the blast radius exactly
/// once. It then counts down [`TRAP_REMOVAL_DELAY`] and becomes spent until
/// re-armed.
pub fn update_traps(
    buildings: &mut BuildingArena,
    units: &mut UnitArena,
    dt: Fixed,
    events: &mut TickEvents,
) {
    for building in buildings.iter_mut() {
        let center = building.position();
        let source = Attacker::Building(building.id);
        let BuildingKind::Trap(stats) = &building.kind else {
            continue;
        };

        match building.combat {
            CombatState::Trap(TrapState::Armed) => {
                if building.hp() <= Fixed::ZERO {
                    continue;
                }
                let triggered = units
                    .alive()
                    .any(|u| u.position.within(center, stats.trigger_radius));
                if !triggered {
                    continue;
                }

                for unit in units.iter_mut() {
                    if unit.is_alive() && unit.position.within(center, stats.blast_radius) {
                        events.hit_unit(source, unit, stats.damage);
                    }
                }
                tracing::info!(trap = %building.id, name = %building.name, "trap detonated");
                events.traps_detonated.push(building.id);
                building.combat = CombatState::Trap(TrapState::Detonated {
                    elapsed: Fixed::ZERO,
                });
            }
            CombatState::Trap(TrapState::Detonated { elapsed }) => {
                let elapsed = elapsed + dt;
                building.combat = if elapsed >= TRAP_REMOVAL_DELAY {
                    CombatState::Trap(TrapState::Spent)
                } else {
                    CombatState::Trap(TrapState::Detonated { elapsed })
                };
            }
            _ => {}
        }
    }
}
