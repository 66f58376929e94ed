//! Unit AI: target acquisition and the Idle/Moving/Attacking/Dead machine.
//!
//! # States
//!
//! - **Idle**: pick a target. Attack at once if it is in range, otherwise
//!   plan a route and start moving.
//! - **Moving**: walk the route. Switch to attacking as soon as the target is
//!   in range; drop back to idle if the target dies or the route runs out.
//! - **Attacking**: hit the target whenever the cooldown allows. Chase it if
//!   it is out of range, go idle once it is destroyed.
//! - **Dead**: terminal.

use crate::buildings::{Building, BuildingArena, BuildingId, OccupancyGrid};
use crate::events::{Attacker, TickEvents};
use crate::grid::{GridCell, GridParameters};
use crate::math::{Fixed, Vec2Fixed};
use crate::pathfinding::find_path;
use crate::units::{AttackPreference, Unit, UnitCategory, UnitState};

/// A waypoint this close counts as reached.
pub const ARRIVAL_EPSILON: Fixed = Fixed::const_from_int(5);

/// Reach of a wall breaker's explosion.
pub const BOMBER_BLAST_RADIUS: Fixed = Fixed::const_from_int(100);

/// Read-only world state the AI needs besides the building arena.
#[derive(Debug, Clone, Copy)]
pub struct SimulationContext<'a> {
    /// Grid geometry.
    pub grid: &'a GridParameters,
    /// Building footprints.
    pub occupancy: &'a OccupancyGrid,
}

/// Pick the building a unit at `from` should attack.
///
/// Candidates that match `preference` form the preferred tier; everything
/// else is the fallback tier. The nearest preferred candidate wins; the
/// nearest fallback is used only when no preferred candidate exists. Equal
/// distances go to the lower id. Non-targetable candidates are ignored.
pub fn acquire_target<'a, I>(
    from: Vec2Fixed,
    preference: AttackPreference,
    candidates: I,
) -> Option<BuildingId>
where
    I: IntoIterator<Item = &'a Building>,
{
    let mut preferred: Option<(BuildingId, Fixed)> = None;
    let mut fallback: Option<(BuildingId, Fixed)> = None;

    for building in candidates {
        if !building.is_targetable() {
            continue;
        }
        let dist = from.distance_squared(building.position());
        let slot = if preference.matches(&building.kind) {
            &mut preferred
        } else {
            &mut fallback
        };
        let better = slot.map_or(true, |(id, best)| {
            dist < best || (dist == best && building.id < id)
        });
        if better {
            *slot = Some((building.id, dist));
        }
    }

    preferred.or(fallback).map(|(id, _)| id)
}

/// True if the unit can hit the building from where it stands.
#[must_use]
pub fn in_attack_range(unit: &Unit, building: &Building, grid: &GridParameters) -> bool {
    building.in_reach(unit.position, unit.stats.attack_range, grid)
}

/// Advance one unit by `dt` seconds.
pub fn update_unit(
    unit: &mut Unit,
    buildings: &mut BuildingArena,
    ctx: &SimulationContext<'_>,
    dt: Fixed,
    events: &mut TickEvents,
) {
    if !unit.is_alive() {
        return;
    }

    if unit.attack_cooldown > Fixed::ZERO {
        unit.attack_cooldown = (unit.attack_cooldown - dt).max(Fixed::ZERO);
    }

    match unit.state() {
        UnitState::Idle => update_idle(unit, buildings, ctx),
        UnitState::Moving => {
            if update_moving(unit, buildings, ctx, dt) == UnitState::Idle {
                update_idle(unit, buildings, ctx);
            }
        }
        UnitState::Attacking => update_attacking(unit, buildings, ctx, events),
        UnitState::Dead => {}
    }
}

fn update_idle(unit: &mut Unit, buildings: &BuildingArena, ctx: &SimulationContext<'_>) {
    let Some(target_id) = acquire_target(unit.position, unit.preference, buildings.targetable())
    else {
        return;
    };
    let Some(target) = buildings.get(target_id) else {
        return;
    };

    unit.target = Some(target_id);
    tracing::debug!(unit = %unit.id, target = %target_id, name = %target.name, "target acquired");

    if in_attack_range(unit, target, ctx.grid) {
        unit.path.clear();
        unit.set_state(UnitState::Attacking);
    } else {
        plan_route(unit, target_id, buildings, ctx);
        unit.set_state(UnitState::Moving);
    }
}

/// Returns the state the unit ended in.
fn update_moving(
    unit: &mut Unit,
    buildings: &BuildingArena,
    ctx: &SimulationContext<'_>,
    dt: Fixed,
) -> UnitState {
    let Some(mut target_id) = unit.target.filter(|id| buildings.is_alive(*id)) else {
        unit.clear_target();
        return unit.state();
    };

    if let Some(&waypoint) = unit.path.front() {
        let step = unit.stats.move_speed * dt;
        unit.position = unit.position.step_toward(waypoint, step);
        if unit.position.within(waypoint, ARRIVAL_EPSILON) {
            unit.path.pop_front();
        }
    }

    if unit.preference == AttackPreference::Wall {
        if let Some(wall) = wall_in_reach(unit, buildings, ctx.grid) {
            target_id = wall;
            unit.target = Some(wall);
        }
    }

    let in_range = buildings
        .get(target_id)
        .is_some_and(|target| in_attack_range(unit, target, ctx.grid));
    if in_range {
        unit.path.clear();
        unit.set_state(UnitState::Attacking);
    } else if unit.path.is_empty() {
        unit.clear_target();
    }

    unit.state()
}

fn update_attacking(
    unit: &mut Unit,
    buildings: &mut BuildingArena,
    ctx: &SimulationContext<'_>,
    events: &mut TickEvents,
) {
    let Some(target_id) = unit.target.filter(|id| buildings.is_alive(*id)) else {
        unit.clear_target();
        return;
    };

    let in_range = buildings
        .get(target_id)
        .is_some_and(|target| in_attack_range(unit, target, ctx.grid));
    if !in_range {
        plan_route(unit, target_id, buildings, ctx);
        unit.set_state(UnitState::Moving);
        return;
    }

    if unit.attack_cooldown > Fixed::ZERO {
        return;
    }

    if unit.kind.explodes_on_attack() {
        explode(unit, buildings, events);
        return;
    }

    if let Some(target) = buildings.get_mut(target_id) {
        events.hit_building(Attacker::Unit(unit.id), target, unit.stats.attack_damage);
    }
    unit.attack_cooldown = unit.stats.attack_interval();

    if !buildings.is_alive(target_id) {
        unit.clear_target();
    }
}

/// Wall breaker attack: damage every standing building around the unit,
/// then die.
fn explode(unit: &mut Unit, buildings: &mut BuildingArena, events: &mut TickEvents) {
    let source = Attacker::Unit(unit.id);
    let center = unit.position;

    for building in buildings.iter_mut() {
        if building.is_targetable() && building.position().within(center, BOMBER_BLAST_RADIUS) {
            events.hit_building(source, building, unit.stats.attack_damage);
        }
    }

    tracing::debug!(unit = %unit.id, "wall breaker exploded");
    unit.kill();
    events.record_death(unit.id);
}

/// Nearest standing wall the unit can already hit.
fn wall_in_reach(unit: &Unit, buildings: &BuildingArena, grid: &GridParameters) -> Option<BuildingId> {
    let walls = buildings
        .targetable()
        .filter(|b| b.kind.is_wall() && in_attack_range(unit, b, grid));
    acquire_target(unit.position, AttackPreference::Wall, walls)
}

fn walkable_for(
    cell: GridCell,
    buildings: &BuildingArena,
    occupancy: &OccupancyGrid,
    through_walls: bool,
) -> bool {
    if occupancy.is_walkable(cell, buildings) {
        return true;
    }
    through_walls
        && occupancy
            .occupant(cell)
            .and_then(|id| buildings.get(id))
            .is_some_and(|b| b.kind.is_wall())
}

/// Fill the unit's waypoint queue toward `target_id`.
///
/// Land units follow the path finder and finish with a straight step to the
/// target's centre, so they always close into range. If no path exists they
/// go for the nearest wall instead; failing that they walk straight. Air
/// units always fly straight.
fn plan_route(
    unit: &mut Unit,
    target_id: BuildingId,
    buildings: &BuildingArena,
    ctx: &SimulationContext<'_>,
) {
    unit.path.clear();
    let Some(target) = buildings.get(target_id) else {
        return;
    };
    let destination = target.position();

    if unit.category == UnitCategory::Air {
        unit.path.push_back(destination);
        return;
    }

    let through_walls = unit.preference == AttackPreference::Wall;
    let walkable =
        |cell: GridCell| walkable_for(cell, buildings, ctx.occupancy, through_walls);

    let path = find_path(unit.position, destination, ctx.grid, walkable);
    if !path.is_empty() {
        unit.path.extend(path);
        push_final(unit, destination);
        return;
    }

    if !target.kind.is_wall() {
        let walls = buildings.targetable().filter(|b| b.kind.is_wall());
        if let Some(wall) = acquire_target(unit.position, AttackPreference::Wall, walls)
            .and_then(|id| buildings.get(id))
        {
            let wall_path = find_path(unit.position, wall.position(), ctx.grid, walkable);
            if !wall_path.is_empty() {
                tracing::debug!(unit = %unit.id, wall = %wall.id, "target walled off, breaking through");
                unit.target = Some(wall.id);
                unit.path.extend(wall_path);
                push_final(unit, wall.position());
                return;
            }
        }
    }

    tracing::debug!(unit = %unit.id, target = %target_id, "no path, walking straight");
    unit.path.push_back(destination);
}

fn push_final(unit: &mut Unit, destination: Vec2Fixed) {
    if unit.path.back() != Some(&destination) {
        unit.path.push_back(destination);
    }
}
