//! The battle session: one village under attack.
//!
//! [`BattleSession`] owns every piece of battle state (grid, occupancy,
//! buildings, units, spells, catalog and recorder) and advances it at a fixed
//! tick rate.
//!
//! # Determinism
//!
//! - All arithmetic is fixed-point ([`Fixed`]).
//! - Units, buildings and spells live in ordered maps and are always
//!   processed in ascending id order.
//! - Time only moves through [`BattleSession::advance`]; nothing reads the
//!   wall clock.
//!
//! # Tick order
//!
//! 1. Unit AI (ascending unit id)
//! 2. Defenses (ascending building id)
//! 3. Traps
//! 4. Spells (ascending spell id); expired spells are dropped
//! 5. Clock
//!
//! # Example
//!
//! ```
//! use raid_core::data::Catalog;
//! use raid_core::grid::GridParameters;
//! use raid_core::math::{Fixed, Vec2Fixed};
//! use raid_core::session::BattleSession;
//! use raid_core::units::UnitKind;
//!
//! let grid = GridParameters::new(Vec2Fixed::ZERO, Fixed::from_num(32), Fixed::from_num(16), 44);
//! let mut session = BattleSession::new(grid, Catalog::builtin().unwrap());
//! session.place_troop(UnitKind::Barbarian, 1, Vec2Fixed::from_ints(10, 10)).unwrap();
//! session.tick();
//! assert_eq!(session.tick_count(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::{update_unit, SimulationContext};
use crate::buildings::{Building, BuildingArena, BuildingId, OccupancyGrid};
use crate::data::Catalog;
use crate::error::{RaidError, Result};
use crate::events::TickEvents;
use crate::grid::GridParameters;
use crate::layout::VillageLayout;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::record::{BattleRecorder, Placement, RecordLog};
use crate::spells::{SpellEffect, SpellId, SpellKind};
use crate::structures::{update_defenses, update_traps};
use crate::units::{Unit, UnitArena, UnitId, UnitKind};

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 20;

/// Length of one tick in seconds.
#[must_use]
pub fn tick_duration() -> Fixed {
    Fixed::ONE / i64::from(TICK_RATE)
}

/// A village under attack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSession {
    tick: u64,
    #[serde(with = "fixed_serde")]
    elapsed: Fixed,
    grid: GridParameters,
    occupancy: OccupancyGrid,
    buildings: BuildingArena,
    units: UnitArena,
    spells: BTreeMap<SpellId, SpellEffect>,
    next_spell_id: u32,
    catalog: Catalog,
    recorder: BattleRecorder,
    recording_started: u64,
    // Events from placements made between ticks.
    pending: TickEvents,
}

impl BattleSession {
    /// Create an empty battle on `grid` using `catalog` for all stats.
    #[must_use]
    pub fn new(grid: GridParameters, catalog: Catalog) -> Self {
        Self {
            tick: 0,
            elapsed: Fixed::ZERO,
            occupancy: OccupancyGrid::new(grid.grid_size),
            grid,
            buildings: BuildingArena::new(),
            units: UnitArena::new(),
            spells: BTreeMap::new(),
            next_spell_id: 1,
            catalog,
            recorder: BattleRecorder::new(),
            recording_started: 0,
            pending: TickEvents::default(),
        }
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since the session started.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Grid geometry.
    #[must_use]
    pub const fn grid(&self) -> &GridParameters {
        &self.grid
    }

    /// Stat catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Building footprints.
    #[must_use]
    pub const fn occupancy(&self) -> &OccupancyGrid {
        &self.occupancy
    }

    /// All buildings, including destroyed ones and spent traps.
    #[must_use]
    pub const fn buildings(&self) -> &BuildingArena {
        &self.buildings
    }

    /// All units, including dead ones.
    #[must_use]
    pub const fn units(&self) -> &UnitArena {
        &self.units
    }

    /// Look up a building.
    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Spells still in effect, in id order.
    pub fn spells(&self) -> impl Iterator<Item = &SpellEffect> {
        self.spells.values()
    }

    // ------------------------------------------------------------------
    // Village setup
    // ------------------------------------------------------------------

    /// Register a building and mark its footprint on the occupancy grid.
    pub fn add_building(&mut self, building: Building) -> BuildingId {
        let id = self.buildings.insert(building);
        if let Some(building) = self.buildings.get(id) {
            let cells = self.occupancy.occupy(building);
            tracing::debug!(building = %id, name = %building.name, cells, "building registered");
        }
        id
    }

    /// Remove a building from the village and clear its footprint.
    ///
    /// Destroyed buildings stay registered as rubble; this is for taking a
    /// building out of the layout altogether.
    ///
    /// # Errors
    /// Returns [`RaidError::InvalidBuildingId`] if the id is unknown.
    pub fn remove_building(&mut self, id: BuildingId) -> Result<Building> {
        let building = self
            .buildings
            .remove(id)
            .ok_or(RaidError::InvalidBuildingId(id.0))?;
        self.occupancy.vacate(id);
        Ok(building)
    }

    /// Instantiate every building in a layout. Returns the new ids.
    pub fn load_layout(&mut self, layout: &VillageLayout) -> Vec<BuildingId> {
        let buildings = layout.instantiate(&self.catalog, &self.grid);
        let ids: Vec<BuildingId> = buildings.into_iter().map(|b| self.add_building(b)).collect();
        tracing::info!(buildings = ids.len(), "village layout loaded");
        ids
    }

    /// Re-arm every detonated or spent trap. Returns how many were re-armed.
    pub fn rearm_traps(&mut self) -> usize {
        let mut rearmed = 0;
        for building in self.buildings.iter_mut() {
            if building.rearm() {
                rearmed += 1;
            }
        }
        if rearmed > 0 {
            tracing::info!(rearmed, "traps re-armed");
        }
        rearmed
    }

    // ------------------------------------------------------------------
    // Placements
    // ------------------------------------------------------------------

    /// Spawn a troop at `position`.
    ///
    /// # Errors
    /// Returns an error if the catalog has no entry for the troop or level.
    pub fn place_troop(&mut self, kind: UnitKind, level: u32, position: Vec2Fixed) -> Result<UnitId> {
        let data = self.catalog.troop(kind)?;
        let stats = data
            .level(level)
            .ok_or_else(|| RaidError::InvalidLevel {
                name: kind.to_string(),
                level,
            })?
            .to_stats();
        let unit = Unit::new(kind, level, data.category, data.preference, stats, position);
        let id = self.units.insert(unit);

        tracing::debug!(unit = %id, %kind, level, "troop placed");
        self.pending.units_spawned.push(id);
        self.recorder
            .record_troop(kind, level, position, self.recording_clock());
        Ok(id)
    }

    /// Cast a spell centred on `position`. The on-cast effect lands at once.
    ///
    /// # Errors
    /// Returns an error if the catalog has no entry for the spell.
    pub fn cast_spell(&mut self, kind: SpellKind, position: Vec2Fixed) -> Result<SpellId> {
        let data = self.catalog.spell(kind)?;
        let id = SpellId(self.next_spell_id);
        self.next_spell_id += 1;

        let mut spell = SpellEffect::new(id, data, position);
        spell.cast(&mut self.units, &mut self.buildings, &mut self.pending);
        self.spells.insert(id, spell);

        self.pending.spells_cast.push(id);
        self.recorder
            .record_spell(kind, position, self.recording_clock());
        Ok(id)
    }

    /// Carry out a recorded placement.
    ///
    /// # Errors
    /// Returns an error if the catalog cannot satisfy the placement.
    pub fn apply_placement(&mut self, placement: &Placement) -> Result<()> {
        match *placement {
            Placement::Troop { kind, level, position } => {
                self.place_troop(kind, level, position)?;
            }
            Placement::Spell { kind, position } => {
                self.cast_spell(kind, position)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance the battle by `dt` seconds.
    ///
    /// Returns everything that happened, including spawns and casts made
    /// since the previous call.
    pub fn advance(&mut self, dt: Fixed) -> TickEvents {
        let mut events = std::mem::take(&mut self.pending);

        let ctx = SimulationContext {
            grid: &self.grid,
            occupancy: &self.occupancy,
        };
        for unit in self.units.iter_mut() {
            update_unit(unit, &mut self.buildings, &ctx, dt, &mut events);
        }

        update_defenses(&mut self.buildings, &mut self.units, dt, &mut events);
        update_traps(&mut self.buildings, &mut self.units, dt, &mut events);

        for spell in self.spells.values_mut() {
            spell.update(dt, &mut self.units, &mut self.buildings, &mut events);
        }
        self.spells.retain(|_, spell| spell.is_active());

        self.elapsed += dt;
        self.tick += 1;

        if cfg!(debug_assertions) {
            tracing::debug!(tick = self.tick, hash = self.state_hash(), "tick complete");
        }
        events
    }

    /// Advance by one fixed tick of `1 / TICK_RATE` seconds.
    pub fn tick(&mut self) -> TickEvents {
        self.advance(tick_duration())
    }

    // ------------------------------------------------------------------
    // Outcome
    // ------------------------------------------------------------------

    /// Share of counted buildings destroyed, in percent (0 to 100).
    ///
    /// Walls and traps do not count. A village with nothing to destroy
    /// reports 0.
    #[must_use]
    pub fn destruction_percent(&self) -> Fixed {
        let counted: Vec<&Building> = self
            .buildings
            .iter()
            .filter(|b| b.kind.counts_for_destruction())
            .collect();
        if counted.is_empty() {
            return Fixed::ZERO;
        }
        let destroyed = counted.iter().filter(|b| !b.is_alive()).count();
        Fixed::from_num(destroyed * 100) / Fixed::from_num(counted.len())
    }

    /// True once every counted building is destroyed, or once troops were
    /// deployed and all of them are dead with no spell still running.
    #[must_use]
    pub fn is_battle_over(&self) -> bool {
        let all_destroyed = self
            .buildings
            .iter()
            .filter(|b| b.kind.counts_for_destruction())
            .all(|b| !b.is_alive());
        let has_targets = self.buildings.iter().any(|b| b.kind.counts_for_destruction());
        let army_spent =
            !self.units.is_empty() && self.units.alive().next().is_none() && self.spells.is_empty();
        (has_targets && all_destroyed) || army_spent
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Start recording placements. Timestamps count from now.
    pub fn start_recording(&mut self) {
        self.recording_started = self.tick;
        self.recorder.start();
    }

    // Whole ticks, so a placement on a second boundary gets that second.
    fn recording_clock(&self) -> Fixed {
        Fixed::from_num(self.tick - self.recording_started) / i64::from(TICK_RATE)
    }

    /// Stop recording and return the placement log, if recording.
    pub fn finish_recording(&mut self) -> Option<RecordLog> {
        self.recorder.finish(self.recording_clock())
    }

    /// True while placements are being recorded.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Hash of the battle state. Identical battles hash identically.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed.to_bits().hash(&mut hasher);

        self.units.len().hash(&mut hasher);
        for unit in self.units.iter() {
            unit.id.hash(&mut hasher);
            unit.kind.hash(&mut hasher);
            unit.state().hash(&mut hasher);
            unit.hp().to_bits().hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.stats.hash(&mut hasher);
            unit.target.hash(&mut hasher);
            unit.attack_cooldown.to_bits().hash(&mut hasher);
        }

        self.buildings.len().hash(&mut hasher);
        for building in self.buildings.iter() {
            building.id.hash(&mut hasher);
            building.hp().to_bits().hash(&mut hasher);
            building.combat.hash(&mut hasher);
        }

        self.spells.len().hash(&mut hasher);
        for spell in self.spells.values() {
            spell.id.hash(&mut hasher);
            spell.elapsed().to_bits().hash(&mut hasher);
            spell.affected().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the whole session with bincode.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| RaidError::InvalidState(format!("Failed to serialize session: {e}")))
    }

    /// Restore a session from [`BattleSession::serialize`] output.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a session snapshot.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| RaidError::InvalidState(format!("Failed to deserialize session: {e}")))
    }
}
