//! Village buildings, their storage and the occupancy grid.
//!
//! A building is anchored on a grid vertex and covers an `n × n` block of
//! cells. During a battle a destroyed building stays in the arena with zero
//! HP; only explicit removal takes it out.
//!
//! All calculations use fixed-point math for deterministic simulation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{GridCell, GridParameters};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::units::{UnitCategory, UnitId};

/// Unique identifier for a building within one village.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "building#{}", self.0)
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// Combat stats of a defensive structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefenseStats {
    /// Damage per shot.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Reach in world units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Shots per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Unit categories this defense can hit; empty means all.
    pub targets: Vec<UnitCategory>,
}

impl DefenseStats {
    /// True if a unit of this category may be targeted.
    #[must_use]
    pub fn can_target(&self, category: UnitCategory) -> bool {
        self.targets.is_empty() || self.targets.contains(&category)
    }

    /// Seconds between shots.
    #[must_use]
    pub fn attack_interval(&self) -> Fixed {
        if self.attack_speed > Fixed::ZERO {
            Fixed::ONE / self.attack_speed
        } else {
            Fixed::MAX
        }
    }
}

/// Stats of a hidden trap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrapStats {
    /// Blast damage.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// A unit this close sets the trap off.
    #[serde(with = "fixed_serde")]
    pub trigger_radius: Fixed,
    /// Every unit this close takes the blast.
    #[serde(with = "fixed_serde")]
    pub blast_radius: Fixed,
}

/// Building type, carrying the stats that only that type has.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// The town hall.
    TownHall,
    /// Attacks units in range.
    Defense(DefenseStats),
    /// Produces resources.
    Resource {
        /// Maximum stored amount.
        capacity: u32,
        /// Amount produced per hour.
        production_rate: u32,
    },
    /// Stores resources.
    Storage {
        /// Maximum stored amount.
        capacity: u32,
    },
    /// Trains and houses troops.
    Barracks {
        /// Housing space.
        capacity: u32,
    },
    /// Blocks movement.
    Wall,
    /// Hidden one-shot explosive.
    Trap(TrapStats),
}

impl BuildingKind {
    /// True for walls.
    #[must_use]
    pub const fn is_wall(&self) -> bool {
        matches!(self, Self::Wall)
    }

    /// True for traps.
    #[must_use]
    pub const fn is_trap(&self) -> bool {
        matches!(self, Self::Trap(_))
    }

    /// Walls and traps do not count toward destruction.
    #[must_use]
    pub const fn counts_for_destruction(&self) -> bool {
        !matches!(self, Self::Wall | Self::Trap(_))
    }
}

// ============================================================================
// Combat state
// ============================================================================

/// Lifecycle of a trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapState {
    /// Hidden and waiting for a unit.
    Armed,
    /// Exploded; counting down to removal.
    Detonated {
        /// Seconds since detonation.
        #[serde(with = "fixed_serde")]
        elapsed: Fixed,
    },
    /// Gone until re-armed.
    Spent,
}

/// Mutable combat bookkeeping of a building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatState {
    /// Does not fight.
    Passive,
    /// Defense cooldown and locked target.
    Defense {
        /// Seconds until the next shot.
        #[serde(with = "fixed_serde")]
        cooldown: Fixed,
        /// Unit currently engaged.
        target: Option<UnitId>,
    },
    /// Trap lifecycle.
    Trap(TrapState),
}

impl CombatState {
    fn for_kind(kind: &BuildingKind) -> Self {
        match kind {
            BuildingKind::Defense(_) => Self::Defense {
                cooldown: Fixed::ZERO,
                target: None,
            },
            BuildingKind::Trap(_) => Self::Trap(TrapState::Armed),
            _ => Self::Passive,
        }
    }
}

// ============================================================================
// Building
// ============================================================================

/// A building placed in the village.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Arena identifier.
    pub id: BuildingId,
    /// Catalog name.
    pub name: String,
    /// Type and type-specific stats.
    pub kind: BuildingKind,
    /// Building level.
    pub level: u32,
    /// Anchor row (may be fractional).
    #[serde(with = "fixed_serde")]
    pub row: Fixed,
    /// Anchor column (may be fractional).
    #[serde(with = "fixed_serde")]
    pub col: Fixed,
    /// Footprint side length in cells.
    pub grid_count: u32,
    position: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    max_hp: Fixed,
    #[serde(with = "fixed_serde")]
    hp: Fixed,
    /// Cooldowns and trap lifecycle.
    pub combat: CombatState,
    /// Resource held (collectors and storages), kept for persistence.
    pub stored_resource: u32,
    /// Last production timestamp, kept for persistence.
    pub last_timestamp: Option<i64>,
}

impl Building {
    /// Create a building at full HP anchored on `(row, col)`.
    ///
    /// The id is assigned when the building is inserted into a
    /// [`BuildingArena`].
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: BuildingKind,
        level: u32,
        max_hp: Fixed,
        grid_count: u32,
        row: Fixed,
        col: Fixed,
        grid: &GridParameters,
    ) -> Self {
        let combat = CombatState::for_kind(&kind);
        Self {
            id: BuildingId(0),
            name: name.into(),
            kind,
            level,
            row,
            col,
            grid_count,
            position: grid.grid_to_world_fractional(row, col),
            max_hp,
            hp: max_hp,
            combat,
            stored_resource: 0,
            last_timestamp: None,
        }
    }

    /// World position of the building centre.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Current hit points.
    #[must_use]
    pub const fn hp(&self) -> Fixed {
        self.hp
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max_hp(&self) -> Fixed {
        self.max_hp
    }

    /// Overwrite current HP (restoring a saved village), clamped to `[0, max]`.
    pub fn set_hp(&mut self, hp: Fixed) {
        self.hp = hp.max(Fixed::ZERO).min(self.max_hp);
    }

    /// Has HP left and is not a spent trap.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > Fixed::ZERO && self.combat != CombatState::Trap(TrapState::Spent)
    }

    /// Units and spells may aim at it. Traps are never targetable.
    #[must_use]
    pub fn is_targetable(&self) -> bool {
        self.is_alive() && !self.kind.is_trap()
    }

    /// Occupies its footprint for path finding.
    #[must_use]
    pub fn blocks_walking(&self) -> bool {
        self.is_targetable()
    }

    /// Apply damage. Returns `true` if this hit destroyed the building.
    pub fn take_damage(&mut self, amount: Fixed) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp -= amount;
        if self.hp <= Fixed::ZERO {
            self.hp = Fixed::ZERO;
            return true;
        }
        false
    }

    /// Put a detonated or spent trap back into the armed state.
    ///
    /// Returns `false` for armed traps and for buildings that are not traps.
    pub fn rearm(&mut self) -> bool {
        match self.combat {
            CombatState::Trap(TrapState::Armed) => false,
            CombatState::Trap(_) => {
                self.combat = CombatState::Trap(TrapState::Armed);
                true
            }
            _ => false,
        }
    }

    /// Cells covered by the footprint: an `n × n` block starting at
    /// `(R - n/2, C - n/2)` where `(R, C)` is the rounded anchor.
    #[must_use]
    pub fn footprint_cells(&self) -> Vec<GridCell> {
        let Some(anchor_row) = self.row.round().checked_to_num::<i32>() else {
            return Vec::new();
        };
        let Some(anchor_col) = self.col.round().checked_to_num::<i32>() else {
            return Vec::new();
        };
        let n = i32::try_from(self.grid_count).unwrap_or(i32::MAX);
        let first_row = anchor_row - n / 2;
        let first_col = anchor_col - n / 2;

        let mut cells = Vec::with_capacity(self.grid_count as usize * self.grid_count as usize);
        for row in first_row..first_row.saturating_add(n) {
            for col in first_col..first_col.saturating_add(n) {
                cells.push(GridCell::new(row, col));
            }
        }
        cells
    }

    /// Squared world distance from `point` to the nearest point of the
    /// footprint, shrunk 0.3 cells inward (never below 0.1 cells from the
    /// anchor).
    #[must_use]
    pub fn distance_squared_to(&self, point: Vec2Fixed, grid: &GridParameters) -> Fixed {
        let half = Fixed::from_num(self.grid_count) / 2;
        let min_extent = Fixed::ONE / 10;
        let shrink = Fixed::from_num(3) / 10;
        let extent = (half - shrink).max(min_extent);

        let (row, col) = grid.world_to_grid_fractional(point);
        let nearest_row = row.clamp(self.row - extent, self.row + extent);
        let nearest_col = col.clamp(self.col - extent, self.col + extent);
        grid.grid_to_world_fractional(nearest_row, nearest_col)
            .distance_squared(point)
    }

    /// True if `point` is within `range` of the footprint.
    #[must_use]
    pub fn in_reach(&self, point: Vec2Fixed, range: Fixed, grid: &GridParameters) -> bool {
        self.distance_squared_to(point, grid) <= range.saturating_mul(range)
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Storage for all buildings in a village.
///
/// Keyed by [`BuildingId`] in a `BTreeMap`, so iteration is always in
/// ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingArena {
    buildings: BTreeMap<BuildingId, Building>,
    next_id: u32,
}

impl BuildingArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buildings: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a building, assigning it the next id.
    pub fn insert(&mut self, mut building: Building) -> BuildingId {
        let id = BuildingId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        building.id = id;
        self.buildings.insert(id, building);
        id
    }

    /// Remove a building by id.
    pub fn remove(&mut self, id: BuildingId) -> Option<Building> {
        self.buildings.remove(&id)
    }

    /// Get a building by id.
    #[must_use]
    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    /// Get a mutable building by id.
    pub fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(&id)
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<BuildingId> {
        self.buildings.keys().copied().collect()
    }

    /// Iterate in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    /// Iterate mutably in ascending id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Building> {
        self.buildings.values_mut()
    }

    /// Buildings units and spells may aim at, in ascending id order.
    pub fn targetable(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values().filter(|b| b.is_targetable())
    }

    /// True if the id refers to a building that is still alive.
    #[must_use]
    pub fn is_alive(&self, id: BuildingId) -> bool {
        self.get(id).is_some_and(Building::is_alive)
    }

    /// Number of buildings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// True if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

// ============================================================================
// Occupancy
// ============================================================================

/// Which building covers each grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    size: u32,
    /// Row-major cell owners.
    cells: Vec<Option<BuildingId>>,
}

impl OccupancyGrid {
    /// Create an empty `size × size` grid.
    #[must_use]
    pub fn new(size: u32) -> Self {
        let count = size as usize * size as usize;
        Self {
            size,
            cells: vec![None; count],
        }
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        let row = u32::try_from(cell.row).ok()?;
        let col = u32::try_from(cell.col).ok()?;
        (row < self.size && col < self.size).then(|| row as usize * self.size as usize + col as usize)
    }

    /// Record a building's footprint. Traps are not recorded. Returns the
    /// number of in-bounds cells written.
    pub fn occupy(&mut self, building: &Building) -> usize {
        if building.kind.is_trap() {
            return 0;
        }
        let mut written = 0;
        for cell in building.footprint_cells() {
            if let Some(index) = self.index(cell) {
                self.cells[index] = Some(building.id);
                written += 1;
            }
        }
        written
    }

    /// Clear every cell owned by `id`.
    pub fn vacate(&mut self, id: BuildingId) {
        for slot in &mut self.cells {
            if *slot == Some(id) {
                *slot = None;
            }
        }
    }

    /// Building covering a cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: GridCell) -> Option<BuildingId> {
        self.index(cell).and_then(|i| self.cells[i])
    }

    /// In bounds and not covered by a standing building.
    #[must_use]
    pub fn is_walkable(&self, cell: GridCell, buildings: &BuildingArena) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        self.cells[index].map_or(true, |id| {
            !buildings.get(id).is_some_and(Building::blocks_walking)
        })
    }
}
