//! # Raid Core
//!
//! Deterministic combat core for a village raid game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No system randomness
//! - No wall clock
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! The only IO is the explicit `save`/`load` helpers on placement logs and
//! village layouts.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Isometric grid/world coordinate transform
//! - [`pathfinding`] - A* over the occupancy grid
//! - [`units`], [`ai`] - Troops and their Idle/Moving/Attacking/Dead machine
//! - [`buildings`], [`structures`] - Buildings, defenses and traps
//! - [`spells`] - Instant and duration spell effects
//! - [`record`], [`replay`] - Placement logs and deterministic playback
//! - [`session`] - The battle loop tying it all together
//! - [`data`] - RON stat catalog
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod buildings;
pub mod data;
pub mod error;
pub mod events;
pub mod grid;
pub mod layout;
pub mod math;
pub mod pathfinding;
pub mod record;
pub mod replay;
pub mod session;
pub mod spells;
pub mod structures;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::SimulationContext;
    pub use crate::buildings::{Building, BuildingArena, BuildingId, BuildingKind, OccupancyGrid};
    pub use crate::data::Catalog;
    pub use crate::error::{RaidError, Result};
    pub use crate::events::TickEvents;
    pub use crate::grid::{GridCell, GridParameters};
    pub use crate::layout::{LayoutEntry, VillageLayout};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::record::{BattleRecorder, Placement, PlacementRecord, RecordLog};
    pub use crate::replay::ReplayPlayer;
    pub use crate::session::{BattleSession, TICK_RATE};
    pub use crate::spells::{SpellCategory, SpellEffect, SpellId, SpellKind};
    pub use crate::units::{AttackPreference, Unit, UnitArena, UnitCategory, UnitId, UnitKind, UnitState};
}
