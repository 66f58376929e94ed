//! Data structures for troop, spell and building configuration.
//!
//! All structs are designed to be deserialized from RON. Numeric stats are
//! written as plain decimals and converted to fixed-point on load.
//!
//! **Note:** This module contains no filesystem IO. The default catalog is
//! embedded at compile time; loading catalogs from disk is handled by
//! `raid_headless`.

mod building_data;
mod catalog;
mod spell_data;
mod troop_data;

pub use building_data::{BuildingData, BuildingLevel, BuildingRole, DefenseLevel, TrapLevel};
pub use catalog::Catalog;
pub use spell_data::SpellData;
pub use troop_data::{TroopData, TroopLevel};
