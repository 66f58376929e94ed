//! Village layout persistence.
//!
//! A layout maps building names to the placed instances of that building:
//!
//! ```json
//! {
//!   "TownHall": [ { "row": 20, "col": 20, "level": 1, "HP": 1500 } ],
//!   "GoldMine": [ { "row": 10, "col": 12, "level": 2, "storedResource": 340,
//!                   "lastTimestamp": 1700000000 } ],
//!   "tips": "ignored"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buildings::Building;
use crate::data::Catalog;
use crate::error::{RaidError, Result};
use crate::grid::GridParameters;
use crate::math::Fixed;

/// Top-level keys that are not building names.
const RESERVED_KEYS: [&str; 1] = ["tips"];

/// One placed building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEntry {
    /// Anchor row.
    pub row: f64,
    /// Anchor column.
    pub col: f64,
    /// Building level, 1 when absent.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Current HP; full HP when absent.
    #[serde(rename = "HP", default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<f64>,
    /// Resource held by a collector or storage.
    #[serde(rename = "storedResource", default, skip_serializing_if = "Option::is_none")]
    pub stored_resource: Option<f64>,
    /// Last production timestamp (Unix seconds).
    #[serde(rename = "lastTimestamp", default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<i64>,
}

const fn default_level() -> u32 {
    1
}

impl LayoutEntry {
    /// Entry at full HP with no saved production state.
    #[must_use]
    pub const fn new(row: f64, col: f64, level: u32) -> Self {
        Self {
            row,
            col,
            level,
            hp: None,
            stored_resource: None,
            last_timestamp: None,
        }
    }

    fn instantiate(&self, name: &str, catalog: &Catalog, grid: &GridParameters) -> Result<Building> {
        let coordinate = |value: f64| {
            Fixed::checked_from_num(value).ok_or_else(|| RaidError::DataParseError {
                path: name.to_string(),
                message: format!("coordinate {value} is out of range"),
            })
        };
        let row = coordinate(self.row)?;
        let col = coordinate(self.col)?;

        let mut building = catalog.building(name)?.instantiate(self.level, row, col, grid)?;
        if let Some(hp) = self.hp.and_then(Fixed::checked_from_num) {
            building.set_hp(hp);
        }
        building.stored_resource = self
            .stored_resource
            .and_then(Fixed::checked_from_num)
            .map_or(0, |amount| amount.saturating_to_num());
        building.last_timestamp = self.last_timestamp;
        Ok(building)
    }
}

/// All buildings of a village, grouped by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VillageLayout {
    /// Entries per building name.
    pub buildings: BTreeMap<String, Vec<LayoutEntry>>,
}

impl VillageLayout {
    /// Empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a building entry.
    pub fn push(&mut self, name: impl Into<String>, entry: LayoutEntry) {
        self.buildings.entry(name.into()).or_default().push(entry);
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.values().map(Vec::len).sum()
    }

    /// True if the layout has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a layout document.
    ///
    /// Reserved keys are ignored. Values that are not arrays and entries
    /// without a `row`/`col` are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if the document is not a JSON object.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(source).map_err(|e| RaidError::DataParseError {
                path: "village layout".to_string(),
                message: e.to_string(),
            })?;

        let mut layout = Self::new();
        for (name, value) in raw {
            if RESERVED_KEYS.contains(&name.as_str()) {
                continue;
            }
            let serde_json::Value::Array(items) = value else {
                tracing::warn!(%name, "layout entry is not an array, skipping");
                continue;
            };
            for (index, item) in items.into_iter().enumerate() {
                match serde_json::from_value::<LayoutEntry>(item) {
                    Ok(entry) => layout.push(name.clone(), entry),
                    Err(e) => tracing::warn!(%name, index, error = %e, "skipping malformed layout entry"),
                }
            }
        }
        Ok(layout)
    }

    /// Serialize to the layout JSON format.
    ///
    /// # Errors
    /// Returns an error if JSON encoding fails.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RaidError::InvalidState(format!("Failed to encode village layout: {e}")))
    }

    /// Read a layout file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| RaidError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&source)
    }

    /// Write the layout as JSON.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()?).map_err(|e| RaidError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Capture the current state of a set of buildings.
    #[must_use]
    pub fn from_buildings<'a>(buildings: impl IntoIterator<Item = &'a Building>) -> Self {
        let mut layout = Self::new();
        for building in buildings {
            layout.push(
                building.name.clone(),
                LayoutEntry {
                    row: building.row.to_num(),
                    col: building.col.to_num(),
                    level: building.level,
                    hp: Some(building.hp().to_num()),
                    stored_resource: (building.stored_resource > 0)
                        .then(|| f64::from(building.stored_resource)),
                    last_timestamp: building.last_timestamp,
                },
            );
        }
        layout
    }

    /// Create the buildings described by this layout.
    ///
    /// Buildings come out grouped by name in name order, file order within a
    /// name. Entries the catalog cannot build (unknown name, missing level)
    /// are skipped with a warning.
    #[must_use]
    pub fn instantiate(&self, catalog: &Catalog, grid: &GridParameters) -> Vec<Building> {
        let mut out = Vec::with_capacity(self.len());
        for (name, entries) in &self.buildings {
            for entry in entries {
                match entry.instantiate(name, catalog, grid) {
                    Ok(building) => out.push(building),
                    Err(e) => tracing::warn!(%name, error = %e, "skipping layout entry"),
                }
            }
        }
        out
    }
}
