//! Input file loading for headless runs.
//!
//! Reads the three inputs a replay needs: a stat catalog (RON), a village
//! layout (JSON) and a placement log (JSON).

use std::fs;
use std::path::{Path, PathBuf};

use raid_core::data::Catalog;
use raid_core::layout::VillageLayout;
use raid_core::record::RecordLog;
use thiserror::Error;

/// Errors that can occur while loading input files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("IO error reading '{path}': {message}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// File was read but its contents were rejected.
    #[error("Parse error in '{path}': {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The battle could not be set up from the loaded data.
    #[error(transparent)]
    Raid(#[from] raid_core::error::RaidError),
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a catalog from a RON file, or the built-in catalog when `path` is
/// `None`.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, LoadError> {
    let Some(path) = path else {
        tracing::debug!("using built-in catalog");
        return Ok(Catalog::builtin()?);
    };

    let content = read(path)?;
    let catalog = Catalog::from_ron_str(&content, &path.display().to_string()).map_err(|e| {
        LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    tracing::info!(
        path = %path.display(),
        troops = catalog.troops.len(),
        spells = catalog.spells.len(),
        buildings = catalog.buildings.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Load a village layout from a JSON map file.
pub fn load_layout(path: &Path) -> Result<VillageLayout, LoadError> {
    let content = read(path)?;
    let layout = VillageLayout::from_json_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!(path = %path.display(), buildings = layout.len(), "layout loaded");
    Ok(layout)
}

/// Load a placement log from a JSON record file.
pub fn load_record(path: &Path) -> Result<RecordLog, LoadError> {
    let content = read(path)?;
    let log = RecordLog::from_json_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!(
        path = %path.display(),
        records = log.len(),
        duration = log.metadata.duration,
        "placement log loaded"
    );
    Ok(log)
}
