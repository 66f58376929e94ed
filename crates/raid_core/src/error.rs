//! Error types for the battle simulation.

use thiserror::Error;

/// Result type alias using [`RaidError`].
pub type Result<T> = std::result::Result<T, RaidError>;

/// Top-level error type for all battle simulation errors.
///
/// Expected non-fatal outcomes (no path, no target, a position off the grid)
/// are modelled as empty collections or `None`, never as errors.
#[derive(Debug, Error)]
pub enum RaidError {
    /// Troop category not present in the catalog.
    #[error("Unknown troop type: {0}")]
    UnknownTroop(String),

    /// Spell category not present in the catalog.
    #[error("Unknown spell type: {0}")]
    UnknownSpell(String),

    /// Building name not present in the catalog.
    #[error("Unknown building type: {0}")]
    UnknownBuilding(String),

    /// Requested level has no stats in the catalog.
    #[error("{name} has no level {level}")]
    InvalidLevel {
        /// Troop, spell or building name.
        name: String,
        /// Requested level.
        level: u32,
    },

    /// Invalid unit identifier.
    #[error("Invalid unit ID: {0}")]
    InvalidUnitId(u32),

    /// Invalid building identifier.
    #[error("Invalid building ID: {0}")]
    InvalidBuildingId(u32),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path or name of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Placement log could not be read as a document at all.
    #[error("Failed to parse placement log: {0}")]
    RecordParseError(String),

    /// Filesystem access failed.
    #[error("IO error on '{path}': {message}")]
    Io {
        /// Path being read or written.
        path: String,
        /// Error message.
        message: String,
    },

    /// Grid geometry cannot be used for a battle.
    #[error("Invalid grid parameters: {0}")]
    InvalidGrid(String),

    /// Invalid battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}
