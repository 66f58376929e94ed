//! Headless battle replay runner for CI verification.
//!
//! Loads a stat catalog, a village layout and a placement log from disk,
//! replays the battle without any presentation layer and reports the
//! outcome as JSON. This enables:
//!
//! - **Replay verification**: Check that a placement log reproduces a battle
//! - **CI determinism checks**: Replay the same battle on many threads and
//!   compare the final state hashes
//! - **Catalog validation**: Catch broken stat files before they ship
//!
//! # Output
//!
//! - **stdout**: JSON summaries
//! - **stderr**: Logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Replay a battle and print its summary
//! cargo run -p raid_headless -- replay --layout village.json --record attack.json
//!
//! # Verify determinism across 8 parallel runs
//! cargo run -p raid_headless -- verify --layout village.json --record attack.json --runs 8
//! ```

pub mod loader;
pub mod runner;

pub use loader::{load_catalog, load_layout, load_record, LoadError};
pub use runner::{ReplayJob, ReplaySummary, VerifyReport};
