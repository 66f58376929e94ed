//! Placement recording and the JSON placement log.
//!
//! Every troop or spell placement made during a battle can be appended to a
//! [`BattleRecorder`]. Finishing the recording yields a [`RecordLog`], which
//! serializes to the JSON document consumed by the replay player:
//!
//! ```json
//! {
//!   "records": [
//!     { "type": "troop", "category": "barbarian", "level": 1,
//!       "x": 10.0, "y": 10.0, "timestamp": 0 }
//!   ],
//!   "metadata": { "totalRecords": 1, "duration": 0 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RaidError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::spells::SpellKind;
use crate::units::UnitKind;

/// Level assumed for a troop record that omits `level`.
pub const DEFAULT_TROOP_LEVEL: u32 = 1;

/// A player action: drop a troop or cast a spell at a world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Spawn a troop.
    Troop {
        /// Troop type.
        kind: UnitKind,
        /// Troop level (1-based).
        level: u32,
        /// Spawn position.
        position: Vec2Fixed,
    },
    /// Cast a spell.
    Spell {
        /// Spell type.
        kind: SpellKind,
        /// Centre of the effect.
        position: Vec2Fixed,
    },
}

impl Placement {
    /// World position of the placement.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        match self {
            Self::Troop { position, .. } | Self::Spell { position, .. } => *position,
        }
    }
}

/// A placement stamped with whole seconds since battle start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// What was placed.
    pub placement: Placement,
    /// Seconds since battle start.
    pub timestamp: i64,
}

/// Summary block of a placement log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Number of records in the log.
    pub total_records: usize,
    /// Battle length in whole seconds.
    pub duration: i64,
}

// JSON shape of a single record.
#[derive(Debug, Serialize, Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
    x: f64,
    y: f64,
    timestamp: i64,
}

impl RawRecord {
    fn from_record(record: &PlacementRecord) -> Self {
        let position = record.placement.position();
        let (kind, category, level) = match record.placement {
            Placement::Troop { kind, level, .. } => ("troop", kind.category_name(), Some(level)),
            Placement::Spell { kind, .. } => ("spell", kind.category_name(), None),
        };
        Self {
            kind: kind.to_string(),
            category: category.to_string(),
            level,
            // Exact for positions with at most 53 significant bits, which
            // covers map coordinates and anything already read from JSON.
            x: position.x.to_num(),
            y: position.y.to_num(),
            timestamp: record.timestamp,
        }
    }

    fn into_record(self) -> std::result::Result<PlacementRecord, String> {
        let x = Fixed::checked_from_num(self.x).ok_or_else(|| format!("x out of range: {}", self.x))?;
        let y = Fixed::checked_from_num(self.y).ok_or_else(|| format!("y out of range: {}", self.y))?;
        let position = Vec2Fixed::new(x, y);

        let placement = match self.kind.as_str() {
            "troop" => Placement::Troop {
                kind: UnitKind::from_category_name(&self.category)
                    .ok_or_else(|| format!("unknown troop category '{}'", self.category))?,
                level: self.level.unwrap_or(DEFAULT_TROOP_LEVEL),
                position,
            },
            "spell" => Placement::Spell {
                kind: SpellKind::from_category_name(&self.category)
                    .ok_or_else(|| format!("unknown spell category '{}'", self.category))?,
                position,
            },
            other => return Err(format!("unknown record type '{other}'")),
        };

        Ok(PlacementRecord {
            placement,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Deserialize)]
struct RawLogIn {
    #[serde(default)]
    records: Vec<serde_json::Value>,
    #[serde(default)]
    metadata: Option<RecordMetadata>,
}

#[derive(Serialize)]
struct RawLogOut<'a> {
    records: Vec<RawRecord>,
    metadata: &'a RecordMetadata,
}

/// A complete placement log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLog {
    /// Records in file (or recording) order.
    pub records: Vec<PlacementRecord>,
    /// Summary block.
    pub metadata: RecordMetadata,
}

impl RecordLog {
    /// Build a log from records, filling in the metadata.
    #[must_use]
    pub fn new(records: Vec<PlacementRecord>, duration: i64) -> Self {
        let metadata = RecordMetadata {
            total_records: records.len(),
            duration,
        };
        Self { records, metadata }
    }

    /// Parse a JSON placement log.
    ///
    /// Records with missing or mistyped fields, an unknown type or an
    /// unknown category are skipped one by one with a warning.
    ///
    /// # Errors
    /// Returns [`RaidError::RecordParseError`] if the document itself is not
    /// a readable placement log.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let raw: RawLogIn =
            serde_json::from_str(source).map_err(|e| RaidError::RecordParseError(e.to_string()))?;

        let mut records = Vec::with_capacity(raw.records.len());
        for (index, value) in raw.records.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RawRecord>(value)
                .map_err(|e| e.to_string())
                .and_then(RawRecord::into_record);
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => tracing::warn!(index, %reason, "skipping malformed placement record"),
            }
        }

        let metadata = raw.metadata.unwrap_or(RecordMetadata {
            total_records: records.len(),
            duration: records.iter().map(|r| r.timestamp).max().unwrap_or(0),
        });
        Ok(Self { records, metadata })
    }

    /// Serialize to the JSON placement-log format.
    ///
    /// # Errors
    /// Returns an error if JSON encoding fails.
    pub fn to_json_string(&self) -> Result<String> {
        let out = RawLogOut {
            records: self.records.iter().map(RawRecord::from_record).collect(),
            metadata: &self.metadata,
        };
        serde_json::to_string_pretty(&out)
            .map_err(|e| RaidError::InvalidState(format!("Failed to encode placement log: {e}")))
    }

    /// Write the log as JSON.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|e| RaidError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Read a JSON log from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a placement log.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| RaidError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&source)
    }

    /// Sort by timestamp, keeping file order among equal timestamps.
    pub fn sort_by_timestamp(&mut self) {
        self.records.sort_by_key(|r| r.timestamp);
    }

    /// Timestamp of the latest record, or 0 for an empty log.
    #[must_use]
    pub fn last_timestamp(&self) -> i64 {
        self.records.iter().map(|r| r.timestamp).max().unwrap_or(0)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the log holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Collects placements while a battle is being recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRecorder {
    recording: bool,
    records: Vec<PlacementRecord>,
}

impl BattleRecorder {
    /// Create an idle recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard anything recorded so far and start recording.
    pub fn start(&mut self) {
        self.clear();
        self.recording = true;
        tracing::info!("battle recording started");
    }

    /// True between [`BattleRecorder::start`] and [`BattleRecorder::finish`].
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Append a placement made `elapsed` seconds into the battle.
    ///
    /// Ignored while not recording.
    pub fn record(&mut self, placement: Placement, elapsed: Fixed) {
        if !self.recording {
            return;
        }
        self.records.push(PlacementRecord {
            placement,
            timestamp: whole_seconds(elapsed),
        });
    }

    /// Record a troop placement.
    pub fn record_troop(&mut self, kind: UnitKind, level: u32, position: Vec2Fixed, elapsed: Fixed) {
        self.record(Placement::Troop { kind, level, position }, elapsed);
    }

    /// Record a spell placement.
    pub fn record_spell(&mut self, kind: SpellKind, position: Vec2Fixed, elapsed: Fixed) {
        self.record(Placement::Spell { kind, position }, elapsed);
    }

    /// Stop recording and hand back the log.
    ///
    /// Returns `None` if the recorder was not recording.
    pub fn finish(&mut self, elapsed: Fixed) -> Option<RecordLog> {
        if !self.recording {
            return None;
        }
        self.recording = false;
        let log = RecordLog::new(std::mem::take(&mut self.records), whole_seconds(elapsed));
        tracing::info!(
            records = log.metadata.total_records,
            duration = log.metadata.duration,
            "battle recording finished"
        );
        Some(log)
    }

    /// Records collected so far.
    #[must_use]
    pub fn records(&self) -> &[PlacementRecord] {
        &self.records
    }

    /// Drop all records and stop recording.
    pub fn clear(&mut self) {
        self.records.clear();
        self.recording = false;
    }
}

fn whole_seconds(elapsed: Fixed) -> i64 {
    elapsed.floor().to_num()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "records": [
            { "type": "spell", "category": "Heal", "x": 10.0, "y": 10.0, "timestamp": 5 },
            { "type": "troop", "category": "barbarian", "level": 2, "x": 10.5, "y": -4, "timestamp": 0 },
            { "type": "troop", "category": "archer", "level": 1, "x": 1, "y": 1, "timestamp": 5 }
        ],
        "metadata": { "totalRecords": 3, "duration": 12 }
    }"#;

    #[test]
    fn test_parse_sample_log() {
        let log = RecordLog::from_json_str(SAMPLE).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.metadata.duration, 12);
        assert_eq!(
            log.records[1].placement,
            Placement::Troop {
                kind: UnitKind::Barbarian,
                level: 2,
                position: Vec2Fixed::new(Fixed::from_num(10.5), Fixed::from_num(-4)),
            }
        );
    }

    #[test]
    fn test_sort_is_stable() {
        let mut log = RecordLog::from_json_str(SAMPLE).unwrap();
        log.sort_by_timestamp();
        let order: Vec<i64> = log.records.iter().map(|r| r.timestamp).collect();
        assert_eq!(order, vec![0, 5, 5]);
        assert!(matches!(log.records[1].placement, Placement::Spell { kind: SpellKind::Heal, .. }));
        assert!(matches!(log.records[2].placement, Placement::Troop { kind: UnitKind::Archer, .. }));
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let source = r#"{
            "records": [
                { "type": "troop", "category": "barbarian", "x": 1, "y": 1 },
                { "type": "troop", "category": "wizard", "level": 1, "x": 1, "y": 1, "timestamp": 0 },
                { "type": "building", "category": "Cannon", "x": 1, "y": 1, "timestamp": 0 },
                { "type": "spell", "category": "Rage", "x": "far", "y": 1, "timestamp": 0 },
                { "type": "troop", "category": "giant", "x": 3, "y": 4, "timestamp": 2 }
            ]
        }"#;
        let log = RecordLog::from_json_str(source).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.records[0].placement,
            Placement::Troop {
                kind: UnitKind::Giant,
                level: DEFAULT_TROOP_LEVEL,
                position: Vec2Fixed::from_ints(3, 4),
            }
        );
        assert_eq!(log.metadata.total_records, 1);
        assert_eq!(log.metadata.duration, 2);
    }

    #[test]
    fn test_unreadable_document_is_an_error() {
        assert!(matches!(
            RecordLog::from_json_str("not json"),
            Err(RaidError::RecordParseError(_))
        ));
        assert!(RecordLog::from_json_str(r#"{ "records": 4 }"#).is_err());
    }

    #[test]
    fn test_json_output_shape() {
        let log = RecordLog::new(
            vec![
                PlacementRecord {
                    placement: Placement::Troop {
                        kind: UnitKind::Archer,
                        level: 3,
                        position: Vec2Fixed::from_ints(5, 6),
                    },
                    timestamp: 1,
                },
                PlacementRecord {
                    placement: Placement::Spell {
                        kind: SpellKind::Rage,
                        position: Vec2Fixed::from_ints(7, 8),
                    },
                    timestamp: 4,
                },
            ],
            9,
        );
        let json: serde_json::Value = serde_json::from_str(&log.to_json_string().unwrap()).unwrap();
        assert_eq!(json["records"][0]["type"], "troop");
        assert_eq!(json["records"][0]["category"], "archer");
        assert_eq!(json["records"][0]["level"], 3);
        assert_eq!(json["records"][1]["category"], "Rage");
        assert!(json["records"][1].get("level").is_none());
        assert_eq!(json["metadata"]["totalRecords"], 2);
        assert_eq!(json["metadata"]["duration"], 9);

        assert_eq!(RecordLog::from_json_str(&log.to_json_string().unwrap()).unwrap(), log);
    }

    #[test]
    fn test_fine_fractional_positions_survive_json() {
        // 2^-20 resolution on a large map coordinate: 33 significant bits.
        let x = Fixed::from_num(40_000) + Fixed::from_bits(1 << 12);
        let y = Fixed::from_num(-1234.5) - Fixed::from_bits(3 << 12);
        let log = RecordLog::new(
            vec![PlacementRecord {
                placement: Placement::Spell {
                    kind: SpellKind::Heal,
                    position: Vec2Fixed::new(x, y),
                },
                timestamp: 0,
            }],
            0,
        );
        let back = RecordLog::from_json_str(&log.to_json_string().unwrap()).unwrap();
        assert_eq!(back.records[0].placement.position(), Vec2Fixed::new(x, y));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attack.json");
        let log = RecordLog::from_json_str(SAMPLE).unwrap();
        log.save(&path).unwrap();
        assert_eq!(RecordLog::load(&path).unwrap(), log);

        let missing = dir.path().join("missing.json");
        assert!(matches!(RecordLog::load(missing), Err(RaidError::Io { .. })));
    }

    #[test]
    fn test_recorder_lifecycle() {
        let mut recorder = BattleRecorder::new();
        recorder.record_troop(UnitKind::Barbarian, 1, Vec2Fixed::ZERO, Fixed::ZERO);
        assert!(recorder.records().is_empty());
        assert!(recorder.finish(Fixed::ONE).is_none());

        recorder.start();
        assert!(recorder.is_recording());
        recorder.record_troop(UnitKind::Barbarian, 1, Vec2Fixed::ZERO, Fixed::from_num(0.95));
        recorder.record_spell(SpellKind::Heal, Vec2Fixed::ZERO, Fixed::from_num(5.5));

        let log = recorder.finish(Fixed::from_num(30.2)).unwrap();
        assert!(!recorder.is_recording());
        assert_eq!(log.records[0].timestamp, 0);
        assert_eq!(log.records[1].timestamp, 5);
        assert_eq!(log.metadata.total_records, 2);
        assert_eq!(log.metadata.duration, 30);
    }

    #[test]
    fn test_recorder_start_clears_previous_records() {
        let mut recorder = BattleRecorder::new();
        recorder.start();
        recorder.record_spell(SpellKind::Lightning, Vec2Fixed::ZERO, Fixed::ZERO);
        recorder.start();
        assert!(recorder.records().is_empty());
    }
}
