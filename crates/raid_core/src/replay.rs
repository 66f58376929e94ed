//! Deterministic playback of a placement log.
//!
//! A [`ReplayPlayer`] keeps a bincode snapshot of the session the battle
//! started from and the placement log recorded against it. Playing forward
//! re-issues each placement at the tick its timestamp falls on; seeking
//! restores the snapshot and fast-forwards, so any tick can be revisited and
//! always produces the same state.

use crate::error::Result;
use crate::record::{PlacementRecord, RecordLog};
use crate::session::{BattleSession, TICK_RATE};

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    /// Serialized session the battle started from.
    initial_state: Vec<u8>,
    /// Placements sorted by timestamp, file order within a timestamp.
    records: Vec<PlacementRecord>,
    /// Current battle state.
    session: BattleSession,
    /// Index of the next placement to issue.
    next_record: usize,
    /// Ticks played so far.
    current_tick: u64,
    /// Tick at which playback ends.
    final_tick: u64,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Prepare playback of `log` against `initial`.
    ///
    /// Playback runs until the later of the last placement and the logged
    /// duration, plus `extra_seconds` for the battle to play out. It always
    /// runs at least one tick past the last placement so every record is
    /// issued.
    ///
    /// # Errors
    /// Returns an error if the session cannot be snapshotted.
    pub fn new(initial: &BattleSession, mut log: RecordLog, extra_seconds: u32) -> Result<Self> {
        log.sort_by_timestamp();
        let initial_state = initial.serialize()?;
        let session = BattleSession::deserialize(&initial_state)?;

        let seconds = log
            .last_timestamp()
            .max(log.metadata.duration)
            .max(0)
            .saturating_add(i64::from(extra_seconds));
        let mut final_tick = u64::try_from(seconds)
            .unwrap_or(0)
            .saturating_mul(u64::from(TICK_RATE));
        // The last record must get a tick to be issued on.
        if !log.is_empty() {
            let last_issue = u64::try_from(log.last_timestamp().max(0))
                .unwrap_or(0)
                .saturating_mul(u64::from(TICK_RATE));
            final_tick = final_tick.max(last_issue.saturating_add(1));
        }

        tracing::info!(records = log.len(), final_tick, "replay prepared");
        Ok(Self {
            initial_state,
            records: log.records,
            session,
            next_record: 0,
            current_tick: 0,
            final_tick,
            paused: false,
        })
    }

    /// Issue due placements and run one tick, ignoring pause.
    fn step(&mut self) {
        let now = i64::try_from(self.current_tick).unwrap_or(i64::MAX);
        while let Some(record) = self.records.get(self.next_record) {
            if record.timestamp.saturating_mul(i64::from(TICK_RATE)) > now {
                break;
            }
            if let Err(e) = self.session.apply_placement(&record.placement) {
                tracing::warn!(index = self.next_record, error = %e, "skipping placement during replay");
            }
            self.next_record += 1;
        }

        self.session.tick();
        self.current_tick += 1;
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if self.paused || self.is_finished() {
            return !self.is_finished();
        }
        self.step();
        !self.is_finished()
    }

    /// Jump to `target_tick` (clamped to the end of the replay).
    ///
    /// # Errors
    /// Returns an error if the initial snapshot cannot be restored.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.session = BattleSession::deserialize(&self.initial_state)?;
        self.current_tick = 0;
        self.next_record = 0;

        while self.current_tick < target_tick && !self.is_finished() {
            self.step();
        }
        Ok(())
    }

    /// Play every remaining tick, pause or not. Returns the final state.
    pub fn run_to_end(&mut self) -> &BattleSession {
        while !self.is_finished() {
            self.step();
        }
        &self.session
    }

    /// Ticks played so far.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Tick at which playback ends.
    #[must_use]
    pub const fn final_tick(&self) -> u64 {
        self.final_tick
    }

    /// Placements issued so far.
    #[must_use]
    pub const fn records_applied(&self) -> usize {
        self.next_record
    }

    /// Current battle state.
    #[must_use]
    pub const fn session(&self) -> &BattleSession {
        &self.session
    }

    /// Check if the replay has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_tick >= self.final_tick
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Get progress as a percentage (0-100).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.final_tick == 0 {
            100.0
        } else {
            (self.current_tick as f64 / self.final_tick as f64) * 100.0
        }
    }
}
