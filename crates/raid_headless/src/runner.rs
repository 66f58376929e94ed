//! Replay execution and determinism checks.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use raid_core::data::Catalog;
use raid_core::grid::GridParameters;
use raid_core::layout::VillageLayout;
use raid_core::record::RecordLog;
use raid_core::replay::ReplayPlayer;
use raid_core::session::{BattleSession, TICK_RATE};

use crate::loader::LoadError;

/// Outcome of one replayed battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulated seconds.
    pub elapsed_seconds: f64,
    /// Placements issued.
    pub records_applied: usize,
    /// Share of counted buildings destroyed (0 to 100).
    pub destruction_percent: f64,
    /// Counted buildings destroyed.
    pub buildings_destroyed: usize,
    /// Counted buildings in the village (walls and traps excluded).
    pub buildings_total: usize,
    /// Troops deployed.
    pub units_deployed: usize,
    /// Troops still alive at the end.
    pub units_surviving: usize,
    /// Whether the battle reached an end condition.
    pub battle_over: bool,
    /// Final state hash as 16 hex digits.
    pub final_hash: String,
}

impl ReplaySummary {
    /// Summarize the state a replay finished in.
    #[must_use]
    pub fn from_session(session: &BattleSession, records_applied: usize) -> Self {
        let counted: Vec<_> = session
            .buildings()
            .iter()
            .filter(|b| b.kind.counts_for_destruction())
            .collect();
        Self {
            ticks: session.tick_count(),
            elapsed_seconds: session.elapsed().to_num(),
            records_applied,
            destruction_percent: session.destruction_percent().to_num(),
            buildings_destroyed: counted.iter().filter(|b| !b.is_alive()).count(),
            buildings_total: counted.len(),
            units_deployed: session.units().len(),
            units_surviving: session.units().alive().count(),
            battle_over: session.is_battle_over(),
            final_hash: format!("{:016x}", session.state_hash()),
        }
    }
}

/// Everything needed to replay one battle.
#[derive(Debug, Clone)]
pub struct ReplayJob {
    /// Grid geometry.
    pub grid: GridParameters,
    /// Stat catalog.
    pub catalog: Catalog,
    /// Defending village.
    pub layout: VillageLayout,
    /// Placements to replay.
    pub log: RecordLog,
    /// Seconds to keep simulating after the log ends.
    pub extra_seconds: u32,
}

impl ReplayJob {
    /// Fresh session with the village loaded and nothing deployed.
    #[must_use]
    pub fn initial_session(&self) -> BattleSession {
        let mut session = BattleSession::new(self.grid, self.catalog.clone());
        session.load_layout(&self.layout);
        session
    }

    /// Replay the battle to the end.
    pub fn run(&self) -> Result<ReplaySummary, LoadError> {
        let initial = self.initial_session();
        let mut player = ReplayPlayer::new(&initial, self.log.clone(), self.extra_seconds)?;
        tracing::info!(
            final_tick = player.final_tick(),
            seconds = player.final_tick() / u64::from(TICK_RATE),
            "replaying battle"
        );
        player.run_to_end();
        let summary = ReplaySummary::from_session(player.session(), player.records_applied());
        tracing::info!(
            destruction = summary.destruction_percent,
            surviving = summary.units_surviving,
            hash = %summary.final_hash,
            "replay finished"
        );
        Ok(summary)
    }

    /// Replay the battle `runs` times in parallel and compare the results.
    pub fn verify(&self, runs: u32) -> Result<VerifyReport, LoadError> {
        let summaries: Vec<ReplaySummary> = (0..runs.max(1))
            .into_par_iter()
            .map(|_| self.run())
            .collect::<Result<_, _>>()?;

        let reference = summaries[0].final_hash.clone();
        let divergent_runs: Vec<u32> = summaries
            .iter()
            .zip(0u32..)
            .filter(|(s, _)| s.final_hash != reference)
            .map(|(_, run)| run)
            .collect();

        if divergent_runs.is_empty() {
            tracing::info!(runs = summaries.len(), hash = %reference, "all runs identical");
        } else {
            tracing::warn!(divergent = divergent_runs.len(), "replay runs diverged");
        }

        Ok(VerifyReport {
            runs: summaries.len(),
            reference_hash: reference,
            divergent_runs,
        })
    }
}

/// Result of a parallel determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Runs performed.
    pub runs: usize,
    /// Final hash of the first run.
    pub reference_hash: String,
    /// Indices of runs whose hash differed from the first.
    pub divergent_runs: Vec<u32>,
}

impl VerifyReport {
    /// True if every run produced the same final state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.divergent_runs.is_empty()
    }
}
