//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! A placement log is only useful if replaying it rebuilds the same battle.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`raid_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units, buildings and spells live in ordered maps keyed by id.
//!
//! - **Wall clock**: Recording and replay use simulated time only.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual systems (AI, defenses, spells)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles and replays are reproducible
//! 4. **Parallel tests**: Running N battles in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use raid_core::record::RecordLog;
use raid_core::replay::ReplayPlayer;
use raid_core::session::BattleSession;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use raid_test_utils::determinism::verify_determinism;
/// use raid_test_utils::fixtures::battle_scenario;
///
/// let result = verify_determinism(
///     3,
///     100,
///     battle_scenario,
///     |session| { session.tick(); },
///     |session| session.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a session built by `setup_fn` twice and compare final hashes.
pub fn verify_session_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> BattleSession,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |session| {
            session.tick();
        },
        |session| session.state_hash(),
    )
    .is_deterministic
}

/// Run N sessions on scoped threads and collect final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_sessions<F>(setup_fn: F, num_runs: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> BattleSession + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    let mut session = setup_fn();
                    for _ in 0..num_ticks {
                        session.tick();
                    }
                    session.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> BattleSession,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick();
        b.tick();

        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a bincode round-trip preserves the session exactly, and that
/// the restored copy keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> BattleSession,
{
    let mut session = setup_fn();
    for _ in 0..num_ticks {
        session.tick();
    }

    let Ok(bytes) = session.serialize() else {
        return false;
    };
    let Ok(mut restored) = BattleSession::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != session.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        session.tick();
        restored.tick();
    }
    restored.state_hash() == session.state_hash()
}

/// Replay `log` against `initial` several times, sampling the state hash
/// every `sample_every` ticks. Returns one hash trace per run.
///
/// # Panics
///
/// Panics if the initial session cannot be snapshotted.
pub fn replay_traces(
    initial: &BattleSession,
    log: &RecordLog,
    extra_seconds: u32,
    runs: usize,
    sample_every: u64,
) -> Vec<Vec<u64>> {
    let sample_every = sample_every.max(1);
    (0..runs)
        .map(|_| {
            let mut player = ReplayPlayer::new(initial, log.clone(), extra_seconds)
                .expect("session snapshot");
            let mut trace = Vec::new();
            while !player.is_finished() {
                player.advance();
                if player.current_tick() % sample_every == 0 {
                    trace.push(player.session().state_hash());
                }
            }
            trace.push(player.session().state_hash());
            trace
        })
        .collect()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use raid_core::grid::GridCell;
    use raid_core::math::{Fixed, Vec2Fixed};
    use raid_core::record::Placement;
    use raid_core::spells::SpellKind;
    use raid_core::units::UnitKind;

    use crate::fixtures::{cell_position, TEST_GRID_SIZE};

    /// Generate a fixed-point coordinate in a range covering the test grid.
    ///
    /// Range: -1500 to 3000 (world units)
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-1500i32..3000i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a cell inside a grid of `size` cells per side.
    pub fn arb_cell(size: u32) -> impl Strategy<Value = GridCell> {
        let size = i32::try_from(size).unwrap_or(i32::MAX);
        (0..size, 0..size).prop_map(|(row, col)| GridCell::new(row, col))
    }

    /// Generate any troop kind.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        prop::sample::select(UnitKind::ALL.to_vec())
    }

    /// Generate any spell kind.
    pub fn arb_spell_kind() -> impl Strategy<Value = SpellKind> {
        prop::sample::select(SpellKind::ALL.to_vec())
    }

    /// Generate a level-1 troop or a spell on a test-grid vertex.
    pub fn arb_placement() -> impl Strategy<Value = Placement> {
        let size = i32::try_from(TEST_GRID_SIZE).unwrap_or(i32::MAX);
        prop_oneof![
            (arb_unit_kind(), 0..size, 0..size).prop_map(|(kind, row, col)| Placement::Troop {
                kind,
                level: 1,
                position: cell_position(row, col),
            }),
            (arb_spell_kind(), 0..size, 0..size).prop_map(|(kind, row, col)| Placement::Spell {
                kind,
                position: cell_position(row, col),
            }),
        ]
    }

    /// Generate a sequence of placements.
    pub fn arb_placement_sequence(max_len: usize) -> impl Strategy<Value = Vec<Placement>> {
        proptest::collection::vec(arb_placement(), 1..max_len)
    }
}
