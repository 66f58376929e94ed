//! Test fixtures and helpers.
//!
//! Pre-built grids, villages and placement logs for consistent testing.

use fixed::types::I32F32;
use raid_core::data::Catalog;
use raid_core::grid::{GridCell, GridParameters};
use raid_core::layout::{LayoutEntry, VillageLayout};
use raid_core::math::{Fixed, Vec2Fixed};
use raid_core::record::{Placement, PlacementRecord, RecordLog};
use raid_core::session::BattleSession;
use raid_core::spells::SpellKind;
use raid_core::units::UnitKind;

/// Side length of [`test_grid`].
pub const TEST_GRID_SIZE: u32 = 44;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A 44x44 grid with vertex (0, 0) at the world origin.
#[must_use]
pub fn test_grid() -> GridParameters {
    GridParameters::new(Vec2Fixed::ZERO, fixed(32), fixed(16), TEST_GRID_SIZE)
}

/// World position of a vertex on [`test_grid`].
#[must_use]
pub fn cell_position(row: i32, col: i32) -> Vec2Fixed {
    test_grid().grid_to_world(GridCell::new(row, col))
}

/// A small village: town hall inside a wall ring, two defenses, two
/// resource buildings and a bomb.
#[must_use]
pub fn sample_village() -> VillageLayout {
    let mut layout = VillageLayout::new();
    layout.push("TownHall", LayoutEntry::new(22.0, 22.0, 1));
    for i in 18..=26 {
        let i = f64::from(i);
        layout.push("Wall", LayoutEntry::new(18.0, i, 1));
        layout.push("Wall", LayoutEntry::new(26.0, i, 1));
        if i > 18.0 && i < 26.0 {
            layout.push("Wall", LayoutEntry::new(i, 18.0, 1));
            layout.push("Wall", LayoutEntry::new(i, 26.0, 1));
        }
    }
    layout.push("Cannon", LayoutEntry::new(14.0, 14.0, 1));
    layout.push("ArcherTower", LayoutEntry::new(30.0, 14.0, 1));
    layout.push("GoldMine", LayoutEntry::new(14.0, 30.0, 1));
    layout.push("ElixirStorage", LayoutEntry::new(30.0, 30.0, 1));
    layout.push("Bomb", LayoutEntry::new(10.0, 22.0, 1));
    layout
}

/// Empty session on [`test_grid`] with the built-in catalog.
///
/// # Panics
///
/// Panics if the built-in catalog fails to parse.
#[must_use]
pub fn empty_session() -> BattleSession {
    BattleSession::new(test_grid(), Catalog::builtin().expect("built-in catalog parses"))
}

/// [`sample_village`] loaded into a fresh session.
#[must_use]
pub fn sample_session() -> BattleSession {
    let mut session = empty_session();
    session.load_layout(&sample_village());
    session
}

/// A barbarian at (10, 10) at t=0, then a heal on the same spot at t=5.
#[must_use]
pub fn heal_log() -> RecordLog {
    let position = Vec2Fixed::from_ints(10, 10);
    RecordLog::new(
        vec![
            PlacementRecord {
                placement: Placement::Troop {
                    kind: UnitKind::Barbarian,
                    level: 1,
                    position,
                },
                timestamp: 0,
            },
            PlacementRecord {
                placement: Placement::Spell {
                    kind: SpellKind::Heal,
                    position,
                },
                timestamp: 5,
            },
        ],
        5,
    )
}

/// A mixed attack on [`sample_village`] from its north-west edge.
#[must_use]
pub fn attack_log() -> RecordLog {
    let troop = |kind, row, col, timestamp| PlacementRecord {
        placement: Placement::Troop {
            kind,
            level: 1,
            position: cell_position(row, col),
        },
        timestamp,
    };
    let spell = |kind, row, col, timestamp| PlacementRecord {
        placement: Placement::Spell {
            kind,
            position: cell_position(row, col),
        },
        timestamp,
    };

    RecordLog::new(
        vec![
            troop(UnitKind::Giant, 4, 14, 0),
            troop(UnitKind::Giant, 4, 16, 0),
            troop(UnitKind::Barbarian, 6, 22, 1),
            troop(UnitKind::Barbarian, 6, 23, 1),
            troop(UnitKind::Archer, 4, 20, 2),
            troop(UnitKind::Bomber, 8, 20, 3),
            troop(UnitKind::Dragon, 2, 30, 4),
            spell(SpellKind::Rage, 12, 16, 6),
            spell(SpellKind::Lightning, 14, 14, 8),
            spell(SpellKind::Heal, 12, 16, 10),
        ],
        30,
    )
}

/// [`sample_session`] with every placement of [`attack_log`] already made.
///
/// # Panics
///
/// Panics if a placement is rejected by the built-in catalog.
#[must_use]
pub fn battle_scenario() -> BattleSession {
    let mut session = sample_session();
    for record in attack_log().records {
        session
            .apply_placement(&record.placement)
            .expect("built-in catalog accepts sample placements");
    }
    session
}

/// True if `a` and `b` differ by at most `epsilon`.
#[must_use]
pub fn approx_eq(a: Fixed, b: Fixed, epsilon: Fixed) -> bool {
    (a - b).abs() <= epsilon
}
