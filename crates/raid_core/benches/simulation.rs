//! Battle benchmarks for raid_core.
//!
//! Run with: `cargo bench -p raid_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use raid_core::data::Catalog;
use raid_core::grid::{GridCell, GridParameters};
use raid_core::layout::{LayoutEntry, VillageLayout};
use raid_core::math::{Fixed, Vec2Fixed};
use raid_core::pathfinding::find_path;
use raid_core::session::BattleSession;
use raid_core::units::UnitKind;

fn grid() -> GridParameters {
    GridParameters::new(Vec2Fixed::ZERO, Fixed::from_num(32), Fixed::from_num(16), 44)
}

/// A town hall behind a ring of walls with a few defenses outside it.
fn walled_village() -> VillageLayout {
    let mut layout = VillageLayout::new();
    layout.push("TownHall", LayoutEntry::new(22.0, 22.0, 1));
    for i in 16..=28 {
        let i = f64::from(i);
        layout.push("Wall", LayoutEntry::new(16.0, i, 1));
        layout.push("Wall", LayoutEntry::new(28.0, i, 1));
        layout.push("Wall", LayoutEntry::new(i, 16.0, 1));
        layout.push("Wall", LayoutEntry::new(i, 28.0, 1));
    }
    layout.push("Cannon", LayoutEntry::new(10.0, 10.0, 1));
    layout.push("ArcherTower", LayoutEntry::new(34.0, 10.0, 1));
    layout.push("GoldMine", LayoutEntry::new(10.0, 34.0, 1));
    layout.push("Bomb", LayoutEntry::new(12.0, 22.0, 1));
    layout
}

pub fn pathfinding_benchmark(c: &mut Criterion) {
    let grid = grid();
    let wall = |cell: GridCell| !(cell.col == 20 && cell.row > 2);
    let start = grid.grid_to_world(GridCell::new(40, 2));
    let end = grid.grid_to_world(GridCell::new(40, 40));

    c.bench_function("find_path_around_wall", |b| {
        b.iter(|| black_box(find_path(black_box(start), black_box(end), &grid, wall)));
    });

    let open = |_: GridCell| true;
    let corner = grid.grid_to_world(GridCell::new(0, 0));
    let far = grid.grid_to_world(GridCell::new(43, 43));
    c.bench_function("find_path_open_diagonal", |b| {
        b.iter(|| black_box(find_path(black_box(corner), black_box(far), &grid, open)));
    });
}

pub fn session_benchmark(c: &mut Criterion) {
    let catalog = Catalog::builtin().expect("builtin catalog");
    let mut base = BattleSession::new(grid(), catalog);
    base.load_layout(&walled_village());
    for (i, kind) in [UnitKind::Barbarian, UnitKind::Archer, UnitKind::Giant, UnitKind::Bomber]
        .into_iter()
        .enumerate()
    {
        for j in 0..5 {
            let offset = i32::try_from(i * 5 + j).unwrap_or(0) * 8;
            base.place_troop(kind, 1, Vec2Fixed::from_ints(40 + offset, 0))
                .expect("troop placement");
        }
    }

    c.bench_function("session_200_ticks_20_units", |b| {
        b.iter(|| {
            let mut session = base.clone();
            for _ in 0..200 {
                session.tick();
            }
            black_box(session.state_hash())
        });
    });

    c.bench_function("session_snapshot_round_trip", |b| {
        b.iter(|| {
            let bytes = base.serialize().expect("serialize");
            black_box(BattleSession::deserialize(&bytes).expect("deserialize"))
        });
    });
}

criterion_group!(benches, pathfinding_benchmark, session_benchmark);
criterion_main!(benches);
