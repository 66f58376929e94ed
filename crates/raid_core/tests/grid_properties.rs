//! Property tests for the isometric grid transform and the path finder.

use proptest::prelude::*;
use raid_core::grid::{GridCell, GridParameters};
use raid_core::math::{Fixed, Vec2Fixed};
use raid_core::pathfinding::find_path;
use raid_test_utils::determinism::strategies::arb_cell;
use raid_test_utils::fixtures::{fixed, test_grid, TEST_GRID_SIZE};

fn arb_grid() -> impl Strategy<Value = GridParameters> {
    (-5000i32..5000, -5000i32..5000, 1i32..64, 1i32..64, 1u32..120).prop_map(
        |(x, y, dx, dy, size)| GridParameters::new(Vec2Fixed::from_ints(x, y), fixed(dx), fixed(dy), size),
    )
}

fn arb_grid_and_cell() -> impl Strategy<Value = (GridParameters, GridCell)> {
    arb_grid().prop_flat_map(|grid| (Just(grid), arb_cell(grid.grid_size)))
}

/// 20x20 obstacle mask, roughly one cell in four blocked.
fn arb_obstacles() -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(prop::bool::weighted(0.25), 400)
}

/// Index into a 20x20 obstacle mask. Out-of-range cells map to 0; callers
/// check bounds first.
fn cell_index(cell: GridCell) -> usize {
    usize::try_from(cell.row * 20 + cell.col).unwrap_or(0)
}

fn small_grid() -> GridParameters {
    GridParameters::new(Vec2Fixed::ZERO, fixed(32), fixed(16), 20)
}

proptest! {
    #[test]
    fn prop_grid_round_trip_is_exact((grid, cell) in arb_grid_and_cell()) {
        let world = grid.grid_to_world(cell);
        prop_assert_eq!(grid.world_to_grid(world), Some(cell));
    }

    #[test]
    fn prop_snap_is_stable_on_vertices((grid, cell) in arb_grid_and_cell()) {
        let world = grid.grid_to_world(cell);
        prop_assert_eq!(grid.find_nearest_snap_vertex(world), Some((cell, world)));
    }

    #[test]
    fn prop_snap_never_returns_farther_neighbour(cell in arb_cell(TEST_GRID_SIZE), dx in -15i32..15, dy in -7i32..7) {
        let grid = test_grid();
        let pos = grid.grid_to_world(cell) + Vec2Fixed::from_ints(dx, dy);
        if let Some((snapped, world)) = grid.find_nearest_snap_vertex(pos) {
            prop_assert!(grid.in_bounds(snapped));
            let own = grid.grid_to_world(cell).distance_squared(pos);
            prop_assert!(world.distance_squared(pos) <= own);
        }
    }

    #[test]
    fn prop_fractional_inverse_matches_forward(row in 0i32..44, col in 0i32..44, frac in 0i32..4) {
        let grid = test_grid();
        let r = Fixed::from_num(row) + Fixed::from_num(frac) / 4;
        let c = Fixed::from_num(col);
        let (back_r, back_c) = grid.world_to_grid_fractional(grid.grid_to_world_fractional(r, c));
        prop_assert_eq!(back_r, r);
        prop_assert_eq!(back_c, c);
    }

    #[test]
    fn prop_paths_are_walkable_and_connected(
        mut blocked in arb_obstacles(),
        start in arb_cell(20),
        end in arb_cell(20),
    ) {
        prop_assume!(start != end);
        blocked[cell_index(start)] = false;
        blocked[cell_index(end)] = false;
        let grid = small_grid();
        let walkable = |cell: GridCell| grid.in_bounds(cell) && !blocked[cell_index(cell)];

        let path = find_path(grid.grid_to_world(start), grid.grid_to_world(end), &grid, walkable);
        if path.is_empty() {
            return Ok(());
        }

        let cells: Vec<GridCell> = path
            .iter()
            .map(|p| grid.world_to_grid(*p).expect("path steps are on the grid"))
            .collect();
        prop_assert!(cells.iter().all(|c| walkable(*c)));
        prop_assert_eq!(cells[0].chebyshev(start), 1);
        for pair in cells.windows(2) {
            prop_assert_eq!(pair[0].chebyshev(pair[1]), 1);
        }
        prop_assert_eq!(*cells.last().unwrap(), end);
    }

    #[test]
    fn prop_blocked_destination_lands_near_it(
        mut blocked in arb_obstacles(),
        start in arb_cell(20),
        end in arb_cell(20),
    ) {
        prop_assume!(start != end);
        blocked[cell_index(start)] = false;
        blocked[cell_index(end)] = true;
        let grid = small_grid();
        let walkable = |cell: GridCell| grid.in_bounds(cell) && !blocked[cell_index(cell)];

        let path = find_path(grid.grid_to_world(start), grid.grid_to_world(end), &grid, walkable);
        if let Some(last) = path.last() {
            let cell = grid.world_to_grid(*last).expect("path steps are on the grid");
            prop_assert!(walkable(cell));
            prop_assert!(cell.chebyshev(end) <= 5);
        }
    }

    #[test]
    fn prop_path_finding_is_deterministic(blocked in arb_obstacles(), start in arb_cell(20), end in arb_cell(20)) {
        let grid = small_grid();
        let walkable = |cell: GridCell| grid.in_bounds(cell) && !blocked[cell_index(cell)];
        let a = find_path(grid.grid_to_world(start), grid.grid_to_world(end), &grid, walkable);
        let b = find_path(grid.grid_to_world(start), grid.grid_to_world(end), &grid, walkable);
        prop_assert_eq!(a, b);
    }
}

#[test]
fn off_grid_positions_are_unmapped() {
    let grid = test_grid();
    assert_eq!(grid.world_to_grid(Vec2Fixed::from_ints(-500, 0)), None);
    assert_eq!(grid.world_to_grid(grid.grid_to_world(GridCell::new(44, 0))), None);
    assert!(grid.world_to_grid(grid.grid_to_world(GridCell::new(43, 43))).is_some());
}
