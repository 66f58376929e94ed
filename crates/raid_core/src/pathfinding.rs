//! Grid-based pathfinding using the A* algorithm.
//!
//! Works over the 8-connected isometric grid. Straight steps cost 10,
//! diagonal steps cost 14 and the heuristic is Manhattan distance × 10, all
//! in integer arithmetic so identical inputs always yield identical paths.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::grid::{GridCell, GridParameters};
use crate::math::Vec2Fixed;

/// Cost of an orthogonal step.
pub const STRAIGHT_COST: u32 = 10;

/// Cost of a diagonal step (10 × √2, rounded down).
pub const DIAGONAL_COST: u32 = 14;

/// Largest ring searched for a walkable stand-in when the destination is blocked.
pub const MAX_RING_RADIUS: i32 = 5;

/// Node expansions allowed before the search gives up.
pub const MAX_EXPANSIONS: usize = 10_000;

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: GridCell,
    /// g + h.
    f_score: u32,
    /// Lower packed coordinates win ties so equal-cost paths are stable.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest-f-first.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 8-directional movement as `(d_row, d_col)`.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// Pack a cell into a single key: `(row << 32) | col`.
#[inline]
fn pack(cell: GridCell) -> u64 {
    (u64::from(cell.row as u32) << 32) | u64::from(cell.col as u32)
}

#[inline]
fn manhattan_heuristic(a: GridCell, b: GridCell) -> u32 {
    (a.row.abs_diff(b.row) + a.col.abs_diff(b.col)) * STRAIGHT_COST
}

/// Find a path between two world positions.
///
/// Returns the world positions of the cells to walk through, excluding the
/// start cell. The result is empty when either endpoint is off the grid, no
/// walkable stand-in exists for a blocked destination, or no route exists.
///
/// * Same start and end cell: returns `[end]` unchanged.
/// * Blocked destination: the nearest walkable cell within
///   [`MAX_RING_RADIUS`] square rings is used instead. If that stand-in is
///   the start cell itself, the result is that cell's position alone.
pub fn find_path<F>(
    start: Vec2Fixed,
    end: Vec2Fixed,
    grid: &GridParameters,
    is_walkable: F,
) -> Vec<Vec2Fixed>
where
    F: Fn(GridCell) -> bool,
{
    let Some(start_cell) = grid.world_to_grid(start) else {
        tracing::debug!(?start, "path start is off the grid");
        return Vec::new();
    };
    let Some(end_cell) = grid.world_to_grid(end) else {
        tracing::debug!(?end, "path end is off the grid");
        return Vec::new();
    };

    if start_cell == end_cell {
        return vec![end];
    }

    let goal = if is_walkable(end_cell) {
        end_cell
    } else {
        match nearest_walkable_ring_cell(end_cell, grid, &is_walkable) {
            Some(cell) => cell,
            None => {
                tracing::debug!(?end_cell, "no walkable cell near blocked destination");
                return Vec::new();
            }
        }
    };

    if goal == start_cell {
        return vec![grid.grid_to_world(goal)];
    }

    match search(start_cell, goal, grid, &is_walkable) {
        Some(cells) => cells
            .into_iter()
            .skip(1)
            .map(|cell| grid.grid_to_world(cell))
            .collect(),
        None => {
            tracing::debug!(?start_cell, ?goal, "no path found");
            Vec::new()
        }
    }
}

/// Nearest walkable, in-bounds cell on the first non-empty square ring
/// around `center`. Ties on distance keep the first cell in row-major order.
fn nearest_walkable_ring_cell<F>(
    center: GridCell,
    grid: &GridParameters,
    is_walkable: &F,
) -> Option<GridCell>
where
    F: Fn(GridCell) -> bool,
{
    for radius in 1..=MAX_RING_RADIUS {
        let mut best: Option<(GridCell, i64)> = None;

        for row in (center.row - radius)..=(center.row + radius) {
            for col in (center.col - radius)..=(center.col + radius) {
                let cell = GridCell::new(row, col);
                if cell.chebyshev(center) != radius.unsigned_abs() {
                    continue;
                }
                if !grid.in_bounds(cell) || !is_walkable(cell) {
                    continue;
                }
                let dist = cell.distance_squared(center);
                if best.map_or(true, |(_, d)| dist < d) {
                    best = Some((cell, dist));
                }
            }
        }

        if let Some((cell, _)) = best {
            return Some(cell);
        }
    }

    None
}

/// A* over grid cells. Returns the full cell sequence including the start.
fn search<F>(
    start: GridCell,
    goal: GridCell,
    grid: &GridParameters,
    is_walkable: &F,
) -> Option<Vec<GridCell>>
where
    F: Fn(GridCell) -> bool,
{
    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut closed: HashSet<u64> = HashSet::new();
    let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
    let mut g_score: HashMap<GridCell, u32> = HashMap::new();

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        cell: start,
        f_score: manhattan_heuristic(start, goal),
        tie_breaker: pack(start),
    });

    let mut expansions = 0usize;

    while let Some(current) = open_set.pop() {
        if !closed.insert(pack(current.cell)) {
            continue;
        }

        if current.cell == goal {
            return Some(reconstruct_path(&came_from, goal));
        }

        expansions += 1;
        if expansions > MAX_EXPANSIONS {
            tracing::debug!(expansions, "path search exceeded expansion limit");
            return None;
        }

        let current_g = g_score.get(&current.cell).copied().unwrap_or(u32::MAX);

        for &(d_row, d_col) in &DIRECTIONS {
            let neighbor = GridCell::new(current.cell.row + d_row, current.cell.col + d_col);

            if !grid.in_bounds(neighbor) || closed.contains(&pack(neighbor)) {
                continue;
            }
            if !is_walkable(neighbor) {
                continue;
            }

            let step = if d_row != 0 && d_col != 0 {
                DIAGONAL_COST
            } else {
                STRAIGHT_COST
            };
            let tentative_g = current_g.saturating_add(step);
            let neighbor_g = g_score.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.cell);
                g_score.insert(neighbor, tentative_g);
                open_set.push(AStarNode {
                    cell: neighbor,
                    f_score: tentative_g + manhattan_heuristic(neighbor, goal),
                    tie_breaker: pack(neighbor),
                });
            }
        }
    }

    None
}

/// Reconstruct path from came_from map.
fn reconstruct_path(came_from: &HashMap<GridCell, GridCell>, goal: GridCell) -> Vec<GridCell> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    fn grid() -> GridParameters {
        GridParameters::new(Vec2Fixed::ZERO, Fixed::from_num(32), Fixed::from_num(16), 20)
    }

    fn open(_: GridCell) -> bool {
        true
    }

    fn cells_of(grid: &GridParameters, path: &[Vec2Fixed]) -> Vec<GridCell> {
        path.iter().map(|p| grid.world_to_grid(*p).unwrap()).collect()
    }

    fn assert_connected(start: GridCell, cells: &[GridCell]) {
        let mut prev = start;
        for &cell in cells {
            assert_eq!(prev.chebyshev(cell), 1, "{prev:?} -> {cell:?} is not a single step");
            prev = cell;
        }
    }

    #[test]
    fn test_straight_path() {
        let g = grid();
        let start = GridCell::new(2, 2);
        let path = find_path(
            g.grid_to_world(start),
            g.grid_to_world(GridCell::new(2, 7)),
            &g,
            open,
        );

        let cells = cells_of(&g, &path);
        assert_eq!(cells.len(), 5);
        assert_eq!(cells.last(), Some(&GridCell::new(2, 7)));
        assert_connected(start, &cells);
    }

    #[test]
    fn test_diagonal_is_preferred() {
        let g = grid();
        let path = find_path(
            g.grid_to_world(GridCell::new(0, 0)),
            g.grid_to_world(GridCell::new(4, 4)),
            &g,
            open,
        );
        // 4 diagonal steps (cost 56) beat any mix of straight steps.
        assert_eq!(
            cells_of(&g, &path),
            vec![
                GridCell::new(1, 1),
                GridCell::new(2, 2),
                GridCell::new(3, 3),
                GridCell::new(4, 4)
            ]
        );
    }

    #[test]
    fn test_path_around_wall() {
        let g = grid();
        let wall = |cell: GridCell| !(cell.col == 5 && cell.row <= 8);
        let start = GridCell::new(2, 2);
        let goal = GridCell::new(2, 8);

        let path = find_path(g.grid_to_world(start), g.grid_to_world(goal), &g, wall);
        let cells = cells_of(&g, &path);

        assert_eq!(cells.last(), Some(&goal));
        assert_connected(start, &cells);
        assert!(cells.iter().all(|&c| wall(c)), "path crosses the wall");
        assert!(cells.iter().any(|c| c.row >= 9), "path must go around the wall end");
    }

    #[test]
    fn test_same_cell_returns_end() {
        let g = grid();
        let start = g.grid_to_world(GridCell::new(3, 3));
        let end = start + Vec2Fixed::from_ints(2, 1);
        assert_eq!(find_path(start, end, &g, open), vec![end]);
    }

    #[test]
    fn test_blocked_destination_uses_nearest_ring_cell() {
        let g = grid();
        let blocked = GridCell::new(10, 10);
        let walkable = move |cell: GridCell| cell != blocked;

        let path = find_path(
            g.grid_to_world(GridCell::new(10, 2)),
            g.grid_to_world(blocked),
            &g,
            walkable,
        );
        let cells = cells_of(&g, &path);
        let last = *cells.last().unwrap();
        assert_eq!(last.chebyshev(blocked), 1);
        // Orthogonal neighbours are closer than diagonal ones.
        assert_eq!(last.distance_squared(blocked), 1);
        // Row-major order picks (9, 10) among the four orthogonal neighbours.
        assert_eq!(last, GridCell::new(9, 10));
    }

    #[test]
    fn test_blocked_destination_without_stand_in_is_empty() {
        let g = grid();
        let center = GridCell::new(10, 10);
        let walkable = move |cell: GridCell| cell.chebyshev(center) > MAX_RING_RADIUS as u32;

        let path = find_path(
            g.grid_to_world(GridCell::new(0, 0)),
            g.grid_to_world(center),
            &g,
            walkable,
        );
        assert!(path.is_empty());
    }

    #[test]
    fn test_unreachable_destination_is_empty() {
        let g = grid();
        let goal = GridCell::new(10, 10);
        // Walkable goal sealed inside a ring of blocked cells.
        let walkable = move |cell: GridCell| cell.chebyshev(goal) != 1;

        let path = find_path(
            g.grid_to_world(GridCell::new(0, 0)),
            g.grid_to_world(goal),
            &g,
            walkable,
        );
        assert!(path.is_empty());
    }

    #[test]
    fn test_off_grid_endpoints_are_empty() {
        let g = grid();
        let inside = g.grid_to_world(GridCell::new(5, 5));
        let outside = Vec2Fixed::from_ints(-1000, -1000);
        assert!(find_path(outside, inside, &g, open).is_empty());
        assert!(find_path(inside, outside, &g, open).is_empty());
    }

    #[test]
    fn test_stand_in_equal_to_start_returns_single_cell() {
        let g = grid();
        let start = GridCell::new(5, 4);
        let blocked = GridCell::new(5, 5);
        let walkable = move |cell: GridCell| cell == start || cell.chebyshev(blocked) > 1;

        let path = find_path(g.grid_to_world(start), g.grid_to_world(blocked), &g, walkable);
        assert_eq!(path, vec![g.grid_to_world(start)]);
    }

    #[test]
    fn test_path_is_deterministic() {
        let g = grid();
        let walkable = |cell: GridCell| (cell.row + cell.col) % 7 != 3;
        let a = find_path(
            g.grid_to_world(GridCell::new(0, 0)),
            g.grid_to_world(GridCell::new(19, 18)),
            &g,
            walkable,
        );
        let b = find_path(
            g.grid_to_world(GridCell::new(0, 0)),
            g.grid_to_world(GridCell::new(19, 18)),
            &g,
            walkable,
        );
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }
}
