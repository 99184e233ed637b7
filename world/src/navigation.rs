//! Route queries over the occupancy grid.
//!
//! Two searches live here: a breadth-first reachability check used to vet
//! hypothetical placements, and an A* search producing the concrete cell
//! sequences enemies walk. A* results are memoised per grid version.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, VecDeque},
};

use siegeline_core::{CellCoord, Direction};

use crate::grid::Grid;

/// Expansion order shared by both searches: down, right, up, left.
const SEARCH_ORDER: [Direction; 4] = [
    Direction::South,
    Direction::East,
    Direction::North,
    Direction::West,
];

/// Cell sequence computed against a specific grid version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
    version: u64,
}

impl Path {
    /// Cells from start to goal, both inclusive. Empty when unreachable.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Grid version the path was computed against.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Number of cells in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no route was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the grid changed since the path was computed.
    #[must_use]
    pub fn is_stale(&self, grid: &Grid) -> bool {
        self.version != grid.version()
    }
}

/// A* front end memoising results until the grid topology changes.
#[derive(Clone, Debug, Default)]
pub struct Pathfinder {
    version: u64,
    entries: HashMap<(CellCoord, CellCoord), Path>,
}

impl Pathfinder {
    /// Returns the shortest path between two cells, consulting the cache first.
    pub fn find(&mut self, grid: &Grid, start: CellCoord, goal: CellCoord) -> Path {
        if self.version != grid.version() {
            self.entries.clear();
            self.version = grid.version();
        }

        if let Some(path) = self.entries.get(&(start, goal)) {
            return path.clone();
        }

        let path = Path {
            cells: find_path(grid, start, goal),
            version: grid.version(),
        };
        let _ = self.entries.insert((start, goal), path.clone());
        path
    }

    /// Number of memoised start/goal pairs.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    estimate: u32,
    sequence: u64,
    cell: CellCoord,
}

/// Shortest 4-connected path between two cells using A* with a Manhattan heuristic.
///
/// The returned sequence includes both endpoints. Ties on the estimated cost are
/// broken by insertion order, which makes the result deterministic for a given
/// grid. Returns an empty vector when no route exists.
#[must_use]
pub fn find_path(grid: &Grid, start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
    let (Some(start_index), Some(goal_index)) = (grid.index(start), grid.index(goal)) else {
        return Vec::new();
    };
    if !grid.is_open(goal) {
        return Vec::new();
    }

    let cell_count = grid.cell_count();
    let mut cost = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<CellCoord>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];
    let mut open = BinaryHeap::new();
    let mut sequence = 0_u64;

    cost[start_index] = 0;
    open.push(Reverse(OpenNode {
        estimate: start.manhattan_distance(goal),
        sequence,
        cell: start,
    }));

    while let Some(Reverse(node)) = open.pop() {
        let Some(index) = grid.index(node.cell) else {
            continue;
        };
        if closed[index] {
            continue;
        }
        closed[index] = true;

        if index == goal_index {
            return reconstruct(grid, &came_from, start, goal);
        }

        let next_cost = cost[index].saturating_add(1);
        for direction in SEARCH_ORDER {
            let Some(neighbor) = node.cell.step(direction, grid.columns(), grid.rows()) else {
                continue;
            };
            if !grid.is_open(neighbor) {
                continue;
            }
            let Some(neighbor_index) = grid.index(neighbor) else {
                continue;
            };
            if closed[neighbor_index] || next_cost >= cost[neighbor_index] {
                continue;
            }

            cost[neighbor_index] = next_cost;
            came_from[neighbor_index] = Some(node.cell);
            sequence += 1;
            open.push(Reverse(OpenNode {
                estimate: next_cost.saturating_add(neighbor.manhattan_distance(goal)),
                sequence,
                cell: neighbor,
            }));
        }
    }

    Vec::new()
}

fn reconstruct(
    grid: &Grid,
    came_from: &[Option<CellCoord>],
    start: CellCoord,
    goal: CellCoord,
) -> Vec<CellCoord> {
    let mut cells = vec![goal];
    let mut current = goal;
    while current != start {
        let previous = grid
            .index(current)
            .and_then(|index| came_from.get(index).copied().flatten());
        match previous {
            Some(cell) => {
                cells.push(cell);
                current = cell;
            }
            None => return Vec::new(),
        }
    }
    cells.reverse();
    cells
}

/// Breadth-first reachability check honouring extra hypothetical blockers.
///
/// `is_blocked` marks cells that should be treated as walls in addition to
/// the grid's own blocked cells, which lets callers test a footprint without
/// mutating the grid.
pub fn is_reachable<F>(grid: &Grid, start: CellCoord, goal: CellCoord, mut is_blocked: F) -> bool
where
    F: FnMut(CellCoord) -> bool,
{
    let passable = |cell: CellCoord, is_blocked: &mut F| grid.is_open(cell) && !is_blocked(cell);

    if !passable(start, &mut is_blocked) || !passable(goal, &mut is_blocked) {
        return false;
    }
    if start == goal {
        return true;
    }

    let mut visited = vec![false; grid.cell_count()];
    let mut queue = VecDeque::new();
    if let Some(index) = grid.index(start) {
        visited[index] = true;
        queue.push_back(start);
    }

    while let Some(cell) = queue.pop_front() {
        for direction in SEARCH_ORDER {
            let Some(neighbor) = cell.step(direction, grid.columns(), grid.rows()) else {
                continue;
            };
            let Some(index) = grid.index(neighbor) else {
                continue;
            };
            if visited[index] || !passable(neighbor, &mut is_blocked) {
                continue;
            }
            if neighbor == goal {
                return true;
            }
            visited[index] = true;
            queue.push_back(neighbor);
        }
    }

    false
}

/// Length of the shortest route in steps, or `None` when unreachable.
#[must_use]
pub fn route_distance(grid: &Grid, start: CellCoord, goal: CellCoord) -> Option<u32> {
    if !grid.is_open(start) || !grid.is_open(goal) {
        return None;
    }
    let mut distances = vec![u32::MAX; grid.cell_count()];
    let mut queue = VecDeque::new();
    distances[grid.index(start)?] = 0;
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        let current = distances[grid.index(cell)?];
        if cell == goal {
            return Some(current);
        }
        for direction in SEARCH_ORDER {
            let Some(neighbor) = cell.step(direction, grid.columns(), grid.rows()) else {
                continue;
            };
            let Some(index) = grid.index(neighbor) else {
                continue;
            };
            if distances[index] != u32::MAX || !grid.is_open(neighbor) {
                continue;
            }
            distances[index] = current + 1;
            queue.push_back(neighbor);
        }
    }
    None
}
