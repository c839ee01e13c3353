//! Dijkstra flood-fill distance maps for mob pathfinding (§4.6).
//!
//! Stores costs in sparse 16×16 tiles matching the world's chip grid.
//! Compute is designed to run a few times a second, not once per tick.
//!
//! Even though every edge weight is `1.0`, this stays a min-priority-queue
//! Dijkstra rather than a plain BFS: `can_enter` gives blocked neighbors
//! effectively infinite cost, and the heap's `cost > visited[cell]` guard is
//! what keeps a later non-uniform terrain-cost extension a one-line change
//! instead of a rewrite.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use mud_core::signals::Compass;

const TILE_STRIDE: i32 = 16;
const TILE_CELLS: usize = (TILE_STRIDE * TILE_STRIDE) as usize;

const EIGHT_DIRS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];

fn tile_key(y: i32, x: i32) -> (i32, i32) {
    (y.div_euclid(TILE_STRIDE) * TILE_STRIDE, x.div_euclid(TILE_STRIDE) * TILE_STRIDE)
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    cost: f64,
    y: i32,
    x: i32,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

/// A sparse flood-fill cost map, keyed by 16×16 tile like the world's chip
/// storage. `get_cost` always returns a finite value: `max_cost` for an
/// unreached approach-map cell, `0.0` for an unreached flee-map cell —
/// callers never need an `is_reachable` guard.
pub struct DijkstraMap {
    costs: HashMap<(i32, i32), [f64; TILE_CELLS]>,
    pub max_cost: f64,
}

impl Default for DijkstraMap {
    fn default() -> Self {
        Self::new()
    }
}

impl DijkstraMap {
    pub fn new() -> Self {
        Self {
            costs: HashMap::new(),
            max_cost: 256.0,
        }
    }

    pub fn with_max_cost(max_cost: f64) -> Self {
        Self {
            costs: HashMap::new(),
            max_cost,
        }
    }

    /// Flood fill from every goal not itself blocked, via an 8-neighbor
    /// uniform-cost Dijkstra. `can_enter` decides which cells are
    /// traversable.
    pub fn compute(&mut self, goals: &[(i32, i32)], can_enter: impl Fn(i32, i32) -> bool) {
        self.costs.clear();
        if goals.is_empty() {
            return;
        }

        let mut heap = BinaryHeap::new();
        let mut visited: HashMap<(i32, i32), f64> = HashMap::new();

        for &(y, x) in goals {
            if can_enter(y, x) {
                heap.push(Entry { cost: 0.0, y, x });
                visited.insert((y, x), 0.0);
            }
        }

        while let Some(Entry { cost, y, x }) = heap.pop() {
            if cost > *visited.get(&(y, x)).unwrap_or(&f64::INFINITY) {
                continue;
            }
            if cost > self.max_cost {
                continue;
            }
            self.set_cost(y, x, cost);

            for (dy, dx) in EIGHT_DIRS {
                let (ny, nx) = (y + dy, x + dx);
                if !can_enter(ny, nx) {
                    continue;
                }
                let new_cost = cost + 1.0;
                if new_cost < *visited.get(&(ny, nx)).unwrap_or(&f64::INFINITY) {
                    visited.insert((ny, nx), new_cost);
                    heap.push(Entry { cost: new_cost, y: ny, x: nx });
                }
            }
        }
    }

    fn set_cost(&mut self, y: i32, x: i32, cost: f64) {
        let key = tile_key(y, x);
        let tile = self.costs.entry(key).or_insert([f64::INFINITY; TILE_CELLS]);
        let (ly, lx) = (y - key.0, x - key.1);
        tile[ly as usize * TILE_STRIDE as usize + lx as usize] = cost;
    }

    fn raw_cost(&self, y: i32, x: i32) -> f64 {
        let key = tile_key(y, x);
        let Some(tile) = self.costs.get(&key) else {
            return f64::INFINITY;
        };
        let (ly, lx) = (y - key.0, x - key.1);
        tile[ly as usize * TILE_STRIDE as usize + lx as usize]
    }

    /// Cost at `(y, x)`. `inverted` flips the curve for flee/avoidance
    /// layers: `max_cost - raw`, `0.0` for an unreached cell (instead of
    /// `max_cost` for the non-inverted case).
    pub fn get_cost(&self, y: i32, x: i32, inverted: bool) -> f64 {
        let raw = self.raw_cost(y, x);
        if raw.is_infinite() {
            return if inverted { 0.0 } else { self.max_cost };
        }
        if inverted {
            self.max_cost - raw
        } else {
            raw
        }
    }

    /// Direction to the lowest-cost neighbor; `None` at an unreached cell
    /// or already at cost `0` (the goal).
    pub fn roll_downhill(&self, y: i32, x: i32) -> Option<Compass> {
        let current = self.raw_cost(y, x);
        if current.is_infinite() || current == 0.0 {
            return None;
        }
        let mut best_cost = current;
        let mut best_dir = None;
        for (dy, dx) in EIGHT_DIRS {
            let neighbor_cost = self.raw_cost(y + dy, x + dx);
            if neighbor_cost < best_cost {
                best_cost = neighbor_cost;
                best_dir = Compass::from_vector(dy, dx);
            }
        }
        best_dir
    }

    /// Direction to the highest-cost reachable neighbor — used by flee
    /// behavior to climb away from a goal instead of rolling toward it.
    pub fn climb_uphill(&self, y: i32, x: i32, can_enter: impl Fn(i32, i32) -> bool) -> Option<Compass> {
        let mut best_cost = self.raw_cost(y, x);
        if best_cost.is_infinite() {
            best_cost = 0.0;
        }
        let mut best_dir = None;
        for (dy, dx) in EIGHT_DIRS {
            let (ny, nx) = (y + dy, x + dx);
            if !can_enter(ny, nx) {
                continue;
            }
            let mut neighbor_cost = self.raw_cost(ny, nx);
            if neighbor_cost.is_infinite() {
                neighbor_cost = self.max_cost;
            }
            if neighbor_cost > best_cost {
                best_cost = neighbor_cost;
                best_dir = Compass::from_vector(dy, dx);
            }
        }
        best_dir
    }
}
