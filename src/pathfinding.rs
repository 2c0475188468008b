//! A* search over the 4-connected grid.
//!
//! Edges cost 1 and the heuristic is the Euclidean distance to the goal.
//! That heuristic does not match Manhattan movement, so the returned path
//! is the one the search settles on, not necessarily a shortest one.

use crate::map::Grid;
use crate::types::Coordinate;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

#[derive(Clone, Copy, Debug)]
struct Node {
    position: Coordinate,
    g_cost: usize,
    f_cost: f64,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

// BinaryHeap is a max-heap: lowest f first, then smallest coordinate.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Path from `start` to `goal`, excluding `start`, front = first move.
///
/// Empty when `start == goal` or when `goal` cannot be reached.
pub fn find_path(grid: &Grid, start: Coordinate, goal: Coordinate) -> VecDeque<Coordinate> {
    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Coordinate, Coordinate> = HashMap::new();
    let mut g_score: HashMap<Coordinate, usize> = HashMap::new();

    g_score.insert(start, 0);
    open_set.push(Node {
        position: start,
        g_cost: 0,
        f_cost: 0.0,
    });

    while let Some(current) = open_set.pop() {
        if current.position == goal {
            return reconstruct(&came_from, goal);
        }

        // Stale entry, a cheaper route to this cell was pushed later.
        if g_score.get(&current.position).is_some_and(|&best| current.g_cost > best) {
            continue;
        }

        for neighbor in grid.neighbors(current.position) {
            let tentative_g = current.g_cost + 1;

            if g_score.get(&neighbor).is_none_or(|&known| tentative_g < known) {
                came_from.insert(neighbor, current.position);
                g_score.insert(neighbor, tentative_g);
                open_set.push(Node {
                    position: neighbor,
                    g_cost: tentative_g,
                    f_cost: tentative_g as f64 + neighbor.distance(goal),
                });
            }
        }
    }

    VecDeque::new()
}

fn reconstruct(came_from: &HashMap<Coordinate, Coordinate>, goal: Coordinate) -> VecDeque<Coordinate> {
    let mut path = VecDeque::new();
    let mut current = goal;

    while let Some(&previous) = came_from.get(&current) {
        path.push_front(current);
        current = previous;
    }

    path
}
