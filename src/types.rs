//! # Fleet Types Module
//!
//! Core value types shared by every part of the fleet simulation: grid
//! coordinates, the robot lifecycle states, and the default dimensions and
//! thresholds used when no configuration overrides them.
//!
//! All types are serializable so that snapshots can be streamed to a remote
//! monitor without any conversion layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// NOTE - Default number of grid rows (600 px window / 20 px cells)
pub const DEFAULT_ROWS: usize = 30;

/// NOTE - Default number of grid columns
pub const DEFAULT_COLS: usize = 30;

/// NOTE - Cell size in pixels, only meaningful to a graphical front-end
pub const DEFAULT_CELL_SIZE: u32 = 20;

/// NOTE - Battery every robot starts with
pub const DEFAULT_BATTERY: i32 = 100;

/// NOTE - Below this battery level a robot heads for the nearest charger
pub const LOW_BATTERY_THRESHOLD: i32 = 20;

/// A cell on the grid, addressed as `(row, col)`.
///
/// Ordering is lexicographic on `(row, col)`; the path planner relies on it
/// to break ties between frontier entries with equal scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
}

impl Coordinate {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Straight-line distance, used both as the A* heuristic and to pick the
    /// nearest task point.
    pub fn distance(&self, other: Coordinate) -> f64 {
        let dr = self.row as f64 - other.row as f64;
        let dc = self.col as f64 - other.col as f64;
        dr.hypot(dc)
    }

    /// True when `other` is exactly one up/down/left/right step away.
    pub fn is_adjacent(&self, other: Coordinate) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}

impl From<(usize, usize)> for Coordinate {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// NOTE - Lifecycle state of a robot, derived from its fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotState {
    Idle,     // NOTE - No target assigned
    EnRoute,  // NOTE - Heading for its target
    Arrived,  // NOTE - Standing on its target, about to complete the task
    Stopped,  // NOTE - Battery depleted, terminal
}
