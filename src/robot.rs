use crate::map::Grid;
use crate::pathfinding;
use crate::types::{Coordinate, RobotState};
use std::collections::VecDeque;

pub struct Robot {
    pub id: usize,
    pub position: Coordinate,
    pub battery: i32,
    pub max_battery: i32,
    pub target: Option<Coordinate>,
    pub path: VecDeque<Coordinate>,
    pub carrying: bool,
    pub completed_journey: bool,
    pub stopped: bool,
    pub deliveries: u32,
}

impl Robot {
    pub fn new(id: usize, position: Coordinate, battery: i32) -> Self {
        Self {
            id,
            position,
            battery,
            max_battery: battery,
            target: None,
            path: VecDeque::new(),
            carrying: false,
            completed_journey: false,
            stopped: false,
            deliveries: 0,
        }
    }

    pub fn state(&self) -> RobotState {
        match self.target {
            _ if self.stopped => RobotState::Stopped,
            None => RobotState::Idle,
            Some(target) if target == self.position => RobotState::Arrived,
            Some(_) => RobotState::EnRoute,
        }
    }

    pub fn is_low_battery(&self, threshold: i32) -> bool {
        self.battery < threshold
    }

    /// Advances one cell along the current path, spending one unit of battery.
    ///
    /// A drained battery stops the robot here; an empty path leaves it in
    /// place. The step that spends the last unit still happens.
    pub fn move_step(&mut self) {
        if self.stopped {
            return;
        }

        if self.battery <= 0 {
            self.stopped = true;
            return;
        }

        if let Some(next_pos) = self.path.pop_front() {
            self.position = next_pos;
            self.battery -= 1;
        }
    }

    /// Targets `goal` and replaces the path with a fresh plan from the
    /// current position, discarding whatever was left of the old one.
    pub fn plan_to(&mut self, grid: &Grid, goal: Coordinate) {
        self.target = Some(goal);
        self.path = pathfinding::find_path(grid, self.position, goal);
    }
}
