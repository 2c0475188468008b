//! # Simulation Loop
//!
//! [`SimulationState`] owns the grid, the task pools and the fleet. One call
//! to [`SimulationState::step`] is one tick: every robot is dispatched
//! exactly once, in fleet order, and nothing else touches the pools.

use crate::config::SimConfig;
use crate::dispatch::{self, FleetEvent, TaskPools};
use crate::error::FleetResult;
use crate::map::Grid;
use crate::network::{self, FleetSnapshot};
use crate::robot::Robot;
use crate::types::{Coordinate, LOW_BATTERY_THRESHOLD};
use rand::rngs::SmallRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Running totals over the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub ticks: u64,
    pub pickups_completed: u64,
    pub deliveries_completed: u64,
    pub charging_diversions: u64,
    pub active_robots: usize,
    pub stopped_robots: usize,
}

pub struct SimulationState {
    pub grid: Grid,
    pub pools: TaskPools,
    pub robots: Vec<Robot>,
    pub low_battery_threshold: i32,
    tick: u64,
    stats: FleetStats,
}

impl SimulationState {
    pub fn new(grid: Grid, pools: TaskPools, robots: Vec<Robot>) -> Self {
        let active_robots = robots.iter().filter(|r| !r.stopped).count();
        Self {
            grid,
            pools,
            stats: FleetStats {
                active_robots,
                stopped_robots: robots.len() - active_robots,
                ..FleetStats::default()
            },
            robots,
            low_battery_threshold: LOW_BATTERY_THRESHOLD,
            tick: 0,
        }
    }

    /// Builds a scenario from `config`: explicit coordinates where given,
    /// random passable cells otherwise. The same seed yields the same run.
    pub fn from_config(config: &SimConfig) -> FleetResult<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let obstacles = match &config.obstacles {
            Some(obstacles) => obstacles.clone(),
            None => {
                let cells = config.rows * config.cols;
                index::sample(&mut rng, cells, config.obstacle_count.min(cells))
                    .into_iter()
                    .map(|i| Coordinate::from((i / config.cols, i % config.cols)))
                    .collect()
            }
        };
        let grid = Grid::new(config.rows, config.cols, obstacles);
        let free = grid.passable_cells();

        let mut place = |explicit: &Option<Vec<Coordinate>>, count: usize| -> Vec<Coordinate> {
            match explicit {
                Some(points) => points.clone(),
                None => (0..count).filter_map(|_| free.choose(&mut rng).copied()).collect(),
            }
        };

        let pickups = place(&config.pickups, config.pickup_count);
        let deliveries = place(&config.deliveries, config.delivery_count);
        let charging_stations = place(&config.charging_stations, config.charging_count);
        let starts = place(&config.robots, config.robot_count);

        let robots = starts
            .into_iter()
            .enumerate()
            .map(|(i, start)| Robot::new(i + 1, start, config.battery))
            .collect::<Vec<_>>();

        info!(
            rows = config.rows,
            cols = config.cols,
            obstacles = grid.obstacles().len(),
            pickups = pickups.len(),
            deliveries = deliveries.len(),
            chargers = charging_stations.len(),
            robots = robots.len(),
            "scenario generated"
        );

        let mut state = Self::new(grid, TaskPools::new(pickups, deliveries, charging_stations), robots);
        state.low_battery_threshold = config.low_battery_threshold;
        Ok(state)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> FleetStats {
        self.stats
    }

    /// Advances every robot by one tick and returns what happened.
    pub fn step(&mut self) -> Vec<FleetEvent> {
        let mut events = Vec::new();

        for robot in self.robots.iter_mut() {
            events.extend(dispatch::dispatch(robot, &self.grid, &mut self.pools, self.low_battery_threshold));
        }

        self.tick += 1;
        self.record(&events);
        debug!(tick = self.tick, events = events.len(), "tick complete");
        events
    }

    fn record(&mut self, events: &[FleetEvent]) {
        for event in events {
            match event {
                FleetEvent::PickedUp { .. } => self.stats.pickups_completed += 1,
                FleetEvent::Delivered { .. } => self.stats.deliveries_completed += 1,
                FleetEvent::ChargingDiverted { .. } => self.stats.charging_diversions += 1,
                _ => {}
            }
        }
        self.stats.ticks = self.tick;
        self.stats.stopped_robots = self.robots.iter().filter(|r| r.stopped).count();
        self.stats.active_robots = self.robots.len() - self.stats.stopped_robots;
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        network::create_snapshot(self)
    }

    /// True once no robot can do anything more. See [`RobotData::is_settled`]
    /// for the per-robot rule; robots parked on a charger or stuck behind an
    /// unreachable target count as settled.
    ///
    /// [`RobotData::is_settled`]: crate::network::RobotData::is_settled
    pub fn is_settled(&self) -> bool {
        self.robots
            .iter()
            .map(network::create_robot_data)
            .all(|r| r.is_settled(&self.pools.pickups, &self.pools.deliveries))
    }

    /// Ticks until `stop_requested` returns true for the latest snapshot or
    /// `max_ticks` ticks have run.
    pub fn run(&mut self, max_ticks: Option<u64>, mut stop_requested: impl FnMut(&FleetSnapshot) -> bool) -> FleetStats {
        loop {
            if stop_requested(&self.snapshot()) {
                info!(tick = self.tick, "stop requested");
                break;
            }
            if max_ticks.is_some_and(|max| self.tick >= max) {
                info!(tick = self.tick, "tick limit reached");
                break;
            }
            self.step();
        }
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(row: usize, col: usize) -> Coordinate {
        Coordinate::new(row, col)
    }

    #[test]
    fn step_counts_ticks_and_completions() {
        let grid = Grid::open(4, 4);
        let pools = TaskPools::new(vec![c(0, 1)], vec![c(0, 2)], vec![]);
        let mut sim = SimulationState::new(grid, pools, vec![Robot::new(1, c(0, 0), 100)]);

        sim.step();
        sim.step();

        let stats = sim.stats();
        assert_eq!(sim.tick(), 2);
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.pickups_completed, 1);
        assert_eq!(stats.deliveries_completed, 1);
        assert!(sim.is_settled());
    }

    #[test]
    fn earlier_robot_claims_contested_pickup() {
        let grid = Grid::open(3, 3);
        let pools = TaskPools::new(vec![c(0, 1)], vec![], vec![]);
        let robots = vec![Robot::new(1, c(0, 2), 100), Robot::new(2, c(0, 0), 100)];
        let mut sim = SimulationState::new(grid, pools, robots);

        let events = sim.step();

        assert!(sim.robots[0].carrying);
        assert!(!sim.robots[1].carrying);
        assert_eq!(events.iter().filter(|e| matches!(e, FleetEvent::PickedUp { .. })).count(), 1);
        assert!(sim.pools.pickups.is_empty());
    }

    #[test]
    fn run_stops_on_request() {
        let mut sim = SimulationState::new(Grid::open(3, 3), TaskPools::default(), vec![Robot::new(1, c(0, 0), 100)]);
        let stats = sim.run(None, |snapshot| snapshot.tick == 5);
        assert_eq!(stats.ticks, 5);
    }

    #[test]
    fn run_honours_tick_limit() {
        let mut sim = SimulationState::new(Grid::open(3, 3), TaskPools::default(), vec![]);
        let stats = sim.run(Some(7), |_| false);
        assert_eq!(stats.ticks, 7);
    }

    #[test]
    fn same_seed_same_scenario() {
        let config = SimConfig {
            seed: Some(42),
            ..SimConfig::default()
        };
        let a = SimulationState::from_config(&config).unwrap();
        let b = SimulationState::from_config(&config).unwrap();
        assert_eq!(a.grid.obstacles(), b.grid.obstacles());
        assert_eq!(a.pools, b.pools);
        let starts_a: Vec<_> = a.robots.iter().map(|r| r.position).collect();
        let starts_b: Vec<_> = b.robots.iter().map(|r| r.position).collect();
        assert_eq!(starts_a, starts_b);
    }

    #[test]
    fn random_points_avoid_obstacles() {
        let config = SimConfig {
            rows: 6,
            cols: 6,
            obstacle_count: 20,
            seed: Some(3),
            ..SimConfig::default()
        };
        let sim = SimulationState::from_config(&config).unwrap();
        assert_eq!(sim.grid.obstacles().len(), 20);
        assert_eq!(sim.robots.len(), 3);
        let points = sim
            .pools
            .pickups
            .iter()
            .chain(&sim.pools.deliveries)
            .chain(&sim.pools.charging_stations)
            .copied()
            .chain(sim.robots.iter().map(|r| r.position));
        for point in points {
            assert!(sim.grid.is_passable(point), "{point} placed on an obstacle");
        }
    }

    #[test]
    fn from_config_refuses_a_grid_with_no_room_for_robots() {
        let config = SimConfig {
            rows: 2,
            cols: 1,
            obstacles: Some(vec![c(0, 0), c(1, 0)]),
            ..SimConfig::default()
        };
        assert!(matches!(
            SimulationState::from_config(&config),
            Err(crate::error::FleetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn explicit_coordinates_override_counts() {
        let config = SimConfig {
            rows: 5,
            cols: 5,
            pickups: Some(vec![c(1, 1)]),
            deliveries: Some(vec![c(2, 2), c(2, 2)]),
            charging_stations: Some(vec![]),
            obstacles: Some(vec![c(4, 4)]),
            robots: Some(vec![c(0, 0), c(3, 0)]),
            battery: 40,
            low_battery_threshold: 5,
            ..SimConfig::default()
        };
        let sim = SimulationState::from_config(&config).unwrap();
        assert_eq!(sim.pools.pickups, vec![c(1, 1)]);
        assert_eq!(sim.pools.deliveries, vec![c(2, 2), c(2, 2)]);
        assert!(sim.pools.charging_stations.is_empty());
        assert!(sim.grid.is_obstacle(c(4, 4)));
        assert_eq!(sim.robots.len(), 2);
        assert_eq!(sim.robots[1].id, 2);
        assert_eq!(sim.robots[1].position, c(3, 0));
        assert_eq!(sim.robots[0].battery, 40);
        assert_eq!(sim.low_battery_threshold, 5);
    }
}
