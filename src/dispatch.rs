//! # Task Dispatch Module
//!
//! Outstanding work lives in three pools: pickups waiting to be collected,
//! deliveries waiting to be dropped off, and charging stations. Each tick the
//! simulation hands every robot, in fleet order, to [`dispatch`], which moves
//! it one step and decides what it should target next.
//!
//! Fleet order matters: pools shrink as robots complete tasks, so a robot
//! earlier in the list gets first claim on a point that two robots reach in
//! the same tick.

use crate::map::Grid;
use crate::robot::Robot;
use crate::types::Coordinate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// NOTE - The three kinds of task points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Pickup,
    Delivery,
    Charging,
}

/// Something a robot did during its dispatch pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FleetEvent {
    PickupAssigned { robot: usize, at: Coordinate },
    PickedUp { robot: usize, at: Coordinate },
    DeliveryAssigned { robot: usize, at: Coordinate },
    Delivered { robot: usize, at: Coordinate },
    ChargingDiverted { robot: usize, at: Coordinate },
    Depleted { robot: usize, at: Coordinate },
}

/// Pending pickups and deliveries plus the reusable charging stations.
///
/// Duplicates are allowed; order only decides ties between equally near
/// points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskPools {
    pub pickups: Vec<Coordinate>,
    pub deliveries: Vec<Coordinate>,
    pub charging_stations: Vec<Coordinate>,
}

impl TaskPools {
    pub fn new(pickups: Vec<Coordinate>, deliveries: Vec<Coordinate>, charging_stations: Vec<Coordinate>) -> Self {
        Self {
            pickups,
            deliveries,
            charging_stations,
        }
    }

    pub fn pool(&self, kind: TaskKind) -> &[Coordinate] {
        match kind {
            TaskKind::Pickup => &self.pickups,
            TaskKind::Delivery => &self.deliveries,
            TaskKind::Charging => &self.charging_stations,
        }
    }

    fn pool_mut(&mut self, kind: TaskKind) -> &mut Vec<Coordinate> {
        match kind {
            TaskKind::Pickup => &mut self.pickups,
            TaskKind::Delivery => &mut self.deliveries,
            TaskKind::Charging => &mut self.charging_stations,
        }
    }

    pub fn contains(&self, kind: TaskKind, coord: Coordinate) -> bool {
        self.pool(kind).contains(&coord)
    }

    /// Closest point of `kind` to `from`; the first one wins on ties.
    pub fn nearest(&self, kind: TaskKind, from: Coordinate) -> Option<Coordinate> {
        let mut nearest = None;
        let mut min_distance = f64::INFINITY;

        for &point in self.pool(kind) {
            let distance = from.distance(point);
            if distance < min_distance {
                min_distance = distance;
                nearest = Some(point);
            }
        }

        nearest
    }

    /// Removes one occurrence of `coord`. Charging stations are never consumed.
    pub fn remove_first(&mut self, kind: TaskKind, coord: Coordinate) -> bool {
        if kind == TaskKind::Charging {
            return false;
        }

        let pool = self.pool_mut(kind);
        match pool.iter().position(|&p| p == coord) {
            Some(index) => {
                pool.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_drained(&self) -> bool {
        self.pickups.is_empty() && self.deliveries.is_empty()
    }
}

/// Runs one tick of decisions for a single robot.
///
/// Order of checks: idle robots claim the nearest pickup, robots with a
/// target advance and complete their task on arrival, then a low battery
/// overrides the target with the nearest charger. A robot whose battery has
/// run out is stopped only when no charger override applied.
pub fn dispatch(robot: &mut Robot, grid: &Grid, pools: &mut TaskPools, low_battery: i32) -> Vec<FleetEvent> {
    let mut events = Vec::new();

    if robot.stopped {
        return events;
    }

    if robot.target.is_none() {
        if let Some(pickup) = pools.nearest(TaskKind::Pickup, robot.position) {
            robot.plan_to(grid, pickup);
            debug!(robot = robot.id, target = %pickup, path_len = robot.path.len(), "pickup assigned");
            events.push(FleetEvent::PickupAssigned { robot: robot.id, at: pickup });
        }
    }

    if let Some(target) = robot.target {
        robot.move_step();

        if robot.position == target {
            complete_task(robot, grid, pools, target, &mut events);
        }
    }

    if robot.is_low_battery(low_battery) && !robot.stopped {
        if let Some(charger) = pools.nearest(TaskKind::Charging, robot.position) {
            if robot.target != Some(charger) {
                debug!(robot = robot.id, battery = robot.battery, charger = %charger, "diverted to charging station");
                events.push(FleetEvent::ChargingDiverted { robot: robot.id, at: charger });
            }
            robot.plan_to(grid, charger);
            return events;
        }
    }

    if robot.battery <= 0 {
        robot.stopped = true;
    }

    if robot.stopped {
        warn!(robot = robot.id, position = %robot.position, "battery depleted, robot stopped");
        events.push(FleetEvent::Depleted { robot: robot.id, at: robot.position });
    }

    events
}

fn complete_task(robot: &mut Robot, grid: &Grid, pools: &mut TaskPools, target: Coordinate, events: &mut Vec<FleetEvent>) {
    if pools.contains(TaskKind::Pickup, target) {
        robot.carrying = true;
        pools.remove_first(TaskKind::Pickup, target);
        debug!(robot = robot.id, at = %target, "picked up");
        events.push(FleetEvent::PickedUp { robot: robot.id, at: target });

        robot.target = None;
        robot.path.clear();
        if let Some(delivery) = pools.nearest(TaskKind::Delivery, robot.position) {
            robot.plan_to(grid, delivery);
            events.push(FleetEvent::DeliveryAssigned { robot: robot.id, at: delivery });
        }
    } else if pools.contains(TaskKind::Delivery, target) {
        robot.carrying = false;
        pools.remove_first(TaskKind::Delivery, target);
        robot.target = None;
        robot.completed_journey = true;
        robot.deliveries += 1;
        debug!(robot = robot.id, at = %target, deliveries = robot.deliveries, "delivered");
        events.push(FleetEvent::Delivered { robot: robot.id, at: target });
    }
}
