//! # Snapshot Streaming Module
//!
//! This module defines what leaves the simulation each tick: a read-only
//! snapshot of the grid, the task pools and every robot. The same snapshot
//! feeds the local terminal renderer and the remote monitor.
//!
//! ## Wire Format
//!
//! Snapshots travel over TCP as newline-delimited JSON, one document per
//! tick:
//! - Human-readable for debugging with `nc localhost 8080`
//! - Self-delimiting, so a client only needs a buffered line reader
//! - Bounded by [`MAX_MESSAGE_SIZE`]: [`read_snapshot`] stops buffering a
//!   line once it reaches the limit

pub mod server;

use crate::error::{FleetError, FleetResult};
use crate::simulation::SimulationState;
use crate::types::{Coordinate, RobotState};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Network-serializable view of a single robot.
///
/// # Examples
///
/// ```rust
/// use robofleet::network::RobotData;
/// use robofleet::types::{Coordinate, RobotState};
///
/// let robot = RobotData {
///     id: 2,
///     position: Coordinate::new(4, 7),
///     battery: 63,
///     max_battery: 100,
///     target: Some(Coordinate::new(9, 7)),
///     remaining_steps: 5,
///     carrying: true,
///     stopped: false,
///     completed_journey: false,
///     deliveries: 1,
///     state: RobotState::EnRoute,
/// };
/// assert!(serde_json::to_string(&robot).is_ok());
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RobotData {
    /// Fleet-wide identifier, assigned from 1 in creation order
    pub id: usize,

    /// Current cell
    pub position: Coordinate,

    /// Remaining battery; zero or below means the robot is about to stop
    /// or already has
    pub battery: i32,

    /// Battery the robot started with
    pub max_battery: i32,

    /// Cell the robot is heading for, if any
    ///
    /// Stale targets (unreachable, or a point another robot consumed) are
    /// reported as-is; the monitor can spot them by a robot that never moves.
    pub target: Option<Coordinate>,

    /// Cells left on the planned path; zero with a target elsewhere means
    /// the target is unreachable
    pub remaining_steps: usize,

    /// True between a pickup and the matching delivery
    pub carrying: bool,

    /// Terminal flag; stopped robots are drawn differently
    pub stopped: bool,

    /// Set on the first completed pickup→delivery cycle
    pub completed_journey: bool,

    /// Number of deliveries completed by this robot
    pub deliveries: u32,

    pub state: RobotState,
}

impl RobotData {
    /// True when dispatching this robot again cannot change anything.
    ///
    /// That is a stopped robot, or one with nothing left to walk that is
    /// neither about to claim a pickup, nor standing on a pickup or delivery
    /// it still has to complete, nor about to stop on an empty battery. A
    /// robot parked on a charger, or holding a stale or unreachable target,
    /// counts as settled.
    pub fn is_settled(&self, pickups: &[Coordinate], deliveries: &[Coordinate]) -> bool {
        if self.stopped {
            return true;
        }
        if self.remaining_steps > 0 || self.battery <= 0 {
            return false;
        }
        match self.target {
            None => pickups.is_empty(),
            Some(target) if target == self.position => !pickups.contains(&target) && !deliveries.contains(&target),
            Some(_) => true,
        }
    }
}

/// Complete per-tick view for rendering.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FleetSnapshot {
    pub tick: u64,
    pub rows: usize,
    pub cols: usize,
    pub obstacles: Vec<Coordinate>,
    pub pickups: Vec<Coordinate>,
    pub deliveries: Vec<Coordinate>,
    pub charging_stations: Vec<Coordinate>,
    pub robots: Vec<RobotData>,
}

impl FleetSnapshot {
    /// Same test as [`SimulationState::is_settled`], from the monitor's side.
    pub fn is_settled(&self) -> bool {
        self.robots.iter().all(|r| r.is_settled(&self.pickups, &self.deliveries))
    }
}

/// Default TCP port for the simulation server.
///
/// Clients should connect to `localhost:8080` when running locally.
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum size of one encoded snapshot (1 megabyte).
///
/// A default 30×30 scenario encodes to a few kilobytes.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Fonction utilitaire : convertir Robot vers RobotData
pub fn create_robot_data(robot: &crate::robot::Robot) -> RobotData {
    RobotData {
        id: robot.id,
        position: robot.position,
        battery: robot.battery,
        max_battery: robot.max_battery,
        target: robot.target,
        remaining_steps: robot.path.len(),
        carrying: robot.carrying,
        stopped: robot.stopped,
        completed_journey: robot.completed_journey,
        deliveries: robot.deliveries,
        state: robot.state(),
    }
}

/// Fonction principale : créer le snapshot complet pour le rendu
pub fn create_snapshot(state: &SimulationState) -> FleetSnapshot {
    FleetSnapshot {
        tick: state.tick(),
        rows: state.grid.rows(),
        cols: state.grid.cols(),
        obstacles: state.grid.obstacles().iter().copied().collect(),
        pickups: state.pools.pickups.clone(),
        deliveries: state.pools.deliveries.clone(),
        charging_stations: state.pools.charging_stations.clone(),
        robots: state.robots.iter().map(create_robot_data).collect(),
    }
}

/// Encodes a snapshot as one JSON line, newline included.
pub fn encode_line(snapshot: &FleetSnapshot) -> FleetResult<String> {
    let mut line = serde_json::to_string(snapshot)?;
    if line.len() >= MAX_MESSAGE_SIZE {
        return Err(FleetError::MessageTooLarge(line.len()));
    }
    line.push('\n');
    Ok(line)
}

pub fn decode_line(line: &str) -> FleetResult<FleetSnapshot> {
    if line.len() > MAX_MESSAGE_SIZE {
        return Err(FleetError::MessageTooLarge(line.len()));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Reads and decodes the next snapshot line from `reader`.
///
/// Returns `Ok(None)` at end of stream. A line longer than
/// [`MAX_MESSAGE_SIZE`] fails with [`FleetError::MessageTooLarge`] without
/// buffering more than the limit; the stream is then out of sync and should
/// be dropped. `line` is reused between calls.
pub async fn read_snapshot<R>(reader: &mut R, line: &mut String) -> FleetResult<Option<FleetSnapshot>>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let read = reader.take(MAX_MESSAGE_SIZE as u64).read_line(line).await?;
    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') && read >= MAX_MESSAGE_SIZE {
        return Err(FleetError::MessageTooLarge(read));
    }
    decode_line(line).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::TaskPools;
    use crate::map::Grid;
    use crate::robot::Robot;

    fn c(row: usize, col: usize) -> Coordinate {
        Coordinate::new(row, col)
    }

    fn sample_state() -> SimulationState {
        let grid = Grid::new(4, 5, [c(1, 1), c(0, 3)]);
        let pools = TaskPools::new(vec![c(2, 2)], vec![c(3, 4)], vec![c(0, 0)]);
        SimulationState::new(grid, pools, vec![Robot::new(1, c(3, 0), 100)])
    }

    #[test]
    fn snapshot_mirrors_state() {
        let mut state = sample_state();
        state.step();
        let snapshot = state.snapshot();

        assert_eq!(snapshot.tick, 1);
        assert_eq!((snapshot.rows, snapshot.cols), (4, 5));
        assert_eq!(snapshot.obstacles, vec![c(0, 3), c(1, 1)]);
        assert_eq!(snapshot.pickups, vec![c(2, 2)]);
        assert_eq!(snapshot.robots.len(), 1);
        assert_eq!(snapshot.robots[0].battery, 99);
        assert_eq!(snapshot.robots[0].target, Some(c(2, 2)));
        assert_eq!(snapshot.robots[0].state, RobotState::EnRoute);
    }

    #[test]
    fn encoded_line_decodes_back() {
        let snapshot = sample_state().snapshot();
        let line = encode_line(&snapshot).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(decode_line(&line).unwrap(), snapshot);
    }

    #[test]
    fn snapshot_settles_with_the_state() {
        let mut state = sample_state();
        assert!(!state.snapshot().is_settled());
        for _ in 0..20 {
            state.step();
        }
        assert_eq!(state.snapshot().is_settled(), state.is_settled());
        assert!(state.is_settled());
    }

    #[test]
    fn garbage_line_is_rejected() {
        assert!(matches!(decode_line("not json\n"), Err(FleetError::Json(_))));
    }

    #[test]
    fn robot_parked_on_a_charger_is_settled() {
        let grid = Grid::open(5, 5);
        let pools = TaskPools::new(vec![], vec![c(4, 4)], vec![c(0, 2)]);
        let mut robot = Robot::new(1, c(0, 0), 10);
        robot.plan_to(&grid, c(4, 4));
        let mut state = SimulationState::new(grid, pools, vec![robot]);

        state.step();
        assert!(!state.is_settled(), "robot is still walking to the charger");
        for _ in 0..5 {
            state.step();
        }

        assert_eq!(state.robots[0].position, c(0, 2));
        assert!(state.is_settled());
        assert!(state.snapshot().is_settled());
    }

    #[test]
    fn robot_with_an_unreachable_target_is_settled() {
        let grid = Grid::new(3, 3, [c(1, 2), c(2, 1)]);
        let pools = TaskPools::new(vec![c(2, 2)], vec![], vec![]);
        let mut state = SimulationState::new(grid, pools, vec![Robot::new(1, c(0, 0), 100)]);

        state.step();

        assert_eq!(state.robots[0].target, Some(c(2, 2)));
        assert!(state.robots[0].path.is_empty());
        assert!(state.is_settled());
        assert!(state.snapshot().is_settled());
    }

    #[test]
    fn robot_standing_on_an_unclaimed_pickup_is_not_settled() {
        let mut data = create_robot_data(&Robot::new(1, c(1, 1), 100));
        data.target = Some(c(1, 1));
        assert!(!data.is_settled(&[c(1, 1)], &[]));
        assert!(data.is_settled(&[], &[]));

        data.battery = 0;
        assert!(!data.is_settled(&[], &[]), "empty battery stops it on the next tick");
    }

    #[tokio::test]
    async fn read_snapshot_reads_lines_until_end_of_stream() {
        let first = sample_state().snapshot();
        let stream = format!("{}{}", encode_line(&first).unwrap(), encode_line(&first).unwrap());
        let mut reader = stream.as_bytes();
        let mut line = String::new();

        assert_eq!(read_snapshot(&mut reader, &mut line).await.unwrap(), Some(first.clone()));
        assert_eq!(read_snapshot(&mut reader, &mut line).await.unwrap(), Some(first));
        assert_eq!(read_snapshot(&mut reader, &mut line).await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_snapshot_stops_buffering_at_the_size_limit() {
        let endless = "x".repeat(MAX_MESSAGE_SIZE * 2);
        let mut reader = endless.as_bytes();
        let mut line = String::new();

        let err = read_snapshot(&mut reader, &mut line).await.unwrap_err();

        assert!(matches!(err, FleetError::MessageTooLarge(MAX_MESSAGE_SIZE)));
        assert_eq!(line.len(), MAX_MESSAGE_SIZE);
    }

    #[test]
    fn oversized_line_is_rejected() {
        let huge = "x".repeat(MAX_MESSAGE_SIZE + 1);
        assert!(matches!(decode_line(&huge), Err(FleetError::MessageTooLarge(_))));
    }
}
