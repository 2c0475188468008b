//! Simulation configuration.
//!
//! Every field has a default, so an empty JSON object `{}` is a valid
//! configuration. Explicit coordinate lists take precedence over the random
//! counts of the same kind.

use crate::error::{FleetError, FleetResult};
use crate::network::DEFAULT_PORT;
use crate::types::{Coordinate, DEFAULT_BATTERY, DEFAULT_CELL_SIZE, DEFAULT_COLS, DEFAULT_ROWS, LOW_BATTERY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Largest grid accepted, in cells.
pub const MAX_GRID_CELLS: usize = 1_000_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub rows: usize,
    pub cols: usize,
    /// Pixels per cell for a graphical front-end; the terminal ignores it.
    pub cell_size: u32,
    pub robot_count: usize,
    pub battery: i32,
    pub low_battery_threshold: i32,
    pub pickup_count: usize,
    pub delivery_count: usize,
    pub charging_count: usize,
    pub obstacle_count: usize,
    pub pickups: Option<Vec<Coordinate>>,
    pub deliveries: Option<Vec<Coordinate>>,
    pub charging_stations: Option<Vec<Coordinate>>,
    pub obstacles: Option<Vec<Coordinate>>,
    /// Starting positions; overrides `robot_count` when present.
    pub robots: Option<Vec<Coordinate>>,
    pub seed: Option<u64>,
    pub tick_ms: u64,
    pub max_ticks: Option<u64>,
    pub port: u16,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            cell_size: DEFAULT_CELL_SIZE,
            robot_count: 3,
            battery: DEFAULT_BATTERY,
            low_battery_threshold: LOW_BATTERY_THRESHOLD,
            pickup_count: 5,
            delivery_count: 5,
            charging_count: 3,
            obstacle_count: 10,
            pickups: None,
            deliveries: None,
            charging_stations: None,
            obstacles: None,
            robots: None,
            seed: None,
            tick_ms: 100,
            max_ticks: None,
            port: DEFAULT_PORT,
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> FleetResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> FleetResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reads the file named by the first command-line argument, or falls
    /// back to the defaults when none is given.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> FleetResult<Self> {
        match args.nth(1) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> FleetResult<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(FleetError::InvalidConfig(format!(
                "grid must have at least one cell, got {}x{}",
                self.rows, self.cols
            )));
        }

        let explicit = [
            ("pickups", &self.pickups),
            ("deliveries", &self.deliveries),
            ("charging_stations", &self.charging_stations),
            ("obstacles", &self.obstacles),
            ("robots", &self.robots),
        ];
        for (name, coords) in explicit {
            let Some(coords) = coords else { continue };
            if let Some(outside) = coords.iter().find(|c| c.row >= self.rows || c.col >= self.cols) {
                return Err(FleetError::InvalidConfig(format!(
                    "{name} entry {outside} lies outside the {}x{} grid",
                    self.rows, self.cols
                )));
            }
        }

        let cells = self
            .rows
            .checked_mul(self.cols)
            .filter(|&cells| cells <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                FleetError::InvalidConfig(format!(
                    "{}x{} grid exceeds the {MAX_GRID_CELLS} cell limit",
                    self.rows, self.cols
                ))
            })?;

        let free = match &self.obstacles {
            Some(obstacles) => cells - obstacles.iter().collect::<BTreeSet<_>>().len(),
            None if self.obstacle_count >= cells => {
                return Err(FleetError::InvalidConfig(format!(
                    "{} obstacles leave no free cell on a {}x{} grid",
                    self.obstacle_count, self.rows, self.cols
                )));
            }
            None => cells - self.obstacle_count,
        };

        let random = [
            ("pickup_count", self.pickups.is_none() && self.pickup_count > 0),
            ("delivery_count", self.deliveries.is_none() && self.delivery_count > 0),
            ("charging_count", self.charging_stations.is_none() && self.charging_count > 0),
            ("robot_count", self.robots.is_none() && self.robot_count > 0),
        ];
        if free == 0 {
            if let Some((name, _)) = random.iter().find(|(_, wanted)| *wanted) {
                return Err(FleetError::InvalidConfig(format!(
                    "{name} needs a free cell but obstacles cover the whole {}x{} grid",
                    self.rows, self.cols
                )));
            }
        }

        if self.tick_ms == 0 {
            return Err(FleetError::InvalidConfig("tick_ms must be positive".to_string()));
        }

        Ok(())
    }
}
