use std::io::{stdout, Write, Result};
use crossterm::{
    ExecutableCommand, QueueableCommand,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
    cursor::{Hide, MoveTo, Show},
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use crate::network::FleetSnapshot;
use crate::types::Coordinate;

/// NOTE - What occupies a cell, in drawing priority order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Robot { id: usize, stopped: bool },
    Obstacle,
    Charging,
    Delivery,
    Pickup,
    Empty,
}

impl Cell {
    pub fn glyph(&self) -> &'static str {
        match self {
            Cell::Robot { stopped: true, .. } => "xx",
            Cell::Robot { .. } => "@@",
            Cell::Obstacle => "██",
            Cell::Charging => "++",
            Cell::Delivery => "[]",
            Cell::Pickup => "<>",
            Cell::Empty => "· ",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Cell::Robot { stopped: true, .. } => Color::Red,
            Cell::Robot { .. } => Color::Blue,
            Cell::Obstacle => Color::DarkGrey,
            Cell::Charging => Color::Red,
            Cell::Delivery => Color::Green,
            Cell::Pickup => Color::Rgb { r: 255, g: 165, b: 0 },
            Cell::Empty => Color::White,
        }
    }
}

/// Robots are drawn over everything else; the first robot on a shared cell wins.
pub fn cell_at(snapshot: &FleetSnapshot, coord: Coordinate) -> Cell {
    if let Some(robot) = snapshot.robots.iter().find(|r| r.position == coord) {
        Cell::Robot { id: robot.id, stopped: robot.stopped }
    } else if snapshot.obstacles.contains(&coord) {
        Cell::Obstacle
    } else if snapshot.charging_stations.contains(&coord) {
        Cell::Charging
    } else if snapshot.deliveries.contains(&coord) {
        Cell::Delivery
    } else if snapshot.pickups.contains(&coord) {
        Cell::Pickup
    } else {
        Cell::Empty
    }
}

/// One status line per robot, as shown under the grid.
pub fn robot_status_lines(snapshot: &FleetSnapshot) -> Vec<String> {
    snapshot
        .robots
        .iter()
        .map(|robot| {
            let target = match robot.target {
                Some(t) => t.to_string(),
                None => "-".to_string(),
            };
            format!(
                "Robot {}: {} | Battery: {:>3} | {:?} | Target: {} | Carrying: {} | Deliveries: {}",
                robot.id,
                robot.position,
                robot.battery,
                robot.state,
                target,
                if robot.carrying { "yes" } else { "no" },
                robot.deliveries
            )
        })
        .collect()
}

/// Runs `restore` when dropped, so the terminal comes back even if the
/// render loop returns early or panics.
pub struct TerminalGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> TerminalGuard<F> {
    pub fn new(restore: F) -> Self {
        Self { restore }
    }
}

impl<F: FnMut()> Drop for TerminalGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

/// NOTE - Raw mode plus hidden cursor, undone when the guard drops
pub fn enter_raw_mode() -> Result<TerminalGuard<impl FnMut()>> {
    enable_raw_mode()?;
    let guard = TerminalGuard::new(|| {
        let _ = stdout().execute(Show);
        let _ = disable_raw_mode();
    });
    stdout().execute(Hide)?;
    Ok(guard)
}

pub struct Display;

impl Display {
    pub fn render(snapshot: &FleetSnapshot) -> Result<()> {
        let mut stdout = stdout();

        stdout.queue(Clear(ClearType::All))?;

        for row in 0..snapshot.rows {
            stdout.queue(MoveTo(0, row as u16))?;
            for col in 0..snapshot.cols {
                let cell = cell_at(snapshot, Coordinate::new(row, col));
                stdout.queue(SetForegroundColor(cell.color()))?;
                stdout.queue(Print(cell.glyph()))?;
            }
        }

        let footer = snapshot.rows as u16 + 1;
        stdout.queue(ResetColor)?;
        stdout.queue(MoveTo(0, footer))?;
        stdout.queue(Print(format!(
            "Tick {} | Pickups: {} | Deliveries: {} | Chargers: {}",
            snapshot.tick,
            snapshot.pickups.len(),
            snapshot.deliveries.len(),
            snapshot.charging_stations.len()
        )))?;

        for (i, line) in robot_status_lines(snapshot).into_iter().enumerate() {
            let stopped = snapshot.robots[i].stopped;
            stdout.queue(MoveTo(0, footer + 1 + i as u16))?;
            stdout.queue(SetForegroundColor(if stopped { Color::Red } else { Color::Blue }))?;
            stdout.queue(Print(line))?;
        }

        let legend_y = footer + 2 + snapshot.robots.len() as u16;
        stdout.queue(ResetColor)?;
        stdout.queue(MoveTo(0, legend_y))?;
        stdout.queue(Print("@@ robot | xx stopped | <> pickup | [] delivery | ++ charger | ██ obstacle | Enter/q: quit"))?;

        stdout.flush()?;
        Ok(())
    }
}
