// Mode local : simulation et affichage terminal dans le même processus

use robofleet::display::{enter_raw_mode, Display};
use robofleet::logging::init_logging;
use robofleet::{SimConfig, SimulationState};

use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("robofleet=warn");

    let config = SimConfig::from_args(std::env::args())?;
    let mut sim = SimulationState::from_config(&config)?;
    let frame = Duration::from_millis(config.tick_ms);

    // NOTE - Raw terminal mode for the UI, restored when `terminal` drops
    let terminal = enter_raw_mode()?;

    let mut failure = None;
    let stats = sim.run(config.max_ticks, |snapshot| {
        if let Err(e) = Display::render(snapshot) {
            failure = Some(e);
            return true;
        }
        // NOTE - Wait one frame for Enter / q / Esc
        match quit_requested(frame) {
            Ok(quit) => quit,
            Err(e) => {
                failure = Some(e);
                true
            }
        }
    });

    drop(terminal);

    if let Some(e) = failure {
        return Err(e.into());
    }

    info!(?stats, "simulation finished");
    println!(
        "\nTicks: {} | Pickups: {} | Deliveries: {} | Stopped robots: {}",
        stats.ticks, stats.pickups_completed, stats.deliveries_completed, stats.stopped_robots
    );
    Ok(())
}

fn quit_requested(frame: Duration) -> std::io::Result<bool> {
    if !event::poll(frame)? {
        return Ok(false);
    }
    Ok(matches!(
        event::read()?,
        Event::Key(key) if key.kind == KeyEventKind::Press
            && matches!(key.code, KeyCode::Enter | KeyCode::Char('q') | KeyCode::Esc)
    ))
}
