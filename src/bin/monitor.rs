// src/bin/monitor.rs

// Remote monitor: connects to the simulation server and renders every
// snapshot it receives with the same terminal display as local mode.

use robofleet::display::{enter_raw_mode, Display};
use robofleet::network::{read_snapshot, DEFAULT_PORT};
use robofleet::{FleetError, FleetSnapshot};

use std::collections::VecDeque;
use std::io::{stdout, Write};
use std::time::Duration;
use crossterm::{
    ExecutableCommand,
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind},
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::net::TcpStream;
use tokio::io::BufReader;

/// Rolling log of fleet events noticed between two snapshots
struct DisplayState {
    log_messages: VecDeque<String>,
    max_log_lines: usize,
    previous: Option<FleetSnapshot>,
}

impl DisplayState {
    fn new() -> Self {
        Self {
            log_messages: VecDeque::new(),
            max_log_lines: 6,
            previous: None,
        }
    }

    fn add_log(&mut self, message: String) {
        self.log_messages.push_back(message);
        if self.log_messages.len() > self.max_log_lines {
            self.log_messages.pop_front();
        }
    }

    /// Compares `state` with the last snapshot and logs what changed.
    fn observe(&mut self, state: &FleetSnapshot) {
        if let Some(previous) = self.previous.take() {
            for robot in &state.robots {
                let Some(before) = previous.robots.iter().find(|r| r.id == robot.id) else { continue };
                if robot.stopped && !before.stopped {
                    self.add_log(format!("Tick {}: robot {} ran out of battery at {}", state.tick, robot.id, robot.position));
                }
                if robot.carrying && !before.carrying {
                    self.add_log(format!("Tick {}: robot {} picked up at {}", state.tick, robot.id, robot.position));
                }
                if robot.deliveries > before.deliveries {
                    self.add_log(format!("Tick {}: robot {} delivered at {}", state.tick, robot.id, robot.position));
                }
            }
            if state.is_settled() && !previous.is_settled() {
                self.add_log(format!("Tick {}: fleet settled", state.tick));
            }
        }
        self.previous = Some(state.clone());
    }

    fn render_log(&self, state: &FleetSnapshot) -> std::io::Result<()> {
        let mut stdout = stdout();
        let top = state.rows as u16 + state.robots.len() as u16 + 4;
        stdout.execute(SetForegroundColor(Color::Cyan))?;
        for (i, message) in self.log_messages.iter().enumerate() {
            stdout.execute(MoveTo(0, top + i as u16))?;
            stdout.execute(Print(message))?;
        }
        stdout.execute(ResetColor)?;
        stdout.flush()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = match std::env::args().nth(1) {
        Some(port) => port.parse::<u16>()?,
        None => DEFAULT_PORT,
    };

    // NOTE - Connect before touching the terminal so errors stay readable
    let stream = match TcpStream::connect(("127.0.0.1", port)).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("❌ Cannot reach the simulation server on port {}: {}", port, e);
            eprintln!("🚀 Start it with: cargo run --bin simulation");
            return Err(e.into());
        }
    };

    // NOTE - Normal terminal behavior comes back when `_terminal` drops,
    // on errors and panics too
    let _terminal = enter_raw_mode()?;
    stdout().execute(Clear(ClearType::All))?;

    follow(stream).await
}

async fn follow(stream: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let mut display_state = DisplayState::new();

    loop {
        let state = match read_snapshot(&mut reader, &mut line).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                println!("\r\n📡 End of transmission");
                break;
            }
            Err(FleetError::Json(_)) => {
                display_state.add_log("⚠️ Corrupted snapshot skipped".to_string());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        display_state.observe(&state);
        Display::render(&state)?;
        display_state.render_log(&state)?;

        if event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Enter | KeyCode::Char('q') | KeyCode::Esc)
                {
                    break;
                }
            }
        }
    }

    Ok(())
}
