// Serveur de simulation de la flotte
// Exécute la boucle de ticks et diffuse les snapshots via TCP aux moniteurs connectés

use robofleet::logging::init_logging;
use robofleet::network::server::SnapshotServer;
use robofleet::{FleetSnapshot, SimConfig, SimulationState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{thread, time::Duration};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("robofleet=info");

    // === PHASE 1: CONFIGURATION ET SCÉNARIO ===

    let config = SimConfig::from_args(std::env::args())?;
    let mut sim = SimulationState::from_config(&config)?;
    info!(robots = sim.robots.len(), tick_ms = config.tick_ms, "fleet ready");

    // === PHASE 2: CANAL VERS LE DIFFUSEUR ===

    let (snapshot_tx, snapshot_rx) = mpsc::channel::<FleetSnapshot>(100);
    let stop = Arc::new(AtomicBool::new(false));

    // === PHASE 3: THREAD DE SIMULATION ===

    let stop_for_sim = stop.clone();
    let tick = Duration::from_millis(config.tick_ms);
    let max_ticks = config.max_ticks;
    let simulation_thread = thread::spawn(move || {
        info!("simulation engine running");
        let mut settled_logged = false;

        let stats = sim.run(max_ticks, |snapshot| {
            if stop_for_sim.load(Ordering::Relaxed) {
                return true;
            }

            // Log de progression toutes les 10 itérations
            if snapshot.tick % 10 == 0 {
                let stopped = snapshot.robots.iter().filter(|r| r.stopped).count();
                info!(
                    tick = snapshot.tick,
                    pickups = snapshot.pickups.len(),
                    deliveries = snapshot.deliveries.len(),
                    stopped,
                    "simulation cycle"
                );
            }

            if !settled_logged && snapshot.is_settled() {
                info!(tick = snapshot.tick, "fleet settled, no task left to claim");
                settled_logged = true;
            }

            // Ne jamais bloquer le moteur : un diffuseur en retard perd un snapshot
            match snapshot_tx.try_send(snapshot.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!(tick = snapshot.tick, "broadcaster busy, snapshot skipped"),
                Err(TrySendError::Closed(_)) => {
                    warn!("snapshot channel closed");
                    return true;
                }
            }

            thread::sleep(tick);
            false
        });

        info!(?stats, "simulation engine stopped");
        stats
    });

    // === PHASE 4: SERVEUR RÉSEAU ===

    let server = match SnapshotServer::bind(("127.0.0.1", config.port)).await {
        Ok(server) => server,
        Err(e) => {
            error!(port = config.port, error = %e, "cannot bind snapshot port");
            stop.store(true, Ordering::Relaxed);
            return Err(e.into());
        }
    };
    info!(addr = %server.local_addr()?, "waiting for monitors (cargo run --bin monitor)");

    // === PHASE 5: ARRÊT SUR CTRL-C ===

    let stop_on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping");
            stop_on_signal.store(true, Ordering::Relaxed);
        }
    });

    server.serve(snapshot_rx).await?;

    match simulation_thread.join() {
        Ok(stats) => info!(
            ticks = stats.ticks,
            pickups = stats.pickups_completed,
            deliveries = stats.deliveries_completed,
            "run complete"
        ),
        Err(_) => error!("simulation thread panicked"),
    }
    Ok(())
}
