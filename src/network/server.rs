//! TCP fan-out of snapshots to every connected monitor.
//!
//! Each monitor gets its own writer task fed by a bounded queue. The
//! broadcaster never waits on a socket: a monitor whose queue is full or
//! whose writer gave up is dropped, and the others keep receiving.

use super::{encode_line, FleetSnapshot};
use crate::error::FleetResult;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Snapshots buffered per monitor before it counts as lagging.
pub const CLIENT_QUEUE_CAPACITY: usize = 32;

/// Longest a single snapshot write may block before the monitor is dropped.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

struct Client {
    addr: SocketAddr,
    queue: mpsc::Sender<Arc<str>>,
}

pub struct SnapshotServer {
    listener: TcpListener,
    clients: Arc<Mutex<Vec<Client>>>,
}

impl SnapshotServer {
    pub async fn bind(addr: impl tokio::net::ToSocketAddrs) -> FleetResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            clients: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn local_addr(&self) -> FleetResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts monitors in the background and forwards every snapshot from
    /// `snapshots` to all of them. Returns once the sending side is dropped.
    pub async fn serve(self, mut snapshots: mpsc::Receiver<FleetSnapshot>) -> FleetResult<()> {
        let SnapshotServer { listener, clients } = self;

        let accepted = clients.clone();
        let acceptor = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let (queue, pending) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
                        tokio::spawn(write_snapshots(stream, addr, pending));
                        let mut registered = accepted.lock().await;
                        registered.push(Client { addr, queue });
                        info!(%addr, clients = registered.len(), "monitor connected");
                    }
                    Err(e) => warn!(error = %e, "failed to accept monitor connection"),
                }
            }
        });

        while let Some(snapshot) = snapshots.recv().await {
            let line = match encode_line(&snapshot) {
                Ok(line) => line,
                Err(e) => {
                    warn!(tick = snapshot.tick, error = %e, "snapshot not sent");
                    continue;
                }
            };
            broadcast(&clients, Arc::from(line)).await;
        }

        acceptor.abort();
        info!("snapshot stream closed");
        Ok(())
    }
}

/// Queues `line` for every monitor without waiting on any of them.
async fn broadcast(clients: &Mutex<Vec<Client>>, line: Arc<str>) {
    let mut registered = clients.lock().await;

    registered.retain(|client| match client.queue.try_send(line.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(addr = %client.addr, "monitor lagging, dropped");
            false
        }
        Err(TrySendError::Closed(_)) => {
            info!(addr = %client.addr, "monitor disconnected");
            false
        }
    });
}

/// Drains one monitor's queue into its socket. Exits on a failed or timed
/// out write, or once the broadcaster drops the queue; the socket closes
/// with it.
async fn write_snapshots(mut stream: TcpStream, addr: SocketAddr, mut pending: mpsc::Receiver<Arc<str>>) {
    while let Some(line) = pending.recv().await {
        match tokio::time::timeout(WRITE_TIMEOUT, stream.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(%addr, error = %e, "monitor write failed");
                break;
            }
            Err(_) => {
                warn!(%addr, "monitor write timed out");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::decode_line;
    use crate::types::Coordinate;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn snapshot(tick: u64) -> FleetSnapshot {
        FleetSnapshot {
            tick,
            rows: 2,
            cols: 2,
            obstacles: vec![],
            pickups: vec![],
            deliveries: vec![],
            charging_stations: vec![],
            robots: vec![],
        }
    }

    /// Roughly 100 KB on the wire, enough to fill socket buffers quickly.
    fn bulky_snapshot(tick: u64) -> FleetSnapshot {
        FleetSnapshot {
            obstacles: (0..5000).map(|i| Coordinate::from((i / 100, i % 100))).collect(),
            ..snapshot(tick)
        }
    }

    #[tokio::test]
    async fn connected_monitor_receives_snapshots() {
        let server = SnapshotServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(16);
        let serving = tokio::spawn(server.serve(rx));

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);

        // Keep publishing until the acceptor has registered the monitor.
        let publisher = tokio::spawn(async move {
            for tick in 0.. {
                if tx.send(snapshot(tick)).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut line))
            .await
            .expect("no snapshot within 5s")
            .unwrap();

        let received = decode_line(&line).unwrap();
        assert_eq!(received.rows, 2);

        publisher.abort();
        let _ = tokio::time::timeout(Duration::from_secs(5), serving).await;
    }

    #[tokio::test]
    async fn stalled_monitor_does_not_block_the_others() {
        const LAST_TICK: u64 = 199;

        let server = SnapshotServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(16);
        let serving = tokio::spawn(server.serve(rx));

        // Never read from this one.
        let _stalled = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(TcpStream::connect(addr).await.unwrap());

        // Give the acceptor time to register both monitors.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let publisher = tokio::spawn(async move {
            for tick in 0..=LAST_TICK {
                tx.send(bulky_snapshot(tick)).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let reading = async {
            let mut line = String::new();
            let mut received = 0;
            loop {
                line.clear();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    panic!("reading monitor was disconnected after {received} snapshots");
                }
                received += 1;
                if decode_line(&line).unwrap().tick == LAST_TICK {
                    return received;
                }
            }
        };
        let received = tokio::time::timeout(Duration::from_secs(20), reading)
            .await
            .expect("reading monitor stopped receiving snapshots");

        assert_eq!(received, LAST_TICK + 1);
        publisher.await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("server did not stop after the publisher finished")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn serve_returns_when_sender_dropped() {
        let server = SnapshotServer::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        server.serve(rx).await.unwrap();
    }
}
