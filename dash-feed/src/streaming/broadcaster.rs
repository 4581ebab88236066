//! Telemetry broadcaster over TCP
//!
//! Two threads share one [`ClientRegistry`]:
//!
//! ```text
//! ┌──────────────┐  add    ┌────────────────┐  broadcast   ┌──────────────┐
//! │ feed-accept  │────────▶│ ClientRegistry │◀─────────────│  feed-tick   │
//! │ (poll 10ms)  │         │ Mutex<Vec<..>> │              │ (every 500ms)│
//! └──────────────┘         └────────────────┘              └──────────────┘
//!                                   ▲
//!                                   │ announce (error overlay, any thread)
//! ```
//!
//! Both loops poll a shared shutdown flag; dropping the broadcaster stops and
//! joins them. A client whose write fails is dropped on the spot.

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::streaming::messages::{ErrorState, Message};
use crate::streaming::registry::{
    BroadcastReport, ClientConnection, ClientRegistry, ClientStream,
};
use crate::streaming::wire::FrameWriter;
use crate::telemetry::TelemetrySource;
use log::{debug, error, info, trace, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest single sleep in the tick loop, bounds shutdown latency
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Accepts dashboard connections and fans telemetry out to them
pub struct Broadcaster {
    registry: ClientRegistry,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    tick_thread: Option<JoinHandle<()>>,
}

impl Broadcaster {
    /// Bind the listener and start accepting clients
    ///
    /// No telemetry is sent until [`Broadcaster::start_ticks`] is called.
    pub fn bind(network: &NetworkConfig) -> Result<Self> {
        let listener = TcpListener::bind(&network.bind_address).map_err(|source| Error::Bind {
            address: network.bind_address.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let registry = ClientRegistry::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_registry = registry.clone();
        let accept_shutdown = Arc::clone(&shutdown);
        let poll = network.accept_poll();
        let write_timeout = network.write_timeout();
        let accept_thread = thread::Builder::new()
            .name("feed-accept".to_string())
            .spawn(move || {
                accept_loop(
                    listener,
                    accept_registry,
                    accept_shutdown,
                    poll,
                    write_timeout,
                )
            })
            .map_err(|e| Error::Other(format!("Failed to spawn accept thread: {}", e)))?;

        info!("Telemetry feed listening on {}", local_addr);

        Ok(Self {
            registry,
            local_addr,
            shutdown,
            accept_thread: Some(accept_thread),
            tick_thread: None,
        })
    }

    /// Start the periodic telemetry loop
    pub fn start_ticks(
        &mut self,
        source: Box<dyn TelemetrySource>,
        period: Duration,
    ) -> Result<()> {
        if self.tick_thread.is_some() {
            return Err(Error::Other("Tick loop already running".to_string()));
        }

        let registry = self.registry.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let handle = thread::Builder::new()
            .name("feed-tick".to_string())
            .spawn(move || tick_loop(registry, source, period, shutdown))
            .map_err(|e| Error::Other(format!("Failed to spawn tick thread: {}", e)))?;

        info!("Broadcasting telemetry every {:?}", period);
        self.tick_thread = Some(handle);
        Ok(())
    }

    /// Address the listener is bound to (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Send one message to every connected client immediately
    pub fn publish<M: Message>(&self, message: &M) -> BroadcastReport {
        self.registry.broadcast(&message.to_bytes())
    }

    /// Push an error overlay state out-of-band from the telemetry tick
    pub fn announce(&self, state: &ErrorState) -> BroadcastReport {
        let report = self.publish(state);
        info!(
            "Sent showError={} message={:?} to {} client(s)",
            state.show_error,
            state.error_message.as_deref().unwrap_or(""),
            report.delivered
        );
        report
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Request both loops to exit
    pub fn stop(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            info!("Telemetry feed shutdown requested");
        }
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        self.stop();

        if let Some(thread) = self.tick_thread.take() {
            let _ = thread.join();
        }
        if let Some(thread) = self.accept_thread.take() {
            let _ = thread.join();
        }
        self.registry.clear();
    }
}

/// Accept connections until shutdown, registering each one
fn accept_loop(
    listener: TcpListener,
    registry: ClientRegistry,
    shutdown: Arc<AtomicBool>,
    poll: Duration,
    write_timeout: Duration,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("Failed to set blocking mode for client {}: {}", addr, e);
                    continue;
                }
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                }
                if let Err(e) = stream.set_write_timeout(Some(write_timeout)) {
                    warn!("Failed to set write timeout for {}: {}", addr, e);
                }
                registry.add(ClientConnection::new(stream, addr.to_string()));
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(poll);
            }
            Err(e) => {
                error!("Error accepting client connection: {}", e);
                thread::sleep(poll);
            }
        }
    }
    debug!("Accept loop exiting");
}

/// Generate, encode and send one snapshot
pub fn broadcast_tick<W: ClientStream>(
    registry: &ClientRegistry<W>,
    source: &mut dyn TelemetrySource,
    writer: &mut FrameWriter,
) -> BroadcastReport {
    let snapshot = source.next_snapshot();
    writer.clear();
    snapshot.encode(writer);
    let report = registry.broadcast(writer.as_bytes());
    trace!(
        "Tick: speed={} battery={}% motor={} -> {} client(s)",
        snapshot.speed, snapshot.battery_level, snapshot.motor_power, report.delivered
    );
    report
}

fn tick_loop(
    registry: ClientRegistry,
    mut source: Box<dyn TelemetrySource>,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) {
    let mut writer = FrameWriter::with_capacity(512);
    let mut ticks = 0u64;
    let mut next_tick = Instant::now();

    while !shutdown.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now < next_tick {
            thread::sleep((next_tick - now).min(SHUTDOWN_POLL));
            continue;
        }

        broadcast_tick(&registry, source.as_mut(), &mut writer);
        ticks += 1;
        if ticks % 120 == 0 {
            debug!("{} ticks sent, {} client(s) connected", ticks, registry.len());
        }

        next_tick += period;
        // Fell behind by more than a period: resync instead of bursting
        if next_tick < Instant::now() {
            next_tick = Instant::now() + period;
        }
    }

    info!("Tick loop exiting ({} ticks)", ticks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::messages::TelemetrySnapshot;
    use crate::streaming::registry::tests::MockClient;
    use crate::streaming::wire::decode_fields;

    struct FixedSource(TelemetrySnapshot);

    impl TelemetrySource for FixedSource {
        fn next_snapshot(&mut self) -> TelemetrySnapshot {
            self.0.clone()
        }
    }

    fn fixed() -> FixedSource {
        FixedSource(TelemetrySnapshot {
            speed: 12,
            speed_limit: 30,
            battery_level: 90,
            battery_voltage: 50,
            battery_range: 270,
            motor_active: true,
            motor_power: 40,
            temperature: None,
            total_distance: None,
        })
    }

    #[test]
    fn test_tick_with_no_clients() {
        let registry: ClientRegistry<MockClient> = ClientRegistry::new();
        let mut writer = FrameWriter::new();
        let report = broadcast_tick(&registry, &mut fixed(), &mut writer);
        assert_eq!(report, BroadcastReport::default());
    }

    #[test]
    fn test_tick_delivers_one_frame_per_client() {
        let registry = ClientRegistry::new();
        let client = MockClient::default();
        registry.add(ClientConnection::new(client.clone(), "dash"));

        let mut source = fixed();
        let mut writer = FrameWriter::new();
        broadcast_tick(&registry, &mut source, &mut writer);

        let fields = decode_fields(&client.received()).unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0].0, "speed");
        assert_eq!(fields[6].0, "motorPower");
    }

    #[test]
    fn test_disconnect_pruned_within_one_tick() {
        let registry = ClientRegistry::new();
        let stays = MockClient::default();
        let leaves = MockClient::default();
        registry.add(ClientConnection::new(leaves.clone(), "leaves"));
        registry.add(ClientConnection::new(stays.clone(), "stays"));

        let mut source = fixed();
        let mut writer = FrameWriter::new();
        broadcast_tick(&registry, &mut source, &mut writer);
        leaves.disconnect();
        let report = broadcast_tick(&registry, &mut source, &mut writer);

        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(registry.peers(), vec!["stays"]);
        assert_eq!(decode_fields(&stays.received()).unwrap().len(), 14);
    }

    #[test]
    fn test_bind_failure_reports_address() {
        let first = Broadcaster::bind(&NetworkConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..Default::default()
        })
        .unwrap();

        let taken = first.local_addr().to_string();
        let err = Broadcaster::bind(&NetworkConfig {
            bind_address: taken.clone(),
            ..Default::default()
        })
        .err()
        .unwrap();
        match err {
            Error::Bind { address, .. } => assert_eq!(address, taken),
            other => panic!("unexpected error: {}", other),
        }
    }
}
