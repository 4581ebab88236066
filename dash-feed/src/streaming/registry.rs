//! Registry of connected dashboard clients
//!
//! Shared between the accept thread (appends) and the broadcast paths
//! (iterate and prune). The lock is held across the whole fan-out so the
//! collection is never mutated mid-iteration.
//!
//! A write to a socket whose peer has already closed usually succeeds once
//! because the kernel buffers it, so every client is checked with
//! [`ClientStream::peer_closed`] before it is written to.

use log::{debug, info};
use parking_lot::Mutex;
use std::io::{self, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::Arc;

/// Writable client connection that can report a closed peer
pub trait ClientStream: Write {
    /// True once the peer has closed or reset the connection
    fn peer_closed(&mut self) -> bool;
}

impl ClientStream for TcpStream {
    fn peer_closed(&mut self) -> bool {
        if let Err(e) = self.set_nonblocking(true) {
            debug!("Failed to set non-blocking mode for liveness check: {}", e);
            return false;
        }
        let mut byte = [0u8; 1];
        let closed = match self.peek(&mut byte) {
            Ok(0) => true,
            // Unread inbound bytes; the dashboard never sends any, but it is alive
            Ok(_) => false,
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => false,
            Err(_) => true,
        };
        if let Err(e) = self.set_nonblocking(false) {
            debug!("Failed to restore blocking mode: {}", e);
            return true;
        }
        closed
    }
}

fn send(stream: &mut impl Write, message: &[u8]) -> io::Result<()> {
    stream.write_all(message)?;
    stream.flush()
}

/// One accepted connection
pub struct ClientConnection<W = TcpStream> {
    stream: W,
    peer: String,
}

impl<W: ClientStream> ClientConnection<W> {
    pub fn new(stream: W, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

/// Outcome of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients that accepted the whole message
    pub delivered: usize,
    /// Clients removed because the write failed
    pub dropped: usize,
}

/// Mutex-guarded set of connected clients
///
/// Cloning shares the same underlying set.
pub struct ClientRegistry<W = TcpStream> {
    clients: Arc<Mutex<Vec<ClientConnection<W>>>>,
}

impl<W> Clone for ClientRegistry<W> {
    fn clone(&self) -> Self {
        Self {
            clients: Arc::clone(&self.clients),
        }
    }
}

impl<W: ClientStream> Default for ClientRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: ClientStream> ClientRegistry<W> {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add(&self, connection: ClientConnection<W>) {
        let mut clients = self.clients.lock();
        info!(
            "Client connected: {} ({} total)",
            connection.peer,
            clients.len() + 1
        );
        clients.push(connection);
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    pub fn peers(&self) -> Vec<String> {
        self.clients.lock().iter().map(|c| c.peer.clone()).collect()
    }

    /// Write one complete message to every client, removing those whose peer
    /// has closed or whose write fails
    ///
    /// A failure on one client never affects delivery to the others.
    pub fn broadcast(&self, message: &[u8]) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut clients = self.clients.lock();

        clients.retain_mut(|client| {
            if client.stream.peer_closed() {
                info!("Client {} disconnected", client.peer);
                report.dropped += 1;
                return false;
            }
            match send(&mut client.stream, message) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    info!("Client {} disconnected: {}", client.peer, e);
                    report.dropped += 1;
                    false
                }
            }
        });

        if report.dropped > 0 {
            debug!(
                "Pruned {} client(s), {} remaining",
                report.dropped,
                clients.len()
            );
        }
        report
    }

    /// Drop every connection (closes the sockets)
    pub fn clear(&self) {
        let mut clients = self.clients.lock();
        if !clients.is_empty() {
            debug!("Closing {} client connection(s)", clients.len());
        }
        clients.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory client whose failure mode is controlled by the test
    #[derive(Clone, Default)]
    pub(crate) struct MockClient {
        pub written: Arc<Mutex<Vec<u8>>>,
        /// Peer has gone away; detected before the next write
        pub closed: Arc<Mutex<bool>>,
        /// Writes fail even though the peer looks alive
        pub broken: Arc<Mutex<bool>>,
    }

    impl MockClient {
        pub fn disconnect(&self) {
            *self.closed.lock() = true;
        }

        pub fn break_writes(&self) {
            *self.broken.lock() = true;
        }

        pub fn received(&self) -> Vec<u8> {
            self.written.lock().clone()
        }
    }

    impl Write for MockClient {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if *self.broken.lock() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
            }
            self.written.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ClientStream for MockClient {
        fn peer_closed(&mut self) -> bool {
            *self.closed.lock()
        }
    }

    #[test]
    fn test_empty_broadcast_is_noop() {
        let registry: ClientRegistry<MockClient> = ClientRegistry::new();
        assert_eq!(registry.broadcast(b"abc"), BroadcastReport::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_all_clients() {
        let registry = ClientRegistry::new();
        let a = MockClient::default();
        let b = MockClient::default();
        registry.add(ClientConnection::new(a.clone(), "a"));
        registry.add(ClientConnection::new(b.clone(), "b"));

        let report = registry.broadcast(b"frame");
        assert_eq!(report.delivered, 2);
        assert_eq!(report.dropped, 0);
        assert_eq!(a.received(), b"frame");
        assert_eq!(b.received(), b"frame");
    }

    #[test]
    fn test_failed_client_pruned_others_served() {
        let registry = ClientRegistry::new();
        let first = MockClient::default();
        let gone = MockClient::default();
        let last = MockClient::default();
        registry.add(ClientConnection::new(first.clone(), "first"));
        registry.add(ClientConnection::new(gone.clone(), "gone"));
        registry.add(ClientConnection::new(last.clone(), "last"));

        gone.disconnect();
        let report = registry.broadcast(b"tick");

        assert_eq!(report, BroadcastReport { delivered: 2, dropped: 1 });
        assert_eq!(registry.peers(), vec!["first", "last"]);
        assert_eq!(first.received(), b"tick");
        assert_eq!(last.received(), b"tick");
        assert!(gone.received().is_empty());
    }

    #[test]
    fn test_write_failure_pruned() {
        let registry = ClientRegistry::new();
        let ok = MockClient::default();
        let failing = MockClient::default();
        registry.add(ClientConnection::new(ok.clone(), "ok"));
        registry.add(ClientConnection::new(failing.clone(), "failing"));

        failing.break_writes();
        let report = registry.broadcast(b"tick");

        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(registry.peers(), vec!["ok"]);
    }

    #[test]
    fn test_closed_tcp_peer_detected_before_write() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let alive_peer = TcpStream::connect(addr).unwrap();
        let (mut alive, _) = listener.accept().unwrap();
        let closed_peer = TcpStream::connect(addr).unwrap();
        let (mut closed, _) = listener.accept().unwrap();

        drop(closed_peer);
        std::thread::sleep(std::time::Duration::from_millis(100));

        assert!(!alive.peer_closed());
        assert!(closed.peer_closed());
        drop(alive_peer);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ClientRegistry::new();
        let shared = registry.clone();
        shared.add(ClientConnection::new(MockClient::default(), "x"));
        assert_eq!(registry.len(), 1);
        registry.clear();
        assert!(shared.is_empty());
    }
}
