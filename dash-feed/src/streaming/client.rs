//! TCP client that decodes a running feed the way the dashboard does

use crate::error::{Error, Result};
use crate::streaming::wire::{FieldValue, FrameReader};
use std::io::{BufReader, ErrorKind};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Reads name/value pairs from a dashboard feed
pub struct FeedClient {
    reader: FrameReader<BufReader<TcpStream>>,
    peer: SocketAddr,
}

impl FeedClient {
    /// Connect with timeout
    pub fn connect_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        let peer: SocketAddr = addr
            .parse()
            .map_err(|e| Error::Other(format!("Invalid address {}: {}", addr, e)))?;
        let stream = TcpStream::connect_timeout(&peer, timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: FrameReader::new(BufReader::new(stream)),
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.reader.get_ref().get_ref().local_addr()?)
    }

    /// Set read timeout (None blocks indefinitely)
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Receive the next field
    ///
    /// Returns `Ok(None)` once the feed closes the connection.
    pub fn recv_field(&mut self) -> Result<Option<(String, FieldValue)>> {
        self.reader.read_field()
    }

    /// Receive exactly `count` fields, failing if the feed closes first
    pub fn recv_fields(&mut self, count: usize) -> Result<Vec<(String, FieldValue)>> {
        let mut fields = Vec::with_capacity(count);
        while fields.len() < count {
            match self.recv_field()? {
                Some(field) => fields.push(field),
                None => {
                    return Err(Error::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("feed closed after {} of {} fields", fields.len(), count),
                    )));
                }
            }
        }
        Ok(fields)
    }
}
