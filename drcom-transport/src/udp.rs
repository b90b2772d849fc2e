//! UDP transport for DrCOM gateways
//!
//! The gateway only answers datagrams that originate from port 61440, so
//! the local socket is bound to the same port it sends to.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use drcom_core::{DEFAULT_PORT, MAX_PACKET_SIZE};

use crate::{error::*, Datagram, Transport};

/// UDP transport for DrCOM gateways
pub struct UdpTransport {
    addr: String,
    port: u16,
    local_port: u16,
    socket: Option<UdpSocket>,
    remote_addr: Option<SocketAddr>,
    connect_timeout: Duration,
}

impl UdpTransport {
    /// Create new UDP transport bound to the protocol port
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            local_port: DEFAULT_PORT,
            socket: None,
            remote_addr: None,
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Set local bind port (0 picks any free port)
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    /// Set address resolution timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Local address of the bound socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.remote_addr {
            return Ok(addr);
        }

        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = timeout(self.connect_timeout, tokio::net::lookup_host(&addr_str))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .filter(SocketAddr::is_ipv4)
            .collect();

        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No IPv4 address found for {}", addr_str)))?;

        self.remote_addr = Some(*addr);
        Ok(*addr)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let remote = self.resolve_addr().await?;
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.local_port));

        debug!("Binding {} for gateway {}...", local, remote);

        let socket = UdpSocket::bind(local).await.map_err(|source| {
            warn!("Cannot bind {}: {}", local, source);
            Error::Bind { addr: local, source }
        })?;

        debug!("Bound {:?} for gateway {}", socket.local_addr().ok(), remote);

        self.socket = Some(socket);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            debug!("Released socket for {}", self.remote_addr());
        }

        self.remote_addr = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;
        let remote = self.remote_addr.ok_or(Error::NotConnected)?;

        trace!(
            "Sending {} bytes via UDP: {:02X?}",
            data.len(),
            &data[..data.len().min(32)]
        );

        socket.send_to(data, remote).await.map_err(Error::Io)?;

        Ok(())
    }

    async fn receive(&mut self, timeout_duration: Duration) -> Result<Datagram> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::zeroed(MAX_PACKET_SIZE);

        let (n, from) = timeout(timeout_duration, socket.recv_from(&mut buf))
            .await
            .map_err(|_| {
                debug!("Read timeout after {:?}", timeout_duration);
                Error::ReadTimeout
            })?
            .map_err(|e| {
                warn!("Read error: {}", e);
                Error::Io(e)
            })?;

        // Truncate to actual received size
        buf.truncate(n);

        trace!(
            "Received {} bytes via UDP from {}: {:02X?}",
            n,
            from,
            &buf[..n.min(32)]
        );

        Ok(Datagram { from, payload: buf })
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn remote_addr(&self) -> String {
        self.remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            debug!("UDP transport for {} dropped while bound", self.remote_addr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_transport_create() {
        let transport = UdpTransport::new("10.30.1.19", DEFAULT_PORT);
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), "10.30.1.19:61440");
        assert!(transport.peer_addr().is_none());
    }

    #[tokio::test]
    async fn test_udp_transport_invalid_address() {
        let mut transport = UdpTransport::new("invalid..address", DEFAULT_PORT)
            .with_local_port(0)
            .with_connect_timeout(Duration::from_millis(100));

        let result = transport.connect().await;
        assert!(result.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_udp_transport_send_without_connect() {
        let mut transport = UdpTransport::new("127.0.0.1", DEFAULT_PORT);
        assert!(matches!(transport.send(&[1, 2, 3]).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_udp_transport_loopback_exchange() {
        let gateway = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let gateway_addr = gateway.local_addr().unwrap();

        let mut transport = UdpTransport::new("127.0.0.1", gateway_addr.port()).with_local_port(0);
        transport.connect().await.unwrap();
        assert_eq!(transport.peer_addr(), Some(gateway_addr));

        transport.send(&[0x01, 0x02, 0x03]).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, client_addr) = gateway.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x02, 0x03]);

        gateway.send_to(&[0x02, 0xAA], client_addr).await.unwrap();

        let datagram = transport.receive(Duration::from_secs(2)).await.unwrap();
        assert_eq!(datagram.from, gateway_addr);
        assert_eq!(&datagram.payload[..], &[0x02, 0xAA]);

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_udp_transport_receive_timeout() {
        let mut transport = UdpTransport::new("127.0.0.1", 9).with_local_port(0);
        transport.connect().await.unwrap();

        let result = transport.receive(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::ReadTimeout)));
    }
}
