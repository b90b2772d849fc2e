//! Transport layer for the DrCOM protocol
//!
//! Provides datagram exchange with the gateway.

pub mod udp;
pub mod error;

pub use error::{Error, Result};
pub use udp::UdpTransport;

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// A datagram and the address it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub from: SocketAddr,
    pub payload: BytesMut,
}

/// Transport trait for exchanging datagrams with one gateway
///
/// Implementations are owned by a single client and never shared between
/// concurrent callers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind the local endpoint and resolve the gateway
    async fn connect(&mut self) -> Result<()>;
    
    /// Release the local endpoint
    async fn disconnect(&mut self) -> Result<()>;
    
    /// Check if connected
    fn is_connected(&self) -> bool;
    
    /// Send one datagram to the gateway
    async fn send(&mut self, data: &[u8]) -> Result<()>;
    
    /// Receive one datagram, waiting at most `timeout`
    ///
    /// Returns [`Error::ReadTimeout`] when the deadline passes.
    async fn receive(&mut self, timeout: Duration) -> Result<Datagram>;
    
    /// Resolved gateway address, once connected
    fn peer_addr(&self) -> Option<SocketAddr>;
    
    /// Get remote address for display
    fn remote_addr(&self) -> String;
}
