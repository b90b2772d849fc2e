//! # drcom
//!
//! Async client for the DrCOM campus network gateway authentication protocol.
//!
//! ## Features
//!
//! - Challenge/login handshake with bounded retries
//! - Background keep-alive with cancellation
//! - Typed errors for timeouts, rejections and transport failures
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::net::Ipv4Addr;
//! use drcom::{Client, ClientConfig, Credentials, HostProfile, MacAddress};
//!
//! #[tokio::main]
//! async fn main() -> drcom::Result<()> {
//!     let mut client = Client::new(ClientConfig::new("10.30.1.19"));
//!
//!     let host = HostProfile::new(
//!         Ipv4Addr::new(10, 30, 22, 17),
//!         "LAPTOP",
//!         "20:68:9d:f3:d0:66".parse()?,
//!         "WINDOWS",
//!     );
//!
//!     client.login(Credentials::new("student01", "secret")?, &host).await?;
//!     client.start_heartbeat()?;
//!
//!     // ... online ...
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
mod heartbeat;

// Re-exports
pub use client::Client;
pub use config::ClientConfig;
pub use error::{AuthFailure, Error, Result};

// Re-export types
pub use drcom_core::{
    LoginOutcome, PackageTail, Packet, Salt, Session, SessionState, DEFAULT_PORT, DEFAULT_SERVER,
};
pub use drcom_types::{Credentials, HostProfile, MacAddress, OsVersion};
