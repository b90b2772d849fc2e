//! # drcom-core
//!
//! Core protocol implementation for the DrCOM gateway authentication protocol.
//!
//! This crate provides the low-level protocol primitives:
//! - Checksum calculation
//! - Credential digests
//! - Packet encoding and response parsing
//! - Session state and write-once session tokens
//! - Protocol constants

pub mod auth;
pub mod checksum;
pub mod clock;
pub mod code;
pub mod constants;
pub mod error;
pub mod packet;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use code::Code;
pub use error::{Error, Result};
pub use packet::{LoginOutcome, Packet, PacketKind};
pub use session::{PackageTail, Salt, Session, SessionState};

/// Default gateway address
pub const DEFAULT_SERVER: &str = "10.30.1.19";

/// Gateway port, also used as the local bind port
pub const DEFAULT_PORT: u16 = 61440;

/// Receive buffer size
pub const MAX_PACKET_SIZE: usize = 1024;
