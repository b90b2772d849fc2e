//! Session state for the DrCOM handshake
//!
//! A session tracks:
//! - Lifecycle state (challenge, login, heartbeat, teardown)
//! - Salt from the challenge (written once)
//! - Package tail from the login reply (written once)
//! - Heartbeat sequence counter and delivery counters

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet
    Idle,

    /// Waiting for the challenge reply
    Challenging,

    /// Salt captured, waiting for the login reply
    Authenticating,

    /// Login accepted, heartbeat not started
    Authenticated,

    /// Heartbeat task running
    HeartbeatActive,

    /// Torn down by the caller
    Disconnected,

    /// Handshake failed
    Failed,
}

impl SessionState {
    /// Check if a keep-alive may be built in this state
    pub fn allows_keepalive(self) -> bool {
        matches!(self, Self::Authenticated | Self::HeartbeatActive)
    }

    /// Check if no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 4-byte salt issued by the gateway's challenge reply
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt([u8; 4]);

impl Salt {
    pub const LEN: usize = 4;

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(self.0))
    }
}

/// Opaque 16-byte token from a successful login, echoed by every heartbeat
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageTail([u8; 16]);

impl PackageTail {
    pub const LEN: usize = 16;

    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PackageTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageTail({})", hex::encode(self.0))
    }
}

/// Session manager
///
/// Every transition takes the state lock, so a second handshake is refused
/// by looking at the current state. Clones share the same state (Arc
/// internally), which lets the heartbeat task observe teardown.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    state: parking_lot::RwLock<SessionState>,

    salt: parking_lot::RwLock<Option<Salt>>,

    package_tail: parking_lot::RwLock<Option<PackageTail>>,

    /// Heartbeat counter, wraps at 256
    sequence: AtomicU8,

    heartbeats_sent: AtomicU64,

    heartbeat_failures: AtomicU64,
}

impl Session {
    /// Create a new idle session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: parking_lot::RwLock::new(SessionState::Idle),
                salt: parking_lot::RwLock::new(None),
                package_tail: parking_lot::RwLock::new(None),
                sequence: AtomicU8::new(0),
                heartbeats_sent: AtomicU64::new(0),
                heartbeat_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if the gateway has accepted the login
    pub fn is_authenticated(&self) -> bool {
        self.state().allows_keepalive()
    }

    pub fn salt(&self) -> Option<Salt> {
        *self.inner.salt.read()
    }

    pub fn package_tail(&self) -> Option<PackageTail> {
        *self.inner.package_tail.read()
    }

    /// Idle -> Challenging
    pub fn begin_challenge(&self) -> Result<()> {
        self.transition(SessionState::Idle, SessionState::Challenging)
    }

    /// Challenging -> Authenticating, capturing the salt
    pub fn set_salt(&self, salt: Salt) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Challenging {
            return Err(Error::InvalidSessionState(format!(
                "Cannot accept salt in state: {:?}",
                *state
            )));
        }

        let mut slot = self.inner.salt.write();
        if slot.is_some() {
            return Err(Error::TokenAlreadySet("salt"));
        }

        *slot = Some(salt);
        *state = SessionState::Authenticating;
        Ok(())
    }

    /// Authenticating -> Authenticated, capturing the package tail
    pub fn authenticate(&self, tail: PackageTail) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Authenticating {
            return Err(Error::InvalidSessionState(format!(
                "Cannot authenticate from state: {:?}",
                *state
            )));
        }

        let mut slot = self.inner.package_tail.write();
        if slot.is_some() {
            return Err(Error::TokenAlreadySet("package tail"));
        }

        *slot = Some(tail);
        *state = SessionState::Authenticated;
        Ok(())
    }

    /// Authenticated -> HeartbeatActive
    pub fn start_heartbeat(&self) -> Result<()> {
        self.transition(SessionState::Authenticated, SessionState::HeartbeatActive)
    }

    /// Mark the handshake as failed
    ///
    /// No effect once the session has been disconnected.
    pub fn fail(&self) {
        let mut state = self.inner.state.write();
        if *state != SessionState::Disconnected {
            *state = SessionState::Failed;
        }
    }

    /// Close session
    ///
    /// A failed session stays `Failed`; everything else becomes `Disconnected`.
    pub fn close(&self) {
        let mut state = self.inner.state.write();
        if *state != SessionState::Failed {
            *state = SessionState::Disconnected;
        }
    }

    /// Salt and package tail for building a keep-alive
    ///
    /// # Errors
    ///
    /// Fails unless the session is `Authenticated` or `HeartbeatActive`.
    pub fn keepalive_tokens(&self) -> Result<(Salt, PackageTail)> {
        let state = self.inner.state.read();

        if !state.allows_keepalive() {
            return Err(Error::InvalidSessionState(format!(
                "Cannot build keep-alive in state: {:?}",
                *state
            )));
        }

        let salt = self.salt().ok_or(Error::TokenMissing("salt"))?;
        let tail = self.package_tail().ok_or(Error::TokenMissing("package tail"))?;

        Ok((salt, tail))
    }

    /// Current heartbeat sequence number
    pub fn sequence(&self) -> u8 {
        self.inner.sequence.load(Ordering::Acquire)
    }

    /// Get the sequence number for this tick and advance it
    ///
    /// Wraps from 255 back to 0.
    pub fn next_sequence(&self) -> u8 {
        self.inner.sequence.fetch_add(1, Ordering::AcqRel)
    }

    /// Count a heartbeat outcome
    pub fn record_heartbeat(&self, delivered: bool) {
        let counter = if delivered {
            &self.inner.heartbeats_sent
        } else {
            &self.inner.heartbeat_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn heartbeats_sent(&self) -> u64 {
        self.inner.heartbeats_sent.load(Ordering::Relaxed)
    }

    pub fn heartbeat_failures(&self) -> u64 {
        self.inner.heartbeat_failures.load(Ordering::Relaxed)
    }

    fn transition(&self, from: SessionState, to: SessionState) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != from {
            return Err(Error::InvalidSessionState(format!(
                "Cannot move to {:?} from state: {:?}",
                to, *state
            )));
        }

        *state = to;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
