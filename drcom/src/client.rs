//! High-level gateway client

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use drcom_core::constants::challenge::{JITTER_MAX, JITTER_MIN};
use drcom_core::packet::{challenge_seed, parse_challenge_response, parse_login_response};
use drcom_core::{
    Clock, LoginOutcome, PackageTail, Packet, Salt, Session, SessionState, SystemClock,
};
use drcom_transport::{Transport, UdpTransport};
use drcom_types::{Credentials, HostProfile};

use crate::config::ClientConfig;
use crate::error::{AuthFailure, Error, Result};
use crate::heartbeat::{Heartbeat, HeartbeatTask, SharedTransport};

/// DrCOM gateway client
///
/// Owns one UDP endpoint and drives a single session through
/// challenge, login, keep-alive and teardown.
///
/// # Examples
///
/// ```no_run
/// use std::net::Ipv4Addr;
/// use drcom::{Client, ClientConfig, Credentials, HostProfile, MacAddress};
///
/// #[tokio::main]
/// async fn main() -> drcom::Result<()> {
///     let mut client = Client::new(ClientConfig::default());
///
///     let credentials = Credentials::new("542207150101", "hunter2")?;
///     let host = HostProfile::new(
///         Ipv4Addr::new(10, 30, 22, 17),
///         "LAPTOP",
///         MacAddress::from(0x20689df3d066),
///         "WINDOWS",
///     );
///
///     client.login(credentials, &host).await?;
///     client.start_heartbeat()?;
///
///     tokio::signal::ctrl_c().await.ok();
///     client.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    transport: SharedTransport,
    session: Session,
    config: ClientConfig,
    clock: Arc<dyn Clock>,
    credentials: Option<Credentials>,
    heartbeat: Option<Heartbeat>,
}

impl Client {
    /// Create a client using UDP on the configured gateway and port
    pub fn new(config: ClientConfig) -> Self {
        let transport = UdpTransport::new(config.server.clone(), config.port);
        Self::with_transport(Box::new(transport), config)
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Box<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            session: Session::new(),
            config,
            clock: Arc::new(SystemClock),
            credentials: None,
            heartbeat: None,
        }
    }

    /// Replace the wall clock used for seeds and keep-alive time fields
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Session details (salt, package tail, heartbeat counters)
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticate against the gateway
    ///
    /// Runs the challenge and login exchanges to completion. On any error
    /// the session ends up `Failed` and the local endpoint is released; a
    /// new `Client` is needed to try again.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if a handshake was already started on this client
    /// - [`Error::Transport`] if the socket cannot be bound or used
    /// - [`Error::Timeout`] if no challenge reply arrives within the attempt bound
    /// - [`Error::Auth`] if the gateway rejects the login or never answers it
    pub async fn login(&mut self, credentials: Credentials, host: &HostProfile) -> Result<()> {
        self.session.begin_challenge()?;

        info!(
            "Logging in as {} from {}...",
            credentials.username(),
            host
        );

        match self.handshake(&credentials, host).await {
            Ok(()) => {
                info!("Login accepted");
                self.credentials = Some(credentials);
                Ok(())
            }
            Err(e) => {
                self.session.fail();
                warn!("Login failed: {}", e);

                let mut transport = self.transport.lock().await;
                if transport.is_connected() {
                    if let Err(release) = transport.disconnect().await {
                        warn!("Cannot release {}: {}", transport.remote_addr(), release);
                    }
                }

                Err(e)
            }
        }
    }

    /// Start the background keep-alive loop
    ///
    /// # Errors
    ///
    /// Fails unless the session is `Authenticated`.
    pub fn start_heartbeat(&mut self) -> Result<()> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Err(drcom_core::Error::InvalidSessionState(format!(
                "Cannot start keep-alive in state: {:?}",
                self.session.state()
            ))
            .into());
        };
        let password = credentials.password().to_vec();

        self.session.start_heartbeat()?;

        self.heartbeat = Some(Heartbeat::spawn(HeartbeatTask {
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
            password,
            clock: Arc::clone(&self.clock),
            interval: self.config.heartbeat_interval,
            ack_timeout: self.config.heartbeat_ack_timeout,
            backoff: self.config.heartbeat_backoff,
        }));

        Ok(())
    }

    /// Stop the keep-alive loop and release the socket
    ///
    /// When this returns no further packet will be sent. Calling it again
    /// is a no-op.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop().await;
        }

        self.session.close();
        self.credentials = None;

        let mut transport = self.transport.lock().await;
        if transport.is_connected() {
            info!("Disconnecting from {}...", transport.remote_addr());
            transport.disconnect().await?;
            info!("Disconnected");
        }

        Ok(())
    }

    // Handshake

    async fn handshake(&self, credentials: &Credentials, host: &HostProfile) -> Result<()> {
        let mut transport = self.transport.lock().await;

        if !transport.is_connected() {
            transport.connect().await?;
        }

        let salt = self.challenge(&mut **transport).await?;
        self.session.set_salt(salt)?;
        debug!("Challenge answered with {:?}", salt);

        let packet = Packet::login(&salt, credentials, host);
        let tail = self.authenticate(&mut **transport, &packet).await?;
        self.session.authenticate(tail)?;
        debug!("Login answered with {:?}", tail);

        Ok(())
    }

    async fn challenge(&self, transport: &mut dyn Transport) -> Result<Salt> {
        let attempts = self.config.challenge_attempts;

        for attempt in 1..=attempts {
            let jitter = rand::thread_rng().gen_range(JITTER_MIN..JITTER_MAX);
            let packet = Packet::challenge(challenge_seed(self.clock.unix_secs(), jitter));

            transport.send(&packet.bytes).await?;

            match self.await_reply(transport, self.config.challenge_timeout).await? {
                Some(reply) => match parse_challenge_response(&reply) {
                    Ok(salt) => return Ok(salt),
                    Err(e) if e.is_recoverable() => {
                        debug!(attempt, "Ignoring challenge reply: {}", e)
                    }
                    Err(e) => return Err(e.into()),
                },
                None => warn!(attempt, attempts, "Challenge timed out, retrying..."),
            }
        }

        Err(Error::Timeout { attempts })
    }

    async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        packet: &Packet,
    ) -> Result<PackageTail> {
        let attempts = self.config.login_attempts;

        for attempt in 1..=attempts {
            transport.send(&packet.bytes).await?;
            debug!(attempt, "Login packet sent");

            match self.await_reply(transport, self.config.login_timeout).await? {
                Some(reply) => match parse_login_response(&reply) {
                    Ok(LoginOutcome::Accepted(tail)) => return Ok(tail),
                    Ok(LoginOutcome::Rejected { code }) => {
                        return Err(AuthFailure::Rejected { code }.into());
                    }
                    Err(e) if e.is_recoverable() => debug!(attempt, "Ignoring login reply: {}", e),
                    Err(e) => return Err(e.into()),
                },
                None => warn!(attempt, attempts, "Login timed out"),
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.login_retry_delay).await;
            }
        }

        Err(AuthFailure::NoResponse { attempts }.into())
    }

    /// Wait for one reply from the gateway
    ///
    /// `None` means nothing usable arrived: the deadline passed or the
    /// datagram came from somewhere other than the gateway.
    async fn await_reply(
        &self,
        transport: &mut dyn Transport,
        timeout: Duration,
    ) -> Result<Option<BytesMut>> {
        match transport.receive(timeout).await {
            Ok(datagram) => {
                if transport.peer_addr().is_some_and(|peer| peer != datagram.from) {
                    debug!("Ignoring datagram from {}", datagram.from);
                    return Ok(None);
                }
                Ok(Some(datagram.payload))
            }
            Err(e) if e.is_timeout() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(heartbeat) = &self.heartbeat {
            warn!("Client dropped with keep-alive running");
            heartbeat.cancel();
        }
    }
}
