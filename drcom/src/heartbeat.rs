//! Background keep-alive task
//!
//! Sends one keep-alive per interval until its cancellation token fires.
//! Failures are logged and counted on the session, then retried after a
//! backoff; they never end the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use drcom_core::{Clock, Code, Packet, Session};
use drcom_transport::Transport;

use crate::error::Result;

/// Transport shared between the client and its heartbeat task
pub(crate) type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Handle to a running keep-alive task
pub(crate) struct Heartbeat {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the task on the current runtime
    pub(crate) fn spawn(task: HeartbeatTask) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(task.run(token.clone()));

        Self { token, handle }
    }

    /// Signal the task without waiting for it
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait until the task has exited
    ///
    /// Once this returns no further keep-alive will be sent.
    pub(crate) async fn stop(self) {
        self.token.cancel();

        if let Err(e) = self.handle.await {
            warn!("Keep-alive task ended abnormally: {}", e);
        }
    }
}

/// Everything one keep-alive loop needs
pub(crate) struct HeartbeatTask {
    pub(crate) transport: SharedTransport,
    pub(crate) session: Session,
    pub(crate) password: Vec<u8>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) interval: Duration,
    pub(crate) ack_timeout: Duration,
    pub(crate) backoff: Duration,
}

impl HeartbeatTask {
    async fn run(self, token: CancellationToken) {
        info!("Keep-alive started (interval {:?})", self.interval);

        while !token.is_cancelled() {
            let pause = match self.beat(&token).await {
                Ok(sent) => {
                    if sent {
                        self.session.record_heartbeat(true);
                    }
                    self.interval
                }
                Err(e) => {
                    self.session.record_heartbeat(false);
                    warn!("Keep-alive failed: {} - retrying in {:?}", e, self.backoff);
                    self.backoff
                }
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        debug!(
            sent = self.session.heartbeats_sent(),
            failed = self.session.heartbeat_failures(),
            "Keep-alive stopped"
        );
    }

    /// One tick: send, then wait for the acknowledgement
    ///
    /// Returns whether a keep-alive went out. The outcome is only final
    /// once the acknowledgement phase is over.
    async fn beat(&self, token: &CancellationToken) -> Result<bool> {
        let mut transport = self.transport.lock().await;

        // Cancellation may have arrived while waiting for the lock
        if token.is_cancelled() {
            return Ok(false);
        }

        let packet = Packet::keepalive(&self.session, &self.password, self.clock.unix_secs())?;
        let sequence = self.session.next_sequence();

        transport.send(&packet.bytes).await?;
        trace!(sequence, "Keep-alive sent");

        tokio::select! {
            _ = token.cancelled() => {}
            reply = transport.receive(self.ack_timeout) => match reply {
                Ok(datagram) => match datagram.payload.first().map(|&lead| Code::try_from(lead)) {
                    Some(Ok(Code::KeepAliveAck)) => debug!(sequence, "Keep-alive acknowledged"),
                    Some(Ok(Code::Message)) => {
                        debug!(sequence, len = datagram.payload.len(), "Gateway message received")
                    }
                    Some(Ok(code)) => debug!(sequence, %code, "Unexpected reply to keep-alive"),
                    Some(Err(e)) => debug!(sequence, "Ignoring reply to keep-alive: {}", e),
                    None => debug!(sequence, "Empty reply to keep-alive"),
                },
                Err(e) if e.is_timeout() => {
                    debug!(sequence, "Keep-alive not acknowledged");
                }
                Err(e) => return Err(e.into()),
            },
        }

        Ok(true)
    }
}
