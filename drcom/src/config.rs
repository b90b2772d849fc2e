//! Client configuration

use std::time::Duration;

use drcom_core::constants::{
    DEFAULT_TIMEOUT, HEARTBEAT_BACKOFF, HEARTBEAT_INTERVAL, LOGIN_RETRY_DELAY, MAX_RETRIES,
};
use drcom_core::{DEFAULT_PORT, DEFAULT_SERVER};

/// Timing and retry policy for a [`Client`](crate::Client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Gateway host name or address
    pub server: String,

    /// Gateway port (also the local bind port)
    pub port: u16,

    /// Wait for each challenge reply
    pub challenge_timeout: Duration,

    /// Challenge requests sent before giving up
    pub challenge_attempts: usize,

    /// Wait for each login reply
    pub login_timeout: Duration,

    /// Login requests sent before giving up
    pub login_attempts: usize,

    /// Pause between login attempts
    pub login_retry_delay: Duration,

    /// Keep-alive period
    pub heartbeat_interval: Duration,

    /// Wait for a keep-alive acknowledgement
    pub heartbeat_ack_timeout: Duration,

    /// Pause after a failed keep-alive
    pub heartbeat_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            challenge_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            challenge_attempts: MAX_RETRIES,
            login_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            login_attempts: MAX_RETRIES,
            login_retry_delay: Duration::from_secs(LOGIN_RETRY_DELAY),
            heartbeat_interval: Duration::from_secs(HEARTBEAT_INTERVAL),
            heartbeat_ack_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            heartbeat_backoff: Duration::from_secs(HEARTBEAT_BACKOFF),
        }
    }
}

impl ClientConfig {
    /// Default policy against `server`
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// Set gateway port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set per-attempt reply timeout for both handshake phases
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.challenge_timeout = timeout;
        self.login_timeout = timeout;
        self
    }

    /// Set attempt bound for both handshake phases (at least one)
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.challenge_attempts = attempts.max(1);
        self.login_attempts = attempts.max(1);
        self
    }

    /// Set pause between login attempts
    pub fn with_login_retry_delay(mut self, delay: Duration) -> Self {
        self.login_retry_delay = delay;
        self
    }

    /// Set keep-alive period
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set keep-alive acknowledgement wait
    pub fn with_heartbeat_ack_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_ack_timeout = timeout;
        self
    }

    /// Set pause after a failed keep-alive
    pub fn with_heartbeat_backoff(mut self, backoff: Duration) -> Self {
        self.heartbeat_backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = ClientConfig::default();

        assert_eq!(config.server, "10.30.1.19");
        assert_eq!(config.port, 61440);
        assert_eq!(config.challenge_timeout, Duration::from_secs(3));
        assert_eq!(config.challenge_attempts, 5);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(20));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("gw.example.edu")
            .with_port(61441)
            .with_timeout(Duration::from_millis(500))
            .with_max_attempts(0)
            .with_heartbeat_interval(Duration::from_secs(10));

        assert_eq!(config.server, "gw.example.edu");
        assert_eq!(config.port, 61441);
        assert_eq!(config.login_timeout, Duration::from_millis(500));
        assert_eq!(config.challenge_attempts, 1);
        assert_eq!(config.login_attempts, 1);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
    }
}
